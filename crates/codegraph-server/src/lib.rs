//! HTTP/JSON query surface and MCP tool server (C10).

pub mod handlers;
pub mod mcp;
pub mod query;
pub mod router;
pub mod state;

pub use state::ServerState;
