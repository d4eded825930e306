//! Core data model for the code property graph: node/edge types, the
//! graph store itself, the cross-file symbol table, and the two-tier
//! cache that analysis results are read from and written to.

pub mod cache;
pub mod error;
pub mod graph;
pub mod model;
pub mod symbols;

#[cfg(test)]
pub mod test_utils;

pub use cache::{Cache, CacheConfig, FileAnalysis};
pub use error::{CodeGraphError, Result};
pub use graph::{any_edge, Categories, EdgeDirection, EdgeFilter, Graph, GraphStats};
pub use model::{
    EdgeId, EdgeKind, EdgeSource, GraphEdge, GraphNode, Language, NodeId, NodeKind,
};
pub use symbols::SymbolTable;
