//! Axum router setup: wires the HTTP/JSON query surface (§6.1) to its
//! handlers. Path layout and methods are the bit-compatible contract —
//! do not rename a route without checking the spec table first.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::handlers::{
    get_call_chain, get_callees, get_callers, get_category, get_node, get_references, get_stats,
    health_check, post_reanalyze, post_subgraph, post_traverse, search_nodes,
};
use crate::ServerState;

pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/graph/stats", get(get_stats))
        .route("/api/graph/nodes/:id", get(get_node))
        .route("/api/graph/nodes/search", get(search_nodes))
        .route("/api/graph/categories/:category", get(get_category))
        .route("/api/graph/query/callers", get(get_callers))
        .route("/api/graph/query/callees", get(get_callees))
        .route("/api/graph/query/references", get(get_references))
        .route("/api/graph/traverse", post(post_traverse))
        .route("/api/graph/subgraph", post(post_subgraph))
        .route("/api/graph/call-chain/:start", get(get_call_chain))
        .route("/api/graph/admin/reanalyze", post(post_reanalyze))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_in_memory_state() {
        let cache = codegraph_core::Cache::in_memory(10, std::time::Duration::from_secs(60));
        let engine = Arc::new(codegraph_index::coordinator::AnalysisEngine::new(
            ".",
            codegraph_index::discovery::Discovery::new("."),
            cache,
        ));
        let state = Arc::new(ServerState::new(engine, None, false));
        let _router = create_router(state);
    }
}
