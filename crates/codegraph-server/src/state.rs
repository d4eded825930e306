//! Shared state handed to every request handler and MCP tool call.

use codegraph_index::coordinator::AnalysisEngine;
use codegraph_watch::WatcherService;
use std::sync::Arc;

/// Bounds applied to unbounded traversal/subgraph queries (§5's
/// `max_nodes_per_traversal` / `max_depth_per_traversal` config options).
#[derive(Debug, Clone, Copy)]
pub struct TraversalLimits {
    pub max_nodes: usize,
    pub max_depth: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        TraversalLimits { max_nodes: 1000, max_depth: 10 }
    }
}

pub struct ServerState {
    pub engine: Arc<AnalysisEngine>,
    pub watcher: Option<Arc<WatcherService>>,
    /// Whether the cache layer was configured with an L2 (redis) backend.
    /// `/health` reports this rather than probing the connection, matching
    /// the cache's own degrade-without-failing-reads policy.
    pub cache_connected: bool,
    pub limits: TraversalLimits,
}

impl ServerState {
    pub fn new(engine: Arc<AnalysisEngine>, watcher: Option<Arc<WatcherService>>, cache_connected: bool) -> Self {
        ServerState { engine, watcher, cache_connected, limits: TraversalLimits::default() }
    }

    pub fn watcher_running(&self) -> bool {
        self.watcher.as_ref().is_some_and(|w| w.is_running())
    }
}
