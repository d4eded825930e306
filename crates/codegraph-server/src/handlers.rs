//! Typed axum extractors and response bodies for the HTTP query surface
//! (§6.1). Each handler times its own query and stamps the result with
//! `execution_time_ms`, then delegates all graph computation to `query`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use codegraph_core::CodeGraphError;
use serde::{Deserialize, Serialize};

use crate::query::{self, Category, TraversalMode};
use crate::ServerState;

fn error_response(err: CodeGraphError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        CodeGraphError::NotFound(_) => StatusCode::NOT_FOUND,
        CodeGraphError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        CodeGraphError::UnsupportedLanguage(_)
        | CodeGraphError::ParseError { .. }
        | CodeGraphError::CacheUnavailable(_)
        | CodeGraphError::DeadlineExceeded => StatusCode::OK,
        CodeGraphError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.kind(), "message": err.to_string() })))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheHealth,
    pub watcher: WatcherHealth,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct WatcherHealth {
    pub running: bool,
}

pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        cache: CacheHealth { connected: state.cache_connected },
        watcher: WatcherHealth { running: state.watcher_running() },
    })
}

pub async fn get_stats(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let start = Instant::now();
    let graph = state.engine.graph().await;
    let stats = graph.stats();
    let mut body = serde_json::to_value(query::stats_response(&graph, &stats)).unwrap();
    body["execution_time_ms"] = serde_json::json!(start.elapsed().as_secs_f64() * 1000.0);
    Json(body)
}

pub async fn get_node(
    State(state): State<Arc<ServerState>>,
    AxumPath(id): AxumPath<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let node_id = query::parse_node_id(&id).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "id".into(), reason: "not a valid node id".into() })
    })?;
    let graph = state.engine.graph().await;
    query::get_node(&graph, node_id)
        .map(Json)
        .ok_or_else(|| error_response(CodeGraphError::NotFound(id)))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub language: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn search_nodes(State(state): State<Arc<ServerState>>, Query(params): Query<SearchParams>) -> impl IntoResponse {
    let start = Instant::now();
    let limit = params.limit.unwrap_or(50).min(500);
    let offset = params.offset.unwrap_or(0);
    let graph = state.engine.graph().await;
    let page = query::search_nodes(&graph, params.q.as_deref().unwrap_or(""), params.language.as_deref(), params.kind.as_deref(), limit, offset);
    Json(serde_json::json!({
        "results": page.items,
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
        "has_more": page.has_more,
        "execution_time_ms": start.elapsed().as_secs_f64() * 1000.0,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn get_category(
    State(state): State<Arc<ServerState>>,
    AxumPath(category): AxumPath<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let start = Instant::now();
    let cat = Category::parse(&category).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "category".into(), reason: "unknown category".into() })
    })?;
    let limit = params.limit.unwrap_or(100).min(1000);
    let offset = params.offset.unwrap_or(0);
    let graph = state.engine.graph().await;
    let page = query::category(&graph, cat, limit, offset);
    Ok(Json(serde_json::json!({
        "category": category,
        "total": page.total,
        "offset": page.offset,
        "limit": page.limit,
        "nodes": page.items,
        "execution_time_ms": start.elapsed().as_secs_f64() * 1000.0,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SymbolQueryParams {
    pub symbol: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn get_callers(State(state): State<Arc<ServerState>>, Query(params): Query<SymbolQueryParams>) -> impl IntoResponse {
    symbol_query_response(&state, &params, "callers", query::callers).await
}

pub async fn get_callees(State(state): State<Arc<ServerState>>, Query(params): Query<SymbolQueryParams>) -> impl IntoResponse {
    symbol_query_response(&state, &params, "callees", query::callees).await
}

pub async fn get_references(State(state): State<Arc<ServerState>>, Query(params): Query<SymbolQueryParams>) -> impl IntoResponse {
    symbol_query_response(&state, &params, "references", query::references).await
}

async fn symbol_query_response(
    state: &ServerState,
    params: &SymbolQueryParams,
    key: &str,
    f: impl Fn(&codegraph_core::Graph, &str, usize, usize) -> query::Page<query::NodeDto>,
) -> impl IntoResponse {
    let start = Instant::now();
    let limit = params.limit.unwrap_or(50).min(500);
    let offset = params.offset.unwrap_or(0);
    let graph = state.engine.graph().await;
    let page = f(&graph, &params.symbol, limit, offset);
    let mut body = serde_json::Map::new();
    body.insert("symbol".to_string(), serde_json::json!(params.symbol));
    body.insert(key.to_string(), serde_json::json!(page.items));
    body.insert(format!("total_{key}"), serde_json::json!(page.total));
    body.insert("limit".to_string(), serde_json::json!(page.limit));
    body.insert("offset".to_string(), serde_json::json!(page.offset));
    body.insert("has_more".to_string(), serde_json::json!(page.has_more));
    body.insert("execution_time_ms".to_string(), serde_json::json!(start.elapsed().as_secs_f64() * 1000.0));
    Json(serde_json::Value::Object(body))
}

#[derive(Debug, Deserialize)]
pub struct TraverseRequest {
    pub start_node: String,
    pub query_type: String,
    pub max_depth: Option<usize>,
    pub include_seams: Option<bool>,
    pub edge_types: Option<Vec<String>>,
}

pub async fn post_traverse(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<TraverseRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let start = Instant::now();
    let start_id = query::parse_node_id(&req.start_node).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "start_node".into(), reason: "not a valid node id".into() })
    })?;
    let mode = TraversalMode::parse(&req.query_type).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "query_type".into(), reason: "must be bfs or dfs".into() })
    })?;
    let max_depth = req.max_depth.unwrap_or(state.limits.max_depth).min(state.limits.max_depth);
    let mut edge_types = req.edge_types.unwrap_or_default();
    if req.include_seams.unwrap_or(false) && !edge_types.is_empty() {
        edge_types.push("seam".to_string());
    }
    let edge_types = if edge_types.is_empty() { None } else { Some(edge_types.as_slice()) };

    let graph = state.engine.graph().await;
    let result = query::traverse(&graph, start_id, mode, max_depth, state.limits.max_nodes, edge_types);
    Ok(Json(serde_json::json!({
        "nodes": result.nodes,
        "relationships": result.edges,
        "stats": {
            "total_nodes": result.nodes.len(),
            "total_relationships": result.edges.len(),
            "traversal_depth": max_depth,
            "seam_count": result.seam_count,
        },
        "truncated": result.truncated,
        "execution_time_ms": start.elapsed().as_secs_f64() * 1000.0,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SubgraphRequest {
    pub start_node: String,
    pub max_depth: Option<usize>,
    pub max_nodes: Option<usize>,
}

pub async fn post_subgraph(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<SubgraphRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let start_id = query::parse_node_id(&req.start_node).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "start_node".into(), reason: "not a valid node id".into() })
    })?;
    let max_depth = req.max_depth.unwrap_or(state.limits.max_depth).min(state.limits.max_depth);
    let max_nodes = req.max_nodes.unwrap_or(state.limits.max_nodes).min(state.limits.max_nodes);
    let graph = state.engine.graph().await;
    let result = query::subgraph(&graph, start_id, max_depth, max_nodes);
    Ok(Json(serde_json::json!({
        "nodes": result.nodes,
        "relationships": result.edges,
        "total_nodes": result.nodes.len(),
        "total_relationships": result.edges.len(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CallChainParams {
    pub dst: Option<String>,
    pub follow_seams: Option<bool>,
    pub max_depth: Option<usize>,
}

pub async fn get_call_chain(
    State(state): State<Arc<ServerState>>,
    AxumPath(start): AxumPath<String>,
    Query(params): Query<CallChainParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let src = query::parse_node_id(&start).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "start".into(), reason: "not a valid node id".into() })
    })?;
    let dst_raw = params
        .dst
        .as_deref()
        .ok_or_else(|| error_response(CodeGraphError::InvalidArgument { field: "dst".into(), reason: "required".into() }))?;
    let dst = query::parse_node_id(dst_raw).ok_or_else(|| {
        error_response(CodeGraphError::InvalidArgument { field: "dst".into(), reason: "not a valid node id".into() })
    })?;
    let follow_seams = params.follow_seams.unwrap_or(false);
    let max_depth = params.max_depth.unwrap_or(state.limits.max_depth).min(state.limits.max_depth);

    let graph = state.engine.graph().await;
    let result = query::call_chain(&graph, src, dst, follow_seams, max_depth)
        .ok_or_else(|| error_response(CodeGraphError::NotFound(format!("no path from {start} to {}", params.dst.as_deref().unwrap_or("")))))?;

    let seam_count = result.seams.len();
    let depth = result.chain.len().saturating_sub(1);
    let seams: Vec<_> = result
        .seams
        .iter()
        .map(|s| serde_json::json!({ "from_index": s.from_index, "to_index": s.to_index, "languages": [s.languages.0, s.languages.1] }))
        .collect();
    Ok(Json(serde_json::json!({
        "chain": result.chain,
        "seams": seams,
        "stats": { "depth": depth, "seam_count": seam_count },
    })))
}

pub async fn post_reanalyze(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.engine.analyze_full().await {
        Ok(_) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(e) => error_response(CodeGraphError::Internal(e)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_reports_cache_and_watcher_state() {
        let cache = codegraph_core::Cache::in_memory(10, std::time::Duration::from_secs(60));
        let engine = Arc::new(codegraph_index::coordinator::AnalysisEngine::new(
            ".",
            codegraph_index::discovery::Discovery::new("."),
            cache,
        ));
        let state = Arc::new(ServerState::new(engine, None, false));
        let response = health_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
