//! MCP tool surface (§6.2): the same nine queries the HTTP transport
//! exposes, wrapped as `rmcp` tools over stdio so an LLM client can call
//! them directly. Every tool delegates to `query` — this module only
//! adapts parameters and formats the text response.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::query;
use crate::ServerState;

fn mcp_err(msg: impl std::fmt::Display) -> McpError {
    McpError::internal_error(msg.to_string(), None)
}

fn text_result(json: serde_json::Value, summary: String) -> Result<CallToolResult, McpError> {
    let pretty = serde_json::to_string_pretty(&json).map_err(mcp_err)?;
    Ok(CallToolResult::success(vec![Content::text(format!("{summary}\n\n{pretty}"))]))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SymbolParams {
    /// Symbol name to look up.
    pub symbol: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ComplexityParams {
    /// Minimum cyclomatic complexity to include (default 10).
    pub threshold: Option<u32>,
}

#[derive(Clone)]
pub struct CodeGraphMcpServer {
    tool_router: ToolRouter<Self>,
    state: Arc<ServerState>,
}

#[tool_router]
impl CodeGraphMcpServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        CodeGraphMcpServer { tool_router: Self::tool_router(), state }
    }

    #[tool(description = "Run a full analysis of the configured project root and report resulting graph statistics.")]
    async fn analyze_codebase(&self, Parameters(_): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        let stats = self.state.engine.analyze_full().await.map_err(mcp_err)?;
        let graph = self.state.engine.graph().await;
        let body = serde_json::to_value(query::stats_response(&graph, &stats)).map_err(mcp_err)?;
        text_result(body, format!("Analyzed {} nodes, {} relationships.", stats.total_nodes, stats.total_edges))
    }

    #[tool(description = "Find where a symbol is declared — returns the declaring node(s) matching the name.")]
    async fn find_definition(&self, Parameters(params): Parameters<SymbolParams>) -> Result<CallToolResult, McpError> {
        let graph = self.state.engine.graph().await;
        let ids: Vec<_> = graph.all_nodes().filter(|n| n.name == params.symbol).map(query::node_to_dto).collect();
        let count = ids.len();
        text_result(serde_json::json!({ "symbol": params.symbol, "definitions": ids }), format!("{count} definition(s) found for '{}'.", params.symbol))
    }

    #[tool(description = "Find references to a symbol (calls and type references into it).")]
    async fn find_references(&self, Parameters(params): Parameters<SymbolParams>) -> Result<CallToolResult, McpError> {
        let graph = self.state.engine.graph().await;
        let page = query::references(&graph, &params.symbol, 500, 0);
        let total = page.total;
        text_result(
            serde_json::json!({ "symbol": params.symbol, "references": page.items, "total": page.total }),
            format!("{total} reference(s) to '{}'.", params.symbol),
        )
    }

    #[tool(description = "Find every node that calls a symbol.")]
    async fn find_callers(&self, Parameters(params): Parameters<SymbolParams>) -> Result<CallToolResult, McpError> {
        let graph = self.state.engine.graph().await;
        let page = query::callers(&graph, &params.symbol, 500, 0);
        let total = page.total;
        text_result(
            serde_json::json!({ "symbol": params.symbol, "callers": page.items, "total": page.total }),
            format!("{total} caller(s) of '{}'.", params.symbol),
        )
    }

    #[tool(description = "Find every symbol a given symbol calls.")]
    async fn find_callees(&self, Parameters(params): Parameters<SymbolParams>) -> Result<CallToolResult, McpError> {
        let graph = self.state.engine.graph().await;
        let page = query::callees(&graph, &params.symbol, 500, 0);
        let total = page.total;
        text_result(
            serde_json::json!({ "symbol": params.symbol, "callees": page.items, "total": page.total }),
            format!("{total} callee(s) of '{}'.", params.symbol),
        )
    }

    #[tool(description = "List functions/methods at or above a cyclomatic complexity threshold, highest first.")]
    async fn complexity_analysis(&self, Parameters(params): Parameters<ComplexityParams>) -> Result<CallToolResult, McpError> {
        let threshold = params.threshold.unwrap_or(10);
        let graph = self.state.engine.graph().await;
        let mut hot: Vec<_> = graph
            .all_nodes()
            .filter(|n| n.complexity.is_some_and(|c| c >= threshold))
            .map(query::node_to_dto)
            .collect();
        hot.sort_by(|a, b| b.complexity.cmp(&a.complexity));
        let count = hot.len();
        text_result(
            serde_json::json!({ "threshold": threshold, "functions": hot }),
            format!("{count} function(s) at or above complexity {threshold}."),
        )
    }

    #[tool(description = "Report circular import dependencies across the project.")]
    async fn dependency_analysis(&self, Parameters(_): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        let graph = self.state.engine.graph().await;
        let cycles = graph.circular_dependencies();
        let named: Vec<Vec<String>> = cycles
            .iter()
            .map(|cycle| cycle.iter().filter_map(|id| graph.node(*id)).map(|n| n.qualified_name.clone()).collect())
            .collect();
        let count = named.len();
        text_result(serde_json::json!({ "circular_dependencies": named }), format!("{count} circular dependency cycle(s) found."))
    }

    #[tool(description = "Project-wide graph statistics: counts, language histogram, top-complexity functions.")]
    async fn project_statistics(&self, Parameters(_): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        let graph = self.state.engine.graph().await;
        let stats = graph.stats();
        let body = serde_json::to_value(query::stats_response(&graph, &stats)).map_err(mcp_err)?;
        text_result(body, format!("{} nodes, {} relationships.", stats.total_nodes, stats.total_edges))
    }

    #[tool(description = "Explain the recommended workflow for using these tools together.")]
    async fn get_usage_guide(&self, Parameters(_): Parameters<EmptyParams>) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(usage_guide())]))
    }
}

fn usage_guide() -> String {
    "This server exposes a pre-computed code property graph over the project root.\n\n\
     Workflow:\n\
     1. Run analyze_codebase once per session (or after major edits) to build/refresh the graph.\n\
     2. Use find_definition to locate where a symbol is declared.\n\
     3. Use find_callers / find_callees to understand call relationships before refactoring.\n\
     4. Use find_references for a broader usage search, including type references.\n\
     5. Use complexity_analysis to triage which functions are riskiest to change.\n\
     6. Use dependency_analysis to spot circular import cycles.\n\
     7. Use project_statistics for a high-level health check of the codebase.\n\n\
     The underlying graph also updates incrementally as files change if the file watcher is enabled."
        .to_string()
}

#[tool_handler]
impl ServerHandler for CodeGraphMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation { name: "codegraph".into(), version: env!("CARGO_PKG_VERSION").into() },
            instructions: Some(usage_guide()),
        }
    }
}

pub async fn run_stdio_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    use rmcp::transport::stdio;
    use rmcp::ServiceExt;

    tracing::info!("starting codegraph MCP server v{}", env!("CARGO_PKG_VERSION"));
    let server = CodeGraphMcpServer::new(state);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    tracing::info!("codegraph MCP server stopped");
    Ok(())
}
