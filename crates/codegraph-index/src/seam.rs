//! Seam Detector (C5): recognizes call and string-literal sites that
//! cross into another language via a string-identified endpoint (SQL,
//! HTTP, shell, FFI) and materializes SEAM edges to a synthetic node
//! representing that logical external target.
//!
//! Target nodes are not owned by any file (they're not real source
//! entities) — they're addressed deterministically by their endpoint
//! description so that the same logical target (e.g. the HTTP route
//! `/api/users`) resolves to the same node id regardless of which file's
//! SEAM edge points at it first, and survive that file's own re-parses
//! untouched since `replace_file_fragment` only ever removes nodes the
//! file itself owns.

use crate::ast;
use codegraph_core::{EdgeKind, EdgeSource, GraphEdge, GraphNode, Language, NodeId, NodeKind};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tree_sitter::Node;

/// One recognized cross-language call shape: a caller-language API
/// surface (matched against the rightmost identifier of a call's
/// callee), the language it targets, and how confidently the literal
/// endpoint argument can be recovered.
struct SeamPattern {
    caller_language: Language,
    /// Matched against the callee text (e.g. `subprocess.run`,
    /// `cursor.execute`, `fetch`, `reqwest::get`).
    callee_pattern: Regex,
    target_language: TargetLanguage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLanguage {
    Shell,
    Sql,
    Http,
}

impl TargetLanguage {
    fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::Shell => "shell",
            TargetLanguage::Sql => "sql",
            TargetLanguage::Http => "http",
        }
    }
}

static PATTERNS: LazyLock<Vec<SeamPattern>> = LazyLock::new(|| {
    vec![
        // Python
        seam(Language::Python, r"^subprocess\.(run|call|Popen|check_output)$", TargetLanguage::Shell),
        seam(Language::Python, r"^os\.(system|popen)$", TargetLanguage::Shell),
        seam(Language::Python, r"^(cursor\.execute|execute)$", TargetLanguage::Sql),
        seam(Language::Python, r"^text$", TargetLanguage::Sql), // sqlalchemy.text(...)
        // TypeScript / JavaScript
        seam(Language::TypeScript, r"^fetch$", TargetLanguage::Http),
        seam(Language::TypeScript, r"^axios\.(get|post|put|delete|patch)$", TargetLanguage::Http),
        seam(Language::TypeScript, r"^(query|prepare)$", TargetLanguage::Sql),
        seam(Language::JavaScript, r"^fetch$", TargetLanguage::Http),
        seam(Language::JavaScript, r"^axios\.(get|post|put|delete|patch)$", TargetLanguage::Http),
        seam(Language::JavaScript, r"^(query|prepare)$", TargetLanguage::Sql),
        // C#
        seam(Language::CSharp, r"^(SqlCommand|SqlConnection)$", TargetLanguage::Sql),
        seam(Language::CSharp, r"^HttpClient\.(Get|Post|Put|Delete)Async$", TargetLanguage::Http),
        // Go
        seam(Language::Go, r"^(Query|Exec|QueryRow)$", TargetLanguage::Sql),
        seam(Language::Go, r"^(Get|Post|Put|Delete|NewRequest)$", TargetLanguage::Http),
        // Rust
        seam(Language::Rust, r"^reqwest::", TargetLanguage::Http),
        seam(Language::Rust, r"^(get|post|put|delete)$", TargetLanguage::Http),
        seam(Language::Rust, r"^query$", TargetLanguage::Sql),
    ]
});

fn seam(caller_language: Language, pattern: &str, target_language: TargetLanguage) -> SeamPattern {
    SeamPattern { caller_language, callee_pattern: Regex::new(pattern).unwrap(), target_language }
}

static STRING_LITERAL_KINDS: &[&str] =
    &["string_literal", "string", "raw_string_literal", "template_string", "interpreted_string_literal"];

/// Detect seams in one file's tree. `call_kinds` is the caller language's
/// call AST-kind set from its pattern table, so this module stays
/// backend-agnostic the same way the Parser does. `functions` are the
/// file's already-extracted Function/Method nodes (from `extractor.rs`,
/// same pass that resolves `Calls` edges) — a seam's source endpoint is
/// whichever of those encloses the call site by line range, so the
/// resulting `Seam` edge shares its source id with the `Calls` edges
/// the same call site may also produce, rather than a freshly-hashed id
/// that never matches a node actually committed to the graph.
pub fn detect(
    relative_path: &str,
    language: Language,
    root: Node,
    source: &str,
    call_kinds: &[&str],
    functions: &[GraphNode],
) -> Vec<(GraphNode, GraphEdge)> {
    let mut out = Vec::new();
    let call_sites = ast::find_all(root, call_kinds);

    for call in call_sites {
        let callee_text = callee_full_text(call, source);
        let Some(pattern) = PATTERNS
            .iter()
            .find(|p| p.caller_language == language && p.callee_pattern.is_match(&callee_text))
        else {
            continue;
        };

        let span = ast::span(call);
        let Some(source_id) = enclosing_function(functions, span.start_line) else {
            // A seam call site outside any extracted function/method (e.g.
            // module-level top-level code) has no node to hang the edge on.
            continue;
        };

        let endpoint = find_literal_argument(call, source);
        let (confidence, endpoint_label) = match &endpoint {
            Some(text) => ("high", text.clone()),
            None => ("low", format!("{}:unknown", pattern.target_language.as_str())),
        };

        let target_id = NodeId::new("<seam>", NodeKind::Module, &endpoint_label, 0);
        let target_node = GraphNode {
            id: target_id,
            kind: NodeKind::Module,
            name: endpoint_label.clone(),
            qualified_name: endpoint_label.clone(),
            file_path: PathBuf::from("<seam>"),
            language: None,
            start_line: 0,
            end_line: 0,
            start_col: 0,
            end_col: 0,
            complexity: None,
            is_container: false,
            child_count: 0,
            loc: None,
            metadata: std::collections::HashMap::from([
                ("target_language".to_string(), pattern.target_language.as_str().to_string()),
            ]),
        };

        let mut edge = GraphEdge::structural(EdgeKind::Seam, source_id, target_id);
        edge.edge_source = EdgeSource::Heuristic;
        edge.confidence = if confidence == "high" { 0.9 } else { 0.3 };
        edge.label = Some(endpoint.unwrap_or_else(|| "unknown".to_string()));
        edge.line = Some(span.start_line);
        edge.file_path = Some(PathBuf::from(relative_path));

        out.push((target_node, edge));
    }

    out
}

/// The innermost Function/Method node whose line range contains `line` —
/// innermost because a nested function's range is always a subset of its
/// enclosing one, so the tightest-fitting range is the correct owner.
fn enclosing_function(functions: &[GraphNode], line: u32) -> Option<NodeId> {
    functions
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::Function | NodeKind::Method))
        .filter(|n| n.start_line <= line && line <= n.end_line)
        .min_by_key(|n| n.end_line.saturating_sub(n.start_line))
        .map(|n| n.id)
}

fn callee_full_text(call: Node, source: &str) -> String {
    if let Some(func) = ast::child_by_field(call, "function") {
        return ast::text(func, source).to_string();
    }
    if let Some(name) = ast::child_by_field(call, "name") {
        return ast::text(name, source).to_string();
    }
    ast::text(call, source).to_string()
}

/// Recover the literal text of the first string-literal argument to a
/// call, if one is statically determinable. Returns `None` (not an
/// error) when the argument is a variable or expression — the seam is
/// still emitted, just at low confidence, per §4.5.
fn find_literal_argument(call: Node, source: &str) -> Option<String> {
    let args = ast::child_by_field(call, "arguments")?;
    let literals = ast::find_all(args, STRING_LITERAL_KINDS);
    let first = literals.into_iter().next()?;
    let text = ast::text(first, source);
    Some(text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor;
    use crate::parser_pool::create_parser_pool;
    use crate::registry;
    use codegraph_core::Graph;

    /// Parses and extracts `source` exactly the way `coordinator.rs` does
    /// before calling `detect`, so these tests exercise the real
    /// node-id-sharing contract between the extractor and the seam
    /// detector instead of a hand-rolled tree.
    async fn bundle_for(relative_path: &str, language: Language, source: &str) -> extractor::ExtractionBundle {
        let pool = create_parser_pool();
        extractor::extract_file(relative_path, source.as_bytes(), &pool).await
    }

    #[tokio::test]
    async fn detects_shell_seam_in_python_subprocess_call() {
        let source = "def bar(x):\n    if x: return foo()\n    subprocess.run(\"ls\")\n";
        let bundle = bundle_for("src/a.py", Language::Python, source).await;
        let patterns = registry::patterns(Language::Python);
        let seams = detect(
            "src/a.py",
            Language::Python,
            bundle.tree.as_ref().unwrap().root_node(),
            source,
            patterns.call,
            &bundle.nodes,
        );
        assert_eq!(seams.len(), 1);
        assert_eq!(seams[0].1.kind, EdgeKind::Seam);
        assert_eq!(seams[0].1.confidence, 0.9);

        let bar = bundle.nodes.iter().find(|n| n.name == "bar").unwrap();
        assert_eq!(seams[0].1.source, bar.id, "seam edge must originate from the enclosing function's real node id");
    }

    #[tokio::test]
    async fn detects_os_system_shell_seam() {
        let source = "def foo(): os.system(\"ls\")\n";
        let bundle = bundle_for("src/a.py", Language::Python, source).await;
        let patterns = registry::patterns(Language::Python);
        let seams = detect(
            "src/a.py",
            Language::Python,
            bundle.tree.as_ref().unwrap().root_node(),
            source,
            patterns.call,
            &bundle.nodes,
        );
        assert_eq!(seams.len(), 1);
        assert_eq!(seams[0].0.metadata.get("target_language").map(String::as_str), Some("shell"));
    }

    #[tokio::test]
    async fn detects_http_seam_in_typescript_fetch_call() {
        let source = "function load() { fetch(\"/api/users\"); }";
        let bundle = bundle_for("src/a.ts", Language::TypeScript, source).await;
        let patterns = registry::patterns(Language::TypeScript);
        let seams = detect(
            "src/a.ts",
            Language::TypeScript,
            bundle.tree.as_ref().unwrap().root_node(),
            source,
            patterns.call,
            &bundle.nodes,
        );
        assert_eq!(seams.len(), 1);
        assert_eq!(seams[0].0.name, "/api/users");
    }

    #[tokio::test]
    async fn low_confidence_when_endpoint_not_a_literal() {
        let source = "function load(path) { fetch(path); }";
        let bundle = bundle_for("src/a.ts", Language::TypeScript, source).await;
        let patterns = registry::patterns(Language::TypeScript);
        let seams = detect(
            "src/a.ts",
            Language::TypeScript,
            bundle.tree.as_ref().unwrap().root_node(),
            source,
            patterns.call,
            &bundle.nodes,
        );
        assert_eq!(seams.len(), 1);
        assert_eq!(seams[0].1.confidence, 0.3);
    }

    /// Reproduces the spec's worked example end to end: the seam edge
    /// must actually commit into a `Graph`, not be silently dropped for
    /// lacking a resident source endpoint.
    #[tokio::test]
    async fn seam_edge_commits_into_a_real_graph() {
        let source = "def foo(): os.system(\"ls\")\n";
        let bundle = bundle_for("src/a.py", Language::Python, source).await;
        let patterns = registry::patterns(Language::Python);
        let seams = detect(
            "src/a.py",
            Language::Python,
            bundle.tree.as_ref().unwrap().root_node(),
            source,
            patterns.call,
            &bundle.nodes,
        );

        let mut graph = Graph::new();
        graph.add_node(bundle.file_node.clone());
        for node in &bundle.nodes {
            graph.add_node(node.clone());
        }
        for (target_node, edge) in seams {
            graph.add_node(target_node);
            assert!(graph.add_edge(edge).is_some(), "seam edge must commit, not be silently dropped");
        }
    }
}
