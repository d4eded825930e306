//! Parser (C4): per-file extraction of entities and relations.
//!
//! A single recursive tree-walk, driven entirely by one language's
//! `PatternTable` (§ registry), rather than one hand-written visitor per
//! language — the pattern table already carries every bit of per-language
//! data a generic walker needs, so duplicating near-identical visitor
//! functions per language would just be reproducing the same logic seven
//! times.

use crate::ast;
use crate::parser_pool::{ParseRequest, ParserPool};
use crate::registry::{self, PatternTable};
use codegraph_core::{EdgeKind, GraphEdge, GraphNode, Language, NodeId, NodeKind};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tree_sitter::Node;

/// A call site whose callee could not be resolved at extraction time
/// because resolution requires the cross-file symbol table, which the
/// Parser only ever reads a snapshot of (§9: the Parser/Store cycle is
/// broken by keeping fragments data-only). The coordinator resolves
/// these against the symbol table after every file in a batch has
/// registered its own declarations.
#[derive(Debug, Clone)]
pub struct UnresolvedCall {
    pub caller: NodeId,
    pub language: Language,
    pub simple_name: String,
    pub line: u32,
}

/// Everything extracted from one file, before call resolution and seam
/// detection (both need the tree, which this bundle keeps around for the
/// coordinator to pass to `seam::detect`).
pub struct ExtractionBundle {
    pub file_node: GraphNode,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub calls: Vec<UnresolvedCall>,
    pub tree: Option<tree_sitter::Tree>,
    pub content: String,
    pub language: Language,
}

struct WalkCtx<'a> {
    relative_path: &'a str,
    language: Language,
    patterns: &'a PatternTable,
    source: &'a str,
    file_id: NodeId,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    calls: Vec<UnresolvedCall>,
}

/// Extract a file's fragment. Returns a FILE-only bundle (no error) for
/// unsupported languages or parse failures, per the degrade-don't-fail
/// contract of §4.4/§7.
pub async fn extract_file(relative_path: &str, content: &[u8], pool: &ParserPool) -> ExtractionBundle {
    let path = Path::new(relative_path);
    let language = registry::detect(path, Some(content));
    let text = String::from_utf8_lossy(content).into_owned();
    let line_count = text.lines().count().max(1) as u32;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or(relative_path);
    let file_node = GraphNode {
        id: NodeId::new(relative_path, NodeKind::File, file_name, 1),
        kind: NodeKind::File,
        name: file_name.to_string(),
        qualified_name: relative_path.to_string(),
        file_path: path.to_path_buf(),
        language: if language == Language::Other { None } else { Some(language) },
        start_line: 1,
        end_line: line_count,
        start_col: 1,
        end_col: 1,
        complexity: None,
        is_container: true,
        child_count: 0,
        loc: Some(line_count),
        metadata: Default::default(),
    };

    if !language.has_pattern_table() {
        return ExtractionBundle {
            file_node,
            nodes: Vec::new(),
            edges: Vec::new(),
            calls: Vec::new(),
            tree: None,
            content: text,
            language,
        };
    }

    let parsed = pool
        .parse(ParseRequest { language, content: text.clone(), path: path.to_path_buf() })
        .await;

    let tree = match parsed {
        Ok(result) => result.tree,
        Err(e) => {
            tracing::debug!(path = relative_path, error = %e, "PARSE_ERROR, degrading to FILE-only node");
            return ExtractionBundle {
                file_node,
                nodes: Vec::new(),
                edges: Vec::new(),
                calls: Vec::new(),
                tree: None,
                content: text,
                language,
            };
        }
    };

    let patterns = registry::patterns(language);
    let mut ctx = WalkCtx {
        relative_path,
        language,
        patterns: &patterns,
        source: &text,
        file_id: file_node.id,
        nodes: Vec::new(),
        edges: Vec::new(),
        calls: Vec::new(),
    };

    walk(tree.root_node(), &mut ctx, None, None);

    ExtractionBundle {
        file_node,
        nodes: ctx.nodes,
        edges: ctx.edges,
        calls: ctx.calls,
        tree: Some(tree),
        content: text,
        language,
    }
}

fn walk(node: Node, ctx: &mut WalkCtx, current_class: Option<String>, current_function: Option<NodeId>) {
    let kind = node.kind();
    let mut next_class = current_class.clone();
    let mut next_function = current_function;

    if ctx.patterns.class.contains(&kind) {
        if let Some(class_node) = extract_declarator(node, ctx, NodeKind::Class, None) {
            next_class = Some(class_node.name.clone());
            ctx.nodes.push(class_node);
        }
    } else if ctx.patterns.function.contains(&kind) {
        let node_kind = if current_class.is_some() { NodeKind::Method } else { NodeKind::Function };
        if let Some(func_node) = extract_declarator(node, ctx, node_kind, current_class.as_deref()) {
            next_function = Some(func_node.id);
            ctx.nodes.push(func_node);
        }
    } else if ctx.patterns.import.contains(&kind) {
        extract_import(node, ctx);
    } else if ctx.patterns.interface.contains(&kind) {
        if let Some(n) = extract_declarator(node, ctx, NodeKind::Interface, None) {
            ctx.nodes.push(n);
        }
    } else if ctx.patterns.enum_.contains(&kind) {
        if let Some(n) = extract_declarator(node, ctx, NodeKind::Enum, None) {
            ctx.nodes.push(n);
        }
    } else if ctx.patterns.type_alias.contains(&kind) {
        if let Some(n) = extract_declarator(node, ctx, NodeKind::TypeAlias, None) {
            ctx.nodes.push(n);
        }
    } else if ctx.patterns.call.contains(&kind) {
        if let Some(caller) = current_function {
            if let Some(simple_name) = extract_callee_name(node, ctx.source) {
                ctx.calls.push(UnresolvedCall {
                    caller,
                    language: ctx.language,
                    simple_name,
                    line: ast::span(node).start_line,
                });
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, ctx, next_class.clone(), next_function);
    }
}

fn extract_declarator(
    node: Node,
    ctx: &mut WalkCtx,
    kind: NodeKind,
    class_name: Option<&str>,
) -> Option<GraphNode> {
    let name = extract_name(node, ctx.source)?;
    let span = ast::span(node);
    let qualified_name = match class_name {
        Some(class) => format!("{}::{}::{}", ctx.relative_path, class, name),
        None => format!("{}::{}", ctx.relative_path, name),
    };
    let complexity = if matches!(kind, NodeKind::Function | NodeKind::Method) {
        Some(1 + ast::count_branches(node, ctx.patterns.branches))
    } else {
        None
    };

    let node_id = NodeId::new(ctx.relative_path, kind, &qualified_name, span.start_line);
    ctx.edges.push(GraphEdge::structural(EdgeKind::Contains, ctx.file_id, node_id));

    Some(GraphNode {
        id: node_id,
        kind,
        name,
        qualified_name,
        file_path: Path::new(ctx.relative_path).to_path_buf(),
        language: Some(ctx.language),
        start_line: span.start_line,
        end_line: span.end_line,
        start_col: span.start_col,
        end_col: span.end_col,
        complexity,
        is_container: matches!(kind, NodeKind::Class | NodeKind::Interface | NodeKind::Namespace),
        child_count: 0,
        loc: Some(span.end_line.saturating_sub(span.start_line) + 1),
        metadata: Default::default(),
    })
}

fn extract_import(node: Node, ctx: &mut WalkCtx) {
    let raw = ast::text(node, ctx.source);
    let module = clean_import_text(raw);
    if module.is_empty() {
        return;
    }
    let span = ast::span(node);
    let node_id = NodeId::new(ctx.relative_path, NodeKind::Import, &module, span.start_line);
    ctx.edges.push(GraphEdge::structural(EdgeKind::Contains, ctx.file_id, node_id));
    ctx.edges.push(GraphEdge::structural(EdgeKind::Imports, ctx.file_id, node_id));
    ctx.nodes.push(GraphNode {
        id: node_id,
        kind: NodeKind::Import,
        name: module.clone(),
        qualified_name: module,
        file_path: Path::new(ctx.relative_path).to_path_buf(),
        language: Some(ctx.language),
        start_line: span.start_line,
        end_line: span.end_line,
        start_col: span.start_col,
        end_col: span.end_col,
        complexity: None,
        is_container: false,
        child_count: 0,
        loc: Some(1),
        metadata: Default::default(),
    });
}

static IMPORT_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(import|from|use|#include|require)\b\s*").unwrap());
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["'<]([^"'>]+)["'>]"#).unwrap());
static IDENT_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_./:*{}, ]*").unwrap());

/// Best-effort textual cleanup of an import/use/include node's raw text
/// down to a module name, documented as a per-language fallback (§4.4
/// step 4: "by regex over `node.text()` as a documented per-language
/// fallback" — applied here uniformly rather than once per language
/// since every grammar's import syntax reduces to "keyword, then a
/// quoted path or a dotted identifier").
fn clean_import_text(raw: &str) -> String {
    if let Some(caps) = QUOTED_RE.captures(raw) {
        return caps[1].trim().to_string();
    }
    let stripped = IMPORT_KEYWORD_RE.replace(raw, "");
    let stripped = stripped.trim_end_matches(';').trim();
    if let Some(m) = IDENT_PATH_RE.find(stripped) {
        return m.as_str().trim().to_string();
    }
    stripped.to_string()
}

fn extract_name(node: Node, source: &str) -> Option<String> {
    if let Some(name_field) = ast::child_by_field(node, "name") {
        let text = ast::text(name_field, source);
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    // Rust's `impl_item` has no "name" field — the type being implemented
    // is what identifies it.
    if node.kind() == "impl_item" {
        if let Some(type_field) = ast::child_by_field(node, "type") {
            let text = rightmost_identifier(type_field, source);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind().ends_with("identifier") {
            let text = ast::text(child, source);
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn extract_callee_name(node: Node, source: &str) -> Option<String> {
    if let Some(name_field) = ast::child_by_field(node, "name") {
        return Some(rightmost_identifier(name_field, source));
    }
    if let Some(func_field) = ast::child_by_field(node, "function") {
        return Some(rightmost_identifier(func_field, source));
    }
    if let Some(macro_field) = ast::child_by_field(node, "macro") {
        return Some(ast::text(macro_field, source).to_string());
    }
    None
}

/// The rightmost identifier-like leaf under `node` — for `obj.method()`
/// style call targets (`member_expression`/`field_expression`/
/// `attribute`/`selector_expression`) this is the method's own simple
/// name, which is exactly what the per-language symbol table is keyed
/// on.
fn rightmost_identifier(node: Node, source: &str) -> String {
    if node.child_count() == 0 {
        return ast::text(node, source).to_string();
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children.iter().rev() {
        if child.kind().ends_with("identifier") {
            return ast::text(*child, source).to_string();
        }
    }
    for child in children.iter().rev() {
        return rightmost_identifier(*child, source);
    }
    ast::text(node, source).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    #[tokio::test]
    async fn round_trip_scenario_from_spec() {
        let pool = create_parser_pool();
        let source = r#"
import os
def foo(): os.system("ls")
def bar(x):
    if x: return foo()
    return 0
"#;
        let bundle = extract_file("src/a.py", source.as_bytes(), &pool).await;

        let functions: Vec<_> = bundle.nodes.iter().filter(|n| n.kind == NodeKind::Function).collect();
        assert_eq!(functions.len(), 2);
        assert!(functions.iter().any(|f| f.name == "foo" && f.complexity == Some(1)));
        assert!(functions.iter().any(|f| f.name == "bar" && f.complexity == Some(2)));

        let imports: Vec<_> = bundle.nodes.iter().filter(|n| n.kind == NodeKind::Import).collect();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].name, "os");

        let contains = bundle.edges.iter().filter(|e| e.kind == EdgeKind::Contains).count();
        assert_eq!(contains, 3); // foo, bar, import(os)

        assert!(bundle.calls.iter().any(|c| c.simple_name == "foo"));
    }

    #[tokio::test]
    async fn empty_file_yields_file_node_only() {
        let pool = create_parser_pool();
        let bundle = extract_file("src/empty.py", b"", &pool).await;
        assert!(bundle.nodes.is_empty());
        assert!(bundle.edges.is_empty());
    }

    #[tokio::test]
    async fn unsupported_language_degrades_to_file_only() {
        let pool = create_parser_pool();
        let bundle = extract_file("README.md", b"# hi", &pool).await;
        assert_eq!(bundle.file_node.language, None);
        assert!(bundle.nodes.is_empty());
    }

    #[tokio::test]
    async fn rust_struct_and_impl_method() {
        let pool = create_parser_pool();
        let source = r#"
struct User { name: String }

impl User {
    fn greet(&self) -> String {
        format!("hi {}", self.name)
    }
}
"#;
        let bundle = extract_file("src/user.rs", source.as_bytes(), &pool).await;
        assert!(bundle.nodes.iter().any(|n| n.kind == NodeKind::Class && n.name == "User"));
        assert!(bundle.nodes.iter().any(|n| n.kind == NodeKind::Method && n.name == "greet"));
    }
}
