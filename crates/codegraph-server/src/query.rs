//! Read-only query surface shared by the HTTP and MCP transports (C10).
//! Every function here takes a `&Graph` snapshot and returns plain,
//! `serde`-friendly DTOs — the two transports differ only in how they
//! wrap this output (JSON body vs. MCP text block), never in what a
//! query actually computes.

use codegraph_core::{EdgeDirection, EdgeKind, Graph, GraphEdge, GraphNode, GraphStats, Language, NodeId, NodeKind};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDto {
    pub id: String,
    pub name: String,
    pub node_type: String,
    pub language: Option<String>,
    pub complexity: Option<u32>,
    pub location: Location,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeDto {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
    pub metadata: HashMap<String, String>,
}

pub fn node_id_to_string(id: NodeId) -> String {
    id.0.to_string()
}

pub fn parse_node_id(raw: &str) -> Option<NodeId> {
    raw.parse::<u64>().ok().map(NodeId)
}

pub fn node_to_dto(node: &GraphNode) -> NodeDto {
    let mut metadata = node.metadata.clone();
    metadata.insert("is_container".to_string(), node.is_container.to_string());
    metadata.insert("child_count".to_string(), node.child_count.to_string());
    if let Some(loc) = node.loc {
        metadata.insert("loc".to_string(), loc.to_string());
    }
    NodeDto {
        id: node_id_to_string(node.id),
        name: node.name.clone(),
        node_type: node.kind.as_str().to_string(),
        language: node.language.map(language_name),
        complexity: node.complexity,
        location: Location {
            file_path: node.file_path.to_string_lossy().into_owned(),
            start_line: node.start_line,
            end_line: node.end_line,
        },
        metadata,
    }
}

pub fn edge_to_dto(edge: &GraphEdge) -> EdgeDto {
    let mut metadata = HashMap::new();
    metadata.insert("edge_source".to_string(), format!("{:?}", edge.edge_source));
    metadata.insert("confidence".to_string(), edge.confidence.to_string());
    metadata.insert("ambiguous".to_string(), edge.ambiguous.to_string());
    if let Some(label) = &edge.label {
        metadata.insert("label".to_string(), label.clone());
    }
    if let Some(line) = edge.line {
        metadata.insert("line".to_string(), line.to_string());
    }
    EdgeDto {
        id: edge.id.0.to_string(),
        source_id: node_id_to_string(edge.source),
        target_id: node_id_to_string(edge.target),
        relationship_type: edge.kind.as_str().to_string(),
        metadata,
    }
}

fn language_name(language: Language) -> String {
    format!("{:?}", language)
}

fn parse_language(raw: &str) -> Option<Language> {
    let candidates = [
        Language::Rust, Language::TypeScript, Language::JavaScript, Language::Python, Language::Go,
        Language::Java, Language::C, Language::Cpp, Language::Ruby, Language::Php, Language::CSharp,
        Language::Kotlin, Language::Swift, Language::Scala, Language::Shell, Language::Lua,
        Language::Elixir, Language::Haskell, Language::R, Language::Perl, Language::Dart,
        Language::ObjectiveC, Language::Zig, Language::Html, Language::Css, Language::Other,
    ];
    candidates.into_iter().find(|l| language_name(*l).eq_ignore_ascii_case(raw))
}

fn parse_kind(raw: &str) -> Option<NodeKind> {
    let candidates = [
        NodeKind::File, NodeKind::Module, NodeKind::Class, NodeKind::Function, NodeKind::Method,
        NodeKind::Import, NodeKind::Variable, NodeKind::Interface, NodeKind::Enum,
        NodeKind::TypeAlias, NodeKind::Namespace,
    ];
    candidates.into_iter().find(|k| k.as_str().eq_ignore_ascii_case(raw))
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_nodes: usize,
    pub total_relationships: usize,
    pub languages: HashMap<String, usize>,
    pub node_types: HashMap<String, usize>,
    pub top_functions: Vec<TopFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopFunction {
    pub id: String,
    pub name: String,
    pub complexity: u32,
}

pub fn stats_response(graph: &Graph, stats: &GraphStats) -> StatsResponse {
    let mut functions: Vec<&GraphNode> = graph
        .all_nodes()
        .filter(|n| matches!(n.kind, NodeKind::Function | NodeKind::Method) && n.complexity.is_some())
        .collect();
    functions.sort_by(|a, b| b.complexity.cmp(&a.complexity).then_with(|| a.name.cmp(&b.name)));
    let top_functions = functions
        .into_iter()
        .take(10)
        .map(|n| TopFunction { id: node_id_to_string(n.id), name: n.name.clone(), complexity: n.complexity.unwrap_or(0) })
        .collect();

    StatsResponse {
        total_nodes: stats.total_nodes,
        total_relationships: stats.total_edges,
        languages: stats.nodes_by_language.clone(),
        node_types: stats.nodes_by_kind.clone(),
        top_functions,
    }
}

pub fn get_node(graph: &Graph, id: NodeId) -> Option<NodeDto> {
    graph.node(id).map(node_to_dto)
}

/// Deterministic order for every paged query: `(language, kind, name, id)`.
fn sort_key(node: &GraphNode) -> (String, &'static str, String, u64) {
    (
        node.language.map(language_name).unwrap_or_default(),
        node.kind.as_str(),
        node.name.clone(),
        node.id.0,
    )
}

pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

fn paginate<T>(mut items: Vec<T>, limit: usize, offset: usize) -> Page<T> {
    let total = items.len();
    if offset < items.len() {
        items.drain(..offset);
    } else {
        items.clear();
    }
    let has_more = items.len() > limit;
    items.truncate(limit);
    Page { items, total, limit, offset, has_more }
}

pub fn search_nodes(
    graph: &Graph,
    name_substring: &str,
    language: Option<&str>,
    kind: Option<&str>,
    limit: usize,
    offset: usize,
) -> Page<NodeDto> {
    let needle = name_substring.to_lowercase();
    let lang_filter = language.and_then(parse_language);
    let kind_filter = kind.and_then(parse_kind);

    let mut matches: Vec<&GraphNode> = graph
        .all_nodes()
        .filter(|n| n.name.to_lowercase().contains(&needle))
        .filter(|n| lang_filter.is_none_or(|l| n.language == Some(l)))
        .filter(|n| kind_filter.is_none_or(|k| n.kind == k))
        .collect();
    matches.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let dtos = matches.into_iter().map(node_to_dto).collect();
    paginate(dtos, limit, offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    EntryPoints,
    Hubs,
    Leaves,
}

impl Category {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "entry_points" => Some(Category::EntryPoints),
            "hubs" => Some(Category::Hubs),
            "leaves" => Some(Category::Leaves),
            _ => None,
        }
    }
}

pub fn category(graph: &Graph, category: Category, limit: usize, offset: usize) -> Page<NodeDto> {
    let categories = graph.categorize();
    let mut ids = match category {
        Category::EntryPoints => categories.entry_points,
        Category::Hubs => categories.hubs,
        Category::Leaves => categories.leaves,
    };
    let mut nodes: Vec<&GraphNode> = ids.drain(..).filter_map(|id| graph.node(id)).collect();
    nodes.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    let dtos = nodes.into_iter().map(node_to_dto).collect();
    paginate(dtos, limit, offset)
}

/// Every node whose name exactly matches `symbol` — the entry point for
/// callers/callees/references, which all key off the same resolved
/// target set produced at commit time in the symbol table.
fn nodes_named(graph: &Graph, symbol: &str) -> Vec<NodeId> {
    graph.all_nodes().filter(|n| n.name == symbol).map(|n| n.id).collect()
}

pub fn callers(graph: &Graph, symbol: &str, limit: usize, offset: usize) -> Page<NodeDto> {
    let targets = nodes_named(graph, symbol);
    let mut sources: Vec<&GraphNode> = targets
        .iter()
        .flat_map(|&t| graph.edges_to(t).filter(|e| e.kind == EdgeKind::Calls).map(|e| e.source))
        .filter_map(|id| graph.node(id))
        .collect();
    sources.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    sources.dedup_by_key(|n| n.id);
    let dtos = sources.into_iter().map(node_to_dto).collect();
    paginate(dtos, limit, offset)
}

pub fn callees(graph: &Graph, symbol: &str, limit: usize, offset: usize) -> Page<NodeDto> {
    let sources = nodes_named(graph, symbol);
    let mut targets: Vec<&GraphNode> = sources
        .iter()
        .flat_map(|&s| graph.edges_from(s).filter(|e| e.kind == EdgeKind::Calls).map(|e| e.target))
        .filter_map(|id| graph.node(id))
        .collect();
    targets.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    targets.dedup_by_key(|n| n.id);
    let dtos = targets.into_iter().map(node_to_dto).collect();
    paginate(dtos, limit, offset)
}

pub fn references(graph: &Graph, symbol: &str, limit: usize, offset: usize) -> Page<NodeDto> {
    let targets = nodes_named(graph, symbol);
    let mut sources: Vec<&GraphNode> = targets
        .iter()
        .flat_map(|&t| {
            graph
                .edges_to(t)
                .filter(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::References))
                .map(|e| e.source)
        })
        .filter_map(|id| graph.node(id))
        .collect();
    sources.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    sources.dedup_by_key(|n| n.id);
    let dtos = sources.into_iter().map(node_to_dto).collect();
    paginate(dtos, limit, offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    Bfs,
    Dfs,
}

impl TraversalMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "bfs" => Some(TraversalMode::Bfs),
            "dfs" => Some(TraversalMode::Dfs),
            _ => None,
        }
    }
}

pub fn edge_filter_for(edge_types: Option<&[String]>) -> impl Fn(EdgeKind) -> bool + '_ {
    move |kind: EdgeKind| match edge_types {
        None => true,
        Some(types) => types.iter().any(|t| t.eq_ignore_ascii_case(kind.as_str())),
    }
}

pub struct TraversalResult {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
    pub seam_count: usize,
    pub truncated: bool,
}

pub fn traverse(
    graph: &Graph,
    start: NodeId,
    mode: TraversalMode,
    max_depth: usize,
    max_nodes: usize,
    edge_types: Option<&[String]>,
) -> TraversalResult {
    let filter = edge_filter_for(edge_types);
    let (visited, truncated) = match mode {
        TraversalMode::Bfs => graph.bfs(start, max_depth, max_nodes, &filter),
        TraversalMode::Dfs => graph.dfs(start, max_depth, max_nodes, &filter),
    };
    let ids: std::collections::HashSet<NodeId> = visited.iter().map(|(id, _)| *id).collect();
    let nodes = visited.iter().filter_map(|(id, _)| graph.node(*id)).map(node_to_dto).collect();
    let mut edges = Vec::new();
    let mut seam_count = 0;
    for (id, _) in &visited {
        for edge in graph.edges_from(*id).filter(|e| filter(e.kind) && ids.contains(&e.target)) {
            if edge.kind == EdgeKind::Seam {
                seam_count += 1;
            }
            edges.push(edge_to_dto(edge));
        }
    }
    TraversalResult { nodes, edges, seam_count, truncated }
}

pub struct SubgraphResult {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
}

pub fn subgraph(graph: &Graph, start: NodeId, max_depth: usize, max_nodes: usize) -> SubgraphResult {
    let filter = codegraph_core::any_edge;
    let (visited, _truncated) = graph.bfs(start, max_depth, max_nodes, &filter);
    let ids: std::collections::HashSet<NodeId> = visited.iter().map(|(id, _)| *id).collect();
    let nodes = visited.iter().filter_map(|(id, _)| graph.node(*id)).map(node_to_dto).collect();
    let edges = ids
        .iter()
        .flat_map(|&id| graph.edges_from(id).filter(|e| ids.contains(&e.target)))
        .map(edge_to_dto)
        .collect();
    SubgraphResult { nodes, edges }
}

pub struct CallChainSeam {
    pub from_index: usize,
    pub to_index: usize,
    pub languages: (String, String),
}

pub struct CallChainResult {
    pub chain: Vec<NodeDto>,
    pub seams: Vec<CallChainSeam>,
}

pub fn call_chain(
    graph: &Graph,
    src: NodeId,
    dst: NodeId,
    follow_seams: bool,
    max_depth: usize,
) -> Option<CallChainResult> {
    let filter = move |kind: EdgeKind| kind == EdgeKind::Calls || (follow_seams && kind == EdgeKind::Seam);
    let path = graph.shortest_path(src, dst, max_depth, &filter)?;
    let chain: Vec<&GraphNode> = path.iter().filter_map(|id| graph.node(*id)).collect();
    let mut seams = Vec::new();
    for window in path.windows(2) {
        let (a, b) = (window[0], window[1]);
        if graph.edges_from(a).any(|e| e.target == b && e.kind == EdgeKind::Seam) {
            let from_index = path.iter().position(|&id| id == a).unwrap_or(0);
            let to_index = path.iter().position(|&id| id == b).unwrap_or(0);
            let lang_a = graph.node(a).and_then(|n| n.language).map(language_name).unwrap_or_default();
            let lang_b = graph.node(b).and_then(|n| n.language).map(language_name).unwrap_or_default();
            seams.push(CallChainSeam { from_index, to_index, languages: (lang_a, lang_b) });
        }
    }
    Some(CallChainResult { chain: chain.into_iter().map(node_to_dto).collect(), seams })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{GraphEdge, NodeId};
    use std::path::PathBuf;

    fn func(path: &str, name: &str, line: u32) -> GraphNode {
        GraphNode {
            id: NodeId::new(path, NodeKind::Function, name, line),
            kind: NodeKind::Function,
            name: name.to_string(),
            qualified_name: name.to_string(),
            file_path: PathBuf::from(path),
            language: Some(Language::Python),
            start_line: line,
            end_line: line + 1,
            start_col: 0,
            end_col: 0,
            complexity: Some(1),
            is_container: false,
            child_count: 0,
            loc: Some(2),
            metadata: Default::default(),
        }
    }

    #[test]
    fn callers_finds_every_caller_by_name() {
        let mut graph = Graph::new();
        let foo = func("a.py", "foo", 1);
        let bar = func("b.py", "bar", 1);
        let (foo_id, bar_id) = (foo.id, bar.id);
        graph.add_node(foo);
        graph.add_node(bar);
        graph.add_edge(GraphEdge::structural(EdgeKind::Calls, bar_id, foo_id));

        let page = callers(&graph, "foo", 10, 0);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "bar");
    }

    #[test]
    fn search_nodes_paginates_deterministically() {
        let mut graph = Graph::new();
        for i in 0..5 {
            graph.add_node(func("a.py", &format!("helper_{i}"), i));
        }
        let page = search_nodes(&graph, "helper", None, None, 2, 1);
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.offset, 1);
    }

    #[test]
    fn get_node_roundtrips_id() {
        let mut graph = Graph::new();
        let node = func("a.py", "foo", 1);
        let id = node.id;
        graph.add_node(node);
        let dto = get_node(&graph, id).unwrap();
        assert_eq!(parse_node_id(&dto.id), Some(id));
    }
}
