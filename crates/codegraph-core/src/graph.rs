//! Graph wrapper over petgraph::StableDiGraph, keyed by content-addressed
//! NodeId/EdgeId rather than petgraph's own insertion-order indices.

use crate::model::*;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Direction to traverse edges in BFS/DFS/neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
    Both,
}

/// A predicate over edge kinds, used to restrict traversal to a subset of
/// relationship types (e.g. CALLS ∪ SEAM for `call_chain`).
pub type EdgeFilter<'a> = dyn Fn(EdgeKind) -> bool + 'a;

pub fn any_edge(_: EdgeKind) -> bool {
    true
}

/// Degree-based bucket assigned by `categorize`. Buckets may overlap — a
/// node can be both a hub and an entry point (§9 open question: the
/// functional description explicitly permits this).
#[derive(Debug, Clone, Default)]
pub struct Categories {
    pub entry_points: Vec<NodeId>,
    pub hubs: Vec<NodeId>,
    pub leaves: Vec<NodeId>,
    pub regular: Vec<NodeId>,
}

/// Project-wide counters, recomputed at batch-commit boundaries and cached
/// by the analysis engine rather than on every read.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_kind: HashMap<String, usize>,
    pub edges_by_type: HashMap<String, usize>,
    pub nodes_by_language: HashMap<String, usize>,
    pub circular_dependency_count: usize,
    pub top_degree_nodes: Vec<(NodeId, usize)>,
}

/// The code graph — a directed multigraph addressed by stable,
/// content-derived ids. Internally backed by petgraph for traversal and
/// adjacency, with a lookup layer translating NodeId/EdgeId to the
/// petgraph indices petgraph actually wants.
pub struct Graph {
    inner: StableDiGraph<GraphNode, GraphEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    /// `FileNodeId -> node ids it owns`, maintained on every
    /// `replace_file_fragment` so a file's whole subtree can be dropped
    /// without a linear scan of the graph.
    file_owned: HashMap<NodeId, HashSet<NodeId>>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            file_owned: HashMap::new(),
        }
    }

    /// Insert a node, keyed by its own (already content-addressed) id.
    /// Re-inserting the same id overwrites the existing node in place
    /// rather than creating a duplicate.
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = node.id;
        if let Some(&idx) = self.node_index.get(&id) {
            self.inner[idx] = node;
        } else {
            let idx = self.inner.add_node(node);
            self.node_index.insert(id, idx);
        }
        id
    }

    /// Insert an edge between two nodes that must already exist. Returns
    /// `None` if either endpoint is missing — callers extracting a
    /// fragment of the graph should skip the edge (and log it) rather
    /// than panic; referential integrity is a contract on commit, not on
    /// insertion of raw edges.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Option<EdgeId> {
        let source_idx = *self.node_index.get(&edge.source)?;
        let target_idx = *self.node_index.get(&edge.target)?;
        let id = edge.id;
        let idx = self.inner.add_edge(source_idx, target_idx, edge);
        self.edge_index.insert(id, idx);
        Some(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.node_index.get(&id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        let idx = *self.node_index.get(&id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edge_index.get(&id).and_then(|&idx| self.inner.edge_weight(idx))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner.node_indices().filter_map(move |idx| self.inner.node_weight(idx))
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.inner.edge_indices().filter_map(move |idx| self.inner.edge_weight(idx))
    }

    pub fn edges_from(&self, source: NodeId) -> impl Iterator<Item = &GraphEdge> {
        let idx = self.node_index.get(&source).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Outgoing)
                .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
        })
    }

    pub fn edges_to(&self, target: NodeId) -> impl Iterator<Item = &GraphEdge> {
        let idx = self.node_index.get(&target).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Incoming)
                .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
        })
    }

    pub fn has_edge_between(&self, source: NodeId, target: NodeId, kind: EdgeKind) -> bool {
        self.edges_from(source).any(|e| e.target == target && e.kind == kind)
    }

    /// Find a node by simple name (first match in iteration order).
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.all_nodes().find(|n| n.name == name).map(|n| n.id)
    }

    /// Find a node by fully qualified name.
    pub fn find_node_by_qualified(&self, qualified_name: &str) -> Option<NodeId> {
        self.all_nodes().find(|n| n.qualified_name == qualified_name).map(|n| n.id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.all_nodes().filter(move |n| n.kind == kind).map(|n| n.id)
    }

    /// Neighbors of a node, optionally restricted by edge kind and
    /// direction.
    pub fn neighbors(&self, id: NodeId, kind: Option<EdgeKind>, direction: EdgeDirection) -> Vec<NodeId> {
        let mut out = Vec::new();
        if matches!(direction, EdgeDirection::Outgoing | EdgeDirection::Both) {
            out.extend(
                self.edges_from(id)
                    .filter(|e| kind.is_none_or(|k| e.kind == k))
                    .map(|e| e.target),
            );
        }
        if matches!(direction, EdgeDirection::Incoming | EdgeDirection::Both) {
            out.extend(
                self.edges_to(id)
                    .filter(|e| kind.is_none_or(|k| e.kind == k))
                    .map(|e| e.source),
            );
        }
        out
    }

    /// Remove a node and all edges touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let idx = self.node_index.remove(&id)?;
        // StableDiGraph::remove_node drops incident edges; reclaim their
        // slots from edge_index too, since petgraph won't tell us which
        // EdgeIds those were once removed.
        let incident: Vec<EdgeId> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.inner.edges_directed(idx, Direction::Incoming))
            .filter_map(|e| self.inner.edge_weight(e.id()).map(|w| w.id))
            .collect();
        let node = self.inner.remove_node(idx);
        for edge_id in incident {
            self.edge_index.remove(&edge_id);
        }
        node
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<GraphEdge> {
        let idx = self.edge_index.remove(&id)?;
        self.inner.remove_edge(idx)
    }

    /// All ancestors of a node, following Contains edges upward.
    pub fn ancestors(&self, node: NodeId) -> HashSet<NodeId> {
        let mut ancestors = HashSet::new();
        let mut to_visit = vec![node];

        while let Some(current) = to_visit.pop() {
            for edge in self.edges_to(current) {
                if edge.kind == EdgeKind::Contains && !ancestors.contains(&edge.source) {
                    ancestors.insert(edge.source);
                    to_visit.push(edge.source);
                }
            }
        }

        ancestors
    }

    /// Remove every node and edge whose `file_path` matches `path`,
    /// for incremental re-analysis of a single file.
    pub fn remove_file(&mut self, path: &std::path::Path) {
        let file_node = self.all_nodes().find(|n| n.kind == NodeKind::File && n.file_path == path).map(|n| n.id);
        if let Some(file_id) = file_node {
            self.file_owned.remove(&file_id);
        }
        let node_ids: Vec<NodeId> = self
            .all_nodes()
            .filter(|n| n.file_path == path)
            .map(|n| n.id)
            .collect();
        for id in node_ids {
            self.remove_node(id);
        }
    }

    /// Transactionally replace everything owned by one file: remove the
    /// nodes previously committed for this FILE node and all edges
    /// incident to them, then insert the new fragment. From a reader's
    /// perspective (readers hold a shared lease; this runs under the
    /// single writer's exclusive lease — see `codegraph_core::Graph`'s
    /// callers for lease acquisition) this is atomic: a lookup never
    /// observes a mix of the old and new fragment for this file.
    ///
    /// Edges whose endpoint is not resident in the graph after node
    /// insertion are dropped and returned for the caller to log at debug
    /// level, per the referential-integrity invariant.
    pub fn replace_file_fragment(
        &mut self,
        file_id: NodeId,
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
    ) -> Vec<GraphEdge> {
        if let Some(owned) = self.file_owned.remove(&file_id) {
            for id in owned {
                if id != file_id {
                    self.remove_node(id);
                }
            }
        }

        let mut owned = HashSet::new();
        for node in nodes {
            let id = node.id;
            self.add_node(node);
            owned.insert(id);
        }
        owned.insert(file_id);
        self.file_owned.insert(file_id, owned);

        let mut dropped = Vec::new();
        for edge in edges {
            let copy = edge.clone();
            if self.add_edge(edge).is_none() {
                dropped.push(copy);
            }
        }
        dropped
    }

    /// Breadth-first traversal from `start`, bounded by `max_depth` and
    /// stopping once `max_nodes` have been visited (the caller's
    /// `truncated` flag should be set when the bound was hit before the
    /// frontier emptied). Cycle-safe via a visited set.
    pub fn bfs(
        &self,
        start: NodeId,
        max_depth: usize,
        max_nodes: usize,
        filter: &EdgeFilter<'_>,
    ) -> (Vec<(NodeId, usize)>, bool) {
        if !self.contains_node(start) {
            return (Vec::new(), false);
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();
        visited.insert(start);
        queue.push_back((start, 0usize));

        while let Some((node, depth)) = queue.pop_front() {
            order.push((node, depth));
            if order.len() >= max_nodes {
                return (order, !queue.is_empty());
            }
            if depth >= max_depth {
                continue;
            }
            for edge in self.edges_from(node) {
                if !filter(edge.kind) {
                    continue;
                }
                if visited.insert(edge.target) {
                    queue.push_back((edge.target, depth + 1));
                }
            }
        }
        (order, false)
    }

    /// Depth-first traversal, same bounds and cycle-safety as `bfs`.
    pub fn dfs(
        &self,
        start: NodeId,
        max_depth: usize,
        max_nodes: usize,
        filter: &EdgeFilter<'_>,
    ) -> (Vec<(NodeId, usize)>, bool) {
        if !self.contains_node(start) {
            return (Vec::new(), false);
        }
        let mut visited = HashSet::new();
        let mut stack = vec![(start, 0usize)];
        let mut order = Vec::new();

        while let Some((node, depth)) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push((node, depth));
            if order.len() >= max_nodes {
                return (order, !stack.is_empty());
            }
            if depth >= max_depth {
                continue;
            }
            let mut children: Vec<_> = self
                .edges_from(node)
                .filter(|e| filter(e.kind))
                .map(|e| e.target)
                .collect();
            children.reverse();
            for child in children {
                if !visited.contains(&child) {
                    stack.push((child, depth + 1));
                }
            }
        }
        (order, false)
    }

    /// Unweighted shortest path via BFS, ties broken by first-visited
    /// order (the natural order BFS already produces). Returns `None` if
    /// `dst` is unreachable within `max_depth` hops.
    pub fn shortest_path(
        &self,
        src: NodeId,
        dst: NodeId,
        max_depth: usize,
        filter: &EdgeFilter<'_>,
    ) -> Option<Vec<NodeId>> {
        if !self.contains_node(src) || !self.contains_node(dst) {
            return None;
        }
        if src == dst {
            return Some(vec![src]);
        }
        let mut visited = HashSet::new();
        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(src);
        queue.push_back((src, 0usize));

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.edges_from(node) {
                if !filter(edge.kind) {
                    continue;
                }
                if visited.insert(edge.target) {
                    parent.insert(edge.target, node);
                    if edge.target == dst {
                        let mut path = vec![dst];
                        let mut cur = dst;
                        while let Some(&p) = parent.get(&cur) {
                            path.push(p);
                            cur = p;
                        }
                        path.reverse();
                        return Some(path);
                    }
                    queue.push_back((edge.target, depth + 1));
                }
            }
        }
        None
    }

    /// Total degree (in + out, any edge kind) of a node.
    pub fn total_degree(&self, id: NodeId) -> usize {
        self.edges_from(id).count() + self.edges_to(id).count()
    }

    /// Degree-based categorization. Buckets may overlap (hub + entry
    /// point is possible and intentional — see the open question in the
    /// functional description). `stdlib_imports` names, per caller
    /// language, simple names that should never count as entry points
    /// even with zero incoming CALLS (e.g. a language's own runtime
    /// entrypoint convention is exempt elsewhere; this list is for
    /// standard-library call targets that only ever get called, never
    /// call back).
    pub fn categorize(&self) -> Categories {
        let mut categories = Categories::default();

        // 75th percentile of total degree, computed per node kind.
        let mut degrees_by_kind: HashMap<NodeKind, Vec<usize>> = HashMap::new();
        for node in self.all_nodes() {
            degrees_by_kind.entry(node.kind).or_default().push(self.total_degree(node.id));
        }
        let mut thresholds: HashMap<NodeKind, usize> = HashMap::new();
        for (kind, mut degrees) in degrees_by_kind {
            degrees.sort_unstable();
            let idx = ((degrees.len() as f64) * 0.75).floor() as usize;
            let idx = idx.min(degrees.len().saturating_sub(1));
            thresholds.insert(kind, degrees.get(idx).copied().unwrap_or(0));
        }

        for node in self.all_nodes() {
            let id = node.id;
            let in_calls = self.edges_to(id).filter(|e| e.kind == EdgeKind::Calls).count();
            let out_calls = self.edges_from(id).filter(|e| e.kind == EdgeKind::Calls).count();
            let total = self.total_degree(id);

            let mut any = false;
            if in_calls == 0 && matches!(node.kind, NodeKind::Function | NodeKind::Method) {
                categories.entry_points.push(id);
                any = true;
            }
            if let Some(&threshold) = thresholds.get(&node.kind) {
                if threshold > 0 && total >= threshold {
                    categories.hubs.push(id);
                    any = true;
                }
            }
            if out_calls == 0 && matches!(node.kind, NodeKind::Function | NodeKind::Method) {
                categories.leaves.push(id);
                any = true;
            }
            if !any {
                categories.regular.push(id);
            }
        }

        categories
    }

    /// Strongly-connected components of size > 1 over the IMPORTS
    /// projection, via Tarjan's algorithm — each such component is a
    /// circular import dependency.
    pub fn circular_dependencies(&self) -> Vec<Vec<NodeId>> {
        struct TarjanState {
            index_counter: usize,
            index: HashMap<NodeId, usize>,
            lowlink: HashMap<NodeId, usize>,
            on_stack: HashSet<NodeId>,
            stack: Vec<NodeId>,
            components: Vec<Vec<NodeId>>,
        }

        fn strongconnect(graph: &Graph, v: NodeId, state: &mut TarjanState) {
            state.index.insert(v, state.index_counter);
            state.lowlink.insert(v, state.index_counter);
            state.index_counter += 1;
            state.stack.push(v);
            state.on_stack.insert(v);

            for edge in graph.edges_from(v).filter(|e| e.kind == EdgeKind::Imports) {
                let w = edge.target;
                if !graph.contains_node(w) {
                    continue;
                }
                if !state.index.contains_key(&w) {
                    strongconnect(graph, w, state);
                    let w_low = state.lowlink[&w];
                    let v_low = state.lowlink[&v];
                    state.lowlink.insert(v, v_low.min(w_low));
                } else if state.on_stack.contains(&w) {
                    let w_idx = state.index[&w];
                    let v_low = state.lowlink[&v];
                    state.lowlink.insert(v, v_low.min(w_idx));
                }
            }

            if state.lowlink[&v] == state.index[&v] {
                let mut component = Vec::new();
                loop {
                    let w = state.stack.pop().unwrap();
                    state.on_stack.remove(&w);
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                if component.len() > 1 {
                    state.components.push(component);
                }
            }
        }

        let mut state = TarjanState {
            index_counter: 0,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            components: Vec::new(),
        };

        for node in self.all_nodes().map(|n| n.id).collect::<Vec<_>>() {
            if !state.index.contains_key(&node) {
                strongconnect(self, node, &mut state);
            }
        }

        state.components
    }

    /// Project-wide counters. O(V + E); the analysis engine caches this
    /// rather than recomputing it on every `stats` query.
    pub fn stats(&self) -> GraphStats {
        let mut nodes_by_kind = HashMap::new();
        let mut nodes_by_language = HashMap::new();
        for node in self.all_nodes() {
            *nodes_by_kind.entry(node.kind.as_str().to_string()).or_insert(0) += 1;
            if let Some(lang) = node.language {
                *nodes_by_language.entry(format!("{lang:?}").to_lowercase()).or_insert(0) += 1;
            }
        }
        let mut edges_by_type = HashMap::new();
        for edge in self.all_edges() {
            *edges_by_type.entry(edge.kind.as_str().to_string()).or_insert(0) += 1;
        }

        let mut degrees: Vec<(NodeId, usize)> =
            self.all_nodes().map(|n| (n.id, self.total_degree(n.id))).collect();
        degrees.sort_by(|a, b| b.1.cmp(&a.1));
        degrees.truncate(20);

        GraphStats {
            total_nodes: self.node_count(),
            total_edges: self.edge_count(),
            nodes_by_kind,
            edges_by_type,
            nodes_by_language,
            circular_dependency_count: self.circular_dependencies().len(),
            top_degree_nodes: degrees,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn node(path: &str, kind: NodeKind, name: &str, line: u32) -> GraphNode {
        GraphNode {
            id: NodeId::new(path, kind, name, line),
            kind,
            name: name.into(),
            qualified_name: format!("{path}::{name}"),
            file_path: PathBuf::from(path),
            language: Some(Language::Rust),
            start_line: line,
            end_line: line + 1,
            start_col: 0,
            end_col: 1,
            complexity: Some(1),
            is_container: false,
            child_count: 0,
            loc: Some(1),
            metadata: Default::default(),
        }
    }

    #[test]
    fn add_edge_rejects_missing_endpoints() {
        let mut g = Graph::new();
        let a = node("a.rs", NodeKind::Function, "a", 1);
        let a_id = a.id;
        g.add_node(a);
        let missing = NodeId::new("b.rs", NodeKind::Function, "b", 1);
        let edge = GraphEdge::structural(EdgeKind::Calls, a_id, missing);
        assert!(g.add_edge(edge).is_none());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn bfs_respects_max_depth_and_is_cycle_safe() {
        let mut g = Graph::new();
        let a = node("a.rs", NodeKind::Function, "a", 1);
        let b = node("a.rs", NodeKind::Function, "b", 2);
        let c = node("a.rs", NodeKind::Function, "c", 3);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        g.add_node(a);
        g.add_node(b);
        g.add_node(c);
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, a_id, b_id));
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, b_id, c_id));
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, c_id, a_id)); // cycle

        let (visited, truncated) = g.bfs(a_id, 1, 100, &any_edge);
        assert!(!truncated);
        assert_eq!(visited.len(), 2); // a (depth 0), b (depth 1); c is depth 2
        assert!(visited.iter().all(|&(_, d)| d <= 1));
    }

    #[test]
    fn bfs_truncates_at_max_nodes() {
        let mut g = Graph::new();
        let root = node("a.rs", NodeKind::Function, "root", 1);
        let root_id = root.id;
        g.add_node(root);
        for i in 0..10 {
            let leaf = node("a.rs", NodeKind::Function, &format!("leaf{i}"), 2 + i);
            let leaf_id = leaf.id;
            g.add_node(leaf);
            g.add_edge(GraphEdge::structural(EdgeKind::Calls, root_id, leaf_id));
        }
        let (visited, truncated) = g.bfs(root_id, 5, 3, &any_edge);
        assert_eq!(visited.len(), 3);
        assert!(truncated);
    }

    #[test]
    fn shortest_path_finds_minimal_hops() {
        let mut g = Graph::new();
        let a = node("a.rs", NodeKind::Function, "a", 1);
        let b = node("a.rs", NodeKind::Function, "b", 2);
        let c = node("a.rs", NodeKind::Function, "c", 3);
        let d = node("a.rs", NodeKind::Function, "d", 4);
        let (a_id, b_id, c_id, d_id) = (a.id, b.id, c.id, d.id);
        g.add_node(a);
        g.add_node(b);
        g.add_node(c);
        g.add_node(d);
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, a_id, b_id));
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, b_id, d_id));
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, a_id, c_id));
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, c_id, d_id));

        let path = g.shortest_path(a_id, d_id, 10, &any_edge).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], a_id);
        assert_eq!(path[2], d_id);
    }

    #[test]
    fn shortest_path_none_when_unreachable() {
        let mut g = Graph::new();
        let a = node("a.rs", NodeKind::Function, "a", 1);
        let b = node("a.rs", NodeKind::Function, "b", 2);
        let (a_id, b_id) = (a.id, b.id);
        g.add_node(a);
        g.add_node(b);
        assert!(g.shortest_path(a_id, b_id, 10, &any_edge).is_none());
    }

    #[test]
    fn replace_file_fragment_is_idempotent() {
        let mut g = Graph::new();
        let file = node("a.rs", NodeKind::File, "a.rs", 1);
        let file_id = file.id;
        g.add_node(file.clone());
        let func = node("a.rs", NodeKind::Function, "foo", 2);
        let func_id = func.id;
        let contains = GraphEdge::structural(EdgeKind::Contains, file_id, func_id);

        let dropped = g.replace_file_fragment(file_id, vec![func.clone()], vec![contains.clone()]);
        assert!(dropped.is_empty());
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);

        let dropped = g.replace_file_fragment(file_id, vec![func], vec![contains]);
        assert!(dropped.is_empty());
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn replace_file_fragment_removes_stale_nodes() {
        let mut g = Graph::new();
        let file = node("a.rs", NodeKind::File, "a.rs", 1);
        let file_id = file.id;
        g.add_node(file);
        let foo = node("a.rs", NodeKind::Function, "foo", 2);
        let foo_id = foo.id;
        let bar = node("a.rs", NodeKind::Function, "bar", 3);
        let bar_id = bar.id;
        g.replace_file_fragment(
            file_id,
            vec![foo.clone(), bar],
            vec![
                GraphEdge::structural(EdgeKind::Contains, file_id, foo_id),
                GraphEdge::structural(EdgeKind::Contains, file_id, bar_id),
                GraphEdge::structural(EdgeKind::Calls, bar_id, foo_id),
            ],
        );
        assert_eq!(g.node_count(), 3);

        // Re-parse with bar removed.
        g.replace_file_fragment(
            file_id,
            vec![foo.clone()],
            vec![GraphEdge::structural(EdgeKind::Contains, file_id, foo_id)],
        );
        assert_eq!(g.node_count(), 2);
        assert!(g.node(bar_id).is_none());
        assert!(g.node(foo_id).is_some());
    }

    #[test]
    fn circular_dependencies_detects_import_cycle() {
        let mut g = Graph::new();
        let a = node("a.rs", NodeKind::File, "a.rs", 1);
        let b = node("b.rs", NodeKind::File, "b.rs", 1);
        let (a_id, b_id) = (a.id, b.id);
        g.add_node(a);
        g.add_node(b);
        g.add_edge(GraphEdge::structural(EdgeKind::Imports, a_id, b_id));
        g.add_edge(GraphEdge::structural(EdgeKind::Imports, b_id, a_id));

        let cycles = g.circular_dependencies();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn categorize_leaf_and_entry_point() {
        let mut g = Graph::new();
        let entry = node("a.rs", NodeKind::Function, "entry", 1);
        let leaf = node("a.rs", NodeKind::Function, "leaf", 2);
        let (entry_id, leaf_id) = (entry.id, leaf.id);
        g.add_node(entry);
        g.add_node(leaf);
        g.add_edge(GraphEdge::structural(EdgeKind::Calls, entry_id, leaf_id));

        let categories = g.categorize();
        assert!(categories.entry_points.contains(&entry_id));
        assert!(categories.leaves.contains(&leaf_id));
    }
}
