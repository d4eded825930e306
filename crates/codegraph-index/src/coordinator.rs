//! Analysis Engine (C8): orchestrates discovery, parallel extraction, and
//! the two-phase commit that breaks the Parser/Store cycle (§9) — every
//! file's structural fragment (Phase A) lands in the graph and symbol
//! table before any file's calls are resolved against it (Phase B), so
//! resolution never depends on extraction order.

use crate::discovery::Discovery;
use crate::extractor::{self, ExtractionBundle};
use crate::parser_pool::{create_parser_pool, ParserPool};
use crate::registry;
use crate::seam;
use codegraph_core::{
    Cache, EdgeKind, FileAnalysis, Graph, GraphEdge, GraphNode, GraphStats, Language, NodeId,
    NodeKind, SymbolTable,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// One file's content loaded from disk, tagged with its project-relative
/// path — the unit the rest of the pipeline keys everything on.
struct Loaded {
    relative_path: String,
    content: Vec<u8>,
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Names of nodes worth registering as resolvable call/reference targets.
/// Imports and variables are not — a call never resolves to an import
/// statement itself, only to what it names.
fn is_symbol_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Function
            | NodeKind::Method
            | NodeKind::Class
            | NodeKind::Interface
            | NodeKind::Enum
            | NodeKind::TypeAlias
    )
}

pub struct AnalysisEngine {
    root: PathBuf,
    discovery: Discovery,
    pool: ParserPool,
    cache: Cache,
    graph: RwLock<Graph>,
    symbols: SymbolTable,
    stats: RwLock<Option<GraphStats>>,
}

impl AnalysisEngine {
    pub fn new(root: impl Into<PathBuf>, discovery: Discovery, cache: Cache) -> Self {
        AnalysisEngine {
            root: root.into(),
            discovery,
            pool: create_parser_pool(),
            cache,
            graph: RwLock::new(Graph::new()),
            symbols: SymbolTable::new(),
            stats: RwLock::new(None),
        }
    }

    pub async fn graph(&self) -> tokio::sync::RwLockReadGuard<'_, Graph> {
        self.graph.read().await
    }

    pub async fn stats(&self) -> Option<GraphStats> {
        self.stats.read().await.clone()
    }

    /// Walk the project root, extract every discovered file in parallel,
    /// and commit the whole batch in one two-phase pass. The graph is
    /// replaced incrementally per file (`replace_file_fragment`), not
    /// wholesale, so a full re-analysis behaves the same as re-running
    /// incremental analysis over every file.
    pub async fn analyze_full(&self) -> anyhow::Result<GraphStats> {
        let files = self.discovery.walk();
        let loaded = self.read_files_parallel(&files);
        let bundles = self.extract_all(loaded).await;
        self.commit_structural(&bundles).await;
        self.resolve_calls_and_seams(&bundles).await;
        self.cache_bundles(&bundles).await;
        let stats = {
            let graph = self.graph.read().await;
            graph.stats()
        };
        *self.stats.write().await = Some(stats.clone());
        let project_hash = Cache::project_hash(&self.root);
        if let Err(e) = self.cache.put_stats(&project_hash, &stats).await {
            tracing::warn!(error = %e, "failed to persist project stats to cache");
        }
        Ok(stats)
    }

    /// Re-analyze a bounded set of changed paths: deletions drop the
    /// file's fragment and symbols outright, everything else is
    /// re-extracted (content-hash cache permitting) and recommitted.
    ///
    /// Known limitation (see DESIGN.md): CALLS edges from *unchanged*
    /// files into a symbol that moved or was renamed in a changed file
    /// are not retroactively re-resolved — they're refreshed the next
    /// time the calling file itself is re-analyzed or a full re-analysis
    /// runs. Node ids are derived from `(path, kind, qualified_name,
    /// start_line)`, so a changed start line already mints a new id and
    /// naturally drops the stale edge via `replace_file_fragment`; a
    /// pure rename does not.
    pub async fn analyze_incremental(&self, changed_paths: &[PathBuf]) -> anyhow::Result<GraphStats> {
        let mut loaded = Vec::new();

        for path in changed_paths {
            let rel = relative_path(&self.root, path);
            if !path.exists() {
                self.graph.write().await.remove_file(path);
                self.symbols.remove_file(&rel);
                continue;
            }
            if self.discovery.is_ignored(path) || !registry::is_supported(path) {
                continue;
            }
            match std::fs::read(path) {
                Ok(content) => loaded.push(Loaded { relative_path: rel, content }),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to read changed file"),
            }
        }

        let bundles = self.extract_all(loaded).await;
        self.commit_structural(&bundles).await;
        self.resolve_calls_and_seams(&bundles).await;
        self.cache_bundles(&bundles).await;

        let stats = {
            let graph = self.graph.read().await;
            graph.stats()
        };
        *self.stats.write().await = Some(stats.clone());
        let project_hash = Cache::project_hash(&self.root);
        if let Err(e) = self.cache.put_stats(&project_hash, &stats).await {
            tracing::warn!(error = %e, "failed to persist project stats to cache");
        }
        Ok(stats)
    }

    fn read_files_parallel(&self, files: &[PathBuf]) -> Vec<Loaded> {
        files
            .par_iter()
            .filter_map(|path| match std::fs::read(path) {
                Ok(content) => Some(Loaded {
                    relative_path: relative_path(&self.root, path),
                    content,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read file during discovery");
                    None
                }
            })
            .collect()
    }

    /// Parse and extract every loaded file concurrently. Cache hits skip
    /// re-parsing entirely (the bundle is reconstructed from the cached
    /// `FileAnalysis`, with no tree — calls were already resolved the
    /// first time, so cache hits carry no `UnresolvedCall`s and are
    /// skipped in Phase B's seam pass, which needs a live tree).
    async fn extract_all(&self, loaded: Vec<Loaded>) -> Vec<(Loaded, ExtractionBundle)> {
        let mut join_set = tokio::task::JoinSet::new();

        for item in loaded {
            let pool = self.pool.clone();
            let cached = self.cache.get_analysis(&Cache::content_hash(&item.content)).await;
            join_set.spawn(async move {
                if let Some(analysis) = cached {
                    let bundle = bundle_from_cache(&item, analysis);
                    (item, bundle)
                } else {
                    let bundle = extractor::extract_file(&item.relative_path, &item.content, &pool).await;
                    (item, bundle)
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(pair) => results.push(pair),
                Err(e) => tracing::warn!(error = %e, "extraction task panicked"),
            }
        }
        results
    }

    /// Phase A: commit structural nodes/edges per file and (re)register
    /// each file's declared symbols.
    async fn commit_structural(&self, bundles: &[(Loaded, ExtractionBundle)]) {
        let mut graph = self.graph.write().await;
        for (loaded, bundle) in bundles {
            self.symbols.remove_file(&loaded.relative_path);
            for node in &bundle.nodes {
                if is_symbol_kind(node.kind) {
                    self.symbols.insert(
                        bundle.language,
                        node.name.clone(),
                        node.id,
                        loaded.relative_path.clone(),
                    );
                }
            }

            let mut nodes = Vec::with_capacity(bundle.nodes.len() + 1);
            nodes.push(bundle.file_node.clone());
            nodes.extend(bundle.nodes.clone());

            let dropped = graph.replace_file_fragment(bundle.file_node.id, nodes, bundle.edges.clone());
            for edge in dropped {
                tracing::debug!(
                    path = %loaded.relative_path,
                    source = ?edge.source,
                    target = ?edge.target,
                    "dropped edge with missing endpoint during commit"
                );
            }
        }
    }

    /// Phase B: resolve every pending call against the now-fully-populated
    /// symbol table, and run seam detection over files that still carry a
    /// live tree.
    async fn resolve_calls_and_seams(&self, bundles: &[(Loaded, ExtractionBundle)]) {
        let mut graph = self.graph.write().await;

        for (loaded, bundle) in bundles {
            for call in &bundle.calls {
                let candidates = self.symbols.lookup(call.language, &call.simple_name);
                if candidates.is_empty() {
                    continue;
                }
                let ambiguous = candidates.len() > 1;
                for target in candidates {
                    let mut edge = GraphEdge::structural(EdgeKind::Calls, call.caller, target);
                    edge.ambiguous = ambiguous;
                    edge.line = Some(call.line);
                    edge.file_path = Some(PathBuf::from(&loaded.relative_path));
                    graph.add_edge(edge);
                }
            }

            let Some(tree) = &bundle.tree else { continue };
            let patterns = registry::patterns(bundle.language);
            let seams = seam::detect(
                &loaded.relative_path,
                bundle.language,
                tree.root_node(),
                &bundle.content,
                patterns.call,
                &bundle.nodes,
            );
            for (target_node, edge) in seams {
                graph.add_node(target_node);
                graph.add_edge(edge);
            }
        }
    }

    async fn cache_bundles(&self, bundles: &[(Loaded, ExtractionBundle)]) {
        let generation = self.cache.current_generation();
        for (loaded, bundle) in bundles {
            let mut nodes = Vec::with_capacity(bundle.nodes.len() + 1);
            nodes.push(bundle.file_node.clone());
            nodes.extend(bundle.nodes.clone());
            let analysis = FileAnalysis { generation, nodes, edges: bundle.edges.clone() };
            let hash = Cache::content_hash(&loaded.content);
            if let Err(e) = self.cache.put_analysis(&hash, &analysis).await {
                tracing::warn!(path = %loaded.relative_path, error = %e, "failed to cache analysis");
            }
        }
    }
}

fn bundle_from_cache(loaded: &Loaded, analysis: FileAnalysis) -> ExtractionBundle {
    let file_node = analysis
        .nodes
        .iter()
        .find(|n| n.kind == NodeKind::File)
        .cloned()
        .unwrap_or_else(|| file_node_placeholder(loaded));
    let language = file_node.language.unwrap_or(Language::Other);
    let nodes: Vec<_> = analysis.nodes.into_iter().filter(|n| n.kind != NodeKind::File).collect();
    ExtractionBundle {
        file_node,
        nodes,
        edges: analysis.edges,
        calls: Vec::new(),
        tree: None,
        content: String::from_utf8_lossy(&loaded.content).into_owned(),
        language,
    }
}

fn file_node_placeholder(loaded: &Loaded) -> GraphNode {
    let name = Path::new(&loaded.relative_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&loaded.relative_path)
        .to_string();
    GraphNode {
        id: NodeId::new(&loaded.relative_path, NodeKind::File, &name, 1),
        kind: NodeKind::File,
        name: name.clone(),
        qualified_name: loaded.relative_path.clone(),
        file_path: PathBuf::from(&loaded.relative_path),
        language: None,
        start_line: 1,
        end_line: 1,
        start_col: 1,
        end_col: 1,
        complexity: None,
        is_container: true,
        child_count: 0,
        loc: None,
        metadata: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::CacheConfig;
    use std::fs;
    use tempfile::TempDir;

    async fn engine_for(dir: &TempDir) -> AnalysisEngine {
        let cache = Cache::connect(CacheConfig { redis_url: None, ..Default::default() }).await.unwrap();
        AnalysisEngine::new(dir.path(), Discovery::new(dir.path()), cache)
    }

    #[tokio::test]
    async fn analyze_full_persists_stats_to_cache() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def foo():\n    return 1\n").unwrap();

        let cache = Cache::connect(CacheConfig { redis_url: None, ..Default::default() }).await.unwrap();
        let engine = AnalysisEngine::new(dir.path(), Discovery::new(dir.path()), cache.clone());
        let stats = engine.analyze_full().await.unwrap();

        let project_hash = Cache::project_hash(dir.path());
        let cached = cache.get_stats(&project_hash).await.expect("stats cached after analyze_full");
        assert_eq!(cached.total_nodes, stats.total_nodes);
    }

    #[tokio::test]
    async fn analyze_full_builds_call_graph_across_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def foo():\n    return 1\n").unwrap();
        fs::write(dir.path().join("b.py"), "from a import foo\ndef bar():\n    return foo()\n").unwrap();

        let engine = engine_for(&dir).await;
        let stats = engine.analyze_full().await.unwrap();

        assert!(stats.total_nodes >= 4); // 2 files + foo + bar (+ import node)
        let graph = engine.graph().await;
        let bar = graph.find_node_by_name("bar").unwrap();
        let calls: Vec<_> = graph.edges_from(bar).filter(|e| e.kind == EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn analyze_incremental_removes_deleted_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.py");
        fs::write(&file_path, "def foo():\n    return 1\n").unwrap();

        let engine = engine_for(&dir).await;
        engine.analyze_full().await.unwrap();
        assert!(engine.graph().await.find_node_by_name("foo").is_some());

        fs::remove_file(&file_path).unwrap();
        engine.analyze_incremental(&[file_path]).await.unwrap();
        assert!(engine.graph().await.find_node_by_name("foo").is_none());
    }

    #[tokio::test]
    async fn analyze_incremental_reparses_changed_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.py");
        fs::write(&file_path, "def foo():\n    return 1\n").unwrap();

        let engine = engine_for(&dir).await;
        engine.analyze_full().await.unwrap();

        fs::write(&file_path, "def foo():\n    return 1\n\ndef baz():\n    return 2\n").unwrap();
        engine.analyze_incremental(&[file_path]).await.unwrap();

        assert!(engine.graph().await.find_node_by_name("baz").is_some());
    }
}
