//! Two-tier cache for parsed/extracted analysis results.
//!
//! L1 is a bounded, TTL'd in-process map (moka) fronting L2, an external
//! key-value store (redis) shared across processes/machines. Keys live
//! under the `code_graph:` prefix, grouped by class:
//!
//!   code_graph:analysis:<content_hash>       -- a FileAnalysis (nodes+edges extracted from one file's content)
//!   code_graph:analysis:stats:<project_hash> -- the project's last-computed GraphStats
//!   code_graph:meta:generation                -- a monotonically increasing counter
//!
//! This collapses the per-path `nodes:<path>`/`edges:<path>`/`meta:<path>`
//! key classes into one content-hash-addressed `analysis:<content_hash>`
//! record per file: a `FileAnalysis` already carries that file's nodes and
//! edges together, and keying by content hash (rather than path + a
//! separately-tracked mtime/content_hash pair) makes the record naturally
//! path-and-rename independent, so there is nothing left for a separate
//! per-path `meta:<path>` entry to mean.
//!
//! `meta:generation` is bumped whenever the extraction algorithm or the
//! data model changes in a way that makes previously-cached records
//! unsafe to reuse; every read checks the record's stamped generation
//! against the current one and treats a mismatch as a miss.

use crate::graph::GraphStats;
use crate::model::{GraphEdge, GraphNode};
use moka::future::Cache as MokaCache;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "code_graph";

/// Configuration for the cache layer, loaded from the application config.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Connection string for the L2 store. `None` disables L2 entirely —
    /// the cache then degrades to an L1-only, process-local cache.
    pub redis_url: Option<String>,
    pub l1_capacity: u64,
    pub l1_ttl: Duration,
    /// Bumped by callers whenever the extraction algorithm changes in a
    /// way that invalidates previously-cached records.
    pub generation: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            redis_url: None,
            l1_capacity: 10_000,
            l1_ttl: Duration::from_secs(600),
            generation: 1,
        }
    }
}

/// A cached record of everything extracted from one file's content,
/// keyed by the blake3 hash of that content so an unchanged file's
/// analysis survives a re-run even if its path or mtime changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub generation: u64,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// A cached record of a project's last-computed stats (§4.8: `analyze_full`
/// stores its recomputed stats under `analysis:stats:<project_hash>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatsRecord {
    generation: u64,
    stats: GraphStats,
}

/// Two-tier cache. Cheap to clone — both tiers are internally `Arc`'d.
#[derive(Clone)]
pub struct Cache {
    l1: MokaCache<String, Vec<u8>>,
    l2: Option<ConnectionManager>,
    generation: Arc<AtomicU64>,
}

impl Cache {
    pub async fn connect(config: CacheConfig) -> anyhow::Result<Self> {
        let l1 = MokaCache::builder()
            .max_capacity(config.l1_capacity)
            .time_to_live(config.l1_ttl)
            .build();

        let l2 = match config.redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = client.get_connection_manager().await?;
                Some(manager)
            }
            None => None,
        };

        Ok(Cache {
            l1,
            l2,
            generation: Arc::new(AtomicU64::new(config.generation)),
        })
    }

    /// An L1-only cache, for tests and for `--no-redis` operation.
    pub fn in_memory(capacity: u64, ttl: Duration) -> Self {
        Cache {
            l1: MokaCache::builder().max_capacity(capacity).time_to_live(ttl).build(),
            l2: None,
            generation: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidate every previously-cached record without touching L2's
    /// storage — stale-generation records are simply ignored on read and
    /// naturally age out of both tiers.
    pub fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn analysis_key(content_hash: &str) -> String {
        format!("{KEY_PREFIX}:analysis:{content_hash}")
    }

    fn stats_key(project_hash: &str) -> String {
        format!("{KEY_PREFIX}:analysis:stats:{project_hash}")
    }

    pub fn content_hash(content: &[u8]) -> String {
        blake3::hash(content).to_hex().to_string()
    }

    /// Hash identifying a project root, for the `analysis:stats:<hash>`
    /// key — stable across repeated runs against the same root.
    pub fn project_hash(root: &std::path::Path) -> String {
        blake3::hash(root.to_string_lossy().as_bytes()).to_hex().to_string()
    }

    /// Fetch the project's last-stored stats, if any and from the current
    /// generation. Mirrors `get_analysis`'s L1-then-L2 promotion.
    pub async fn get_stats(&self, project_hash: &str) -> Option<GraphStats> {
        let key = Self::stats_key(project_hash);

        if let Some(bytes) = self.l1.get(&key).await {
            if let Some(record) = self.decode_stats_if_current(&bytes) {
                return Some(record);
            }
        }

        let mut l2 = self.l2.clone()?;
        let bytes: Option<Vec<u8>> = l2.get(&key).await.ok()?;
        let bytes = bytes?;
        let record = self.decode_stats_if_current(&bytes)?;
        self.l1.insert(key, bytes).await;
        Some(record)
    }

    pub async fn put_stats(&self, project_hash: &str, stats: &GraphStats) -> anyhow::Result<()> {
        let key = Self::stats_key(project_hash);
        let record = StatsRecord { generation: self.current_generation(), stats: stats.clone() };
        let bytes = bincode::serialize(&record)?;

        self.l1.insert(key.clone(), bytes.clone()).await;

        if let Some(mut l2) = self.l2.clone() {
            let _: () = l2.set_ex(key, bytes, 7 * 24 * 3600).await?;
        }

        Ok(())
    }

    fn decode_stats_if_current(&self, bytes: &[u8]) -> Option<GraphStats> {
        let record: StatsRecord = bincode::deserialize(bytes).ok()?;
        if record.generation == self.current_generation() {
            Some(record.stats)
        } else {
            None
        }
    }

    /// Fetch a file's cached analysis by content hash, checking L1 then
    /// L2. A hit in L2 is promoted into L1. Records from a stale
    /// generation are treated as misses.
    pub async fn get_analysis(&self, content_hash: &str) -> Option<FileAnalysis> {
        let key = Self::analysis_key(content_hash);

        if let Some(bytes) = self.l1.get(&key).await {
            if let Some(record) = self.decode_if_current(&bytes) {
                return Some(record);
            }
        }

        let mut l2 = self.l2.clone()?;
        let bytes: Option<Vec<u8>> = l2.get(&key).await.ok()?;
        let bytes = bytes?;
        let record = self.decode_if_current(&bytes)?;
        self.l1.insert(key, bytes).await;
        Some(record)
    }

    pub async fn put_analysis(&self, content_hash: &str, analysis: &FileAnalysis) -> anyhow::Result<()> {
        let key = Self::analysis_key(content_hash);
        let bytes = bincode::serialize(analysis)?;

        self.l1.insert(key.clone(), bytes.clone()).await;

        if let Some(mut l2) = self.l2.clone() {
            let _: () = l2.set_ex(key, bytes, 7 * 24 * 3600).await?;
        }

        Ok(())
    }

    fn decode_if_current(&self, bytes: &[u8]) -> Option<FileAnalysis> {
        let record: FileAnalysis = bincode::deserialize(bytes).ok()?;
        if record.generation == self.current_generation() {
            Some(record)
        } else {
            None
        }
    }

    /// Drop everything cached for one file's prior content — called when
    /// a file changes and its old content hash is no longer reachable
    /// from disk, so its cache entry would otherwise simply expire on
    /// its own schedule instead of immediately.
    pub async fn invalidate_content(&self, content_hash: &str) -> anyhow::Result<()> {
        let key = Self::analysis_key(content_hash);
        self.l1.invalidate(&key).await;
        if let Some(mut l2) = self.l2.clone() {
            let _: () = l2.del(key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use std::path::PathBuf;

    fn sample_analysis(generation: u64) -> FileAnalysis {
        FileAnalysis {
            generation,
            nodes: vec![GraphNode {
                id: crate::model::NodeId::new("a.rs", NodeKind::Function, "f", 1),
                kind: NodeKind::Function,
                name: "f".into(),
                qualified_name: "f".into(),
                file_path: PathBuf::from("a.rs"),
                language: Some(crate::model::Language::Rust),
                start_line: 1,
                end_line: 3,
                start_col: 0,
                end_col: 1,
                complexity: Some(1),
                is_container: false,
                child_count: 0,
                loc: Some(3),
                metadata: Default::default(),
            }],
            edges: vec![],
        }
    }

    #[tokio::test]
    async fn round_trips_through_l1() {
        let cache = Cache::in_memory(100, Duration::from_secs(60));
        let hash = Cache::content_hash(b"fn f() {}");
        cache.put_analysis(&hash, &sample_analysis(1)).await.unwrap();

        let fetched = cache.get_analysis(&hash).await.unwrap();
        assert_eq!(fetched.nodes.len(), 1);
    }

    #[tokio::test]
    async fn stale_generation_is_a_miss() {
        let cache = Cache::in_memory(100, Duration::from_secs(60));
        let hash = Cache::content_hash(b"fn f() {}");
        cache.put_analysis(&hash, &sample_analysis(1)).await.unwrap();

        cache.bump_generation();

        assert!(cache.get_analysis(&hash).await.is_none());
    }

    #[tokio::test]
    async fn stats_round_trip_through_l1() {
        let cache = Cache::in_memory(100, Duration::from_secs(60));
        let project_hash = Cache::project_hash(PathBuf::from("/tmp/project").as_path());
        let stats = crate::graph::GraphStats { total_nodes: 3, total_edges: 2, ..Default::default() };

        cache.put_stats(&project_hash, &stats).await.unwrap();
        let fetched = cache.get_stats(&project_hash).await.unwrap();
        assert_eq!(fetched.total_nodes, 3);
        assert_eq!(fetched.total_edges, 2);
    }

    #[tokio::test]
    async fn stats_stale_generation_is_a_miss() {
        let cache = Cache::in_memory(100, Duration::from_secs(60));
        let project_hash = Cache::project_hash(PathBuf::from("/tmp/project").as_path());
        cache.put_stats(&project_hash, &GraphStats::default()).await.unwrap();

        cache.bump_generation();

        assert!(cache.get_stats(&project_hash).await.is_none());
    }
}
