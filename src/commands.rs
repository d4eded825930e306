//! CLI command implementations, wiring the config, analysis engine,
//! watcher, and the two transports together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use codegraph_core::{Cache, CacheConfig};
use codegraph_index::coordinator::AnalysisEngine;
use codegraph_index::discovery::Discovery;
use codegraph_server::{router, ServerState};
use codegraph_watch::WatcherService;

use crate::config::Config;

fn build_cache_config(config: &Config) -> CacheConfig {
    CacheConfig {
        redis_url: if config.cache_enabled() { config.redis_url.clone() } else { None },
        l1_capacity: 10_000,
        l1_ttl: Duration::from_secs(config.cache_ttl_seconds.unwrap_or(600)),
        generation: config.pattern_set_version as u64,
    }
}

async fn build_engine(root: &PathBuf, config: &Config) -> anyhow::Result<Arc<AnalysisEngine>> {
    let cache = Cache::connect(build_cache_config(config)).await?;
    let discovery = Discovery::new(root.clone()).with_ignore_file(config.ignore_file.clone());
    Ok(Arc::new(AnalysisEngine::new(root.clone(), discovery, cache)))
}

fn build_watcher(root: &PathBuf, config: &Config, engine: Arc<AnalysisEngine>) -> Option<Arc<WatcherService>> {
    if !config.watcher_enabled {
        return None;
    }
    let discovery = Discovery::new(root.clone()).with_ignore_file(config.ignore_file.clone());
    let watcher = Arc::new(WatcherService::new(root.clone(), engine, discovery, Duration::from_millis(config.debounce_ms)));
    match watcher.start() {
        Ok(()) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "failed to start file watcher");
            None
        }
    }
}

pub async fn serve(root: PathBuf, host: String, port: u16, enable_mcp: bool) -> anyhow::Result<()> {
    let config = Config::load(&root)?;
    let engine = build_engine(&root, &config).await?;

    tracing::info!("running initial analysis of {}", root.display());
    let stats = engine.analyze_full().await?;
    tracing::info!(nodes = stats.total_nodes, edges = stats.total_edges, "initial analysis complete");

    let watcher = build_watcher(&root, &config, engine.clone());
    let state = Arc::new(ServerState::new(engine.clone(), watcher, config.cache_enabled()));

    if enable_mcp {
        let mcp_state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = codegraph_server::mcp::run_stdio_server(mcp_state).await {
                tracing::error!(error = %e, "MCP server exited with error");
            }
        });
    }

    let app = router::create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn mcp(root: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&root)?;
    let engine = build_engine(&root, &config).await?;
    engine.analyze_full().await?;
    let watcher = build_watcher(&root, &config, engine.clone());
    let state = Arc::new(ServerState::new(engine, watcher, config.cache_enabled()));
    codegraph_server::mcp::run_stdio_server(state).await
}

pub async fn index(root: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&root)?;
    let engine = build_engine(&root, &config).await?;
    let stats = engine.analyze_full().await?;
    tracing::info!(nodes = stats.total_nodes, edges = stats.total_edges, "indexing complete");
    println!(
        "Indexed {} nodes, {} relationships across {} language(s).",
        stats.total_nodes,
        stats.total_edges,
        stats.nodes_by_language.len()
    );
    Ok(())
}

pub async fn clear_cache(root: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&root)?;
    let cache = Cache::connect(build_cache_config(&config)).await?;
    cache.bump_generation();
    tracing::info!("cache generation bumped; all previously cached analyses are now stale");
    Ok(())
}
