//! codegraph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "codegraph")]
#[command(about = "Cross-language code property graph with call, import, and seam analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP query server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7890")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Also start the MCP tool server over stdio, in-process
        #[arg(long)]
        mcp: bool,
    },
    /// Start the MCP tool server over stdio (no HTTP transport)
    Mcp,
    /// Analyze the project once and exit
    Index,
    /// Bump the cache generation, invalidating all previously cached analyses
    ClearCache,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("codegraph={log_level}"))))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("codegraph v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("project root: {}", cli.root.display());

    match cli.command {
        Commands::Serve { port, host, mcp } => commands::serve(cli.root, host, port, mcp).await,
        Commands::Mcp => commands::mcp(cli.root).await,
        Commands::Index => commands::index(cli.root).await,
        Commands::ClearCache => commands::clear_cache(cli.root).await,
    }
}
