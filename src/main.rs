//! Confluence - Multi-source memory confluence engine
//!
//! Gathers source records for one identity from fixture directories and
//! writes the merged knowledge graph snapshot.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confluence::{
    config::ConfluenceConfig, AttributeScopeResolver, ConfluenceEngine, FixtureFetcher,
    IdentityDescriptor, ScopeResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "confluence")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Multi-source memory confluence engine")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFLUENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gather all source domains and write the knowledge graph
    Run {
        /// Identity descriptor (JSON, YAML or TOML)
        #[arg(short, long)]
        identity: PathBuf,

        /// Directory holding per-domain record fixtures
        #[arg(short, long)]
        sources: PathBuf,

        /// Snapshot path (overrides output.path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the source domains an identity resolves to
    Scope {
        /// Identity descriptor (JSON, YAML or TOML)
        #[arg(short, long)]
        identity: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("confluence={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => ConfluenceConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfluenceConfig::default(),
    };
    config.validate()?;

    match cli.command {
        Commands::Run {
            identity,
            sources,
            output,
        } => {
            run(config, identity, sources, output).await?;
        }
        Commands::Scope { identity } => {
            show_scope(config, identity)?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run(
    config: ConfluenceConfig,
    identity: PathBuf,
    sources: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let path = identity;
    let identity = IdentityDescriptor::load(&path)?;
    if identity.is_empty() {
        tracing::warn!(path = %path.display(), "Identity descriptor has no attributes");
    }
    let output = output.unwrap_or_else(|| config.output.path.clone());
    let fetcher = FixtureFetcher::new(sources);

    tracing::info!(
        identity = %identity.identity_ref(),
        sources = %fetcher.root().display(),
        "Starting memory confluence"
    );

    let engine = ConfluenceEngine::new(config, Arc::new(fetcher));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling gather...");
            on_signal.cancel();
        }
    });

    let graph = engine.run_with_cancel(&identity, cancel).await?;
    confluence::write_snapshot(&graph, &output, engine.config().output.pretty).await?;

    let summary = graph.summary();
    println!("Knowledge graph written to {}", output.display());
    println!(
        "  {} nodes, {} edges, {} confluences, {} contradictions, {} warnings",
        summary.nodes, summary.edges, summary.confluences, summary.contradictions, summary.warnings
    );

    Ok(())
}

fn show_scope(config: ConfluenceConfig, identity: PathBuf) -> Result<()> {
    let identity = IdentityDescriptor::load(&identity)?;
    let resolver = AttributeScopeResolver::new(&config.scope);
    for domain in resolver.resolve(&identity)? {
        println!("{}", domain);
    }
    Ok(())
}

fn show_config(config: Option<&ConfluenceConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
