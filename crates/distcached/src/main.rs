//! distcache node daemon
//!
//! Serves directory-backed cache groups to clients under `/api/` and to peer
//! nodes under the peer base path.

mod api;
mod config;
mod loader;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use distcache::{peer_router, HttpPool, Registry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{ConfigFile, GroupSpec, NodeConfig, DEFAULT_BIND};
use crate::loader::DirLoader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// URL peers use to reach this node (default: http://{bind})
    #[arg(long)]
    self_url: Option<String>,

    /// Comma-separated peer URLs, this node included
    #[arg(long, value_delimiter = ',')]
    peers: Option<Vec<String>>,

    /// Path prefix of the peer protocol
    #[arg(long)]
    base_path: Option<String>,

    /// Virtual nodes per peer on the hash ring
    #[arg(long)]
    replicas: Option<usize>,

    /// Budget for one peer fetch in milliseconds
    #[arg(long)]
    peer_timeout_ms: Option<u64>,

    /// Load locally when the owning peer fails
    #[arg(long)]
    fallback_to_loader: bool,

    /// Cache group as name=capacity:dir (repeatable)
    #[arg(short, long = "group")]
    groups: Vec<GroupSpec>,

    /// Health check mode (for Docker)
    #[arg(long)]
    health: bool,
}

impl Args {
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            bind: self.bind.clone(),
            self_url: self.self_url.clone(),
            peers: self.peers.clone(),
            base_path: self.base_path.clone(),
            replicas: self.replicas,
            peer_timeout_ms: self.peer_timeout_ms,
            fallback_to_loader: self.fallback_to_loader.then_some(true),
            groups: (!self.groups.is_empty()).then(|| self.groups.clone()),
        }
    }

    fn node_config(&self) -> Result<NodeConfig> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        NodeConfig::resolve(file.merge(self.overrides())).context("Invalid configuration")
    }
}

/// Wire the registry, peer pool and both routers for `config`
fn build_node(config: &NodeConfig) -> Result<(Arc<Registry>, Router)> {
    let pool = Arc::new(
        HttpPool::new(&config.self_url)
            .with_base_path(&config.base_path)
            .with_replicas(config.replicas)
            .with_timeout(config.peer_timeout),
    );
    pool.set_peers(&config.peers)?;

    let registry = Arc::new(Registry::with_peers(pool.clone()));
    for spec in &config.groups {
        let loader = DirLoader::new(&spec.dir)?;
        info!(
            "Group {}: {} entries from {}",
            spec.name,
            spec.capacity,
            loader.root().display()
        );
        registry.register_group_with(&spec.name, config.group_options(spec.capacity), loader)?;
    }

    let app = api::router(registry.clone()).merge(peer_router(registry.clone(), pool.base_path()));
    Ok((registry, app))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    // Health check
    if args.health {
        let bind = args.bind.as_deref().unwrap_or(DEFAULT_BIND);
        match reqwest::get(format!("http://{}/health", bind)).await {
            Ok(response) if response.status().is_success() => {
                println!("OK");
                std::process::exit(0);
            }
            _ => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    let config = args.node_config()?;

    info!("Starting distcache node v{}", env!("CARGO_PKG_VERSION"));
    info!("Self URL: {}", config.self_url);
    info!("Peers: {:?}", config.peers);
    info!(
        "Peer protocol: {} ({} replicas, {:?} budget, fallback {})",
        config.base_path, config.replicas, config.peer_timeout, config.fallback_to_loader
    );

    let (registry, app) = build_node(&config)?;

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Server listening on {}", config.bind);

    println!("\ndistcache node ready");
    println!("   Client API:  {}/api/{{group}}/{{key}}", config.self_url);
    println!("   Peer API:    {}{}{{group}}/{{key}}", config.self_url, config.base_path);
    println!("   Stats:       {}/stats", config.self_url);
    println!("   Groups:      {}", registry.group_names().join(", "));
    println!("\nPress Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
