//! Selectel storage command-line client

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use selectel_client::{ClientRegistry, MemoryTokenStore, RedisTokenStore, StorageSettings, TokenStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "selectel")]
#[command(about = "Command-line client for Selectel cloud storage")]
#[command(version)]
pub struct Args {
    /// Settings file (TOML); SELECTEL__* variables override it
    #[arg(short, long, env = "SELECTEL_CONFIG")]
    config: Option<PathBuf>,

    /// Storage type to operate on
    #[arg(short, long, default_value = "static", env = "SELECTEL_STORAGE")]
    storage: String,

    /// Redis URL for the shared token cache (in-memory if omitted)
    #[arg(long, env = "SELECTEL_REDIS_URL")]
    redis_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, env = "SELECTEL_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List every object in the container
    Ls,
    /// Upload a local file
    Upload { local: PathBuf, remote: String },
    /// Download an object by URL or path
    Download { url: String, local: PathBuf },
    /// Delete an object
    Rm { path: String },
    /// Create a symlink object
    Link { origin: String, link: String },
    /// Print the public URL of an object
    Url { path: String },
    /// List configured storage types
    Types,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("selectel={0},selectel_client={0}", log_level).into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = StorageSettings::load(args.config.as_deref())
        .context("failed to load storage settings")?;

    let store: Arc<dyn TokenStore> = match &args.redis_url {
        Some(url) => {
            tracing::info!("Caching tokens in Redis");
            Arc::new(
                RedisTokenStore::connect(url)
                    .await
                    .context("failed to connect to Redis")?,
            )
        }
        None => Arc::new(MemoryTokenStore::new()),
    };

    let registry = ClientRegistry::new(settings, store)?;
    commands::execute(&registry, &args.storage, args.command).await
}
