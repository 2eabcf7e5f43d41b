//! Chirpy - short-post service
//! Mission: Serve chirps behind password, JWT and refresh-token auth

use anyhow::{Context, Result};
use chirpy_backend::{
    api::{self, AppState},
    config::{Config, Platform},
    db::SqliteStore,
};
use clap::Parser;
use dotenv::dotenv;
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chirpy")]
#[command(about = "Chirpy API server")]
struct Args {
    /// SQLite database path
    #[arg(long, env = "DB_PATH")]
    db: Option<String>,

    /// Listen address
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// Deployment platform, `dev` or `prod`
    #[arg(long, env = "PLATFORM")]
    platform: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let args = Args::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(platform) = args.platform {
        config.platform = Platform::parse(&platform);
    }

    info!("Chirpy starting");
    info!(config = ?config, "Configuration loaded");

    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .with_context(|| format!("Failed to open database at {}", config.database_path))?,
    );
    info!("Database initialized at: {}", config.database_path);

    let state = AppState::new(&config, store)?;
    let app = api::router(state, &config.filepath_root);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with an env-overridable filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirpy_backend=debug,chirpy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
