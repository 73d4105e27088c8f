//! audioform - audio-guided intake form service
//!
//! Serves the tenant form pages, the wizard API, the two audio clips and the
//! reporting dashboard from one process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use audioform_common::config::{self, StoreKind, TomlConfig};
use audioform_common::db::init_database;
use audioform_server::store::{MemoryStore, RestStore, SqliteStore, SubmissionStore};
use audioform_server::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for audioform
#[derive(Parser, Debug)]
#[command(name = "audioform")]
#[command(about = "Audio-guided intake form service")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "AUDIOFORM_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "AUDIOFORM_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "AUDIOFORM_BIND")]
    bind: Option<String>,

    /// SQLite database file (sqlite store)
    #[arg(short, long, env = "AUDIOFORM_DATABASE")]
    database: Option<PathBuf>,

    /// Directory holding intro.mp3 and employment.mp3
    #[arg(long, env = "AUDIOFORM_AUDIO_DIR")]
    audio_dir: Option<PathBuf>,

    /// Submission store: sqlite, rest or memory
    #[arg(long, env = "AUDIOFORM_STORE")]
    store: Option<StoreKind>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "AUDIOFORM_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(self, mut config: TomlConfig) -> TomlConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(database) = self.database {
            config.database_path = Some(database);
        }
        if let Some(audio_dir) = self.audio_dir {
            config.audio_dir = audio_dir;
        }
        if let Some(kind) = self.store {
            config.store.kind = kind;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_arg = args.config.clone();
    let config = config::load_config(config_arg.as_deref()).context("Failed to load config")?;
    let config = args.apply(config);
    config.validate().context("Invalid configuration")?;

    // Initialize tracing; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "audioform={level},audioform_server={level},audioform_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting audioform v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match config::resolve_config_path(config_arg.as_deref()) {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    let store = open_store(&config).await?;
    info!("Submission store: {}", store.name());

    if !config.audio_dir.is_dir() {
        warn!(
            "Audio directory {} does not exist; clips will 404",
            config.audio_dir.display()
        );
    }
    if config.dashboard_token.as_deref().map_or(true, str::is_empty) {
        warn!("No dashboard_token configured; reporting API is unauthenticated");
    }

    let state = AppState::from_config(&config, store);
    info!("Serving {} tenant route(s)", state.tenants.len());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("audioform listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Construct the configured submission store
async fn open_store(config: &TomlConfig) -> Result<Arc<dyn SubmissionStore>> {
    let table = &config.store.table;
    let store: Arc<dyn SubmissionStore> = match config.store.kind {
        StoreKind::Sqlite => {
            let db_path = config.database_path();
            info!("Database path: {}", db_path.display());
            let pool = init_database(&db_path, table)
                .await
                .context("Failed to open database")?;
            Arc::new(SqliteStore::new(pool, table).context("Failed to open sqlite store")?)
        }
        StoreKind::Rest => {
            let url = config
                .store
                .url
                .as_deref()
                .context("store.url is required for the rest store")?;
            info!("Store endpoint: {}", url);
            Arc::new(
                RestStore::new(url, config.store.api_key.clone(), table)
                    .context("Failed to configure rest store")?,
            )
        }
        StoreKind::Memory => {
            warn!("Using in-memory store; submissions are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
