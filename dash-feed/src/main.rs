//! dash-feed - department dashboard data feed
//!
//! Polls the five department sources and serves their views on
//! `127.0.0.1:5740` by default.

use anyhow::Result;
use clap::Parser;
use dash_common::config::{cache_dir, load_or_default, RootFolderResolver};
use dash_common::{logging, CacheStore, EventBus, FileStore};
use dash_feed::api::BUILD;
use dash_feed::{build_router, AppState, Dashboard};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Event bus capacity; slow SSE clients drop the oldest events beyond this
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "dash-feed", version, about = "Department dashboard data feed")]
struct Cli {
    /// TOML config file
    #[arg(long, env = "DASH_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for the durable cache
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Serve cached data only, never poll
    #[arg(long)]
    no_poll: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref(), "dash-feed");

    logging::init(&config.logging)?;

    // Build identification first, before any network activity
    info!("Starting dash-feed {}", BUILD);

    let root_folder = RootFolderResolver::new("dash-feed").resolve(cli.root_folder.as_deref(), &config);
    let store = FileStore::open(cache_dir(&root_folder))?;
    info!("Cache directory: {}", store.dir().display());
    let cache = Arc::new(CacheStore::new(store));

    let dashboard = Arc::new(Dashboard::new(&config, cache, EventBus::new(EVENT_CAPACITY))?);

    // Shut down after the server stops; dropping a handle also stops its poller
    let poll_handles = if cli.no_poll {
        info!("Polling disabled (--no-poll), serving cached data only");
        Vec::new()
    } else {
        dashboard.start_polling()
    };

    let state = AppState::new(Arc::clone(&dashboard));
    let shutdown = state.shutdown_token();
    let app = build_router(state);

    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("dash-feed listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    for handle in poll_handles {
        handle.shutdown().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
