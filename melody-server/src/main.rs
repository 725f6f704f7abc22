//! melody-server - Music library and audio relay
//!
//! Serves the playlist/song JSON API, uploaded media, and the streaming
//! relay for allow-listed remote audio.

use anyhow::{Context, Result};
use clap::Parser;
use melody_common::config::load_toml_config;
use melody_common::db::{init_database, seed_demo_library};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use melody_server::config::{Args, ServerConfig};
use melody_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "melody_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting Melody server (melody-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config =
        ServerConfig::resolve(&args, &toml_config).context("Invalid configuration")?;

    info!("Root folder: {}", config.root_folder.display());
    std::fs::create_dir_all(&config.root_folder).with_context(|| {
        format!(
            "Failed to create root folder {}",
            config.root_folder.display()
        )
    })?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if config.seed {
        seed_demo_library(&pool)
            .await
            .context("Failed to seed demo library")?;
    }

    if config.proxy_allowed_hosts.is_empty() {
        warn!("No proxy hosts configured; the audio relay will refuse every request");
    } else {
        info!(
            "Audio relay allows: {}",
            config.proxy_allowed_hosts.join(", ")
        );
    }

    let state = AppState::new(pool, &config).context("Failed to build application state")?;
    std::fs::create_dir_all(state.media.root()).with_context(|| {
        format!(
            "Failed to create media folder {}",
            state.media.root().display()
        )
    })?;

    let app = build_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("melody-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
