//! F5-TTS Voice Cloning Server
//!
//! HTTP wrapper around the F5-TTS Python pipeline: upload a reference clip
//! and target text, get back a WAV in the reference voice.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared::config;

use f5tts_server::http::{router, AppState};
use f5tts_server::tts::{F5Engine, CKPT_FILE, CKPT_REPO};

// Use jemalloc for better memory allocation performance
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    match dotenvy::from_filename(".env") {
        Ok(path) => eprintln!("Loaded environment from: {}", path.display()),
        Err(e) if e.not_found() => eprintln!("No .env file found (this is OK)"),
        Err(e) => eprintln!("Warning: Could not load .env: {}", e),
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "f5tts_server=info,tower_http=info".into()),
        )
        .init();

    // Initialize Prometheus metrics
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    info!("Prometheus metrics recorder installed");

    // Load models before accepting any traffic; failure here is fatal.
    info!("Loading vocoder and acoustic model, this may take a moment...");
    let engine = F5Engine::load()?;
    info!("Models loaded");

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
        model: Some(format!("{}/{}", CKPT_REPO, CKPT_FILE)),
    });

    // Build router
    let app = router(state).route("/metrics", get(move || std::future::ready(handle.render())));

    let addr = SocketAddr::from(([0, 0, 0, 0], config::DEFAULT_PORT));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
