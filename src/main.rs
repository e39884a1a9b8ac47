//! OCR Extractor Server
//!
//! HTTP front end for the document ingestion pipeline.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_extractor::config::Config;
use ocr_extractor::pipeline::Pipeline;
use ocr_extractor::routes;
use ocr_extractor::state::AppState;
use ocr_extractor::upload::WorkspaceManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_extractor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Starting OCR Extractor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Workspace root: {}", config.workspace.root.display());
    tracing::info!(
        "OCR: {} (lang {}, psm {}), rasterizer: {} (scale {})",
        config.ocr.tesseract_path,
        config.ocr.language,
        config.ocr.segmentation.psm(),
        config.raster.pdftoppm_path,
        config.raster.scale_to
    );

    // The scratch area must exist before any job runs
    let workspaces = WorkspaceManager::init(config.workspace.root.clone())
        .await
        .context("Failed to initialize workspace root")?;

    let pipeline = Pipeline::from_config(&config, workspaces);
    if !pipeline.recognizer().engine().is_available().await {
        tracing::warn!(
            "OCR engine '{}' is not available; uploads will fail until it is installed",
            config.ocr.tesseract_path
        );
    }

    let app_state = AppState::new(config.clone(), pipeline);
    let app = routes::app(app_state.clone());

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    tracing::info!("OCR Extractor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    app_state.shutdown().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
