//! Arena server: fans one prompt out to several model backends and streams
//! their completions back side by side over SSE.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod state;

use arena_core::ArenaEngine;
use arena_core::vendors::{AnthropicAdapter, GoogleAdapter, OpenAiAdapter};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Credentials come from the process environment, optionally via .env.
    let _ = dotenvy::dotenv();

    let engine = ArenaEngine::builder()
        .register(Arc::new(AnthropicAdapter::from_env()))
        .register(Arc::new(OpenAiAdapter::from_env()))
        .register(Arc::new(GoogleAdapter::from_env()))
        .build()?;

    let catalog_path =
        PathBuf::from(std::env::var("MODELS_PATH").unwrap_or_else(|_| "models.json".to_string()));
    info!("Model catalogue: {:?}", catalog_path);

    let state = AppState::new(engine, catalog_path);
    let app = api::create_router(state);

    let port = match std::env::var("PORT") {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid PORT='{}', falling back to 3456", raw);
                3456
            }
        },
        Err(_) => 3456,
    };
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Arena running at http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
