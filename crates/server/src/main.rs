use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use livetrans_server::{build_router, settings::Settings, state::AppState};
use livetrans_translation::TranslationEngine;
use livetrans_translation::translate::google::GoogleTranslateBackend;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!(%e, "Invalid configuration");
            return ExitCode::from(1);
        }
    };

    let backend = match GoogleTranslateBackend::new(
        &settings.google_api_key,
        settings.google_endpoint.as_deref(),
        Duration::from_millis(settings.translation.request_timeout_ms),
    ) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            error!(%e, "Failed to initialize translation backend");
            return ExitCode::from(1);
        }
    };

    let engine = TranslationEngine::new(backend, settings.translation.clone());
    let state = AppState {
        settings: Arc::new(settings),
        engine,
    };

    let listener = match tokio::net::TcpListener::bind(state.settings.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%e, addr = %state.settings.listen_addr, "Failed to bind");
            return ExitCode::from(2);
        }
    };
    info!(addr = %state.settings.listen_addr, "Livetrans server listening");

    let app = build_router(state);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    match result {
        Ok(()) => {
            info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(%e, "Server error");
            ExitCode::from(2)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
