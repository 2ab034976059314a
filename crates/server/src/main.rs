//! Shadow entry point
//!
//! Loads settings, initializes tracing and metrics, builds the assistant
//! and runs either the interactive CLI or the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use shadow_agent::Assistant;
use shadow_config::{load_settings, ServerMode, Settings};
use shadow_server::{cli, create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("SHADOW_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing is not initialized yet
            eprintln!("Warning: failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = env.as_deref().unwrap_or("default"),
        mode = ?settings.server.mode,
        "Starting Shadow"
    );

    let metrics = if settings.observability.metrics_enabled {
        init_metrics()
    } else {
        None
    };

    let assistant = Arc::new(
        Assistant::from_settings(settings.clone()).context("failed to build the assistant")?,
    );

    match settings.server.mode {
        ServerMode::Cli => {
            cli::run_repl(assistant, &settings.assistant.name).await?;
        }
        ServerMode::Http => {
            let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
                .parse()
                .context("invalid server.host / server.port")?;

            let mut state = AppState::new(assistant, settings);
            if let Some(handle) = metrics {
                state = state.with_metrics(handle);
            }
            let app = create_router(state);

            tracing::info!("Listening on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

/// Tracing to stderr (stdout belongs to the REPL); `RUST_LOG` overrides the
/// configured level
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        ["shadow", "shadow_server", "shadow_agent", "shadow_llm", "shadow_tools", "shadow_text_processing"]
            .iter()
            .map(|target| format!("{}={}", target, level))
            .chain(std::iter::once("tower_http=info".to_string()))
            .collect::<Vec<_>>()
            .join(",")
            .into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
