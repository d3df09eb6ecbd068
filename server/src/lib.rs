//! HTTP transport over the analytics query service.
//!
//! Handlers only translate requests into `Query` values and serve the
//! envelope the service returns. No analytics are computed here.

use std::time::Duration;

use analytics_core::config::AnalyticsConfig;
use axum::{http::Method, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};

pub mod error;
pub mod routes;
pub mod state;

use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(60 * 60));

    routes::router().layer(cors).with_state(state)
}

pub async fn serve(config: AnalyticsConfig) -> anyhow::Result<()> {
    let state = AppState::new(&config);
    let address = config.server.bind_addr();

    let listener = TcpListener::bind(&address).await?;
    log::info!("Serving {} on {address}", config.database.path);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Cannot listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
