//! Web server module.

mod format;
mod handlers;
mod render;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::fetch::HttpFetcher;
use crate::poller::{CycleReport, Poller};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub poller: Arc<Poller<HttpFetcher>>,
}

impl AppState {
    /// The last published cycle, or a fresh one if nothing was polled yet.
    pub async fn current_report(&self) -> Arc<CycleReport> {
        self.poller.current().await
    }
}

/// Web server for the gateway monitor.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, poller: Arc<Poller<HttpFetcher>>) -> Self {
        Self {
            state: AppState { config, poller },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Dashboard
            .route("/", get(handlers::handle_dashboard))
            // API endpoints
            .route("/api/report", get(handlers::handle_get_report))
            .route("/api/summary", get(handlers::handle_get_summary))
            .route("/api/poll", post(handlers::handle_poll))
            // Static assets
            .route("/assets/{*path}", get(handlers::handle_asset))
            .route("/favicon.ico", get(handlers::handle_favicon))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
