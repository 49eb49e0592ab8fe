//! Gateway Monitor - SMS Gateway Status Dashboard
//!
//! Polls the `status.xml` page of a fleet of SMS gateway instances and
//! serves a summarized status dashboard.

mod admin;
mod aggregate;
mod config;
mod fetch;
mod poller;
mod status;
mod web;

use config::ServerConfig;
use fetch::HttpFetcher;
use poller::{Poller, ReportCache};
use web::Server;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("gateway_monitor=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting Gateway Monitor on port {}...", cfg.http_port);
    tracing::info!("Using instance list at {}", cfg.instances_path);

    let instances = config::load_instances(&cfg.instances_path)?;

    // Create poller
    let timeout = Duration::from_secs(cfg.fetch_timeout_secs);
    let fetcher = HttpFetcher::new(timeout)?;
    let cache = Arc::new(ReportCache::new());
    let poller = Arc::new(Poller::new(instances, fetcher, timeout, cache)?);
    for instance in poller.instances() {
        tracing::info!("Monitoring {} at {}", instance.name, instance.base_url);
    }

    // Start polling
    poller.start(Duration::from_secs(cfg.refresh_secs)).await;

    // Start web server
    let server = Server::new(cfg, poller.clone());
    let result = server.start().await;

    poller.stop().await;
    result
}
