//! Poller that fetches every instance once per cycle and aggregates the results.

use crate::aggregate::{aggregate, FleetSummary};
use crate::config::{ConfigError, InstanceConfig};
use crate::fetch::{fetch_with_timeout, FetchError, Fetcher};
use crate::status::{parse_status_document, GatewayStatus, LinkCensus, StatusError};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinSet;

/// Why an instance has no status this cycle.
#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Malformed(#[from] StatusError),
    #[error("invalid instance configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The outcome of one instance in one cycle.
#[derive(Debug)]
pub struct InstanceReport {
    pub instance: InstanceConfig,
    pub outcome: Result<GatewayStatus, PollError>,
    pub census: LinkCensus,
}

impl InstanceReport {
    fn new(instance: InstanceConfig, outcome: Result<GatewayStatus, PollError>) -> Self {
        let census = outcome
            .as_ref()
            .map(GatewayStatus::census)
            .unwrap_or_default();
        Self {
            instance,
            outcome,
            census,
        }
    }

    pub fn status(&self) -> Option<&GatewayStatus> {
        self.outcome.as_ref().ok()
    }
}

/// Everything one poll cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    pub polled_at: DateTime<Utc>,
    pub instances: Vec<InstanceReport>,
    pub summary: FleetSummary,
}

impl CycleReport {
    /// Build a report from per-instance outcomes, in configured order.
    pub fn from_outcomes(
        polled_at: DateTime<Utc>,
        outcomes: Vec<(InstanceConfig, Result<GatewayStatus, PollError>)>,
    ) -> Self {
        let instances: Vec<InstanceReport> = outcomes
            .into_iter()
            .map(|(instance, outcome)| InstanceReport::new(instance, outcome))
            .collect();
        let summary = aggregate(
            instances
                .iter()
                .map(|r| (r.instance.name.as_str(), r.status())),
        );
        Self {
            polled_at,
            instances,
            summary,
        }
    }
}

/// The most recent completed cycle, shared with the web layer.
#[derive(Default)]
pub struct ReportCache {
    latest: RwLock<Option<Arc<CycleReport>>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn latest(&self) -> Option<Arc<CycleReport>> {
        self.latest.read().await.clone()
    }

    pub async fn publish(&self, report: CycleReport) -> Arc<CycleReport> {
        let report = Arc::new(report);
        *self.latest.write().await = Some(report.clone());
        report
    }
}

/// Polls a fixed, ordered set of gateway instances.
pub struct Poller<F: Fetcher> {
    instances: Arc<Vec<InstanceConfig>>,
    fetcher: Arc<F>,
    timeout: Duration,
    cache: Arc<ReportCache>,
    /// Held while a cycle runs and is published.
    cycle: Mutex<()>,
    stop: Mutex<Option<broadcast::Sender<()>>>,
}

impl<F: Fetcher> Poller<F> {
    /// Create a poller; an empty instance list is a configuration error.
    pub fn new(
        instances: Vec<InstanceConfig>,
        fetcher: F,
        timeout: Duration,
        cache: Arc<ReportCache>,
    ) -> Result<Self, ConfigError> {
        if instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }
        Ok(Self {
            instances: Arc::new(instances),
            fetcher: Arc::new(fetcher),
            timeout,
            cache,
            cycle: Mutex::new(()),
            stop: Mutex::new(None),
        })
    }

    pub fn instances(&self) -> &[InstanceConfig] {
        &self.instances
    }

    /// Run one cycle: fetch all instances concurrently, then aggregate.
    pub async fn poll_once(&self) -> CycleReport {
        let polled_at = Utc::now();
        let mut bodies = self.fetch_all().await;

        let outcomes = self
            .instances
            .iter()
            .zip(bodies.iter_mut())
            .map(|(instance, body)| {
                let outcome = match body.take() {
                    Some(Ok(body)) => parse_status_document(&body).map_err(PollError::from),
                    Some(Err(e)) => Err(e),
                    None => Err(PollError::Fetch(FetchError::Network(
                        "fetch task did not complete".to_string(),
                    ))),
                };
                if let Err(e) = &outcome {
                    tracing::warn!("Instance {} unavailable: {}", instance.name, e);
                }
                (instance.clone(), outcome)
            })
            .collect();

        let report = CycleReport::from_outcomes(polled_at, outcomes);
        let available = report.instances.iter().filter(|r| r.status().is_some()).count();
        tracing::info!(
            "Poll cycle complete: {}/{} instances available",
            available,
            report.instances.len()
        );
        report
    }

    /// Run one cycle and publish it to the cache.
    pub async fn refresh(&self) -> Arc<CycleReport> {
        let _cycle = self.cycle.lock().await;
        let report = self.poll_once().await;
        self.cache.publish(report).await
    }

    /// The last published cycle, running one if none exists yet.
    ///
    /// Concurrent callers on an empty cache wait for a single cycle.
    pub async fn current(&self) -> Arc<CycleReport> {
        if let Some(report) = self.cache.latest().await {
            return report;
        }

        let _cycle = self.cycle.lock().await;
        if let Some(report) = self.cache.latest().await {
            return report;
        }
        let report = self.poll_once().await;
        self.cache.publish(report).await
    }

    /// Fetch every instance on its own task; results are indexed by position.
    async fn fetch_all(&self) -> Vec<Option<Result<Vec<u8>, PollError>>> {
        let mut results: Vec<Option<Result<Vec<u8>, PollError>>> =
            (0..self.instances.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (idx, instance) in self.instances.iter().enumerate() {
            let url = match instance.status_url() {
                Ok(url) => url,
                Err(e) => {
                    results[idx] = Some(Err(PollError::from(e)));
                    continue;
                }
            };
            let fetcher = self.fetcher.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = fetch_with_timeout(fetcher.as_ref(), url.as_str(), timeout).await;
                (idx, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result.map_err(PollError::from)),
                Err(e) => tracing::error!("Fetch task failed: {}", e),
            }
        }

        results
    }
}

impl<F: Fetcher> Poller<F> {
    /// Start polling in the background, one cycle per `interval`.
    pub async fn start(self: &Arc<Self>, interval: Duration) {
        let (tx, mut rx) = broadcast::channel(1);
        *self.stop.lock().await = Some(tx);

        tracing::info!(
            "Starting poller with {} instances every {:?}",
            self.instances.len(),
            interval
        );

        let poller = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = ticker.tick() => {
                        poller.refresh().await;
                    }
                }
            }
        });
    }

    /// Stop the background loop.
    pub async fn stop(&self) {
        let stop = self.stop.lock().await;
        if let Some(tx) = stop.as_ref() {
            let _ = tx.send(());
        }
    }
}
