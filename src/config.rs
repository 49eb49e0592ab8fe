//! Configuration module for the gateway monitor.
//!
//! Server settings come from environment variables with sensible defaults;
//! the monitored instances are listed, in display order, in a JSON file.

use std::env;
use std::path::Path;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read instance file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid instance file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no gateway instances configured")]
    NoInstances,
    #[error("invalid base URL for instance {name}: {reason}")]
    InvalidUrl { name: String, reason: String },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the instance list (default: "instances.json")
    pub instances_path: String,
    /// Poll interval and default page refresh, in seconds (default: 60)
    pub refresh_secs: u64,
    /// Per-instance fetch timeout, in seconds (default: 10)
    pub fetch_timeout_secs: u64,
    /// Queue size above which a box queue is highlighted (default: 100)
    pub max_queue: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            instances_path: "instances.json".to_string(),
            refresh_secs: 60,
            fetch_timeout_secs: 10,
            max_queue: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GATEWAY_MONITOR_HTTP_PORT`: HTTP port (default: 8080)
    /// - `GATEWAY_MONITOR_INSTANCES`: instance list path (default: "instances.json")
    /// - `GATEWAY_MONITOR_REFRESH`: poll interval in seconds (default: 60)
    /// - `GATEWAY_MONITOR_FETCH_TIMEOUT`: fetch timeout in seconds (default: 10)
    /// - `GATEWAY_MONITOR_MAX_QUEUE`: queue highlight threshold (default: 100)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Some(port) = env_parse("GATEWAY_MONITOR_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Ok(path) = env::var("GATEWAY_MONITOR_INSTANCES") {
            cfg.instances_path = path;
        }

        if let Some(refresh) = env_parse::<u64>("GATEWAY_MONITOR_REFRESH").filter(|r| *r > 0) {
            cfg.refresh_secs = refresh;
        }

        if let Some(timeout) = env_parse::<u64>("GATEWAY_MONITOR_FETCH_TIMEOUT").filter(|t| *t > 0) {
            cfg.fetch_timeout_secs = timeout;
        }

        if let Some(max_queue) = env_parse("GATEWAY_MONITOR_MAX_QUEUE") {
            cfg.max_queue = max_queue;
        }

        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// One monitored gateway instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub status_password: String,
    #[serde(default, skip_serializing)]
    pub admin_password: String,
}

impl InstanceConfig {
    /// The parsed base URL, without a trailing slash.
    pub fn base(&self) -> Result<Url, ConfigError> {
        Url::parse(self.base_url.trim_end_matches('/')).map_err(|e| ConfigError::InvalidUrl {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }

    /// URL of a resource below the base URL, e.g. `status.xml`.
    pub fn endpoint(&self, resource: &str) -> Result<Url, ConfigError> {
        let mut url = self.base()?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl {
                name: self.name.clone(),
                reason: "base URL cannot have a path".to_string(),
            })?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }

    /// `{base_url}/status.xml?password={status_password}`
    pub fn status_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.endpoint("status.xml")?;
        url.query_pairs_mut()
            .append_pair("password", &self.status_password);
        Ok(url)
    }
}

/// Parse an instance list; order is preserved and the list must not be empty.
pub fn parse_instances(json: &str) -> Result<Vec<InstanceConfig>, ConfigError> {
    let instances: Vec<InstanceConfig> = serde_json::from_str(json)?;
    if instances.is_empty() {
        return Err(ConfigError::NoInstances);
    }
    for instance in &instances {
        instance.endpoint("status.xml")?;
    }
    Ok(instances)
}

/// Load the instance list from a JSON file.
pub fn load_instances<P: AsRef<Path>>(path: P) -> Result<Vec<InstanceConfig>, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    parse_instances(&json)
}
