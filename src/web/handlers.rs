//! HTTP request handlers.

use super::render::{render_dashboard, DashboardOptions};
use super::AppState;
use crate::aggregate::FleetSummary;
use crate::poller::{CycleReport, InstanceReport};
use crate::status::{GatewayStatus, LinkCensus};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl DashboardQuery {
    /// A positive `refresh` overrides the default; anything else is ignored.
    pub fn refresh_secs(&self, default: u64) -> u64 {
        self.refresh
            .as_deref()
            .and_then(|r| r.trim().parse::<u64>().ok())
            .filter(|r| *r > 0)
            .unwrap_or(default)
    }

    pub fn details(&self) -> bool {
        self.details
            .as_deref()
            .is_some_and(|d| !d.is_empty() && d != "0")
    }
}

pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let report = state.current_report().await;
    let opts = DashboardOptions {
        refresh_secs: query.refresh_secs(state.config.refresh_secs),
        details: query.details(),
        max_queue: state.config.max_queue,
    };

    Html(render_dashboard(&report, &opts))
}

// ============================================================================
// API
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiInstance<'a> {
    pub name: &'a str,
    pub base_url: &'a str,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a GatewayStatus>,
    pub links: &'a LinkCensus,
}

impl<'a> From<&'a InstanceReport> for ApiInstance<'a> {
    fn from(report: &'a InstanceReport) -> Self {
        Self {
            name: &report.instance.name,
            base_url: &report.instance.base_url,
            available: report.status().is_some(),
            error: report.outcome.as_ref().err().map(|e| e.to_string()),
            status: report.status(),
            links: &report.census,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiReport<'a> {
    pub polled_at: DateTime<Utc>,
    pub instances: Vec<ApiInstance<'a>>,
    pub summary: &'a FleetSummary,
}

impl<'a> From<&'a CycleReport> for ApiReport<'a> {
    fn from(report: &'a CycleReport) -> Self {
        Self {
            polled_at: report.polled_at,
            instances: report.instances.iter().map(ApiInstance::from).collect(),
            summary: &report.summary,
        }
    }
}

pub async fn handle_get_report(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.current_report().await;
    Json(ApiReport::from(report.as_ref())).into_response()
}

pub async fn handle_get_summary(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.current_report().await;
    Json(&report.summary).into_response()
}

pub async fn handle_poll(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.poller.refresh().await;
    Json(&report.summary).into_response()
}

// ============================================================================
// Static Assets
// ============================================================================

pub async fn handle_asset(Path(path): Path<String>) -> impl IntoResponse {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                file.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}

pub async fn handle_favicon() -> impl IntoResponse {
    // Return a simple SVG favicon
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
        <rect x="10" y="20" width="80" height="55" rx="10" fill="#3d6e9e"/>
        <path d="M30 75 L30 90 L48 75" fill="#3d6e9e"/>
        <path d="M25 48 L40 48 L48 34 L58 60 L66 48 L78 48" stroke="white" stroke-width="5" fill="none"/>
    </svg>"##;

    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}
