//! Normalized gateway status types.

use serde::Serialize;

use super::census::{classify, LinkCensus};
use super::metric::{Load, Metric};
use super::uptime::StatusLine;

/// A `received` or `sent` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Counter {
    pub total: Metric,
    pub queued: Metric,
}

impl Counter {
    /// A path ending at the counter itself resolves to its total.
    fn lookup(&self, field: Option<&str>) -> f64 {
        match field {
            None | Some("total") => self.total.value(),
            Some("queued") => self.queued.value(),
            Some(_) => 0.0,
        }
    }
}

/// Counters of one traffic section (`wdp`, `sms` or `dlr`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficCounters {
    pub received: Counter,
    pub sent: Counter,
    pub inbound: Load,
    pub outbound: Load,
    /// Section-level queue (`dlr/queued`).
    pub queued: Metric,
    /// Store size (`sms/storesize`).
    pub store_size: Metric,
    /// Storage backend name (`dlr/storage`).
    pub storage: Option<String>,
}

impl TrafficCounters {
    fn lookup<'a>(&self, mut segments: impl Iterator<Item = &'a str>) -> f64 {
        let head = segments.next();
        let field = segments.next();
        if segments.next().is_some() {
            return 0.0;
        }
        match (head, field) {
            (Some("received"), field) => self.received.lookup(field),
            (Some("sent"), field) => self.sent.lookup(field),
            (Some("inbound"), None) => self.inbound.value(),
            (Some("outbound"), None) => self.outbound.value(),
            (Some("queued"), None) => self.queued.value(),
            (Some("storesize"), None) => self.store_size.value(),
            _ => 0.0,
        }
    }
}

/// A box (smsbox, wapbox, ...) attached to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoxInfo {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub ip: Option<String>,
    pub queued: Metric,
    pub status: StatusLine,
    pub ssl: Option<String>,
}

/// One SMSC link.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmscInfo {
    pub id: Option<String>,
    pub admin_id: Option<String>,
    pub name: Option<String>,
    pub raw_status: Option<String>,
    pub status: StatusLine,
    pub sms_received: Metric,
    pub sms_sent: Metric,
    pub dlr_received: Metric,
    pub dlr_sent: Metric,
    pub failed: Metric,
    pub queued: Metric,
}

impl SmscInfo {
    /// First whitespace-delimited token of the raw status.
    pub fn status_word(&self) -> Option<&str> {
        self.raw_status.as_deref()?.split_whitespace().next()
    }

    /// The parsed state, falling back to the status word, then `-`.
    pub fn state(&self) -> &str {
        match &self.status {
            StatusLine::Parsed { state, .. } => state,
            StatusLine::Unrecognized => self.status_word().unwrap_or("-"),
        }
    }
}

/// The normalized status report of one gateway instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GatewayStatus {
    pub raw_status: Option<String>,
    pub status: StatusLine,
    pub version: Option<String>,
    pub wdp: TrafficCounters,
    pub sms: TrafficCounters,
    pub dlr: TrafficCounters,
    pub boxes: Vec<BoxInfo>,
    pub smscs: Vec<SmscInfo>,
}

impl GatewayStatus {
    pub fn overall_state(&self) -> &str {
        self.status.state()
    }

    /// Resolve a slash-separated path such as `sms/received/total`.
    ///
    /// Unknown or missing segments resolve to `0.0`.
    pub fn lookup(&self, path: &str) -> f64 {
        let mut segments = path.split('/');
        let section = match segments.next() {
            Some("wdp") => &self.wdp,
            Some("sms") => &self.sms,
            Some("dlr") => &self.dlr,
            _ => return 0.0,
        };
        section.lookup(segments)
    }

    pub fn census(&self) -> LinkCensus {
        classify(&self.smscs)
    }
}
