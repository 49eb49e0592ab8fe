//! Fleet-wide aggregation of per-instance status.

use serde::Serialize;

use crate::status::{GatewayStatus, LinkState};

/// A traffic column of the summary table.
#[derive(Debug, Clone, Copy)]
pub struct TrafficColumn {
    pub label: &'static str,
    pub path: &'static str,
    /// Decimal places used for display.
    pub decimals: usize,
}

pub const TRAFFIC_COLUMNS: [TrafficColumn; 10] = [
    TrafficColumn { label: "Received (MO)", path: "sms/received/total", decimals: 0 },
    TrafficColumn { label: "Received (DLR)", path: "dlr/received/total", decimals: 0 },
    TrafficColumn { label: "Inbound (MO)", path: "sms/inbound", decimals: 2 },
    TrafficColumn { label: "Inbound (DLR)", path: "dlr/inbound", decimals: 2 },
    TrafficColumn { label: "Sent (MT)", path: "sms/sent/total", decimals: 0 },
    TrafficColumn { label: "Sent (DLR)", path: "dlr/sent/total", decimals: 0 },
    TrafficColumn { label: "Outbound (MT)", path: "sms/outbound", decimals: 2 },
    TrafficColumn { label: "Outbound (DLR)", path: "dlr/outbound", decimals: 2 },
    TrafficColumn { label: "Queued (MO)", path: "sms/received/queued", decimals: 0 },
    TrafficColumn { label: "Queued (MT)", path: "sms/sent/queued", decimals: 0 },
];

/// Labels of the link columns: the links total, then one per state.
pub const LINK_COLUMNS: [&str; 7] = [
    "Links",
    "Online",
    "Disconnected",
    "Connecting",
    "Re-Connecting",
    "Dead",
    "Unknown",
];

pub const TOTAL_ROW_NAME: &str = "Total";

/// One row of the fleet summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub instance: String,
    /// False when the instance produced no status this cycle.
    pub available: bool,
    pub traffic: [f64; 10],
    pub links: [usize; 7],
}

impl SummaryRow {
    fn empty(instance: &str, available: bool) -> Self {
        Self {
            instance: instance.to_string(),
            available,
            traffic: [0.0; 10],
            links: [0; 7],
        }
    }

    fn from_status(instance: &str, status: Option<&GatewayStatus>) -> Self {
        let Some(status) = status else {
            return Self::empty(instance, false);
        };

        let mut row = Self::empty(instance, true);
        for (value, column) in row.traffic.iter_mut().zip(TRAFFIC_COLUMNS.iter()) {
            *value = status.lookup(column.path);
        }

        let census = status.census();
        row.links[0] = census.total();
        for (slot, state) in row.links[1..].iter_mut().zip(LinkState::ALL) {
            *slot = census.count(state);
        }
        row
    }

    fn accumulate(&mut self, other: &SummaryRow) {
        for (sum, v) in self.traffic.iter_mut().zip(other.traffic.iter()) {
            *sum += v;
        }
        for (sum, v) in self.links.iter_mut().zip(other.links.iter()) {
            *sum += v;
        }
    }
}

/// Per-instance rows in configured order, plus the fleet total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub rows: Vec<SummaryRow>,
    pub total: SummaryRow,
}

/// Fold instance results into summary rows.
///
/// Instances without a status contribute an all-zero row; the row count
/// always equals the number of instances given.
pub fn aggregate<'a, I>(instances: I) -> FleetSummary
where
    I: IntoIterator<Item = (&'a str, Option<&'a GatewayStatus>)>,
{
    let rows: Vec<SummaryRow> = instances
        .into_iter()
        .map(|(name, status)| SummaryRow::from_status(name, status))
        .collect();

    let mut total = SummaryRow::empty(TOTAL_ROW_NAME, true);
    for row in &rows {
        total.accumulate(row);
    }

    FleetSummary { rows, total }
}
