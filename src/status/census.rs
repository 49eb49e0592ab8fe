//! SMSC link census by connection state.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::model::SmscInfo;

/// Placeholder used for links without an admin-id.
const MISSING_ADMIN_ID: &str = "-";

/// The connection states a gateway reports for its SMSC links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkState {
    Online,
    Disconnected,
    Connecting,
    ReConnecting,
    Dead,
    Unknown,
}

impl LinkState {
    pub const ALL: [LinkState; 6] = [
        LinkState::Online,
        LinkState::Disconnected,
        LinkState::Connecting,
        LinkState::ReConnecting,
        LinkState::Dead,
        LinkState::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Online => "online",
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::ReConnecting => "re-connecting",
            LinkState::Dead => "dead",
            LinkState::Unknown => "unknown",
        }
    }

    /// Exact, case-sensitive match of a status word.
    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == word)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Admin-ids of SMSC links grouped by state, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkCensus {
    ids: [Vec<String>; 6],
}

impl LinkCensus {
    pub fn count(&self, state: LinkState) -> usize {
        self.ids[state.index()].len()
    }

    pub fn ids(&self, state: LinkState) -> &[String] {
        &self.ids[state.index()]
    }

    /// Space-joined admin-ids, for drill-down display.
    pub fn joined(&self, state: LinkState) -> String {
        self.ids(state).join(" ")
    }

    /// Links counted in any of the six states.
    pub fn total(&self) -> usize {
        self.ids.iter().map(Vec::len).sum()
    }
}

impl Serialize for LinkCensus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Bucket<'a> {
            count: usize,
            admin_ids: &'a [String],
        }

        let mut map = serializer.serialize_map(Some(LinkState::ALL.len()))?;
        for state in LinkState::ALL {
            let ids = self.ids(state);
            map.serialize_entry(
                state.as_str(),
                &Bucket {
                    count: ids.len(),
                    admin_ids: ids,
                },
            )?;
        }
        map.end()
    }
}

/// Count SMSC links by the first word of their status.
///
/// Links whose status word is not one of the six known states, or that have
/// no status at all, are left out of every bucket.
pub fn classify(smscs: &[SmscInfo]) -> LinkCensus {
    let mut census = LinkCensus::default();
    for smsc in smscs {
        let Some(state) = smsc.status_word().and_then(LinkState::from_word) else {
            continue;
        };
        let admin_id = smsc
            .admin_id
            .clone()
            .unwrap_or_else(|| MISSING_ADMIN_ID.to_string());
        census.ids[state.index()].push(admin_id);
    }
    census
}
