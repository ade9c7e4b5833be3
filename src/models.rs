use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Occupancy reported by protocols that know about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub online: u64,
    pub max: u64,
}

/// Why a check was not attempted, or why it ended abnormally.
/// Serializes as a single boolean flag, e.g. `{"skipped": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Disabled,
    Skipped,
    InternalError,
}

impl Marker {
    pub fn flag(self) -> &'static str {
        match self {
            Marker::Disabled => "disabled",
            Marker::Skipped => "skipped",
            Marker::InternalError => "internalError",
        }
    }
}

impl Serialize for Marker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.flag(), &true)?;
        map.end()
    }
}

/// Outcome of one checker invocation. Lives for a single tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub online: bool,
    #[serde(
        rename = "rttMs",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_rtt"
    )]
    pub round_trip: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Players>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub marker: Option<Marker>,
}

impl CheckResult {
    pub fn online(round_trip: Duration) -> Self {
        Self { online: true, round_trip: Some(round_trip), ..Self::default() }
    }

    pub fn offline(round_trip: Option<Duration>) -> Self {
        Self { online: false, round_trip, ..Self::default() }
    }

    pub fn disabled() -> Self {
        Self { marker: Some(Marker::Disabled), ..Self::default() }
    }

    pub fn skipped() -> Self {
        Self { marker: Some(Marker::Skipped), ..Self::default() }
    }

    pub fn internal_error() -> Self {
        Self { marker: Some(Marker::InternalError), ..Self::default() }
    }

    pub fn is_disabled(&self) -> bool {
        self.marker == Some(Marker::Disabled)
    }

    pub fn is_skipped(&self) -> bool {
        self.marker == Some(Marker::Skipped)
    }

    pub fn rtt_ms(&self) -> Option<u64> {
        self.round_trip.map(|d| d.as_millis() as u64)
    }
}

fn serialize_rtt<S: Serializer>(rtt: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match rtt {
        Some(d) => serializer.serialize_u64(d.as_millis() as u64),
        None => serializer.serialize_none(),
    }
}

/// Persisted last-observation state for one target id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub online: bool,
    #[serde(rename = "lastCheckAt")]
    pub last_check_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Players>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Whole persisted state, keyed by target id. Sorted so output is stable.
pub type Snapshot = BTreeMap<String, StatusRecord>;
