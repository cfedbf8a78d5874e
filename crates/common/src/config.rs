//! Poller configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the configured location is turned into a search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBy {
    /// Search by `"latitude,longitude"`.
    #[default]
    LatLong,
    /// Search by free-text place name.
    Name,
}

/// Top-level poller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default)]
    pub search_by: SearchBy,

    /// Latitude used when searching by coordinates.
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Longitude used when searching by coordinates.
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Place name used when searching by name.
    #[serde(default = "default_location")]
    pub location: String,

    /// Minutes between the end of one poll cycle and the start of the next (1-120).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,

    /// Log full payloads and error detail.
    #[serde(default)]
    pub verbose: bool,
}

impl PollerConfig {
    /// The term sent as `search=` to the location search endpoint.
    pub fn search_term(&self) -> String {
        match self.search_by {
            SearchBy::Name => self.location.trim().to_string(),
            SearchBy::LatLong => format!("{},{}", self.latitude, self.longitude),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_minutes.saturating_mul(60_000))
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_latitude() -> f64 {
    -37.3568
}
fn default_longitude() -> f64 {
    144.5274
}
fn default_location() -> String {
    "Adelaide".into()
}
fn default_poll_interval() -> u64 {
    5
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            search_by: SearchBy::default(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            location: default_location(),
            poll_interval_minutes: default_poll_interval(),
            verbose: false,
        }
    }
}
