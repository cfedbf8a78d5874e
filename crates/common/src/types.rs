//! Domain types shared across the poller.
//!
//! Field names follow the BOM API JSON so the structs deserialize directly.
//!
//! `Option` fields marked `#[serde(default)]` may be absent or null. The ones
//! using `Option::deserialize` must be present, though they may be null.

use serde::{Deserialize, Serialize};

// ── Locations ─────────────────────────────────────────────────────────

/// A search result from `GET /locations?search=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// 7-character geohash identifying the location.
    pub geohash: String,
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "Option::deserialize")]
    pub postcode: Option<String>,
    pub state: String,
}

impl Location {
    /// The location used before any search has succeeded.
    pub fn woodend() -> Self {
        Self {
            geohash: "r1qg2z3".into(),
            id: "Woodend-r1qg2z3".into(),
            name: "Woodend".into(),
            postcode: None,
            state: "VIC".into(),
        }
    }
}

/// Extended metadata from `GET /locations/{geohash}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInformation {
    /// 6 or 7 characters.
    pub geohash: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub marine_area_id: Option<String>,
    #[serde(default)]
    pub tidal_point: Option<String>,
    pub id: String,
    pub name: String,
    pub state: String,
}

impl Default for LocationInformation {
    fn default() -> Self {
        Self {
            geohash: "r1qg2z3".into(),
            timezone: String::new(),
            latitude: -37.3568,
            longitude: 144.5274,
            marine_area_id: None,
            tidal_point: None,
            id: "Woodend-r1qg2z3".into(),
            name: "Woodend".into(),
            state: "VIC".into(),
        }
    }
}

// ── Forecasts ─────────────────────────────────────────────────────────

/// One period (day or hour) of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub rain: RainForecast,
    pub uv: UvForecast,
    pub astronomical: Astronomical,
    pub fire_danger_category: FireDangerCategory,
    #[serde(default)]
    pub now: Option<NowSnapshot>,
    pub date: String,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub extended_text: Option<String>,
    pub short_text: String,
    pub icon_descriptor: String,
    #[serde(default)]
    pub fire_danger: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub surf_danger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainForecast {
    pub amount: RainAmount,
    #[serde(default)]
    pub chance: Option<f64>,
    pub chance_of_no_rain_category: String,
    pub precipitation_amount_25_percent_chance: f64,
    pub precipitation_amount_50_percent_chance: f64,
    pub precipitation_amount_75_percent_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainAmount {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvForecast {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub max_index: Option<f64>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astronomical {
    pub sunrise_time: String,
    pub sunset_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireDangerCategory {
    #[serde(deserialize_with = "Option::deserialize")]
    pub text: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub default_colour: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub dark_mode_colour: Option<String>,
}

/// Present only on the first period of a daily forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowSnapshot {
    pub is_night: bool,
    pub now_label: String,
    pub later_label: String,
    pub temp_now: f64,
    pub temp_later: f64,
}

// ── Observations ──────────────────────────────────────────────────────

/// Current conditions from `GET /locations/{geohash6}/observations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub temp_feels_like: Option<f64>,
    #[serde(default)]
    pub rain_since_9am: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub gust: Option<Gust>,
    #[serde(default)]
    pub station: Option<Station>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed_kilometre: Option<f64>,
    #[serde(default)]
    pub speed_knot: Option<f64>,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gust {
    #[serde(default)]
    pub speed_kilometre: Option<f64>,
    #[serde(default)]
    pub speed_knot: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub bom_id: String,
    pub name: String,
    pub distance: f64,
}

// ── Warnings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub id: String,
    #[serde(rename = "type")]
    pub warning_type: String,
    pub title: String,
    pub short_title: String,
    pub state: String,
    pub warning_group_type: String,
    pub issue_time: String,
    pub expiry_time: String,
    pub phase: String,
}

// ── Response envelopes ────────────────────────────────────────────────

/// Every BOM response wraps its payload in `{ "metadata": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<D, M = Metadata> {
    pub metadata: M,
    pub data: D,
}

/// Metadata carrying the server's response timestamp.
pub trait ResponseMetadata {
    fn response_timestamp(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metadata {
    pub response_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchMetadata {
    pub response_timestamp: String,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastMetadata {
    pub response_timestamp: String,
    pub issue_time: String,
    pub next_issue_time: String,
    pub forecast_region: String,
    pub forecast_type: String,
    pub copyright: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObservationMetadata {
    pub response_timestamp: String,
    pub issue_time: String,
}

impl ResponseMetadata for Metadata {
    fn response_timestamp(&self) -> &str {
        &self.response_timestamp
    }
}

impl ResponseMetadata for SearchMetadata {
    fn response_timestamp(&self) -> &str {
        &self.response_timestamp
    }
}

impl ResponseMetadata for ForecastMetadata {
    fn response_timestamp(&self) -> &str {
        &self.response_timestamp
    }
}

impl ResponseMetadata for ObservationMetadata {
    fn response_timestamp(&self) -> &str {
        &self.response_timestamp
    }
}

pub type SearchResponse = Envelope<Vec<Location>, SearchMetadata>;
pub type LocationInformationResponse = Envelope<LocationInformation>;
pub type ForecastResponse = Envelope<Vec<ForecastItem>, ForecastMetadata>;
pub type ObservationResponse = Envelope<Observation, ObservationMetadata>;
pub type WarningResponse = Envelope<Vec<Warning>>;

// ── Status ────────────────────────────────────────────────────────────

/// Connection health as shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Ok,
    Connecting,
    Disconnected,
    ConnectionFailure,
    BadConfig,
    UnknownWarning,
}

/// A health value paired with an optional message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: InstanceStatus,
    pub message: Option<String>,
}

impl Status {
    pub fn new(status: InstanceStatus, message: Option<&str>) -> Self {
        Self {
            status,
            message: message.map(str::to_string),
        }
    }
}
