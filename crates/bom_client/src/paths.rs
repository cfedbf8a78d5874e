//! Endpoint templates, relative to the API base URL.
//!
//! Forecast, warning and location lookups take a 7-character geohash;
//! observations are keyed by the 6-character station geohash.

pub const LOCATION_SEARCH: &str = "locations";

/// Trim and cut a geohash to at most `len` characters.
pub fn truncate_geohash(geohash: &str, len: usize) -> &str {
    let trimmed = geohash.trim();
    match trimmed.char_indices().nth(len) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

pub fn location_information(geohash: &str) -> String {
    format!("locations/{}", truncate_geohash(geohash, 7))
}

pub fn forecast_daily(geohash: &str) -> String {
    format!("locations/{}/forecasts/daily", truncate_geohash(geohash, 7))
}

pub fn forecast_hourly(geohash: &str) -> String {
    format!("locations/{}/forecasts/hourly", truncate_geohash(geohash, 7))
}

pub fn observations(geohash: &str) -> String {
    format!("locations/{}/observations", truncate_geohash(geohash, 6))
}

pub fn warnings(geohash: &str) -> String {
    format!("locations/{}/warnings", truncate_geohash(geohash, 7))
}
