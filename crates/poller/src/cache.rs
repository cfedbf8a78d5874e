//! In-memory state for the poller.
//!
//! Each slot is replaced wholesale, and only with fully validated values,
//! so readers never see a half-updated entity.

use std::collections::HashMap;

use common::{ForecastItem, Location, LocationInformation, Observation, Warning};
use serde::Serialize;
use tokio::sync::RwLock;

/// Search results and the location every fetch is templated on.
pub struct LocationStore {
    catalog: RwLock<HashMap<String, Location>>,
    selected: RwLock<Location>,
}

impl LocationStore {
    pub fn new(initial: Location) -> Self {
        Self {
            catalog: RwLock::new(HashMap::new()),
            selected: RwLock::new(initial),
        }
    }

    /// Replace the catalog with `results`, keyed by geohash, and select the
    /// last result. Returns the new selection; an empty list clears the
    /// catalog and keeps the current selection.
    pub async fn replace_catalog(&self, results: Vec<Location>) -> Option<Location> {
        let mut catalog = self.catalog.write().await;
        let mut selected = self.selected.write().await;

        catalog.clear();
        let mut last = None;
        for location in results {
            catalog.insert(location.geohash.clone(), location.clone());
            last = Some(location);
        }

        if let Some(location) = &last {
            *selected = location.clone();
        }
        last
    }

    /// Select a catalog entry. Unknown geohashes leave the selection alone.
    pub async fn select(&self, geohash: &str) -> Option<Location> {
        let catalog = self.catalog.read().await;
        let location = catalog.get(geohash)?.clone();
        *self.selected.write().await = location.clone();
        Some(location)
    }

    pub async fn selected(&self) -> Location {
        self.selected.read().await.clone()
    }

    pub async fn catalog(&self) -> HashMap<String, Location> {
        self.catalog.read().await.clone()
    }
}

impl Default for LocationStore {
    fn default() -> Self {
        Self::new(Location::woodend())
    }
}

/// An ordered forecast sequence; index 0 is the nearest period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forecast {
    pub items: Vec<ForecastItem>,
    pub issued_at: Option<String>,
}

/// Last-known-good data for the selected location.
#[derive(Default)]
pub struct WeatherStore {
    pub location_info: RwLock<LocationInformation>,
    pub forecast_daily: RwLock<Forecast>,
    pub forecast_hourly: RwLock<Forecast>,
    pub observation: RwLock<Option<Observation>>,
    pub warnings: RwLock<Vec<Warning>>,
    /// `response_timestamp` of the newest accepted response.
    pub most_recent_data: RwLock<String>,
}

impl WeatherStore {
    pub async fn snapshot(&self, location: Location) -> WeatherSnapshot {
        WeatherSnapshot {
            location,
            location_info: self.location_info.read().await.clone(),
            forecast_daily: self.forecast_daily.read().await.clone(),
            forecast_hourly: self.forecast_hourly.read().await.clone(),
            observation: self.observation.read().await.clone(),
            warnings: self.warnings.read().await.clone(),
            most_recent_data: self.most_recent_data.read().await.clone(),
        }
    }

    pub async fn set_most_recent(&self, timestamp: &str) {
        *self.most_recent_data.write().await = timestamp.to_string();
    }
}

/// A consistent copy of everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub location_info: LocationInformation,
    pub forecast_daily: Forecast,
    pub forecast_hourly: Forecast,
    pub observation: Option<Observation>,
    pub warnings: Vec<Warning>,
    pub most_recent_data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(geohash: &str, name: &str) -> Location {
        Location {
            geohash: geohash.into(),
            id: format!("{name}-{geohash}"),
            name: name.into(),
            postcode: None,
            state: "VIC".into(),
        }
    }

    #[tokio::test]
    async fn test_replace_catalog_selects_last() {
        let store = LocationStore::default();
        store.replace_catalog(vec![loc("aaaaaaa", "Old")]).await;

        let selected = store
            .replace_catalog(vec![loc("r1r0gnd", "Ballarat"), loc("r1qg2z3", "Woodend")])
            .await;

        assert_eq!(selected.map(|l| l.name), Some("Woodend".to_string()));
        let catalog = store.catalog().await;
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.contains_key("aaaaaaa"));
        for (key, value) in &catalog {
            assert_eq!(key, &value.geohash);
        }
    }

    #[tokio::test]
    async fn test_empty_results_keep_selection() {
        let store = LocationStore::default();
        store.replace_catalog(vec![loc("r1r0gnd", "Ballarat")]).await;

        assert!(store.replace_catalog(Vec::new()).await.is_none());
        assert!(store.catalog().await.is_empty());
        assert_eq!(store.selected().await.name, "Ballarat");
    }

    #[tokio::test]
    async fn test_select_unknown_is_noop() {
        let store = LocationStore::default();
        store
            .replace_catalog(vec![loc("r1r0gnd", "Ballarat"), loc("r1qg2z3", "Woodend")])
            .await;

        assert!(store.select("zzzzzzz").await.is_none());
        assert_eq!(store.selected().await.name, "Woodend");

        assert!(store.select("r1r0gnd").await.is_some());
        assert_eq!(store.selected().await.name, "Ballarat");
    }
}
