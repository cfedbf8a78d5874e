//! Shared fakes and payload fixtures for the poller tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bom_client::Transport;
use common::{Error, InstanceStatus, Status};
use serde_json::{json, Value};

use crate::status::StatusSink;
use crate::variables::{DataSink, LocationChoice, VariableDefinition, VariableValues};

#[derive(Default)]
pub struct RecordingStatus(Mutex<Vec<Status>>);

impl RecordingStatus {
    pub fn take(&self) -> Vec<Status> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl StatusSink for RecordingStatus {
    fn set_status(&self, status: InstanceStatus, message: Option<&str>) {
        self.0.lock().unwrap().push(Status::new(status, message));
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub values: Mutex<Vec<VariableValues>>,
    pub definitions: Mutex<Vec<Vec<VariableDefinition>>>,
    pub choices: Mutex<Vec<Vec<LocationChoice>>>,
}

impl RecordingSink {
    pub fn publish_count(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    pub fn last_values(&self) -> VariableValues {
        self.values.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl DataSink for RecordingSink {
    fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>) {
        self.definitions.lock().unwrap().push(definitions);
    }

    fn set_variable_values(&self, values: VariableValues) {
        self.values.lock().unwrap().push(values);
    }

    fn set_location_choices(&self, choices: Vec<LocationChoice>) {
        self.choices.lock().unwrap().push(choices);
    }
}

/// In-memory API: fixed bodies per path, optional simulated outages.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Value>>,
    down: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn respond(&self, path: &str, body: Value) {
        self.routes.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn fail(&self, path: &str) {
        self.down.lock().unwrap().insert(path.to_string());
    }

    /// Hold responses for `path` back by `delay`.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_string(), delay);
    }

    pub fn restore(&self, path: &str) {
        self.down.lock().unwrap().remove(path);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Every endpoint for `geohash` answers with valid fixtures.
    pub fn healthy(geohash: &str) -> Self {
        let t = Self::default();
        t.serve_location(geohash);
        t
    }

    pub fn serve_location(&self, geohash: &str) {
        let six: String = geohash.chars().take(6).collect();
        self.respond(
            &format!("locations/{geohash}/forecasts/daily"),
            forecast_body("daily", "2026-10-18T01:00:00Z", &[22.0, 24.0]),
        );
        self.respond(
            &format!("locations/{geohash}/forecasts/hourly"),
            forecast_body("hourly", "2026-10-18T01:01:00Z", &[15.0, 16.0, 17.0]),
        );
        self.respond(
            &format!("locations/{six}/observations"),
            observation_body("2026-10-18T01:02:00Z", 14.5),
        );
        self.respond(
            &format!("locations/{geohash}/warnings"),
            warnings_body("2026-10-18T01:03:00Z", &["VIC_RC022_IDV36310"]),
        );
        self.respond(
            &format!("locations/{geohash}"),
            location_info_body(geohash, "Australia/Melbourne"),
        );
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str, search: Option<&str>) -> Result<Value, Error> {
        let key = match search {
            Some(term) => format!("{path}?search={term}"),
            None => path.to_string(),
        };
        self.calls.lock().unwrap().push(key.clone());

        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.down.lock().unwrap().contains(&key) {
            return Err(Error::Timeout(5000));
        }
        self.routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(Error::Api {
                status: 404,
                message: format!("no route for {key}"),
            })
    }
}

// ── Payload fixtures ─────────────────────────────────────────────────

pub fn location_json(geohash: &str, name: &str, postcode: Option<&str>) -> Value {
    json!({
        "geohash": geohash,
        "id": format!("{name}-{geohash}"),
        "name": name,
        "postcode": postcode,
        "state": "VIC"
    })
}

pub fn search_body(locations: &[Value]) -> Value {
    json!({
        "metadata": {"response_timestamp": "2026-10-18T00:59:00Z", "copyright": "BOM"},
        "data": locations
    })
}

pub fn forecast_item_json(temp_max: f64, with_now: bool) -> Value {
    let mut item = json!({
        "rain": {
            "amount": {"min": 0, "max": 4, "units": "mm"},
            "chance": 60,
            "chance_of_no_rain_category": "fifty",
            "precipitation_amount_25_percent_chance": 0,
            "precipitation_amount_50_percent_chance": 1,
            "precipitation_amount_75_percent_chance": 3
        },
        "uv": {"category": "moderate", "end_time": null, "max_index": 5, "start_time": null},
        "astronomical": {"sunrise_time": "2026-10-17T19:32:00Z", "sunset_time": "2026-10-18T08:45:00Z"},
        "fire_danger_category": {"text": "Moderate", "default_colour": "#64BF30", "dark_mode_colour": "#64BF30"},
        "date": "2026-10-17T13:00:00Z",
        "temp_max": temp_max,
        "temp_min": 9,
        "extended_text": "Showers increasing.",
        "short_text": "Showers.",
        "icon_descriptor": "shower",
        "fire_danger": "Moderate",
        "surf_danger": null
    });
    if with_now {
        item["now"] = json!({
            "is_night": false,
            "now_label": "Max",
            "later_label": "Overnight min",
            "temp_now": temp_max,
            "temp_later": 9
        });
    }
    item
}

pub fn forecast_body(kind: &str, timestamp: &str, temps: &[f64]) -> Value {
    let items: Vec<Value> = temps
        .iter()
        .enumerate()
        .map(|(i, t)| forecast_item_json(*t, i == 0 && kind == "daily"))
        .collect();
    json!({
        "metadata": {
            "response_timestamp": timestamp,
            "issue_time": "2026-10-18T00:00:00Z",
            "next_issue_time": "2026-10-18T06:00:00Z",
            "forecast_region": "Central",
            "forecast_type": kind,
            "copyright": "BOM"
        },
        "data": items
    })
}

pub fn observation_body(timestamp: &str, temp: f64) -> Value {
    json!({
        "metadata": {"response_timestamp": timestamp, "issue_time": "2026-10-18T00:50:00Z"},
        "data": {
            "temp": temp,
            "temp_feels_like": temp - 2.0,
            "rain_since_9am": 0.4,
            "humidity": 80,
            "wind": {"speed_kilometre": 19, "speed_knot": 10, "direction": "NW"},
            "gust": {"speed_kilometre": 28, "speed_knot": 15},
            "station": {"bom_id": "088162", "name": "Woodend", "distance": 1540}
        }
    })
}

pub fn warnings_body(timestamp: &str, ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "type": "flood_warning",
                "title": "Flood Watch for Central",
                "short_title": "Flood Watch",
                "state": "VIC",
                "warning_group_type": "minor",
                "issue_time": "2026-10-18T00:30:00Z",
                "expiry_time": "2026-10-19T00:30:00Z",
                "phase": "new"
            })
        })
        .collect();
    json!({"metadata": {"response_timestamp": timestamp}, "data": data})
}

pub fn location_info_body(geohash: &str, timezone: &str) -> Value {
    json!({
        "metadata": {"response_timestamp": "2026-10-18T01:04:00Z"},
        "data": {
            "geohash": geohash,
            "timezone": timezone,
            "latitude": -37.35,
            "longitude": 144.52,
            "marine_area_id": null,
            "tidal_point": null,
            "id": format!("Place-{geohash}"),
            "name": "Place",
            "state": "VIC"
        }
    })
}
