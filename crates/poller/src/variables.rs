//! Flattening of cached entities into named scalar variables.
//!
//! Every entity has an explicit field list; ids are the field path joined
//! with `_` under a per-entity prefix (`obs_wind_speed_kilometre`,
//! `fc_day_0_rain_chance`), and absent values are published as null.

use std::collections::BTreeMap;

use common::{ForecastItem, Location, LocationInformation, Observation, Warning};
use serde::Serialize;

use crate::cache::{Forecast, WeatherSnapshot};

/// A single published value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl From<&str> for VariableValue {
    fn from(v: &str) -> Self {
        VariableValue::Text(v.to_string())
    }
}

impl From<&String> for VariableValue {
    fn from(v: &String) -> Self {
        VariableValue::Text(v.clone())
    }
}

impl From<f64> for VariableValue {
    fn from(v: f64) -> Self {
        VariableValue::Number(v)
    }
}

impl From<bool> for VariableValue {
    fn from(v: bool) -> Self {
        VariableValue::Bool(v)
    }
}

impl<T> From<Option<T>> for VariableValue
where
    T: Into<VariableValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(VariableValue::Null, Into::into)
    }
}

pub type VariableValues = BTreeMap<String, VariableValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    pub variable_id: String,
    pub name: String,
}

/// Definitions and values produced from one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    pub definitions: Vec<VariableDefinition>,
    pub values: VariableValues,
}

/// An entry for a location picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationChoice {
    pub id: String,
    pub label: String,
}

/// Downstream consumer of published data.
pub trait DataSink: Send + Sync {
    fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>);
    fn set_variable_values(&self, values: VariableValues);
    fn set_location_choices(&self, _choices: Vec<LocationChoice>) {}
}

struct Field {
    path: &'static [&'static str],
    value: VariableValue,
}

fn field(path: &'static [&'static str], value: impl Into<VariableValue>) -> Field {
    Field {
        path,
        value: value.into(),
    }
}

impl VariableSet {
    fn push(&mut self, id: String, name: String, value: VariableValue) {
        self.definitions.push(VariableDefinition {
            variable_id: id.clone(),
            name,
        });
        self.values.insert(id, value);
    }

    fn extend(&mut self, prefix: &str, group: &str, fields: Vec<Field>) {
        for f in fields {
            self.push(
                format!("{}_{}", prefix, f.path.join("_")),
                format!("{}: {}", group, f.path.join(" - ")),
                f.value,
            );
        }
    }

    fn extend_forecast(&mut self, prefix: &str, group: &str, forecast: &Forecast) {
        for (i, item) in forecast.items.iter().enumerate() {
            self.extend(
                &format!("{prefix}_{i}"),
                &format!("{group} [{i}]"),
                forecast_fields(item),
            );
        }
        self.push(
            format!("{prefix}_issued_at"),
            format!("{group} Issued At"),
            forecast.issued_at.as_ref().into(),
        );
    }
}

/// Build the full variable set for a snapshot.
pub fn build(snapshot: &WeatherSnapshot) -> VariableSet {
    let mut set = VariableSet::default();
    set.push(
        "mostRecentData".into(),
        "Most Recent Data".into(),
        (&snapshot.most_recent_data).into(),
    );
    set.extend(
        "locInfo",
        "Location Info",
        location_info_fields(&snapshot.location_info),
    );
    set.extend(
        "obs",
        "Observation",
        observation_fields(snapshot.observation.as_ref()),
    );
    for (i, warning) in snapshot.warnings.iter().enumerate() {
        set.extend(
            &format!("warn_{i}"),
            &format!("Warning [{i}]"),
            warning_fields(warning),
        );
    }
    set.extend_forecast("fc_day", "Daily Forecast", &snapshot.forecast_daily);
    set.extend_forecast("fc_hour", "Hourly Forecast", &snapshot.forecast_hourly);
    set
}

fn location_info_fields(info: &LocationInformation) -> Vec<Field> {
    vec![
        field(&["geohash"], &info.geohash),
        field(&["timezone"], &info.timezone),
        field(&["latitude"], info.latitude),
        field(&["longitude"], info.longitude),
        field(&["marine_area_id"], info.marine_area_id.as_ref()),
        field(&["tidal_point"], info.tidal_point.as_ref()),
        field(&["id"], &info.id),
        field(&["name"], &info.name),
        field(&["state"], &info.state),
    ]
}

fn observation_fields(obs: Option<&Observation>) -> Vec<Field> {
    let wind = obs.and_then(|o| o.wind.as_ref());
    let gust = obs.and_then(|o| o.gust.as_ref());
    let station = obs.and_then(|o| o.station.as_ref());
    vec![
        field(&["temp"], obs.and_then(|o| o.temp)),
        field(&["temp_feels_like"], obs.and_then(|o| o.temp_feels_like)),
        field(&["rain_since_9am"], obs.and_then(|o| o.rain_since_9am)),
        field(&["humidity"], obs.and_then(|o| o.humidity)),
        field(&["wind", "speed_kilometre"], wind.and_then(|w| w.speed_kilometre)),
        field(&["wind", "speed_knot"], wind.and_then(|w| w.speed_knot)),
        field(&["wind", "direction"], wind.and_then(|w| w.direction.as_ref())),
        field(&["gust", "speed_kilometre"], gust.and_then(|g| g.speed_kilometre)),
        field(&["gust", "speed_knot"], gust.and_then(|g| g.speed_knot)),
        field(&["station", "bom_id"], station.map(|s| &s.bom_id)),
        field(&["station", "name"], station.map(|s| &s.name)),
        field(&["station", "distance"], station.map(|s| s.distance)),
    ]
}

fn warning_fields(w: &Warning) -> Vec<Field> {
    vec![
        field(&["id"], &w.id),
        field(&["type"], &w.warning_type),
        field(&["title"], &w.title),
        field(&["short_title"], &w.short_title),
        field(&["state"], &w.state),
        field(&["warning_group_type"], &w.warning_group_type),
        field(&["issue_time"], &w.issue_time),
        field(&["expiry_time"], &w.expiry_time),
        field(&["phase"], &w.phase),
    ]
}

fn forecast_fields(item: &ForecastItem) -> Vec<Field> {
    let rain = &item.rain;
    let mut fields = vec![
        field(&["rain", "amount", "min"], rain.amount.min),
        field(&["rain", "amount", "max"], rain.amount.max),
        field(&["rain", "amount", "units"], rain.amount.units.as_ref()),
        field(&["rain", "chance"], rain.chance),
        field(
            &["rain", "chance_of_no_rain_category"],
            &rain.chance_of_no_rain_category,
        ),
        field(
            &["rain", "precipitation_amount_25_percent_chance"],
            rain.precipitation_amount_25_percent_chance,
        ),
        field(
            &["rain", "precipitation_amount_50_percent_chance"],
            rain.precipitation_amount_50_percent_chance,
        ),
        field(
            &["rain", "precipitation_amount_75_percent_chance"],
            rain.precipitation_amount_75_percent_chance,
        ),
        field(&["uv", "category"], item.uv.category.as_ref()),
        field(&["uv", "end_time"], item.uv.end_time.as_ref()),
        field(&["uv", "max_index"], item.uv.max_index),
        field(&["uv", "start_time"], item.uv.start_time.as_ref()),
        field(&["astronomical", "sunrise_time"], &item.astronomical.sunrise_time),
        field(&["astronomical", "sunset_time"], &item.astronomical.sunset_time),
        field(
            &["fire_danger_category", "text"],
            item.fire_danger_category.text.as_ref(),
        ),
        field(
            &["fire_danger_category", "default_colour"],
            item.fire_danger_category.default_colour.as_ref(),
        ),
        field(
            &["fire_danger_category", "dark_mode_colour"],
            item.fire_danger_category.dark_mode_colour.as_ref(),
        ),
    ];

    // Only the first daily period carries a "now" block.
    if let Some(now) = &item.now {
        fields.extend([
            field(&["now", "is_night"], now.is_night),
            field(&["now", "now_label"], &now.now_label),
            field(&["now", "later_label"], &now.later_label),
            field(&["now", "temp_now"], now.temp_now),
            field(&["now", "temp_later"], now.temp_later),
        ]);
    }

    fields.extend([
        field(&["date"], &item.date),
        field(&["temp_max"], item.temp_max),
        field(&["temp_min"], item.temp_min),
        field(&["extended_text"], item.extended_text.as_ref()),
        field(&["short_text"], &item.short_text),
        field(&["icon_descriptor"], &item.icon_descriptor),
        field(&["fire_danger"], item.fire_danger.as_ref()),
        field(&["surf_danger"], item.surf_danger.as_ref()),
    ]);
    fields
}

/// Catalog entries as picker choices, sorted by label.
pub fn location_choices<'a>(catalog: impl IntoIterator<Item = &'a Location>) -> Vec<LocationChoice> {
    let mut choices: Vec<LocationChoice> = catalog
        .into_iter()
        .map(|l| LocationChoice {
            id: l.geohash.clone(),
            label: match &l.postcode {
                Some(postcode) => format!("{} ({}:{})", l.name, l.state, postcode),
                None => format!("{} ({})", l.name, l.state),
            },
        })
        .collect();
    choices.sort_by(|a, b| a.label.cmp(&b.label));
    choices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{forecast_body, observation_body, warnings_body};
    use common::{ForecastResponse, ObservationResponse, WarningResponse};

    fn snapshot() -> WeatherSnapshot {
        let daily: ForecastResponse = bom_client::validate(&forecast_body(
            "daily",
            "2026-10-18T01:00:00Z",
            &[22.0, 24.0],
        ))
        .unwrap();
        let obs: ObservationResponse =
            bom_client::validate(&observation_body("2026-10-18T01:02:00Z", 14.5)).unwrap();
        let warnings: WarningResponse =
            bom_client::validate(&warnings_body("t", &["W1", "W2"])).unwrap();

        WeatherSnapshot {
            location: Location::woodend(),
            location_info: LocationInformation::default(),
            forecast_daily: Forecast {
                items: daily.data,
                issued_at: Some(daily.metadata.issue_time),
            },
            forecast_hourly: Forecast::default(),
            observation: Some(obs.data),
            warnings: warnings.data,
            most_recent_data: "2026-10-18T01:02:00Z".into(),
        }
    }

    #[test]
    fn test_flattened_names_and_values() {
        let set = build(&snapshot());
        let v = &set.values;

        assert_eq!(v["mostRecentData"], VariableValue::from("2026-10-18T01:02:00Z"));
        assert_eq!(v["obs_wind_speed_kilometre"], VariableValue::Number(19.0));
        assert_eq!(v["obs_wind_direction"], VariableValue::from("NW"));
        assert_eq!(v["fc_day_0_rain_chance"], VariableValue::Number(60.0));
        assert_eq!(v["fc_day_1_temp_max"], VariableValue::Number(24.0));
        assert_eq!(v["fc_day_0_rain_amount_units"], VariableValue::from("mm"));
        assert_eq!(v["fc_day_0_now_temp_now"], VariableValue::Number(22.0));
        assert!(!v.contains_key("fc_day_1_now_temp_now"));
        assert_eq!(v["fc_day_0_surf_danger"], VariableValue::Null);
        assert_eq!(v["warn_1_id"], VariableValue::from("W2"));
        assert_eq!(v["warn_0_type"], VariableValue::from("flood_warning"));
        assert_eq!(v["locInfo_name"], VariableValue::from("Woodend"));
        assert_eq!(v["fc_day_issued_at"], VariableValue::from("2026-10-18T00:00:00Z"));
        assert_eq!(v["fc_hour_issued_at"], VariableValue::Null);
    }

    #[test]
    fn test_definitions_match_values() {
        let set = build(&snapshot());
        assert_eq!(set.definitions.len(), set.values.len());

        let wind = set
            .definitions
            .iter()
            .find(|d| d.variable_id == "obs_wind_speed_kilometre")
            .expect("wind definition");
        assert_eq!(wind.name, "Observation: wind - speed_kilometre");

        let rain = set
            .definitions
            .iter()
            .find(|d| d.variable_id == "fc_day_0_rain_amount_min")
            .expect("rain definition");
        assert_eq!(rain.name, "Daily Forecast [0]: rain - amount - min");
    }

    #[test]
    fn test_missing_observation_publishes_nulls() {
        let mut snap = snapshot();
        snap.observation = None;
        let set = build(&snap);
        assert_eq!(set.values["obs_temp"], VariableValue::Null);
        assert_eq!(set.values["obs_station_name"], VariableValue::Null);
    }

    #[test]
    fn test_location_choices_sorted() {
        let mut ballarat = Location::woodend();
        ballarat.geohash = "r1r0gnd".into();
        ballarat.name = "Ballarat".into();
        ballarat.postcode = Some("3350".into());
        let woodend = Location::woodend();

        let choices = location_choices([&woodend, &ballarat]);
        assert_eq!(
            choices,
            vec![
                LocationChoice {
                    id: "r1r0gnd".into(),
                    label: "Ballarat (VIC:3350)".into()
                },
                LocationChoice {
                    id: "r1qg2z3".into(),
                    label: "Woodend (VIC)".into()
                },
            ]
        );
    }

    #[test]
    fn test_values_serialize_as_plain_json() {
        let mut values = VariableValues::new();
        values.insert("a".into(), VariableValue::Number(1.5));
        values.insert("b".into(), VariableValue::Null);
        values.insert("c".into(), VariableValue::from("x"));
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            serde_json::json!({"a": 1.5, "b": null, "c": "x"})
        );
    }
}
