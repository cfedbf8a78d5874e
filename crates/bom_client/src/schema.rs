//! Schema validation for BOM API payloads.
//!
//! Decoding is done by serde (types, required fields); the constraints the
//! API types cannot express (geohash lengths, non-negative rain amounts)
//! are checked afterwards and every violation is reported, not just the first.

use common::types::{
    Envelope, ForecastItem, Location, LocationInformation, Observation, Warning,
};
use common::error::{FieldViolation, ValidationFailure, ViolationKind};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// A payload shape that can be decoded and checked.
pub trait Schema: DeserializeOwned {
    /// Entity name used in failure reports.
    const ENTITY: &'static str;

    /// Push every constraint violation found under `path`.
    fn check(&self, _path: &str, _out: &mut Vec<FieldViolation>) {}
}

/// Decode `raw` as `T`, failing closed on any type error or constraint violation.
pub fn validate<T: Schema>(raw: &Value) -> Result<T, ValidationFailure> {
    let decoded = T::deserialize(raw).map_err(|e| ValidationFailure {
        entity: T::ENTITY,
        violations: vec![FieldViolation {
            path: "$".into(),
            kind: ViolationKind::Malformed(e.to_string()),
        }],
    })?;

    let mut violations = Vec::new();
    decoded.check("", &mut violations);
    if violations.is_empty() {
        Ok(decoded)
    } else {
        Err(ValidationFailure {
            entity: T::ENTITY,
            violations,
        })
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn exact_len(path: &str, field: &str, value: &str, expected: usize, out: &mut Vec<FieldViolation>) {
    let actual = value.chars().count();
    if actual != expected {
        out.push(FieldViolation {
            path: join(path, field),
            kind: ViolationKind::WrongLength { expected, actual },
        });
    }
}

fn len_between(
    path: &str,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    out: &mut Vec<FieldViolation>,
) {
    let actual = value.chars().count();
    if actual < min || actual > max {
        out.push(FieldViolation {
            path: join(path, field),
            kind: ViolationKind::LengthOutOfRange { min, max, actual },
        });
    }
}

fn non_negative(path: &str, field: &str, value: f64, out: &mut Vec<FieldViolation>) {
    if value < 0.0 {
        out.push(FieldViolation {
            path: join(path, field),
            kind: ViolationKind::BelowMinimum {
                min: 0.0,
                actual: value,
            },
        });
    }
}

impl Schema for Location {
    const ENTITY: &'static str = "Location";

    fn check(&self, path: &str, out: &mut Vec<FieldViolation>) {
        exact_len(path, "geohash", &self.geohash, 7, out);
    }
}

impl Schema for LocationInformation {
    const ENTITY: &'static str = "LocationInformation";

    fn check(&self, path: &str, out: &mut Vec<FieldViolation>) {
        len_between(path, "geohash", &self.geohash, 6, 7, out);
    }
}

impl Schema for ForecastItem {
    const ENTITY: &'static str = "ForecastItem";

    fn check(&self, path: &str, out: &mut Vec<FieldViolation>) {
        let rain = join(path, "rain");
        non_negative(
            &rain,
            "precipitation_amount_25_percent_chance",
            self.rain.precipitation_amount_25_percent_chance,
            out,
        );
        non_negative(
            &rain,
            "precipitation_amount_50_percent_chance",
            self.rain.precipitation_amount_50_percent_chance,
            out,
        );
        non_negative(
            &rain,
            "precipitation_amount_75_percent_chance",
            self.rain.precipitation_amount_75_percent_chance,
            out,
        );
    }
}

impl Schema for Observation {
    const ENTITY: &'static str = "Observation";
}

impl Schema for Warning {
    const ENTITY: &'static str = "Warning";
}

impl<T: Schema> Schema for Vec<T> {
    const ENTITY: &'static str = T::ENTITY;

    fn check(&self, path: &str, out: &mut Vec<FieldViolation>) {
        for (i, item) in self.iter().enumerate() {
            item.check(&join(path, &i.to_string()), out);
        }
    }
}

impl<D, M> Schema for Envelope<D, M>
where
    D: Schema,
    M: DeserializeOwned,
{
    const ENTITY: &'static str = D::ENTITY;

    fn check(&self, path: &str, out: &mut Vec<FieldViolation>) {
        self.data.check(&join(path, "data"), out);
    }
}
