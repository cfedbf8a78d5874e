//! Configuration loader: merges .env, config.toml and environment variables.

use std::path::Path;

use common::{Error, PollerConfig, SearchBy};

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number")))
}

fn parse_search_by(raw: &str) -> Result<SearchBy, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "lat_long" | "latlong" | "coordinates" => Ok(SearchBy::LatLong),
        "name" => Ok(SearchBy::Name),
        _ => Err(Error::Config(
            "BOM_SEARCH_BY must be one of: lat_long, name".into(),
        )),
    }
}

/// Apply `BOM_*` overrides; `lookup` returns the raw value of a variable.
fn apply_overrides<F>(config: &mut PollerConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("BOM_SEARCH_BY") {
        config.search_by = parse_search_by(&raw)?;
    }
    if let Some(raw) = lookup("BOM_LATITUDE") {
        config.latitude = parse_f64(&raw, "BOM_LATITUDE")?;
    }
    if let Some(raw) = lookup("BOM_LONGITUDE") {
        config.longitude = parse_f64(&raw, "BOM_LONGITUDE")?;
    }
    if let Some(raw) = lookup("BOM_LOCATION") {
        config.location = raw;
    }
    if let Some(raw) = lookup("BOM_POLL_INTERVAL_MINUTES") {
        config.poll_interval_minutes = raw.trim().parse::<u64>().map_err(|_| {
            Error::Config("BOM_POLL_INTERVAL_MINUTES must be an integer between 1 and 120".into())
        })?;
    }
    if let Some(raw) = lookup("BOM_VERBOSE") {
        config.verbose = parse_bool(&raw);
    }
    Ok(())
}

fn validate_config(config: &PollerConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if !(1..=120).contains(&config.poll_interval_minutes) {
        issues.push("poll_interval_minutes must be between 1 and 120".into());
    }

    match config.search_by {
        SearchBy::LatLong => {
            if !(-45.0..=-10.0).contains(&config.latitude) {
                issues.push("latitude must be between -45 and -10".into());
            }
            if !(110.0..=160.0).contains(&config.longitude) {
                issues.push("longitude must be between 110 and 160".into());
            }
        }
        SearchBy::Name => {
            let alphanumeric = config
                .location
                .chars()
                .filter(|c| c.is_alphanumeric())
                .count();
            if alphanumeric < 3 {
                issues.push("location must contain at least 3 letters or digits".into());
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load poller configuration from `.env`, an optional TOML file and the
/// environment, in increasing priority.
pub fn load_config(path: &Path) -> Result<PollerConfig, Error> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let mut config = PollerConfig::default();

    if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
    }

    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;

    Ok(config)
}
