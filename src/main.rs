//! bom-weather: polls the Bureau of Meteorology API for one location.
//!
//! Single-binary Tokio application that:
//! 1. Resolves the configured place name or coordinates to a BOM location
//! 2. Fetches forecasts, observations, warnings and location details
//! 3. Publishes the flattened values and repeats on a fixed interval

mod config;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bom_client::HttpTransport;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use common::InstanceStatus;
use poller::{DataSink, Engine, LocationChoice, StatusSink, VariableDefinition, VariableValues};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// BOM weather poller
#[derive(Parser)]
#[command(name = "bom-weather", about = "Bureau of Meteorology weather poller")]
struct Cli {
    /// Search, run a single poll cycle, print the variables as JSON and exit.
    #[arg(long)]
    once: bool,

    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Status indicator backed by the log.
struct LogStatus;

impl StatusSink for LogStatus {
    fn set_status(&self, status: InstanceStatus, message: Option<&str>) {
        let message = message.unwrap_or_default();
        match status {
            InstanceStatus::Ok | InstanceStatus::Connecting => {
                info!("Status: {:?} {}", status, message)
            }
            _ => warn!("Status: {:?} {}", status, message),
        }
    }
}

/// Keeps the latest published values for the heartbeat and `--once`.
#[derive(Default)]
struct LatestValues {
    values: Mutex<VariableValues>,
}

impl LatestValues {
    fn get(&self) -> VariableValues {
        self.values
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl DataSink for LatestValues {
    fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>) {
        debug!("{} variable definitions", definitions.len());
    }

    fn set_variable_values(&self, values: VariableValues) {
        info!("Published {} variables", values.len());
        if let Ok(mut latest) = self.values.lock() {
            *latest = values;
        }
    }

    fn set_location_choices(&self, choices: Vec<LocationChoice>) {
        for choice in &choices {
            debug!("Location choice {} = {}", choice.id, choice.label);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match config::load_config(&cli.config) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            None
        }
    };
    let verbose = cfg.as_ref().is_some_and(|c| c.verbose);
    let default_filter = if verbose {
        "bom_weather=debug,bom_client=debug,poller=debug"
    } else {
        "bom_weather=info,bom_client=info,poller=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(true)
        .init();

    let Some(cfg) = cfg else {
        error!("Refusing to start with an invalid configuration");
        std::process::exit(1);
    };

    info!("BOM weather poller starting up...");
    info!(
        "Search: {:?} '{}', every {} minute(s)",
        cfg.search_by,
        cfg.search_term(),
        cfg.poll_interval_minutes
    );

    let transport = match HttpTransport::bom() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let latest = Arc::new(LatestValues::default());
    let engine = Arc::new(Engine::new(transport, Arc::new(LogStatus), latest.clone()));

    engine.configure(&cfg).await;

    if cli.once {
        let snapshot = engine.snapshot().await;
        let output = json!({
            "generated_at": now_iso(),
            "location": snapshot.location,
            "status": engine.status(),
            "variables": latest.get(),
        });
        engine.shutdown();
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!("Failed to serialize output: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let heartbeat = {
        let engine = Arc::clone(&engine);
        let latest = Arc::clone(&latest);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEARTBEAT_INTERVAL).await;
                let status = engine.status();
                let most_recent = latest
                    .get()
                    .get("mostRecentData")
                    .map(|v| json!(v))
                    .unwrap_or_default();
                info!(
                    "Heartbeat at {}: {:?}, most recent data {}",
                    now_iso(),
                    status.status,
                    most_recent
                );
            }
        })
    };

    info!("Poller is running. Press Ctrl+C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    } else {
        info!("Shutdown signal received");
    }

    heartbeat.abort();
    engine.shutdown();
    info!("Shutdown complete");
}
