//! Polling engine crate.
//!
//! Resolves the configured location, runs the five-step fetch cycle on a
//! self-rescheduling timer, keeps the last-known-good data, and debounces
//! connection health for the status indicator.

pub mod cache;
pub mod engine;
pub mod orchestrator;
pub mod resolver;
pub mod status;
pub mod variables;

pub use cache::{Forecast, LocationStore, WeatherSnapshot, WeatherStore};
pub use engine::Engine;
pub use orchestrator::{CyclePhase, PollOrchestrator};
pub use resolver::LocationResolver;
pub use status::{StatusDebouncer, StatusSink, DEFAULT_THROTTLE_WINDOW};
pub use variables::{
    DataSink, LocationChoice, VariableDefinition, VariableSet, VariableValue, VariableValues,
};

#[cfg(test)]
pub(crate) mod testing;
