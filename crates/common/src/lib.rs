//! Shared types, config, and error definitions for the BOM weather poller.

pub mod config;
pub mod error;
pub mod types;

pub use config::{PollerConfig, SearchBy};
pub use error::{Error, FieldViolation, ValidationFailure};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
