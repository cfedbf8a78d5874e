//! Unified error type for the BOM weather poller.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("BOM API error (status={status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-readable code, suitable for a status message.
    pub fn code(&self) -> String {
        match self {
            Error::Http(_) => "ERR_NETWORK".into(),
            Error::Connect(_) => "ECONNREFUSED".into(),
            Error::Timeout(_) => "ETIMEDOUT".into(),
            Error::Api { status, .. } => format!("HTTP_{status}"),
            Error::Json(_) => "ERR_BAD_RESPONSE".into(),
            Error::Validation(_) => "ERR_VALIDATION".into(),
            Error::Config(_) => "ERR_CONFIG".into(),
            Error::Io(_) => "EIO".into(),
        }
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Dotted path to the field, e.g. `data.0.geohash`.
    pub path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// Wrong type or missing required field, as reported by the decoder.
    Malformed(String),
    WrongLength { expected: usize, actual: usize },
    LengthOutOfRange { min: usize, max: usize, actual: usize },
    BelowMinimum { min: f64, actual: f64 },
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Malformed(msg) => write!(f, "{}: {}", self.path, msg),
            ViolationKind::WrongLength { expected, actual } => write!(
                f,
                "{}: must be exactly {} characters long (got {})",
                self.path, expected, actual
            ),
            ViolationKind::LengthOutOfRange { min, max, actual } => write!(
                f,
                "{}: must be {}-{} characters long (got {})",
                self.path, min, max, actual
            ),
            ViolationKind::BelowMinimum { min, actual } => {
                write!(f, "{}: must be >= {} (got {})", self.path, min, actual)
            }
        }
    }
}

/// A payload that did not match the expected entity shape.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{entity} failed validation: {}", join_violations(.violations))]
pub struct ValidationFailure {
    pub entity: &'static str,
    pub violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
