//! BOM weather API client library.
//!
//! Provides schema validation of API payloads, the single-lane request
//! queue every outbound call goes through, and the HTTP transport.

pub mod paths;
pub mod queue;
pub mod rest;
pub mod schema;

pub use queue::{RequestQueue, DEFAULT_TASK_TIMEOUT};
pub use rest::{BomClient, HttpTransport, StatusUpdate, Transport, API_ENDPOINT};
pub use schema::{validate, Schema};
