//! HTTP access to the BOM API.
//!
//! [`Transport`] performs a single GET; [`BomClient`] routes every call
//! through the [`RequestQueue`] and reports connection health.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Error, InstanceStatus};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::queue::{RequestQueue, DEFAULT_TASK_TIMEOUT};
use crate::schema::{validate, Schema};

pub const API_ENDPOINT: &str = "https://api.weather.bom.gov.au/v1/";

/// Extra time the queue slot allows past the request deadline, so a hung
/// request times out inside its task and is reported.
const SLOT_GRACE: Duration = Duration::from_millis(250);

/// One outbound GET returning decoded JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `path` is relative to the API base; `search` becomes `?search=`.
    async fn get(&self, path: &str, search: Option<&str>) -> Result<Value, Error>;
}

/// Receiver of connection-health signals.
pub trait StatusUpdate: Send + Sync {
    fn update_status(&self, status: InstanceStatus, message: Option<&str>);
}

/// reqwest-backed transport with a fixed timeout and JSON content type.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Transport for the public BOM API.
    pub fn bom() -> Result<Self, Error> {
        Self::new(API_ENDPOINT, DEFAULT_TASK_TIMEOUT)
    }

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent("bom-weather/0.1")
            .default_headers(headers)
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_connect() {
            Error::Connect(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, search: Option<&str>) -> Result<Value, Error> {
        let url = self.url(path);
        debug!("GET {} search={:?}", url, search);

        let mut req = self.client.get(&url);
        if let Some(term) = search {
            req = req.query(&[("search", term)]);
        }

        let resp = req.send().await.map_err(|e| self.map_send_error(e))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body.chars().take(500).collect(),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Queued, health-reporting access to the BOM API.
pub struct BomClient {
    transport: Arc<dyn Transport>,
    status: Arc<dyn StatusUpdate>,
    queue: RequestQueue,
    request_timeout: Duration,
    verbose: Arc<AtomicBool>,
}

impl BomClient {
    pub fn new(transport: Arc<dyn Transport>, status: Arc<dyn StatusUpdate>) -> Self {
        Self::with_queue(
            transport,
            status,
            RequestQueue::with_timeout(DEFAULT_TASK_TIMEOUT + SLOT_GRACE),
        )
    }

    /// Requests are cut off after [`DEFAULT_TASK_TIMEOUT`]; `queue` should
    /// allow its tasks longer than that.
    pub fn with_queue(
        transport: Arc<dyn Transport>,
        status: Arc<dyn StatusUpdate>,
        queue: RequestQueue,
    ) -> Self {
        Self {
            transport,
            status,
            queue,
            request_timeout: DEFAULT_TASK_TIMEOUT,
            verbose: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Health receiver shared with queued requests.
    pub fn status(&self) -> &Arc<dyn StatusUpdate> {
        &self.status
    }

    /// Issue one GET through the queue.
    ///
    /// Transport failures, timeouts and discarded tasks all come back as
    /// `None`; failures are logged and reported as unhealthy.
    pub async fn query(&self, path: &str, search: Option<&str>) -> Option<Value> {
        let transport = Arc::clone(&self.transport);
        let status = Arc::clone(&self.status);
        let verbose = Arc::clone(&self.verbose);
        let path = path.to_string();
        let search = search.map(str::to_string);
        let deadline = self.request_timeout;

        self.queue
            .enqueue(move || async move {
                let request = transport.get(&path, search.as_deref());
                let result = tokio::time::timeout(deadline, request)
                    .await
                    .unwrap_or_else(|_| Err(Error::Timeout(deadline.as_millis() as u64)));
                match result {
                    Ok(body) => {
                        status.update_status(InstanceStatus::Ok, None);
                        if verbose.load(Ordering::Relaxed) {
                            debug!("Response from API call to {}:\n{}", path, body);
                        }
                        Some(body)
                    }
                    Err(e) => {
                        error!("Request to {} failed: {}", path, e);
                        status.update_status(InstanceStatus::ConnectionFailure, Some(&e.code()));
                        if verbose.load(Ordering::Relaxed) {
                            error!("{:?}", e);
                        }
                        None
                    }
                }
            })
            .await
            .flatten()
    }

    /// [`query`](Self::query) and validate the body as `T`.
    ///
    /// A body that fails validation is logged with every violation and
    /// reported as a warning; the caller keeps whatever it had before.
    pub async fn fetch<T: Schema>(
        &self,
        label: &str,
        path: &str,
        search: Option<&str>,
    ) -> Option<T> {
        let body = self.query(path, search).await?;
        match validate::<T>(&body) {
            Ok(value) => Some(value),
            Err(failure) => {
                warn!("Invalid {} response: {}", label, failure);
                let code = Error::from(failure).code();
                let message = format!("{label}: {code}");
                self.status
                    .update_status(InstanceStatus::UnknownWarning, Some(&message));
                None
            }
        }
    }
}
