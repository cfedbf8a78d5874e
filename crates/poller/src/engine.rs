//! Wiring for one poller instance.
//!
//! The [`Engine`] owns every component and is the only thing the host
//! application talks to: it applies configuration, handles manual location
//! selection and tears everything down on shutdown.

use std::sync::Arc;

use bom_client::{BomClient, Transport};
use common::{InstanceStatus, PollerConfig, SearchBy, Status};
use tracing::{debug, info, warn};

use crate::cache::{LocationStore, WeatherSnapshot, WeatherStore};
use crate::orchestrator::PollOrchestrator;
use crate::resolver::LocationResolver;
use crate::status::{StatusDebouncer, StatusSink};
use crate::variables::{self, DataSink, LocationChoice};

pub struct Engine {
    client: Arc<BomClient>,
    status: Arc<StatusDebouncer>,
    locations: Arc<LocationStore>,
    store: Arc<WeatherStore>,
    resolver: LocationResolver,
    orchestrator: Arc<PollOrchestrator>,
    sink: Arc<dyn DataSink>,
}

impl Engine {
    /// Build an idle engine. Emits `Connecting: Initialising` straight away.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        status_sink: Arc<dyn StatusSink>,
        sink: Arc<dyn DataSink>,
    ) -> Self {
        let status = Arc::new(StatusDebouncer::with_defaults(status_sink));
        let client = Arc::new(BomClient::new(transport, status.clone()));
        let locations = Arc::new(LocationStore::default());
        let store = Arc::new(WeatherStore::default());
        let resolver = LocationResolver::new(Arc::clone(&client), Arc::clone(&locations));
        let orchestrator = Arc::new(PollOrchestrator::new(
            Arc::clone(&client),
            Arc::clone(&locations),
            Arc::clone(&store),
            Arc::clone(&sink),
            PollerConfig::default().poll_interval(),
        ));

        Self {
            client,
            status,
            locations,
            store,
            resolver,
            orchestrator,
            sink,
        }
    }

    /// Apply a configuration: stop the current schedule, search for the
    /// configured location, then run the first cycle for the result.
    pub async fn configure(&self, config: &PollerConfig) {
        self.orchestrator.cancel();
        self.client.set_verbose(config.verbose);
        self.orchestrator.set_interval(config.poll_interval());

        let term = config.search_term();
        if config.search_by == SearchBy::Name && term.is_empty() {
            warn!("No location name configured");
            self.status
                .update(InstanceStatus::BadConfig, Some("Missing location name"));
            return;
        }

        if self.resolver.resolve(&term).await.is_some() {
            self.publish_search_results().await;
        }

        info!(
            "Polling every {} minute(s)",
            config.poll_interval_minutes
        );
        self.orchestrator.run_cycle().await;
    }

    /// Select a location from the last search results and poll it now.
    ///
    /// Returns `false`, changing nothing, when `geohash` is not in the catalog.
    pub async fn select_location(&self, geohash: &str) -> bool {
        match self.locations.select(geohash).await {
            Some(location) => {
                info!("Location changed to {} ({})", location.name, location.geohash);
                self.orchestrator.trigger_now().await;
                true
            }
            None => {
                debug!("Ignoring selection of unknown location {}", geohash);
                false
            }
        }
    }

    pub async fn location_choices(&self) -> Vec<LocationChoice> {
        let catalog = self.locations.catalog().await;
        variables::location_choices(catalog.values())
    }

    pub async fn snapshot(&self) -> WeatherSnapshot {
        self.store.snapshot(self.locations.selected().await).await
    }

    /// Last status sent to the indicator.
    pub fn status(&self) -> Status {
        self.status.current()
    }

    pub fn orchestrator(&self) -> &Arc<PollOrchestrator> {
        &self.orchestrator
    }

    /// Stop polling and report `Disconnected`. The engine stays inert after this.
    pub fn shutdown(&self) {
        info!("Shutting down poller");
        self.orchestrator.cancel();
        self.status.destroy();
    }

    async fn publish_search_results(&self) {
        self.sink
            .set_location_choices(self.location_choices().await);

        let set = variables::build(&self.snapshot().await);
        self.sink.set_variable_definitions(set.definitions);
        self.sink.set_variable_values(set.values);
    }
}
