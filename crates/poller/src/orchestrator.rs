//! The five-step fetch cycle and its reschedule timer.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bom_client::{paths, BomClient, Schema};
use common::{
    ForecastResponse, Location, LocationInformationResponse, ObservationResponse,
    ResponseMetadata, WarningResponse,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{Forecast, LocationStore, WeatherStore};
use crate::variables::{self, DataSink};

/// Where a cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    FetchingDaily,
    FetchingHourly,
    FetchingObservation,
    FetchingWarnings,
    FetchingLocationInfo,
    Scheduled,
}

type CycleFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

struct ScheduledCycle {
    handle: JoinHandle<()>,
    due: Instant,
    generation: u64,
}

/// The cycle was abandoned because the configuration changed under it.
struct Cancelled;

pub struct PollOrchestrator {
    client: Arc<BomClient>,
    locations: Arc<LocationStore>,
    store: Arc<WeatherStore>,
    sink: Arc<dyn DataSink>,
    interval_ms: AtomicU64,
    phase: watch::Sender<CyclePhase>,
    /// Held for the whole of a cycle.
    cycle_lock: tokio::sync::Mutex<()>,
    timer: Mutex<Option<ScheduledCycle>>,
    generation: AtomicU64,
    /// Bumped by [`cancel`](PollOrchestrator::cancel).
    epoch: AtomicU64,
    last_completed: Mutex<Option<Instant>>,
}

impl PollOrchestrator {
    pub fn new(
        client: Arc<BomClient>,
        locations: Arc<LocationStore>,
        store: Arc<WeatherStore>,
        sink: Arc<dyn DataSink>,
        interval: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        Self {
            client,
            locations,
            store,
            sink,
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
            phase,
            cycle_lock: tokio::sync::Mutex::new(()),
            timer: Mutex::new(None),
            generation: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            last_completed: Mutex::new(None),
        }
    }

    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    /// When the pending timer fires, if one is armed.
    pub fn next_cycle_due(&self) -> Option<Instant> {
        self.timer().as_ref().map(|s| s.due)
    }

    pub fn last_completed_at(&self) -> Option<Instant> {
        *self
            .last_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one full cycle for the current selection, then arm the timer.
    ///
    /// Waits for any cycle already running. A cycle abandoned by
    /// [`cancel`](Self::cancel) neither publishes nor reschedules.
    pub async fn run_cycle(self: &Arc<Self>) {
        self.run_cycle_due(None).await;
    }

    /// `due` is set for timer-started cycles; such a cycle is skipped when
    /// another one completed after it fell due.
    async fn run_cycle_due(self: &Arc<Self>, due: Option<Instant>) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let _running = self.cycle_lock.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Skipping cycle queued before cancellation");
            return;
        }
        if let Some(due) = due {
            if self.last_completed_at().is_some_and(|done| done >= due) {
                debug!("Skipping timed cycle, already polled since it fell due");
                return;
            }
        }

        let location = self.locations.selected().await;
        info!("Polling {} ({})", location.name, location.geohash);

        if self.fetch_all(epoch, &location).await.is_err() {
            debug!("Cycle for {} cancelled", location.geohash);
            return;
        }

        self.publish(location).await;
        *self
            .last_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.schedule_next();
    }

    /// Cancel the pending timer and run a cycle now.
    pub async fn trigger_now(self: &Arc<Self>) {
        self.cancel_timer();
        self.phase.send_replace(CyclePhase::Idle);
        self.run_cycle().await;
    }

    /// Stop polling: disarm the timer, abandon the running cycle, and drop
    /// queued requests that have not started.
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cancel_timer();
        let dropped = self.client.queue().clear();
        if dropped > 0 {
            debug!("Discarded {} queued request(s)", dropped);
        }
        self.phase.send_replace(CyclePhase::Idle);
    }

    async fn fetch_all(&self, epoch: u64, location: &Location) -> Result<(), Cancelled> {
        let geohash = location.geohash.as_str();

        let daily: Option<ForecastResponse> = self
            .step(
                epoch,
                CyclePhase::FetchingDaily,
                "daily forecast",
                paths::forecast_daily(geohash),
            )
            .await?;
        if let Some(r) = daily {
            self.store.set_most_recent(r.metadata.response_timestamp()).await;
            *self.store.forecast_daily.write().await = Forecast {
                items: r.data,
                issued_at: Some(r.metadata.issue_time),
            };
        }

        let hourly: Option<ForecastResponse> = self
            .step(
                epoch,
                CyclePhase::FetchingHourly,
                "hourly forecast",
                paths::forecast_hourly(geohash),
            )
            .await?;
        if let Some(r) = hourly {
            self.store.set_most_recent(r.metadata.response_timestamp()).await;
            *self.store.forecast_hourly.write().await = Forecast {
                items: r.data,
                issued_at: Some(r.metadata.issue_time),
            };
        }

        let observation: Option<ObservationResponse> = self
            .step(
                epoch,
                CyclePhase::FetchingObservation,
                "observation",
                paths::observations(geohash),
            )
            .await?;
        if let Some(r) = observation {
            self.store.set_most_recent(r.metadata.response_timestamp()).await;
            *self.store.observation.write().await = Some(r.data);
        }

        let warnings: Option<WarningResponse> = self
            .step(
                epoch,
                CyclePhase::FetchingWarnings,
                "warnings",
                paths::warnings(geohash),
            )
            .await?;
        if let Some(r) = warnings {
            self.store.set_most_recent(r.metadata.response_timestamp()).await;
            *self.store.warnings.write().await = r.data;
        }

        let info: Option<LocationInformationResponse> = self
            .step(
                epoch,
                CyclePhase::FetchingLocationInfo,
                "location information",
                paths::location_information(geohash),
            )
            .await?;
        if let Some(r) = info {
            *self.store.location_info.write().await = r.data;
        }

        Ok(())
    }

    async fn step<T: Schema>(
        &self,
        epoch: u64,
        phase: CyclePhase,
        label: &str,
        path: String,
    ) -> Result<Option<T>, Cancelled> {
        self.phase.send_replace(phase);
        let result = self.client.fetch::<T>(label, &path, None).await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            return Err(Cancelled);
        }
        if result.is_none() {
            warn!("No new {} data, keeping previous", label);
        }
        Ok(result)
    }

    async fn publish(&self, location: Location) {
        let snapshot = self.store.snapshot(location).await;
        let set = variables::build(&snapshot);
        debug!("Publishing {} variables", set.values.len());
        self.sink.set_variable_definitions(set.definitions);
        self.sink.set_variable_values(set.values);
    }

    fn timer(&self) -> MutexGuard<'_, Option<ScheduledCycle>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_timer(&self) {
        if let Some(scheduled) = self.timer().take() {
            scheduled.handle.abort();
        }
    }

    fn schedule_next(self: &Arc<Self>) {
        let interval = self.interval();
        let due = Instant::now() + interval;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = tokio::spawn(Self::wait_and_run(Arc::clone(self), due, generation));

        let previous = self.timer().replace(ScheduledCycle {
            handle,
            due,
            generation,
        });
        if let Some(previous) = previous {
            previous.handle.abort();
        }

        self.phase.send_replace(CyclePhase::Scheduled);
        debug!("Next cycle in {:?}", interval);
    }

    fn wait_and_run(self: Arc<Self>, due: Instant, generation: u64) -> CycleFuture {
        Box::pin(async move {
            tokio::time::sleep_until(due).await;
            {
                let mut slot = self.timer();
                if !matches!(&*slot, Some(s) if s.generation == generation) {
                    return;
                }
                // Detach rather than abort: this task is the one running.
                slot.take();
            }
            self.phase.send_replace(CyclePhase::Idle);
            self.run_cycle_due(Some(due)).await;
        })
    }
}
