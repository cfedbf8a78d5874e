//! Status debouncer.
//!
//! Health signals arrive once per request and can flap. The debouncer keeps
//! the last value sent to the indicator (`current`) apart from the latest
//! value observed (`pending`) and throttles emissions: the first change after
//! a quiet period goes out immediately, later changes inside the window are
//! coalesced and only the newest is sent when the window closes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bom_client::StatusUpdate;
use common::{InstanceStatus, Status};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(2000);

/// Downstream status indicator.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, status: InstanceStatus, message: Option<&str>);
}

struct DebounceState {
    current: Status,
    pending: Status,
    /// A change arrived while the window was open.
    trailing: bool,
    /// Open throttle window, if any.
    window: Option<JoinHandle<()>>,
    destroyed: bool,
}

struct Shared {
    state: Mutex<DebounceState>,
    sink: Arc<dyn StatusSink>,
    window: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Promote `pending` to `current`; the caller sends the result to the
    /// sink once the state lock is released.
    fn promote(state: &mut DebounceState) -> Status {
        state.current = state.pending.clone();
        state.current.clone()
    }

    /// Promote `pending` and open a new throttle window.
    fn promote_leading(self: &Arc<Self>, state: &mut DebounceState) -> Status {
        state.window = Some(tokio::spawn(run_window(Arc::clone(self))));
        Self::promote(state)
    }

    fn send(&self, status: &Status) {
        self.sink.set_status(status.status, status.message.as_deref());
    }
}

async fn run_window(shared: Arc<Shared>) {
    loop {
        tokio::time::sleep(shared.window).await;

        let emitted = {
            let mut state = shared.lock();
            if state.trailing && !state.destroyed {
                state.trailing = false;
                Shared::promote(&mut state)
            } else {
                state.trailing = false;
                state.window = None;
                return;
            }
        };
        shared.send(&emitted);
    }
}

/// Throttled leading+trailing view of connection health.
///
/// Must be created inside a Tokio runtime.
pub struct StatusDebouncer {
    shared: Arc<Shared>,
}

impl StatusDebouncer {
    /// Create the debouncer and emit `initial` straight away.
    pub fn new(sink: Arc<dyn StatusSink>, initial: Status, window: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(DebounceState {
                current: Status::new(InstanceStatus::Disconnected, None),
                pending: initial,
                trailing: false,
                window: None,
                destroyed: false,
            }),
            sink,
            window,
        });

        let emitted = {
            let mut state = shared.lock();
            shared.promote_leading(&mut state)
        };
        shared.send(&emitted);

        Self { shared }
    }

    /// `Connecting: Initialising` with the default 2 s window.
    pub fn with_defaults(sink: Arc<dyn StatusSink>) -> Self {
        Self::new(
            sink,
            Status::new(InstanceStatus::Connecting, Some("Initialising")),
            DEFAULT_THROTTLE_WINDOW,
        )
    }

    /// Record a health observation.
    pub fn update(&self, status: InstanceStatus, message: Option<&str>) {
        let emitted = {
            let mut state = self.shared.lock();
            if state.destroyed {
                info!(
                    "Status update after destroy dropped: {:?}: {}",
                    status,
                    message.unwrap_or_default()
                );
                return;
            }

            let next = Status::new(status, message);
            if next == state.current {
                return;
            }
            state.pending = next;

            if state.window.is_some() {
                state.trailing = true;
                return;
            }
            self.shared.promote_leading(&mut state)
        };
        self.shared.send(&emitted);
    }

    /// Last status sent downstream.
    pub fn current(&self) -> Status {
        self.shared.lock().current.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.lock().destroyed
    }

    /// Flush any coalesced status, emit `Disconnected: Destroyed`, and ignore
    /// every later update.
    pub fn destroy(&self) {
        let mut emitted = Vec::with_capacity(2);
        {
            let mut state = self.shared.lock();
            if state.destroyed {
                return;
            }
            if let Some(window) = state.window.take() {
                window.abort();
            }
            if state.trailing {
                state.trailing = false;
                emitted.push(Shared::promote(&mut state));
            }
            state.pending = Status::new(InstanceStatus::Disconnected, Some("Destroyed"));
            emitted.push(Shared::promote(&mut state));
            state.destroyed = true;
        }
        for status in &emitted {
            self.shared.send(status);
        }
        debug!("Status debouncer destroyed");
    }
}

impl StatusUpdate for StatusDebouncer {
    fn update_status(&self, status: InstanceStatus, message: Option<&str>) {
        self.update(status, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStatus;

    const WINDOW: Duration = Duration::from_millis(2000);

    fn status(s: InstanceStatus, msg: &str) -> Status {
        Status::new(s, Some(msg))
    }

    /// Debouncer whose initial emission and window have already passed.
    async fn quiet_debouncer() -> (StatusDebouncer, Arc<RecordingStatus>) {
        let sink = Arc::new(RecordingStatus::default());
        let debouncer = StatusDebouncer::new(
            sink.clone(),
            status(InstanceStatus::Connecting, "Initialising"),
            WINDOW,
        );
        assert_eq!(
            sink.take(),
            vec![status(InstanceStatus::Connecting, "Initialising")]
        );
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        assert!(sink.take().is_empty());
        (debouncer, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_and_trailing_emissions() {
        let (debouncer, sink) = quiet_debouncer().await;
        let a = status(InstanceStatus::Ok, "a");
        let b = status(InstanceStatus::ConnectionFailure, "b");
        let c = status(InstanceStatus::Ok, "c");

        debouncer.update(a.status, a.message.as_deref());
        debouncer.update(b.status, b.message.as_deref());
        debouncer.update(c.status, c.message.as_deref());
        assert_eq!(sink.take(), vec![a]);

        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        assert_eq!(sink.take(), vec![c.clone()]);

        tokio::time::sleep(WINDOW * 3).await;
        assert!(sink.take().is_empty());
        assert_eq!(debouncer.current(), c);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_update_is_ignored() {
        let (debouncer, sink) = quiet_debouncer().await;

        debouncer.update(InstanceStatus::Connecting, Some("Initialising"));
        tokio::time::sleep(WINDOW * 2).await;
        assert!(sink.take().is_empty());

        debouncer.update(InstanceStatus::Ok, None);
        tokio::time::sleep(WINDOW * 2).await;
        debouncer.update(InstanceStatus::Ok, None);
        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(sink.take(), vec![Status::new(InstanceStatus::Ok, None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_after_quiet_window_emits_immediately() {
        let (debouncer, sink) = quiet_debouncer().await;

        debouncer.update(InstanceStatus::Ok, None);
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        debouncer.update(InstanceStatus::ConnectionFailure, Some("ETIMEDOUT"));

        assert_eq!(
            sink.take(),
            vec![
                Status::new(InstanceStatus::Ok, None),
                status(InstanceStatus::ConnectionFailure, "ETIMEDOUT"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_opens_a_new_window() {
        let (debouncer, sink) = quiet_debouncer().await;

        debouncer.update(InstanceStatus::Ok, None);
        debouncer.update(InstanceStatus::ConnectionFailure, Some("x"));
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        assert_eq!(sink.take().len(), 2);

        // Still inside the window opened by the trailing emission.
        debouncer.update(InstanceStatus::Ok, None);
        assert!(sink.take().is_empty());
        tokio::time::sleep(WINDOW).await;
        assert_eq!(sink.take(), vec![Status::new(InstanceStatus::Ok, None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_flushes_then_disconnects_once() {
        let (debouncer, sink) = quiet_debouncer().await;

        debouncer.update(InstanceStatus::Ok, None);
        debouncer.update(InstanceStatus::ConnectionFailure, Some("ECONNREFUSED"));
        debouncer.destroy();

        assert_eq!(
            sink.take(),
            vec![
                Status::new(InstanceStatus::Ok, None),
                status(InstanceStatus::ConnectionFailure, "ECONNREFUSED"),
                status(InstanceStatus::Disconnected, "Destroyed"),
            ]
        );
        assert!(debouncer.is_destroyed());

        debouncer.update(InstanceStatus::Ok, None);
        debouncer.destroy();
        tokio::time::sleep(WINDOW * 3).await;
        assert!(sink.take().is_empty());
        assert_eq!(
            debouncer.current(),
            status(InstanceStatus::Disconnected, "Destroyed")
        );
    }

    /// Answers every failure by reporting a recovery through the debouncer.
    #[derive(Default)]
    struct RecoveringSink {
        seen: std::sync::Mutex<Vec<Status>>,
        debouncer: std::sync::OnceLock<Arc<StatusDebouncer>>,
    }

    impl StatusSink for RecoveringSink {
        fn set_status(&self, status: InstanceStatus, message: Option<&str>) {
            self.seen.lock().unwrap().push(Status::new(status, message));
            if status == InstanceStatus::ConnectionFailure {
                if let Some(debouncer) = self.debouncer.get() {
                    debouncer.update(InstanceStatus::Ok, Some("recovered"));
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_may_update_from_inside_set_status() {
        let sink = Arc::new(RecoveringSink::default());
        let debouncer = Arc::new(StatusDebouncer::new(
            sink.clone(),
            status(InstanceStatus::Connecting, "Initialising"),
            WINDOW,
        ));
        let _ = sink.debouncer.set(Arc::clone(&debouncer));
        tokio::time::sleep(WINDOW * 2).await;

        debouncer.update(InstanceStatus::ConnectionFailure, Some("ETIMEDOUT"));
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;

        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec![
                status(InstanceStatus::Connecting, "Initialising"),
                status(InstanceStatus::ConnectionFailure, "ETIMEDOUT"),
                status(InstanceStatus::Ok, "recovered"),
            ]
        );
        assert_eq!(debouncer.current(), status(InstanceStatus::Ok, "recovered"));
    }
}
