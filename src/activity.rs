//! User activity monitoring
//!
//! The host feeds interaction signals into [`ActivityMonitor::record`]. Each
//! subscriber runs on its own task and is woken through a `watch` channel, so any
//! burst of signals recorded between two runs of a subscriber collapses into a
//! single `on_activity` call.
//!
//! A host that never records signals leaves every subscriber idle. Inactivity
//! enforcement then never resets, and the absolute timeout is the only limit that
//! effectively moves sessions along; this is an accepted degradation.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Qualifying interaction signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    PointerMove,
    PointerDown,
    KeyPress,
    Scroll,
    Touch,
    Focus,
}

struct MonitorShared {
    last_activity: Mutex<Instant>,
    pulses: watch::Sender<u64>,
}

/// Observes interaction signals; cheap to clone, all clones share state
#[derive(Clone)]
pub struct ActivityMonitor {
    shared: Arc<MonitorShared>,
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityMonitor {
    #[must_use]
    pub fn new() -> Self {
        let (pulses, _) = watch::channel(0);
        Self {
            shared: Arc::new(MonitorShared {
                last_activity: Mutex::new(Instant::now()),
                pulses,
            }),
        }
    }

    /// Record one interaction signal
    pub fn record(&self, signal: ActivitySignal) {
        log::trace!("activity: {signal:?}");
        *self
            .shared
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.shared.pulses.send_modify(|count| *count = count.wrapping_add(1));
    }

    /// Elapsed time since the last recorded signal (or since creation)
    #[must_use]
    pub fn time_since_last_activity(&self) -> Duration {
        self.shared
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// Call `on_activity` after signals recorded from now on
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, on_activity: F) -> ActivitySubscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        // A fresh receiver has the current value marked as seen, so signals
        // recorded before this call are not delivered.
        let mut pulses = self.shared.pulses.subscribe();

        let task = tokio::spawn(async move {
            while pulses.changed().await.is_ok() {
                on_activity();
            }
        });
        ActivitySubscription { task: Some(task) }
    }

    /// Stop a subscription; equivalent to dropping it
    pub fn stop(&self, subscription: ActivitySubscription) {
        drop(subscription);
    }
}

/// Handle to a running activity subscriber; aborts it on drop
pub struct ActivitySubscription {
    task: Option<JoinHandle<()>>,
}

impl ActivitySubscription {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ActivitySubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
