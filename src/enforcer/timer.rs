//! Cancellable one-shot timer shared by both enforcers
//!
//! The slot holds the state, the pending task and a generation counter under one
//! mutex. Scheduling bumps the generation and aborts the previous task before
//! spawning the next, so at most one timer is pending. A waking timer fires only
//! if its generation is still current and the state is `Armed`, and it moves the
//! slot to `Fired` under the same lock. A reschedule racing a fire therefore
//! either suppresses the fire or is dropped, never both.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Invoked once when an enforcer fires
pub type FireCallback = Arc<dyn Fn() + Send + Sync>;

/// Deadline used when `from + period` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `from + period`, clamped to a far-future deadline on overflow
pub(crate) fn deadline_after(from: Instant, period: Duration) -> Instant {
    from.checked_add(period)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

/// Enforcer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcerState {
    /// Not watching anything
    Idle,
    /// One timer pending
    Armed,
    /// Timer expired and the callback ran; waits for a fresh arm
    Fired,
}

struct TimerSlot {
    state: EnforcerState,
    generation: u64,
    period: Option<Duration>,
    deadline: Option<Instant>,
    pending: Option<JoinHandle<()>>,
}

impl TimerSlot {
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = None;
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

fn lock(slot: &Mutex<TimerSlot>) -> MutexGuard<'_, TimerSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct EnforcerTimer {
    slot: Arc<Mutex<TimerSlot>>,
    on_fire: FireCallback,
}

impl EnforcerTimer {
    pub(crate) fn new(on_fire: FireCallback) -> Self {
        Self {
            slot: Arc::new(Mutex::new(TimerSlot {
                state: EnforcerState::Idle,
                generation: 0,
                period: None,
                deadline: None,
                pending: None,
            })),
            on_fire,
        }
    }

    /// Arm with `period` and a first deadline, replacing any pending timer
    pub(crate) fn arm(&self, period: Duration, deadline: Instant) {
        let mut slot = lock(&self.slot);
        slot.period = Some(period);
        self.schedule(&mut slot, deadline);
    }

    /// Restart a full period from now, only while `Armed`
    pub(crate) fn restart(&self) -> bool {
        let mut slot = lock(&self.slot);
        match (slot.state, slot.period) {
            (EnforcerState::Armed, Some(period)) => {
                self.schedule(&mut slot, deadline_after(Instant::now(), period));
                true
            }
            _ => false,
        }
    }

    /// Start a full period from now after the timer fired or while armed
    ///
    /// A disarmed timer stays disarmed.
    pub(crate) fn rearm(&self) -> bool {
        let mut slot = lock(&self.slot);
        match (slot.state, slot.period) {
            (EnforcerState::Armed | EnforcerState::Fired, Some(period)) => {
                self.schedule(&mut slot, deadline_after(Instant::now(), period));
                true
            }
            _ => false,
        }
    }

    /// Cancel any pending timer and go `Idle`; the cancelled timer never fires
    pub(crate) fn disarm(&self) {
        let mut slot = lock(&self.slot);
        slot.cancel_pending();
        slot.state = EnforcerState::Idle;
        slot.period = None;
    }

    pub(crate) fn state(&self) -> EnforcerState {
        lock(&self.slot).state
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        lock(&self.slot).deadline
    }

    fn schedule(&self, slot: &mut TimerSlot, deadline: Instant) {
        slot.cancel_pending();
        let generation = slot.generation;
        slot.state = EnforcerState::Armed;
        slot.deadline = Some(deadline);

        let shared = Arc::clone(&self.slot);
        let on_fire = Arc::clone(&self.on_fire);
        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let fire = {
                let mut slot = lock(&shared);
                if slot.generation == generation && slot.state == EnforcerState::Armed {
                    slot.state = EnforcerState::Fired;
                    slot.deadline = None;
                    slot.pending = None;
                    true
                } else {
                    false
                }
            };
            if fire {
                on_fire();
            }
        }));
    }
}

impl Drop for EnforcerTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
