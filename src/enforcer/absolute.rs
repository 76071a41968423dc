use crate::enforcer::timer::{deadline_after, EnforcerState, EnforcerTimer, FireCallback};
use crate::models::SessionPolicy;
use std::time::Duration;
use tokio::time::Instant;

/// Fires once when the session reaches `absolute_timeout_seconds`, regardless
/// of activity
pub struct AbsoluteTimeoutEnforcer {
    timer: EnforcerTimer,
}

impl AbsoluteTimeoutEnforcer {
    #[must_use]
    pub fn new(on_expiry: FireCallback) -> Self {
        Self {
            timer: EnforcerTimer::new(on_expiry),
        }
    }

    /// Arm for a session that started at `started`
    pub fn arm(&self, policy: &SessionPolicy, started: Instant) {
        let period = policy.absolute_timeout();
        self.timer.arm(period, deadline_after(started, period));
    }

    /// Arm for a session that has already lived for `elapsed`, e.g. one that
    /// began before a restart; an exhausted budget fires on the next tick
    pub fn arm_elapsed(&self, policy: &SessionPolicy, elapsed: Duration) {
        let period = policy.absolute_timeout();
        let remaining = period.saturating_sub(elapsed);
        self.timer.arm(period, deadline_after(Instant::now(), remaining));
    }

    /// Start another full period from now after a refresh
    pub fn rearm(&self) -> bool {
        self.timer.rearm()
    }

    pub fn disarm(&self) {
        self.timer.disarm();
    }

    #[must_use]
    pub fn state(&self) -> EnforcerState {
        self.timer.state()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy(absolute: u64) -> SessionPolicy {
        SessionPolicy {
            inactivity_timeout_seconds: 5,
            absolute_timeout_seconds: absolute,
            ..SessionPolicy::default()
        }
    }

    fn enforcer() -> (AbsoluteTimeoutEnforcer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let enforcer = AbsoluteTimeoutEnforcer::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (enforcer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_absolute_age() {
        let (enforcer, fired) = enforcer();
        enforcer.arm(&policy(10), Instant::now());

        tokio::time::sleep(Duration::from_millis(9_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(enforcer.state(), EnforcerState::Fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measured_from_session_start() {
        let (enforcer, fired) = enforcer();
        let started = Instant::now();
        tokio::time::sleep(Duration::from_secs(3)).await;

        enforcer.arm(&policy(10), started);
        assert_eq!(enforcer.deadline(), Some(started + Duration::from_secs(10)));

        tokio::time::sleep(Duration::from_millis(7_001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_budget_is_respected() {
        let (enforcer, fired) = enforcer();
        enforcer.arm_elapsed(&policy(3600), Duration::from_secs(3595));

        tokio::time::sleep(Duration::from_millis(5_001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_fires_immediately() {
        let (enforcer, fired) = enforcer();
        enforcer.arm_elapsed(&policy(60), Duration::from_secs(600));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_lifetime_does_not_overflow() {
        let (enforcer, fired) = enforcer();
        enforcer.arm(&policy(u64::MAX), Instant::now());
        enforcer.arm_elapsed(&policy(u64::MAX), Duration::from_secs(60));
        assert!(enforcer.rearm());
        assert_eq!(enforcer.state(), EnforcerState::Armed);

        tokio::time::sleep(Duration::from_secs(86400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_and_disarm() {
        let (enforcer, fired) = enforcer();
        enforcer.arm(&policy(10), Instant::now());
        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(enforcer.rearm());
        enforcer.disarm();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!enforcer.rearm());
    }
}
