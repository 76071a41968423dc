use crate::enforcer::timer::{deadline_after, EnforcerState, EnforcerTimer, FireCallback};
use crate::models::SessionPolicy;
use tokio::time::Instant;

/// Fires once after `inactivity_timeout_seconds` without activity
///
/// `Idle` while tracking is disabled or no user is present, `Armed` while a
/// timer is pending, `Fired` after the callback ran. Only a fresh [`arm`]
/// leaves `Fired`.
///
/// [`arm`]: InactivityEnforcer::arm
pub struct InactivityEnforcer {
    timer: EnforcerTimer,
}

impl InactivityEnforcer {
    #[must_use]
    pub fn new(on_timeout: FireCallback) -> Self {
        Self {
            timer: EnforcerTimer::new(on_timeout),
        }
    }

    /// Arm for a new session; returns false (and stays `Idle`) when the policy
    /// disables inactivity tracking
    pub fn arm(&self, policy: &SessionPolicy) -> bool {
        if !policy.inactivity_tracking_enabled {
            self.timer.disarm();
            return false;
        }
        let period = policy.inactivity_timeout();
        self.timer.arm(period, deadline_after(Instant::now(), period));
        true
    }

    /// Push the deadline to `now + timeout`; ignored unless `Armed`
    pub fn record_activity(&self) -> bool {
        self.timer.restart()
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
    use std::time::Duration;

    fn policy(inactivity: u64, enabled: bool) -> SessionPolicy {
        SessionPolicy {
            inactivity_timeout_seconds: inactivity,
            absolute_timeout_seconds: 3600,
            inactivity_tracking_enabled: enabled,
            ..SessionPolicy::default()
        }
    }

    fn enforcer() -> (InactivityEnforcer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let enforcer = InactivityEnforcer::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (enforcer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_resets_then_silence_fire_once() {
        let (enforcer, fired) = enforcer();
        assert!(enforcer.arm(&policy(5, true)));

        for _ in 0..20 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(enforcer.record_activity());
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(enforcer.state(), EnforcerState::Fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_moves_deadline() {
        let (enforcer, fired) = enforcer();
        let start = Instant::now();
        enforcer.arm(&policy(5, true));

        tokio::time::sleep(Duration::from_secs(4)).await;
        enforcer.record_activity();
        assert_eq!(enforcer.deadline(), Some(start + Duration::from_secs(9)));

        tokio::time::sleep(Duration::from_millis(1_001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0, "must not fire at the original deadline");

        tokio::time::sleep(Duration::from_millis(3_998)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_policy_never_arms() {
        let (enforcer, fired) = enforcer();
        assert!(!enforcer.arm(&policy(5, false)));
        assert_eq!(enforcer.state(), EnforcerState::Idle);
        assert!(!enforcer.record_activity());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_after_fire_does_not_rearm() {
        let (enforcer, fired) = enforcer();
        enforcer.arm(&policy(1, true));
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(!enforcer.record_activity());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A fresh session arms again
        assert!(enforcer.arm(&policy(1, true)));
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_arms_and_resets() {
        let (enforcer, fired) = enforcer();
        assert!(enforcer.arm(&policy(u64::MAX, true)));
        assert!(enforcer.record_activity());
        assert_eq!(enforcer.state(), EnforcerState::Armed);

        tokio::time::sleep(Duration::from_secs(86400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_while_pending() {
        let (enforcer, fired) = enforcer();
        enforcer.arm(&policy(5, true));
        tokio::time::sleep(Duration::from_secs(4)).await;
        enforcer.disarm();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(enforcer.state(), EnforcerState::Idle);
    }
}
