//! Session Lifecycle Controller
//!
//! This module provides the `SessionLifecycleController`, the single owner of the
//! authenticated-user reference, the per-session policy snapshot and both
//! enforcers. It is the integration point between the auth provider, the
//! activity monitor, the enforcers and the session tracker.
//!
//! ## Organization
//!
//! 1. **Construction** - Wiring collaborators and enforcer callbacks
//! 2. **Auth transitions** - Reacting to the auth-state stream
//! 3. **Enforcer signals** - Timeouts, refreshes and activity resets
//! 4. **Logout** - The single canonical teardown sequence
//! 5. **Disposal** - Cancelling everything the controller started
//!
//! ## Invariants
//!
//! - The current user lives in one mutex-guarded cell; every transition
//!   compares against its present value.
//! - No lock is held across an `.await`. Lock order is controller state, then
//!   enforcer slot.
//! - At most one logout sequence runs at a time. Later callers wait for it and
//!   receive the same redirect path.

use crate::activity::{ActivityMonitor, ActivitySubscription};
use crate::collaborators::traits::{
    AuthProvider, NotificationSink, ProfileLookup, SessionPersistence, SettingsSource,
};
use crate::enforcer::{AbsoluteTimeoutEnforcer, EnforcerState, FireCallback, InactivityEnforcer};
use crate::lifecycle::redirect::RedirectRules;
use crate::models::{
    AuthEvent, AuthStateChange, EndReason, ExpiryAction, LogoutCause, LogoutOutcome,
    NotificationKind, Session, SessionPolicy, TimeoutKind, User,
};
use crate::session::{SessionEventLog, SessionTracker};
use crate::utils::logging::LoggingHelper;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const OUTCOME_CHANNEL_CAPACITY: usize = 16;

/// External collaborators the controller is built from
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthProvider>,
    pub settings: Arc<dyn SettingsSource>,
    pub persistence: Arc<dyn SessionPersistence>,
    pub profiles: Arc<dyn ProfileLookup>,
    pub notifier: Arc<dyn NotificationSink>,
}

type RedirectReceiver = watch::Receiver<Option<String>>;

#[derive(Default)]
struct ControllerState {
    current_user: Option<User>,
    policy: Option<SessionPolicy>,
    activity: Option<ActivitySubscription>,
    listener: Option<JoinHandle<()>>,
    logout: Option<RedirectReceiver>,
    disposed: bool,
}

struct ControllerInner {
    collaborators: Collaborators,
    tracker: SessionTracker,
    monitor: ActivityMonitor,
    redirects: RedirectRules,
    inactivity: InactivityEnforcer,
    absolute: AbsoluteTimeoutEnforcer,
    state: Mutex<ControllerState>,
    outcomes: broadcast::Sender<LogoutOutcome>,
    weak_self: Weak<ControllerInner>,
}

/// Owner of the authenticated-session lifecycle
///
/// One instance per application. Dropping it disarms both enforcers and stops
/// listening to the auth provider; [`dispose`](Self::dispose) additionally
/// awaits the closing of any open session.
pub struct SessionLifecycleController {
    inner: Arc<ControllerInner>,
}

// =============================================================================
// 1. Construction
// =============================================================================

impl SessionLifecycleController {
    /// Subscribe to the auth provider, probe the current user, and start
    /// tracking if someone is signed in
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(collaborators: Collaborators, redirects: RedirectRules) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let inner = Arc::new_cyclic(|weak: &Weak<ControllerInner>| ControllerInner {
            tracker: SessionTracker::new(SessionEventLog::new(Arc::clone(
                &collaborators.persistence,
            ))),
            collaborators,
            monitor: ActivityMonitor::new(),
            redirects,
            inactivity: InactivityEnforcer::new(timeout_callback(weak, TimeoutKind::Inactivity)),
            absolute: AbsoluteTimeoutEnforcer::new(timeout_callback(weak, TimeoutKind::Absolute)),
            state: Mutex::new(ControllerState::default()),
            outcomes,
            weak_self: weak.clone(),
        });

        // Subscribe before probing so no transition between the two is lost;
        // queued duplicates are absorbed by comparing with the current user.
        let receiver = inner.collaborators.auth.subscribe();
        let initial = inner.probe_current_user().await;
        inner
            .apply_auth_change(AuthStateChange {
                event: AuthEvent::InitialSession,
                user: initial,
            })
            .await;

        let listener = tokio::spawn(listen(Arc::downgrade(&inner), receiver));
        inner.lock_state().listener = Some(listener);

        Self { inner }
    }

    /// The currently authenticated user
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.lock_state().current_user.clone()
    }

    /// Policy snapshot of the running session
    #[must_use]
    pub fn policy(&self) -> Option<SessionPolicy> {
        self.inner.lock_state().policy
    }

    /// The tracked session, if one is open
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.inner.tracker.current_session()
    }

    /// Monitor the host feeds interaction signals into
    #[must_use]
    pub fn activity_monitor(&self) -> &ActivityMonitor {
        &self.inner.monitor
    }

    #[must_use]
    pub fn inactivity_state(&self) -> EnforcerState {
        self.inner.inactivity.state()
    }

    #[must_use]
    pub fn absolute_state(&self) -> EnforcerState {
        self.inner.absolute.state()
    }

    #[must_use]
    pub fn is_logging_out(&self) -> bool {
        self.inner.lock_state().logout.is_some()
    }

    /// Every completed logout, including enforcer-driven ones nobody awaited
    #[must_use]
    pub fn subscribe_logouts(&self) -> broadcast::Receiver<LogoutOutcome> {
        self.inner.outcomes.subscribe()
    }

    /// Log the current user out and return the path to redirect to
    ///
    /// Never fails. If a logout is already running this waits for it and returns
    /// the same path.
    pub async fn logout(&self) -> String {
        match self.inner.begin_logout(LogoutCause::Manual) {
            Some(receiver) => self.inner.await_redirect(receiver).await,
            None => self.inner.redirects.default_path().to_string(),
        }
    }

    /// Stop listening, disarm both enforcers, and end any open session
    pub async fn dispose(&self) {
        if self.inner.shutdown() {
            self.inner
                .tracker
                .end_session_tracking(EndReason::Teardown)
                .await;
            self.inner.clear_local_state();
            info!("🧹 Session lifecycle controller disposed");
        }
    }
}

impl Drop for SessionLifecycleController {
    fn drop(&mut self) {
        if !self.inner.shutdown() || self.inner.tracker.current_session().is_none() {
            return;
        }
        // The session can only be closed asynchronously; do it if a runtime is
        // still around.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move {
                inner.tracker.end_session_tracking(EndReason::Teardown).await;
            });
        } else {
            warn!("⚠️  Controller dropped outside a runtime; open session left unclosed");
        }
    }
}

fn timeout_callback(weak: &Weak<ControllerInner>, kind: TimeoutKind) -> FireCallback {
    let weak = weak.clone();
    Arc::new(move || {
        if let Some(inner) = weak.upgrade() {
            inner.on_timeout(kind);
        }
    })
}

// =============================================================================
// 2. Auth transitions
// =============================================================================

async fn listen(weak: Weak<ControllerInner>, mut receiver: broadcast::Receiver<AuthStateChange>) {
    loop {
        let received = receiver.recv().await;
        let Some(inner) = weak.upgrade() else {
            break;
        };
        match received {
            Ok(change) => inner.apply_auth_change(change).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                LoggingHelper::log_auth_stream_lagged(skipped);
                let user = inner.probe_current_user().await;
                inner
                    .apply_auth_change(AuthStateChange {
                        event: AuthEvent::UserUpdated,
                        user,
                    })
                    .await;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Auth state stream closed");
                break;
            }
        }
    }
}

impl ControllerInner {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn probe_current_user(&self) -> Option<User> {
        match self.collaborators.auth.get_current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("⚠️  Current user probe failed, treating as signed out: {e}");
                None
            }
        }
    }

    async fn apply_auth_change(&self, change: AuthStateChange) {
        // Transitions that arrive mid-logout are applied once it has finished.
        let in_flight = self.lock_state().logout.clone();
        if let Some(receiver) = in_flight {
            self.await_redirect(receiver).await;
        }

        let previous = {
            let mut state = self.lock_state();
            if state.disposed {
                return;
            }
            std::mem::replace(&mut state.current_user, change.user.clone())
        };

        match (previous, change.user) {
            (None, None) => {}
            (None, Some(user)) => self.open_session(user).await,
            (Some(previous), None) => {
                debug!("Auth provider reports {} signed out", previous.id);
                self.close_session(EndReason::SignedOut).await;
            }
            (Some(previous), Some(user)) if previous.id != user.id => {
                info!("🔁 Signed-in user changed from {} to {}", previous.id, user.id);
                self.close_session(EndReason::SignedOut).await;
                self.open_session(user).await;
            }
            (Some(_), Some(user)) => {
                if change.event == AuthEvent::TokenRefreshed {
                    debug!("Token refreshed for {}", user.id);
                    self.tracker.log_session_refresh_event().await;
                }
            }
        }
    }

    async fn open_session(&self, user: User) {
        let opened_at = Instant::now();
        let policy = match self.collaborators.settings.session_policy().await {
            Ok(policy) => policy,
            Err(e) => {
                LoggingHelper::log_policy_fallback(&e);
                SessionPolicy::default()
            }
        };
        LoggingHelper::log_policy_snapshot(&user.id, &policy);

        if let Err(e) = self.tracker.start_session_tracking(&user.id).await {
            error!("❌ Could not start session tracking: {e}");
            return;
        }

        let abandoned = {
            let mut state = self.lock_state();
            let still_current = state
                .current_user
                .as_ref()
                .is_some_and(|current| current.id == user.id);
            if state.disposed || state.logout.is_some() || !still_current {
                Some(if state.disposed {
                    EndReason::Teardown
                } else {
                    EndReason::SignedOut
                })
            } else {
                state.policy = Some(policy);
                self.inactivity.arm(&policy);
                match user.signed_in_at {
                    Some(signed_in_at) => {
                        let age = (Utc::now() - signed_in_at)
                            .to_std()
                            .unwrap_or(Duration::ZERO);
                        self.absolute.arm_elapsed(&policy, age);
                    }
                    None => self.absolute.arm(&policy, opened_at),
                }
                let weak = self.weak_self.clone();
                state.activity = Some(self.monitor.start(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.inactivity.record_activity();
                    }
                }));
                None
            }
        };

        if let Some(reason) = abandoned {
            debug!("Session for {} superseded before arming", user.id);
            self.tracker.end_session_tracking(reason).await;
        }
    }

    async fn close_session(&self, reason: EndReason) {
        {
            let mut state = self.lock_state();
            self.disarm_enforcers(&mut state);
            state.policy = None;
        }
        self.tracker.end_session_tracking(reason).await;
    }

    fn disarm_enforcers(&self, state: &mut ControllerState) {
        self.inactivity.disarm();
        self.absolute.disarm();
        state.activity = None;
    }

    // =========================================================================
    // 3. Enforcer signals
    // =========================================================================

    fn on_timeout(&self, kind: TimeoutKind) {
        // Decided and started under one lock so a concurrent sign-out or user
        // switch cannot slip between the check and the logout.
        let state = self.lock_state();
        if state.disposed || state.logout.is_some() {
            return;
        }
        let Some(user_id) = state.current_user.as_ref().map(|user| user.id.clone()) else {
            return;
        };
        let policy = state.policy.unwrap_or_default();
        if kind == TimeoutKind::Absolute
            && policy.absolute_expiry_action == ExpiryAction::Refresh
            && self.is_still_active(&policy)
        {
            self.absolute.rearm();
            drop(state);
            LoggingHelper::log_session_refreshed(&user_id);
            self.spawn_refresh_log();
            return;
        }

        LoggingHelper::log_timeout_fired(kind, Some(&user_id));
        // The in-flight receiver is enough; later callers pick it up from state.
        drop(self.begin_logout_locked(state, LogoutCause::Forced(kind)));
    }

    fn is_still_active(&self, policy: &SessionPolicy) -> bool {
        let window = if policy.inactivity_tracking_enabled {
            policy.inactivity_timeout()
        } else {
            policy.absolute_timeout()
        };
        self.monitor.time_since_last_activity() < window
    }

    fn spawn_refresh_log(&self) {
        if let Some(inner) = self.weak_self.upgrade() {
            tokio::spawn(async move {
                inner.tracker.log_session_refresh_event().await;
            });
        }
    }

    // =========================================================================
    // 4. Logout
    // =========================================================================

    /// Start the logout sequence unless one is already running
    ///
    /// Returns `None` once the controller is disposed.
    fn begin_logout(&self, cause: LogoutCause) -> Option<RedirectReceiver> {
        let state = self.lock_state();
        if state.disposed {
            debug!("Logout requested after dispose, nothing to sign out");
            return None;
        }
        Some(self.begin_logout_locked(state, cause))
    }

    /// Both enforcers are disarmed before this returns, so neither can fire into
    /// a second sequence.
    fn begin_logout_locked(
        &self,
        mut state: MutexGuard<'_, ControllerState>,
        cause: LogoutCause,
    ) -> RedirectReceiver {
        if let Some(receiver) = &state.logout {
            debug!("Logout already in flight, joining it");
            return receiver.clone();
        }

        let (sender, receiver) = watch::channel(None);
        state.logout = Some(receiver.clone());
        self.disarm_enforcers(&mut state);
        let outgoing = state.current_user.clone();
        drop(state);

        let Some(inner) = self.weak_self.upgrade() else {
            // Controller is being torn down; nobody is left to sequence the logout.
            let _ = sender.send(Some(self.redirects.default_path().to_string()));
            return receiver;
        };
        tokio::spawn(async move {
            let outcome = inner.run_logout(cause, outgoing).await;
            inner.lock_state().logout = None;
            let _ = sender.send(Some(outcome.redirect_path.clone()));
            LoggingHelper::log_logout_complete(&outcome);
            let _ = inner.outcomes.send(outcome);
        });
        receiver
    }

    async fn await_redirect(&self, mut receiver: RedirectReceiver) -> String {
        let path = match receiver.wait_for(Option::is_some).await {
            Ok(path) => path.clone(),
            Err(_) => None,
        };
        path.unwrap_or_else(|| self.redirects.default_path().to_string())
    }

    /// The canonical teardown sequence; total, every step is best-effort
    async fn run_logout(&self, cause: LogoutCause, outgoing: Option<User>) -> LogoutOutcome {
        match cause {
            LogoutCause::Forced(TimeoutKind::Inactivity) => {
                self.tracker.log_inactivity_event().await;
            }
            LogoutCause::Forced(TimeoutKind::Absolute) => {
                self.tracker.log_absolute_timeout_event().await;
            }
            LogoutCause::Manual => {}
        }

        // 1. Close the audit trail
        self.tracker.end_session_tracking(cause.end_reason()).await;

        // 2. Route by the outgoing user's type
        let user_id = outgoing.map(|user| user.id);
        let mut redirect_path = self
            .redirects
            .resolve(self.collaborators.profiles.as_ref(), user_id.as_deref())
            .await;

        // 3. External sign-out
        let signed_out = match self.collaborators.auth.sign_out().await {
            Ok(()) => true,
            Err(e) => {
                LoggingHelper::log_sign_out_failure(&e);
                redirect_path = self.redirects.default_path().to_string();
                false
            }
        };

        // 4. Local state
        self.clear_local_state();

        // 5. Tell the user
        let (message, kind) = logout_notice(cause, signed_out);
        self.collaborators.notifier.notify(message, kind);

        // 6. Hand the path back
        LogoutOutcome {
            cause,
            user_id,
            redirect_path,
            signed_out,
        }
    }

    fn clear_local_state(&self) {
        let mut state = self.lock_state();
        state.current_user = None;
        state.policy = None;
        state.activity = None;
    }

    // =========================================================================
    // 5. Disposal
    // =========================================================================

    /// Synchronous part of disposal; returns false if already disposed
    fn shutdown(&self) -> bool {
        let (listener, activity) = {
            let mut state = self.lock_state();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            self.inactivity.disarm();
            self.absolute.disarm();
            (state.listener.take(), state.activity.take())
        };
        if let Some(listener) = listener {
            listener.abort();
        }
        drop(activity);
        true
    }
}

fn logout_notice(cause: LogoutCause, signed_out: bool) -> (&'static str, NotificationKind) {
    if !signed_out {
        return (
            "Sign-out could not be confirmed with the server. You have been signed out on this device.",
            NotificationKind::Error,
        );
    }
    match cause {
        LogoutCause::Manual => ("You have been signed out.", NotificationKind::Success),
        LogoutCause::Forced(TimeoutKind::Inactivity) => (
            "You were signed out after a period of inactivity.",
            NotificationKind::Warning,
        ),
        LogoutCause::Forced(TimeoutKind::Absolute) => (
            "Your session has expired. Please sign in again.",
            NotificationKind::Warning,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionEventKind;
    use crate::testing::constants::{TEST_EMAIL, TEST_USER_ID};
    use crate::testing::fixtures::TestFixtures;

    #[tokio::test(start_paused = true)]
    async fn test_start_with_signed_in_user_arms_enforcers() {
        let harness = TestFixtures::harness(Some(TestFixtures::user()), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        let user = controller.current_user().unwrap();
        assert_eq!(user.id, TEST_USER_ID);
        assert_eq!(user.email.as_deref(), Some(TEST_EMAIL));
        assert_eq!(controller.current_session().unwrap().user_id, TEST_USER_ID);
        assert_eq!(controller.inactivity_state(), EnforcerState::Armed);
        assert_eq!(controller.absolute_state(), EnforcerState::Armed);
        assert_eq!(harness.persistence.kinds(), vec![SessionEventKind::Start]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_user_stays_idle() {
        let harness = TestFixtures::harness(None, TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        assert!(controller.current_user().is_none());
        assert_eq!(controller.inactivity_state(), EnforcerState::Idle);
        assert!(harness.persistence.kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_is_treated_as_signed_out() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        harness.auth.fail_probe();
        let controller = harness.start().await;
        assert!(controller.current_user().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_notification_ends_session() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        harness.auth.emit(AuthStateChange::signed_out());
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(controller.current_user().is_none());
        assert_eq!(controller.inactivity_state(), EnforcerState::Idle);
        assert_eq!(
            harness.persistence.kinds(),
            vec![SessionEventKind::Start, SessionEventKind::SignedOut]
        );
        assert_eq!(harness.auth.sign_out_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_sign_in_notifications_start_once() {
        let harness = TestFixtures::harness(None, TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        harness.auth.emit(AuthStateChange::signed_in(User::new("alice")));
        harness.auth.emit(AuthStateChange::signed_in(User::new("alice")));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(controller.current_user().unwrap().id, "alice");
        assert_eq!(harness.persistence.kinds(), vec![SessionEventKind::Start]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_refresh_logs_refresh_event() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let _controller = harness.start().await;

        harness.auth.emit(AuthStateChange::token_refreshed(User::new("alice")));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(
            harness.persistence.kinds(),
            vec![SessionEventKind::Start, SessionEventKind::Refresh]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_switch_ends_then_starts() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;
        let alice_session = controller.current_session().unwrap().session_id;

        harness.auth.emit(AuthStateChange::signed_in(User::new("bob")));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let bob_session = controller.current_session().unwrap();
        assert_eq!(bob_session.user_id, "bob");
        assert_ne!(bob_session.session_id, alice_session);
        assert_eq!(
            harness.persistence.kinds(),
            vec![
                SessionEventKind::Start,
                SessionEventKind::SignedOut,
                SessionEventKind::Start
            ]
        );
        assert_eq!(controller.inactivity_state(), EnforcerState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_failure_uses_defaults() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        harness.settings.fail();
        let controller = harness.start().await;
        assert_eq!(controller.policy(), Some(SessionPolicy::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_logout_sequence() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        let path = controller.logout().await;

        assert_eq!(path, "/login");
        assert!(controller.current_user().is_none());
        assert!(!controller.is_logging_out());
        assert_eq!(harness.auth.sign_out_calls(), 1);
        assert_eq!(
            harness.persistence.kinds(),
            vec![SessionEventKind::Start, SessionEventKind::ManualLogout]
        );
        assert_eq!(
            harness.notifier.kinds(),
            vec![NotificationKind::Success]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_maximal_timeouts_start_and_accept_activity() {
        let harness = TestFixtures::harness(
            Some(User::new("alice")),
            TestFixtures::policy(u64::MAX, u64::MAX),
        );
        let controller = harness.start().await;
        assert_eq!(controller.inactivity_state(), EnforcerState::Armed);
        assert_eq!(controller.absolute_state(), EnforcerState::Armed);

        for _ in 0..3 {
            controller
                .activity_monitor()
                .record(crate::activity::ActivitySignal::KeyPress);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        tokio::time::sleep(Duration::from_secs(86400)).await;

        assert_eq!(controller.current_user().unwrap().id, "alice");
        assert_eq!(controller.inactivity_state(), EnforcerState::Armed);
        assert_eq!(harness.auth.sign_out_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_sign_out_does_not_log_out() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        harness.auth.emit(AuthStateChange::signed_out());
        tokio::time::sleep(Duration::from_millis(1)).await;
        // A timer that woke just before the sign-out was applied
        controller.inner.on_timeout(TimeoutKind::Inactivity);

        assert!(!controller.is_logging_out());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(harness.auth.sign_out_calls(), 0);
        assert!(harness.notifier.kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_user_switch_keeps_new_user() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;

        harness.auth.emit(AuthStateChange::signed_in(User::new("bob")));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(controller.current_user().unwrap().id, "bob");

        // Bob's own timer is armed; an expiry now is his, decided against him
        controller.inner.on_timeout(TimeoutKind::Inactivity);
        let path = controller.logout().await;

        assert_eq!(path, "/login");
        assert_eq!(harness.auth.sign_out_calls(), 1);
        assert_eq!(
            harness.persistence.kinds(),
            vec![
                SessionEventKind::Start,
                SessionEventKind::SignedOut,
                SessionEventKind::Start,
                SessionEventKind::InactivityTimeout,
                SessionEventKind::ForcedLogout
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_after_dispose_is_local_noop() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;
        controller.dispose().await;

        let path = controller.logout().await;

        assert_eq!(path, "/login");
        assert!(!controller.is_logging_out());
        assert_eq!(harness.auth.sign_out_calls(), 0);
        assert!(harness.notifier.kinds().is_empty());
        assert_eq!(
            harness.persistence.kinds(),
            vec![SessionEventKind::Start, SessionEventKind::Teardown]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_dispose_is_ignored() {
        let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
        let controller = harness.start().await;
        controller.dispose().await;

        controller.inner.on_timeout(TimeoutKind::Absolute);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(harness.auth.sign_out_calls(), 0);
    }

    #[test]
    fn test_logout_notice_kinds() {
        assert_eq!(
            logout_notice(LogoutCause::Manual, true).1,
            NotificationKind::Success
        );
        assert_eq!(
            logout_notice(LogoutCause::Forced(TimeoutKind::Absolute), true).1,
            NotificationKind::Warning
        );
        assert_eq!(
            logout_notice(LogoutCause::Manual, false).1,
            NotificationKind::Error
        );
    }
}
