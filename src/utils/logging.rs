// Centralized logging for session lifecycle transitions
use crate::errors::WardenError;
use crate::models::{LogoutCause, LogoutOutcome, SessionEvent, SessionPolicy, TimeoutKind};
use log::{debug, error, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a successfully persisted session event
    pub fn log_session_event(event: &SessionEvent) {
        debug!(
            "📝 Session event {} for session {} (user {})",
            event.kind, event.session_id, event.user_id
        );
    }

    /// Log a session event that could not be persisted
    pub fn log_persistence_failure(event: &SessionEvent, err: &WardenError) {
        warn!(
            "⚠️  Failed to persist {} event for session {}: {}",
            event.kind, event.session_id, err
        );
    }

    /// Log the policy snapshot taken for a new session
    pub fn log_policy_snapshot(user_id: &str, policy: &SessionPolicy) {
        info!(
            "🔧 Session policy for {}: inactivity={}s (enabled={}), absolute={}s, on_expiry={:?}",
            user_id,
            policy.inactivity_timeout_seconds,
            policy.inactivity_tracking_enabled,
            policy.absolute_timeout_seconds,
            policy.absolute_expiry_action
        );
        if policy.inactivity_exceeds_absolute() {
            warn!(
                "⚠️  Inactivity timeout ({}s) exceeds absolute timeout ({}s); using policy as configured",
                policy.inactivity_timeout_seconds, policy.absolute_timeout_seconds
            );
        }
    }

    /// Log that the policy could not be read and defaults apply
    pub fn log_policy_fallback(err: &WardenError) {
        warn!("⚠️  Could not read session policy, using defaults: {err}");
    }

    /// Log an enforcer firing
    pub fn log_timeout_fired(kind: TimeoutKind, user_id: Option<&str>) {
        let what = match kind {
            TimeoutKind::Inactivity => "Inactivity timeout",
            TimeoutKind::Absolute => "Absolute session timeout",
        };
        info!("⏰ {} reached for {}", what, user_id.unwrap_or("<no user>"));
    }

    /// Log an absolute-expiry refresh
    pub fn log_session_refreshed(user_id: &str) {
        info!("🔄 Session for {user_id} refreshed at absolute expiry (user still active)");
    }

    /// Log that the redirect lookup failed and the default path is used
    pub fn log_profile_lookup_fallback(user_id: &str, err: &WardenError) {
        warn!("⚠️  Profile lookup for {user_id} failed, using default redirect: {err}");
    }

    /// Log a failed external sign-out
    pub fn log_sign_out_failure(err: &WardenError) {
        error!("❌ External sign-out failed, local session cleared anyway: {err}");
    }

    /// Log a completed logout sequence
    pub fn log_logout_complete(outcome: &LogoutOutcome) {
        let cause = match outcome.cause {
            LogoutCause::Manual => "manual",
            LogoutCause::Forced(TimeoutKind::Inactivity) => "inactivity",
            LogoutCause::Forced(TimeoutKind::Absolute) => "absolute timeout",
        };
        info!(
            "👋 Logout ({}) complete for {} -> {}",
            cause,
            outcome.user_id.as_deref().unwrap_or("<no user>"),
            outcome.redirect_path
        );
    }

    /// Log an auth-state notification that was dropped to lag
    pub fn log_auth_stream_lagged(skipped: u64) {
        warn!("⚠️  Auth state stream lagged by {skipped} notifications, re-probing current user");
    }
}
