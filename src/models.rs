//! Session lifecycle data types
//!
//! This module provides the records shared by the tracker, the enforcers and the
//! lifecycle controller: the authenticated principal, the tracked session, the
//! immutable audit events and the per-session policy snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Authenticated principal as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-side sign-in time, used to keep the absolute lifetime stable
    /// across restarts. `None` means "measure from the local session start".
    #[serde(default)]
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a user known only by id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            signed_in_at: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_signed_in_at(mut self, signed_in_at: DateTime<Utc>) -> Self {
        self.signed_in_at = Some(signed_in_at);
        self
    }
}

/// Opaque session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One continuous authenticated period, owned by the session tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub last_refreshed_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Open a new session for `user_id` starting now
    #[must_use]
    pub fn open(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            user_id: user_id.to_string(),
            started_at: now,
            last_refreshed_at: now,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Kind of lifecycle transition recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Start,
    Refresh,
    InactivityTimeout,
    AbsoluteTimeout,
    ManualLogout,
    ForcedLogout,
    SignedOut,
    Teardown,
}

impl SessionEventKind {
    /// Whether this kind closes a session
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ManualLogout | Self::ForcedLogout | Self::SignedOut | Self::Teardown
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Refresh => "refresh",
            Self::InactivityTimeout => "inactivity_timeout",
            Self::AbsoluteTimeout => "absolute_timeout",
            Self::ManualLogout => "manual_logout",
            Self::ForcedLogout => "forced_logout",
            Self::SignedOut => "signed_out",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of a lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub user_id: String,
    pub kind: SessionEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    #[must_use]
    pub fn for_session(session: &Session, kind: SessionEventKind) -> Self {
        Self {
            session_id: session.session_id,
            user_id: session.user_id.clone(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Which timeout caused a forced logout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    Inactivity,
    Absolute,
}

impl TimeoutKind {
    /// Event written at the moment the timeout is detected
    #[must_use]
    pub fn event_kind(self) -> SessionEventKind {
        match self {
            Self::Inactivity => SessionEventKind::InactivityTimeout,
            Self::Absolute => SessionEventKind::AbsoluteTimeout,
        }
    }
}

/// Why a session is being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndReason {
    /// User asked to log out
    Manual,
    /// An enforcer fired
    Forced(TimeoutKind),
    /// The auth provider reported that the user is gone
    SignedOut,
    /// The controller was disposed with a session still open
    Teardown,
}

impl EndReason {
    /// Terminal event appended when the session closes
    #[must_use]
    pub fn terminal_event(self) -> SessionEventKind {
        match self {
            Self::Manual => SessionEventKind::ManualLogout,
            Self::Forced(_) => SessionEventKind::ForcedLogout,
            Self::SignedOut => SessionEventKind::SignedOut,
            Self::Teardown => SessionEventKind::Teardown,
        }
    }
}

/// What the absolute timeout does on expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryAction {
    /// Force a logout
    #[default]
    Logout,
    /// Refresh the session if the user is still active, otherwise log out
    Refresh,
}

impl std::str::FromStr for ExpiryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logout" => Ok(Self::Logout),
            "refresh" => Ok(Self::Refresh),
            other => Err(format!("unknown absolute expiry action: {other}")),
        }
    }
}

/// Per-session configuration snapshot
///
/// Read once when a session starts and treated as immutable until the next
/// session. `inactivity_timeout_seconds <= absolute_timeout_seconds` is not
/// enforced; see [`SessionPolicy::inactivity_exceeds_absolute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    pub inactivity_timeout_seconds: u64,
    pub absolute_timeout_seconds: u64,
    pub inactivity_tracking_enabled: bool,
    #[serde(default)]
    pub absolute_expiry_action: ExpiryAction,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            inactivity_timeout_seconds: 30 * 60,
            absolute_timeout_seconds: 8 * 60 * 60,
            inactivity_tracking_enabled: true,
            absolute_expiry_action: ExpiryAction::Logout,
        }
    }
}

impl SessionPolicy {
    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_seconds)
    }

    #[must_use]
    pub fn absolute_timeout(&self) -> Duration {
        Duration::from_secs(self.absolute_timeout_seconds)
    }

    /// True when the inactivity window is longer than the whole session may live.
    /// Accepted as configured; callers only warn about it.
    #[must_use]
    pub fn inactivity_exceeds_absolute(&self) -> bool {
        self.inactivity_tracking_enabled
            && self.inactivity_timeout_seconds > self.absolute_timeout_seconds
    }
}

/// Auth provider notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One auth-state notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub user: Option<User>,
}

impl AuthStateChange {
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            user: Some(user),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            user: None,
        }
    }

    #[must_use]
    pub fn token_refreshed(user: User) -> Self {
        Self {
            event: AuthEvent::TokenRefreshed,
            user: Some(user),
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

/// What triggered a logout sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoutCause {
    Manual,
    Forced(TimeoutKind),
}

impl LogoutCause {
    #[must_use]
    pub fn end_reason(self) -> EndReason {
        match self {
            Self::Manual => EndReason::Manual,
            Self::Forced(kind) => EndReason::Forced(kind),
        }
    }
}

/// Completed logout, broadcast so a router can apply the redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub cause: LogoutCause,
    pub user_id: Option<String>,
    pub redirect_path: String,
    pub signed_out: bool,
}
