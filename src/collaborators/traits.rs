//! Collaborator traits consumed by the lifecycle core
//!
//! The session core never talks to a backend directly. It is written against
//! these narrow contracts so that the in-process adapters, the REST backend and
//! the test mocks are interchangeable.

use crate::errors::WardenResult;
use crate::models::{AuthStateChange, NotificationKind, SessionEvent, SessionPolicy, User};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// External authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// One-shot probe of the currently authenticated user
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached. The controller treats
    /// a failed probe as "no user".
    async fn get_current_user(&self) -> WardenResult<Option<User>>;

    /// Subscribe to auth-state notifications
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;

    /// Sign the current user out
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardenError::SignOut`] if the provider rejects the call.
    async fn sign_out(&self) -> WardenResult<()>;
}

/// Source of the session policy
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Read the policy for a session that is about to start
    ///
    /// # Errors
    ///
    /// Returns an error if the policy cannot be read; the controller falls back
    /// to [`SessionPolicy::default`].
    async fn session_policy(&self) -> WardenResult<SessionPolicy>;
}

/// Append-only persistence for session events
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Persist one event
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardenError::PersistenceWrite`] if the write fails.
    async fn append_session_event(&self, event: &SessionEvent) -> WardenResult<()>;
}

/// Profile lookup used only for post-logout routing
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Resolve the user type of `user_id`
    ///
    /// # Errors
    ///
    /// Returns [`crate::WardenError::ProfileLookup`] if the profile is missing or
    /// unreadable.
    async fn get_user_type(&self, user_id: &str) -> WardenResult<String>;
}

/// Fire-and-forget user feedback
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind);
}
