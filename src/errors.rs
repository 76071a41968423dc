//! Error types for session lifecycle operations
//!
//! Only [`WardenError::AlreadyTracking`] ever reaches a caller of the lifecycle
//! core. Every other variant is produced by a collaborator and downgraded to a
//! logged warning plus a fallback value before it can interrupt a logout.

use thiserror::Error;

/// Errors raised by the session core and its collaborators
#[derive(Debug, Error)]
pub enum WardenError {
    /// A session is already open for another user without an intervening end
    #[error("session already tracked for user {active_user}, refusing to start for {requested_user}")]
    AlreadyTracking {
        active_user: String,
        requested_user: String,
    },

    /// Appending a session event failed
    #[error("session event write failed: {0}")]
    PersistenceWrite(String),

    /// The external sign-out call failed
    #[error("sign-out failed: {0}")]
    SignOut(String),

    /// The user type lookup for redirect routing failed
    #[error("profile lookup failed: {0}")]
    ProfileLookup(String),

    /// Reading the current user from the auth provider failed
    #[error("auth provider error: {0}")]
    Auth(String),

    /// The session policy could not be read
    #[error("settings error: {0}")]
    Settings(String),

    /// Transport failure talking to the managed backend
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type WardenResult<T> = Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_tracking_message_names_both_users() {
        let err = WardenError::AlreadyTracking {
            active_user: "alice".to_string(),
            requested_user: "bob".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("alice"));
        assert!(msg.contains("bob"));
    }

    #[test]
    fn test_collaborator_errors_display() {
        assert_eq!(
            WardenError::SignOut("timeout".to_string()).to_string(),
            "sign-out failed: timeout"
        );
        assert_eq!(
            WardenError::ProfileLookup("no row".to_string()).to_string(),
            "profile lookup failed: no row"
        );
    }
}
