#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the session-warden library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod activity;
pub mod collaborators;
pub mod enforcer;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use activity::{ActivityMonitor, ActivitySignal, ActivitySubscription};
pub use enforcer::{AbsoluteTimeoutEnforcer, EnforcerState, InactivityEnforcer};
pub use errors::{WardenError, WardenResult};
pub use lifecycle::{Collaborators, RedirectRules, SessionLifecycleController};
pub use models::{
    AuthEvent, AuthStateChange, EndReason, ExpiryAction, LogoutCause, LogoutOutcome,
    NotificationKind, Session, SessionEvent, SessionEventKind, SessionId, SessionPolicy,
    TimeoutKind, User,
};
pub use session::{SessionEventLog, SessionTracker};
pub use settings::WardenSettings;
