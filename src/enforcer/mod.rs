//! Timeout enforcers
//!
//! - [`inactivity`] - Logout after a period without user activity
//! - [`absolute`] - Logout (or refresh) when the session reaches its maximum age
//! - [`timer`] - The cancellable one-shot timer both are built on
//!
//! Enforcers only hold a callback. They never touch the user or the session.

pub mod absolute;
pub mod inactivity;
pub mod timer;

pub use absolute::AbsoluteTimeoutEnforcer;
pub use inactivity::InactivityEnforcer;
pub use timer::{EnforcerState, FireCallback};
