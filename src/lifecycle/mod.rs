//! Session lifecycle orchestration
//!
//! - [`controller`] - Owner of the user, the policy snapshot and both enforcers
//! - [`redirect`] - Post-logout routing by user type

pub mod controller;
pub mod redirect;

pub use controller::{Collaborators, SessionLifecycleController};
pub use redirect::RedirectRules;
