//! Session tracking
//!
//! - [`tracker`] - Owner of the open session
//! - [`event_log`] - Append-only audit trail of lifecycle events

pub mod event_log;
pub mod tracker;

pub use event_log::SessionEventLog;
pub use tracker::SessionTracker;
