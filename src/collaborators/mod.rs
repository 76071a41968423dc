//! External collaborators of the session lifecycle core
//!
//! - [`traits`] - The contracts the core is written against
//! - [`local`] - In-process adapters (auth state, JSON-lines store, log notifier)
//! - [`rest`] - Managed backend client

pub mod local;
pub mod rest;
pub mod traits;

pub use local::{JsonLinesEventStore, LocalAuthProvider, LogNotifier, StaticProfileLookup};
pub use rest::RestBackend;
pub use traits::{AuthProvider, NotificationSink, ProfileLookup, SessionPersistence, SettingsSource};
