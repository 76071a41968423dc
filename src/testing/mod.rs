//! Shared testing utilities for session-warden
//!
//! Compiled for unit tests and, behind the `testing` feature, for the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`mock`] - Recording and scriptable collaborator implementations
//! - [`fixtures`] - Policies and a ready-wired controller harness
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_warden::testing::fixtures::TestFixtures;
//! use session_warden::User;
//!
//! #[tokio::test(start_paused = true)]
//! async fn logs_out_idle_user() {
//!     let harness = TestFixtures::harness(Some(User::new("alice")), TestFixtures::policy(5, 3600));
//!     let controller = harness.start().await;
//!     tokio::time::sleep(std::time::Duration::from_secs(6)).await;
//!     assert!(controller.current_user().is_none());
//! }
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::{TestFixtures, TestHarness};

/// Common test constants
pub mod constants {
    /// Default test user id
    pub const TEST_USER_ID: &str = "test-user";

    /// Default test email address
    pub const TEST_EMAIL: &str = "test@example.com";

    /// User type routed to the special login path
    pub const SPECIAL_USER_TYPE: &str = "contractor";

    /// Ordinary user type
    pub const REGULAR_USER_TYPE: &str = "staff";
}
