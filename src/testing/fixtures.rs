//! Test fixtures providing pre-built policies and a wired controller

use crate::lifecycle::{Collaborators, RedirectRules, SessionLifecycleController};
use crate::models::{ExpiryAction, SessionPolicy};
use crate::User;
use std::sync::Arc;

use super::constants::{REGULAR_USER_TYPE, TEST_EMAIL, TEST_USER_ID};
use super::mock::{
    MockAuthProvider, MockProfileLookup, MockSettingsSource, RecordingNotifier,
    RecordingPersistence,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Policy with inactivity tracking enabled and logout on absolute expiry
    #[must_use]
    pub fn policy(inactivity_seconds: u64, absolute_seconds: u64) -> SessionPolicy {
        SessionPolicy {
            inactivity_timeout_seconds: inactivity_seconds,
            absolute_timeout_seconds: absolute_seconds,
            inactivity_tracking_enabled: true,
            absolute_expiry_action: ExpiryAction::Logout,
        }
    }

    /// Policy that only enforces the absolute lifetime
    #[must_use]
    pub fn absolute_only_policy(absolute_seconds: u64) -> SessionPolicy {
        SessionPolicy {
            inactivity_tracking_enabled: false,
            ..Self::policy(absolute_seconds, absolute_seconds)
        }
    }

    #[must_use]
    pub fn user() -> User {
        User::new(TEST_USER_ID).with_email(TEST_EMAIL)
    }

    /// Mock collaborators around `user` and `policy`
    #[must_use]
    pub fn harness(user: Option<User>, policy: SessionPolicy) -> TestHarness {
        TestHarness {
            auth: Arc::new(MockAuthProvider::new(user)),
            settings: Arc::new(MockSettingsSource::new(policy)),
            persistence: Arc::new(RecordingPersistence::default()),
            profiles: Arc::new(MockProfileLookup::with_type(REGULAR_USER_TYPE)),
            notifier: Arc::new(RecordingNotifier::default()),
            redirects: RedirectRules::default(),
        }
    }
}

/// Handles on every mock a controller under test talks to
pub struct TestHarness {
    pub auth: Arc<MockAuthProvider>,
    pub settings: Arc<MockSettingsSource>,
    pub persistence: Arc<RecordingPersistence>,
    pub profiles: Arc<MockProfileLookup>,
    pub notifier: Arc<RecordingNotifier>,
    pub redirects: RedirectRules,
}

impl TestHarness {
    /// Swap the auth provider, e.g. for one with a tiny notification buffer
    #[must_use]
    pub fn with_auth(mut self, auth: MockAuthProvider) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Swap the profile lookup, e.g. for a special user type or a failing one
    #[must_use]
    pub fn with_profiles(mut self, profiles: MockProfileLookup) -> Self {
        self.profiles = Arc::new(profiles);
        self
    }

    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            auth: self.auth.clone(),
            settings: self.settings.clone(),
            persistence: self.persistence.clone(),
            profiles: self.profiles.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub async fn start(&self) -> SessionLifecycleController {
        SessionLifecycleController::start(self.collaborators(), self.redirects.clone()).await
    }
}
