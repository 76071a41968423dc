//! Mock collaborators for testing
//!
//! Every mock records what it was asked to do so tests can assert on the exact
//! sequence of calls.

use crate::collaborators::traits::{
    AuthProvider, NotificationSink, ProfileLookup, SessionPersistence, SettingsSource,
};
use crate::errors::{WardenError, WardenResult};
use crate::models::{
    AuthStateChange, NotificationKind, SessionEvent, SessionEventKind, SessionPolicy, User,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Auth provider driven entirely by the test
pub struct MockAuthProvider {
    current: Mutex<Option<User>>,
    sender: broadcast::Sender<AuthStateChange>,
    probe_fails: AtomicBool,
    sign_out_fails: AtomicBool,
    sign_out_delay: Mutex<Duration>,
    sign_out_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl MockAuthProvider {
    #[must_use]
    pub fn new(initial: Option<User>) -> Self {
        Self::with_capacity(initial, 64)
    }

    /// Provider whose notification channel holds only `capacity` entries, so a
    /// slow subscriber lags
    #[must_use]
    pub fn with_capacity(initial: Option<User>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            current: Mutex::new(initial),
            sender,
            probe_fails: AtomicBool::new(false),
            sign_out_fails: AtomicBool::new(false),
            sign_out_delay: Mutex::new(Duration::ZERO),
            sign_out_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    /// Publish a raw notification without touching the current user
    pub fn emit(&self, change: AuthStateChange) {
        let _ = self.sender.send(change);
    }

    pub fn sign_in(&self, user: User) {
        *lock(&self.current) = Some(user.clone());
        self.emit(AuthStateChange::signed_in(user));
    }

    pub fn fail_probe(&self) {
        self.probe_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self) {
        self.sign_out_fails.store(true, Ordering::SeqCst);
    }

    /// Make `sign_out` take `delay` before answering
    pub fn delay_sign_out(&self, delay: Duration) {
        *lock(&self.sign_out_delay) = delay;
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Calls to `get_current_user`, successful or not
    #[must_use]
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn get_current_user(&self) -> WardenResult<Option<User>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_fails.load(Ordering::SeqCst) {
            return Err(WardenError::Auth("probe unavailable".to_string()));
        }
        Ok(lock(&self.current).clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.sender.subscribe()
    }

    async fn sign_out(&self) -> WardenResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.sign_out_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(WardenError::SignOut("provider rejected sign-out".to_string()));
        }
        if lock(&self.current).take().is_some() {
            self.emit(AuthStateChange::signed_out());
        }
        Ok(())
    }
}

/// Settings source returning a fixed policy
pub struct MockSettingsSource {
    policy: Mutex<SessionPolicy>,
    fails: AtomicBool,
}

impl MockSettingsSource {
    #[must_use]
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy: Mutex::new(policy),
            fails: AtomicBool::new(false),
        }
    }

    /// Policy handed to sessions started from now on
    pub fn set_policy(&self, policy: SessionPolicy) {
        *lock(&self.policy) = policy;
    }

    pub fn fail(&self) {
        self.fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsSource for MockSettingsSource {
    async fn session_policy(&self) -> WardenResult<SessionPolicy> {
        if self.fails.load(Ordering::SeqCst) {
            return Err(WardenError::Settings("settings unavailable".to_string()));
        }
        Ok(*lock(&self.policy))
    }
}

/// Persistence that keeps events in memory
#[derive(Default)]
pub struct RecordingPersistence {
    events: Mutex<Vec<SessionEvent>>,
    attempts: AtomicUsize,
    fails: bool,
}

impl RecordingPersistence {
    /// A store that rejects every write
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        lock(&self.events).clone()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<SessionEventKind> {
        lock(&self.events).iter().map(|event| event.kind).collect()
    }

    /// Writes attempted, including rejected ones
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionPersistence for RecordingPersistence {
    async fn append_session_event(&self, event: &SessionEvent) -> WardenResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(WardenError::PersistenceWrite("store offline".to_string()));
        }
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

/// Profile lookup answering every user with the same type
pub struct MockProfileLookup {
    user_type: Option<String>,
    lookups: AtomicUsize,
}

impl MockProfileLookup {
    #[must_use]
    pub fn with_type(user_type: &str) -> Self {
        Self {
            user_type: Some(user_type.to_string()),
            lookups: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            user_type: None,
            lookups: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileLookup for MockProfileLookup {
    async fn get_user_type(&self, user_id: &str) -> WardenResult<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.user_type
            .clone()
            .ok_or_else(|| WardenError::ProfileLookup(format!("no profile for {user_id}")))
    }
}

/// Notification sink that keeps every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(String, NotificationKind)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.notices)
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<NotificationKind> {
        lock(&self.notices).iter().map(|(_, kind)| *kind).collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        lock(&self.notices).push((message.to_string(), kind));
    }
}
