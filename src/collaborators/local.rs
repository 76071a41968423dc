//! In-process collaborator adapters
//!
//! Used by the demo binary and by deployments where the auth state is owned by
//! the host process.

use crate::collaborators::traits::{
    AuthProvider, NotificationSink, ProfileLookup, SessionPersistence,
};
use crate::errors::{WardenError, WardenResult};
use crate::models::{AuthStateChange, NotificationKind, SessionEvent, User};
use async_trait::async_trait;
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

const AUTH_CHANNEL_CAPACITY: usize = 32;

/// Auth provider whose state lives in this process
pub struct LocalAuthProvider {
    current: Mutex<Option<User>>,
    sender: broadcast::Sender<AuthStateChange>,
}

impl LocalAuthProvider {
    #[must_use]
    pub fn new(initial: Option<User>) -> Self {
        let (sender, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(initial),
            sender,
        }
    }

    /// Sign `user` in and notify subscribers
    pub fn sign_in(&self, user: User) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(user.clone());
        self.publish(AuthStateChange::signed_in(user));
    }

    /// Report a token refresh for the current user
    pub fn refresh_token(&self) {
        let user = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(user) = user {
            self.publish(AuthStateChange::token_refreshed(user));
        }
    }

    fn publish(&self, change: AuthStateChange) {
        // No receivers is not an error: nobody is listening yet.
        let _ = self.sender.send(change);
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn get_current_user(&self) -> WardenResult<Option<User>> {
        Ok(self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.sender.subscribe()
    }

    async fn sign_out(&self) -> WardenResult<()> {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.publish(AuthStateChange::signed_out());
        }
        Ok(())
    }
}

/// Append-only JSON-lines event file
pub struct JsonLinesEventStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesEventStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every event written so far
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a valid event.
    pub async fn read_all(&self) -> anyhow::Result<Vec<SessionEvent>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(anyhow::Error::from))
            .collect()
    }
}

#[async_trait]
impl SessionPersistence for JsonLinesEventStore {
    async fn append_session_event(&self, event: &SessionEvent) -> WardenResult<()> {
        let mut line = serde_json::to_string(event)
            .map_err(|e| WardenError::PersistenceWrite(format!("encode failed: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                WardenError::PersistenceWrite(format!("open {} failed: {e}", self.path.display()))
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| WardenError::PersistenceWrite(format!("append failed: {e}")))?;
        file.flush()
            .await
            .map_err(|e| WardenError::PersistenceWrite(format!("flush failed: {e}")))?;
        Ok(())
    }
}

/// User-type table with a fallback type
pub struct StaticProfileLookup {
    user_types: HashMap<String, String>,
    default_type: Option<String>,
}

impl StaticProfileLookup {
    #[must_use]
    pub fn new(user_types: HashMap<String, String>, default_type: Option<String>) -> Self {
        Self {
            user_types,
            default_type,
        }
    }
}

#[async_trait]
impl ProfileLookup for StaticProfileLookup {
    async fn get_user_type(&self, user_id: &str) -> WardenResult<String> {
        self.user_types
            .get(user_id)
            .or(self.default_type.as_ref())
            .cloned()
            .ok_or_else(|| WardenError::ProfileLookup(format!("no profile for user {user_id}")))
    }
}

/// Notification sink that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Success => info!("✅ {message}"),
            NotificationKind::Warning => warn!("⚠️  {message}"),
            NotificationKind::Error => error!("❌ {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthEvent;

    #[tokio::test]
    async fn test_local_provider_publishes_transitions() {
        let provider = LocalAuthProvider::new(None);
        let mut rx = provider.subscribe();

        provider.sign_in(User::new("alice"));
        let change = rx.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedIn);
        assert_eq!(change.user.unwrap().id, "alice");

        provider.refresh_token();
        assert_eq!(rx.recv().await.unwrap().event, AuthEvent::TokenRefreshed);

        provider.sign_out().await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedOut);
        assert!(provider.get_current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_user_is_silent() {
        let provider = LocalAuthProvider::new(None);
        let mut rx = provider.subscribe();
        provider.sign_out().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_static_profile_lookup_fallback() {
        let mut types = HashMap::new();
        types.insert("c-1".to_string(), "contractor".to_string());

        let lookup = StaticProfileLookup::new(types.clone(), Some("staff".to_string()));
        assert_eq!(lookup.get_user_type("c-1").await.unwrap(), "contractor");
        assert_eq!(lookup.get_user_type("other").await.unwrap(), "staff");

        let strict = StaticProfileLookup::new(types, None);
        assert!(matches!(
            strict.get_user_type("other").await,
            Err(WardenError::ProfileLookup(_))
        ));
    }
}
