//! Managed backend client
//!
//! Talks to a hosted backend that exposes GoTrue-style auth endpoints under
//! `/auth/v1` and PostgREST-style table endpoints under `/rest/v1`. One client
//! serves as auth provider, event persistence and profile lookup.

use crate::collaborators::traits::{AuthProvider, ProfileLookup, SessionPersistence};
use crate::errors::{WardenError, WardenResult};
use crate::models::{AuthStateChange, SessionEvent, User};
use crate::settings::BackendSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};
use url::Url;

const AUTH_CHANNEL_CAPACITY: usize = 32;

/// User object returned by `GET /auth/v1/user`
#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    last_sign_in_at: Option<DateTime<Utc>>,
}

impl From<RemoteUser> for User {
    fn from(remote: RemoteUser) -> Self {
        Self {
            id: remote.id,
            email: remote.email,
            signed_in_at: remote.last_sign_in_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    user_type: Option<String>,
}

/// REST client for the managed backend
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    events_table: String,
    profiles_table: String,
    access_token: RwLock<Option<String>>,
    sender: broadcast::Sender<AuthStateChange>,
}

impl RestBackend {
    /// Build a client from backend settings
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Settings`] if `base_url` is not a valid URL.
    pub fn new(settings: &BackendSettings) -> WardenResult<Self> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| WardenError::Settings(format!("invalid backend url {base}: {e}")))?;
        let (sender, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: settings.get_api_key().unwrap_or_default(),
            events_table: settings.events_table.clone(),
            profiles_table: settings.profiles_table.clone(),
            access_token: RwLock::new(None),
            sender,
        })
    }

    /// Install an access token and announce the user it belongs to
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not resolve to a user.
    pub async fn set_access_token(&self, token: impl Into<String>) -> WardenResult<User> {
        *self.access_token.write().await = Some(token.into());
        let user = self
            .fetch_user()
            .await?
            .ok_or_else(|| WardenError::Auth("access token has no user".to_string()))?;
        let _ = self.sender.send(AuthStateChange::signed_in(user.clone()));
        Ok(user)
    }

    fn endpoint(&self, path: &str) -> WardenResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| WardenError::Settings(format!("invalid endpoint {path}: {e}")))
    }

    fn events_url(&self) -> WardenResult<Url> {
        self.endpoint(&format!("rest/v1/{}", self.events_table))
    }

    fn profile_url(&self, user_id: &str) -> WardenResult<Url> {
        let mut url = self.endpoint(&format!("rest/v1/{}", self.profiles_table))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", "user_type");
        Ok(url)
    }

    async fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let token = self.access_token.read().await.clone();
        let bearer = token.unwrap_or_else(|| self.api_key.clone());
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn fetch_user(&self) -> WardenResult<Option<User>> {
        if self.access_token.read().await.is_none() {
            return Ok(None);
        }
        let url = self.endpoint("auth/v1/user")?;
        let response = self.request(reqwest::Method::GET, url).await.send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let remote: RemoteUser = response
            .error_for_status()
            .map_err(|e| WardenError::Auth(e.to_string()))?
            .json()
            .await?;
        Ok(Some(remote.into()))
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn get_current_user(&self) -> WardenResult<Option<User>> {
        self.fetch_user().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.sender.subscribe()
    }

    async fn sign_out(&self) -> WardenResult<()> {
        if self.access_token.read().await.is_none() {
            return Ok(());
        }
        let url = self.endpoint("auth/v1/logout")?;
        let result = self
            .request(reqwest::Method::POST, url)
            .await
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        // The token is unusable either way once logout was attempted.
        *self.access_token.write().await = None;
        let _ = self.sender.send(AuthStateChange::signed_out());

        result
            .map(|_| ())
            .map_err(|e| WardenError::SignOut(e.to_string()))
    }
}

#[async_trait]
impl SessionPersistence for RestBackend {
    async fn append_session_event(&self, event: &SessionEvent) -> WardenResult<()> {
        let url = self.events_url()?;
        debug!("📝 POST {url} ({})", event.kind);
        self.request(reqwest::Method::POST, url)
            .await
            .header("Prefer", "return=minimal")
            .json(event)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| WardenError::PersistenceWrite(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileLookup for RestBackend {
    async fn get_user_type(&self, user_id: &str) -> WardenResult<String> {
        let url = self.profile_url(user_id)?;
        let rows: Vec<ProfileRow> = self
            .request(reqwest::Method::GET, url)
            .await
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| WardenError::ProfileLookup(e.to_string()))?
            .json()
            .await
            .map_err(|e| WardenError::ProfileLookup(format!("invalid profile payload: {e}")))?;

        rows.into_iter()
            .find_map(|row| row.user_type)
            .ok_or_else(|| WardenError::ProfileLookup(format!("no profile for user {user_id}")))
    }
}
