use crate::collaborators::traits::SettingsSource;
use crate::errors::WardenResult;
use crate::models::{ExpiryAction, SessionPolicy};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenSettings {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub redirects: RedirectSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Seconds without activity before a forced logout
    pub inactivity_timeout_seconds: u64,
    /// Maximum session age in seconds, independent of activity
    pub absolute_timeout_seconds: u64,
    /// When false the inactivity enforcer never arms
    pub inactivity_tracking_enabled: bool,
    /// `logout` or `refresh`
    #[serde(default)]
    pub absolute_expiry_action: ExpiryAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectSettings {
    pub default_path: String,
    /// User type that is sent to `special_path` after logout
    pub special_user_type: String,
    pub special_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Empty disables the REST backend
    pub base_url: String,

    // Direct value (can be overridden by environment variable)
    pub api_key: Option<String>,
    // Environment variable name for override
    pub api_key_env: Option<String>,

    pub events_table: String,
    pub profiles_table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// JSON-lines file used when no backend is configured
    pub events_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let policy = SessionPolicy::default();
        Self {
            inactivity_timeout_seconds: policy.inactivity_timeout_seconds,
            absolute_timeout_seconds: policy.absolute_timeout_seconds,
            inactivity_tracking_enabled: policy.inactivity_tracking_enabled,
            absolute_expiry_action: policy.absolute_expiry_action,
        }
    }
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            default_path: "/login".to_string(),
            special_user_type: "contractor".to_string(),
            special_path: "/contractor/login".to_string(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            api_key_env: Some("BACKEND_API_KEY".to_string()),
            events_table: "session_events".to_string(),
            profiles_table: "profiles".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            events_path: "session-events.jsonl".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SessionSettings {
    /// Snapshot the policy for one session
    #[must_use]
    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            inactivity_timeout_seconds: self.inactivity_timeout_seconds,
            absolute_timeout_seconds: self.absolute_timeout_seconds,
            inactivity_tracking_enabled: self.inactivity_tracking_enabled,
            absolute_expiry_action: self.absolute_expiry_action,
        }
    }
}

impl BackendSettings {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.base_url.trim().is_empty()
    }

    /// Get the API key, checking environment variable first, then falling back to direct value
    #[must_use]
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value);
            }
        }
        self.api_key.clone()
    }
}

impl WardenSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::initialize_environment()?;

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize environment and logging
    ///
    /// # Errors
    ///
    /// Returns an error if logger initialization fails
    fn initialize_environment() -> anyhow::Result<()> {
        Self::load_env_file();
        env_logger::try_init().context("failed to initialize logger")?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `WARDEN_SETTINGS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed
    fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(settings_dir) = std::env::var("WARDEN_SETTINGS_DIR") {
            let override_path = std::path::Path::new(&settings_dir).join("Settings.toml");
            if override_path.exists() {
                settings = Self::from_toml_file(&override_path)?;
                println!("✓ Overriding settings from {}", override_path.display());
            } else {
                println!(
                    "ℹ WARDEN_SETTINGS_DIR set but no Settings.toml found at: {}",
                    override_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML
    pub fn from_toml_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let toml_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&toml_content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse settings from TOML text; missing sections take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid settings TOML
    pub fn from_toml_str(toml_content: &str) -> anyhow::Result<Self> {
        Ok(basic_toml::from_str(toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_redirect_env_overrides(&mut settings.redirects);
        Self::apply_backend_env_overrides(&mut settings.backend);
        Self::apply_storage_env_overrides(&mut settings.storage);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for session settings
    pub fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        Self::apply_numeric_env_override(
            "SESSION_INACTIVITY_TIMEOUT_SECONDS",
            &mut session_settings.inactivity_timeout_seconds,
        );
        Self::apply_numeric_env_override(
            "SESSION_ABSOLUTE_TIMEOUT_SECONDS",
            &mut session_settings.absolute_timeout_seconds,
        );
        if let Ok(enabled_str) = std::env::var("SESSION_INACTIVITY_TRACKING_ENABLED") {
            if let Ok(enabled) = enabled_str.parse::<bool>() {
                session_settings.inactivity_tracking_enabled = enabled;
            }
        }
        if let Ok(action_str) = std::env::var("SESSION_ABSOLUTE_EXPIRY_ACTION") {
            match action_str.parse::<ExpiryAction>() {
                Ok(action) => session_settings.absolute_expiry_action = action,
                Err(e) => eprintln!("⚠️  Ignoring SESSION_ABSOLUTE_EXPIRY_ACTION: {e}"),
            }
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn apply_redirect_env_overrides(redirect_settings: &mut RedirectSettings) {
        if let Ok(default_path) = std::env::var("REDIRECT_DEFAULT_PATH") {
            redirect_settings.default_path = default_path;
        }
    }

    fn apply_backend_env_overrides(backend_settings: &mut BackendSettings) {
        if let Ok(base_url) = std::env::var("BACKEND_URL") {
            backend_settings.base_url = base_url;
        }
    }

    fn apply_storage_env_overrides(storage_settings: &mut StorageSettings) {
        if let Ok(events_path) = std::env::var("SESSION_EVENTS_PATH") {
            storage_settings.events_path = events_path;
        }
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }
}

#[async_trait]
impl SettingsSource for WardenSettings {
    async fn session_policy(&self) -> WardenResult<SessionPolicy> {
        Ok(self.session.policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Helper function to clean all relevant environment variables for tests
    fn clean_env_vars() {
        std::env::remove_var("SESSION_INACTIVITY_TIMEOUT_SECONDS");
        std::env::remove_var("SESSION_ABSOLUTE_TIMEOUT_SECONDS");
        std::env::remove_var("SESSION_INACTIVITY_TRACKING_ENABLED");
        std::env::remove_var("SESSION_ABSOLUTE_EXPIRY_ACTION");
        std::env::remove_var("REDIRECT_DEFAULT_PATH");
        std::env::remove_var("BACKEND_URL");
        std::env::remove_var("BACKEND_API_KEY");
        std::env::remove_var("SESSION_EVENTS_PATH");
    }

    #[test]
    fn test_default_policy() {
        let settings = WardenSettings::default();
        let policy = settings.session.policy();
        assert_eq!(policy.inactivity_timeout_seconds, 1800);
        assert_eq!(policy.absolute_timeout_seconds, 28800);
        assert!(policy.inactivity_tracking_enabled);
        assert_eq!(policy.absolute_expiry_action, ExpiryAction::Logout);
        assert!(!settings.backend.is_enabled());
        assert_eq!(settings.redirects.default_path, "/login");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = WardenSettings::from_toml_str(
            r#"
            [session]
            inactivity_timeout_seconds = 5
            absolute_timeout_seconds = 3600
            inactivity_tracking_enabled = true
            absolute_expiry_action = "refresh"
            "#,
        )
        .unwrap();

        assert_eq!(settings.session.inactivity_timeout_seconds, 5);
        assert_eq!(
            settings.session.absolute_expiry_action,
            ExpiryAction::Refresh
        );
        assert_eq!(settings.redirects.special_path, "/contractor/login");
        assert_eq!(settings.storage.events_path, "session-events.jsonl");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(WardenSettings::from_toml_str("[session]\ninactivity_timeout_seconds = \"x\"").is_err());
    }

    #[test]
    #[serial]
    fn test_session_env_overrides() {
        clean_env_vars();

        let mut session_settings = SessionSettings::default();

        std::env::set_var("SESSION_INACTIVITY_TIMEOUT_SECONDS", "5");
        std::env::set_var("SESSION_ABSOLUTE_TIMEOUT_SECONDS", "10");
        std::env::set_var("SESSION_INACTIVITY_TRACKING_ENABLED", "false");
        std::env::set_var("SESSION_ABSOLUTE_EXPIRY_ACTION", "refresh");

        WardenSettings::apply_session_env_overrides(&mut session_settings);

        assert_eq!(session_settings.inactivity_timeout_seconds, 5);
        assert_eq!(session_settings.absolute_timeout_seconds, 10);
        assert!(!session_settings.inactivity_tracking_enabled);
        assert_eq!(
            session_settings.absolute_expiry_action,
            ExpiryAction::Refresh
        );

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_malformed_env_values_are_ignored() {
        clean_env_vars();

        let mut session_settings = SessionSettings::default();
        std::env::set_var("SESSION_INACTIVITY_TIMEOUT_SECONDS", "soon");
        std::env::set_var("SESSION_ABSOLUTE_EXPIRY_ACTION", "maybe");

        WardenSettings::apply_session_env_overrides(&mut session_settings);

        assert_eq!(session_settings.inactivity_timeout_seconds, 1800);
        assert_eq!(
            session_settings.absolute_expiry_action,
            ExpiryAction::Logout
        );

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_backend_and_storage_env_overrides() {
        clean_env_vars();

        let mut settings = WardenSettings::default();
        std::env::set_var("BACKEND_URL", "https://project.example.com");
        std::env::set_var("BACKEND_API_KEY", "from-env");
        std::env::set_var("SESSION_EVENTS_PATH", "/tmp/events.jsonl");
        std::env::set_var("REDIRECT_DEFAULT_PATH", "/signin");

        WardenSettings::apply_env_overrides(&mut settings);

        assert!(settings.backend.is_enabled());
        assert_eq!(settings.backend.get_api_key().as_deref(), Some("from-env"));
        assert_eq!(settings.storage.events_path, "/tmp/events.jsonl");
        assert_eq!(settings.redirects.default_path, "/signin");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_api_key_falls_back_to_direct_value() {
        clean_env_vars();

        let backend = BackendSettings {
            api_key: Some("direct".to_string()),
            ..BackendSettings::default()
        };
        assert_eq!(backend.get_api_key().as_deref(), Some("direct"));
    }

    #[tokio::test]
    async fn test_settings_source_snapshot() {
        let mut settings = WardenSettings::default();
        settings.session.inactivity_timeout_seconds = 42;
        let policy = settings.session_policy().await.unwrap();
        assert_eq!(policy.inactivity_timeout_seconds, 42);
    }
}
