//! Post-logout redirect routing

use crate::collaborators::traits::ProfileLookup;
use crate::settings::RedirectSettings;
use crate::utils::logging::LoggingHelper;

/// Maps the outgoing user's type to the path a router should apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRules {
    default_path: String,
    special_user_type: String,
    special_path: String,
}

impl Default for RedirectRules {
    fn default() -> Self {
        Self::from_settings(&RedirectSettings::default())
    }
}

impl RedirectRules {
    #[must_use]
    pub fn from_settings(settings: &RedirectSettings) -> Self {
        Self {
            default_path: settings.default_path.clone(),
            special_user_type: settings.special_user_type.clone(),
            special_path: settings.special_path.clone(),
        }
    }

    /// Path used whenever routing information is missing or a step failed
    #[must_use]
    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    #[must_use]
    pub fn path_for(&self, user_type: &str) -> &str {
        if user_type.trim().eq_ignore_ascii_case(&self.special_user_type) {
            &self.special_path
        } else {
            &self.default_path
        }
    }

    /// Look up `user_id`'s type and pick a path; any failure yields the default
    pub async fn resolve(&self, profiles: &dyn ProfileLookup, user_id: Option<&str>) -> String {
        let Some(user_id) = user_id else {
            return self.default_path.clone();
        };
        match profiles.get_user_type(user_id).await {
            Ok(user_type) => self.path_for(&user_type).to_string(),
            Err(e) => {
                LoggingHelper::log_profile_lookup_fallback(user_id, &e);
                self.default_path.clone()
            }
        }
    }
}
