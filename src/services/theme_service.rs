use std::sync::Arc;

use moka::future::Cache;
use tracing::warn;

use crate::error::AppError;
use crate::services::auth_service::AuthManager;
use crate::theme_spec::ThemeSpec;

/// Bridges generated theme specs into the store and a fast-path cache.
pub struct ThemeManager {
    auth: Arc<AuthManager>,
    cache: Cache<String, String>,
}

impl ThemeManager {
    pub fn new(auth: Arc<AuthManager>) -> Self {
        Self {
            auth,
            cache: Cache::new(256),
        }
    }

    /// Load precedence is fixed: store, then cache, then the default
    /// palette. The store is the source of truth; the cache exists only to
    /// speed up repeated reads.
    pub async fn load_for_user(&self, username: &str) -> ThemeSpec {
        match self.auth.load_theme_spec_for_user(username).await {
            Ok(Some(spec)) => return spec,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Theme lookup failed; falling back to cache."),
        }

        if let Some(json) = self.cache.get(username).await {
            if let Some(spec) = ThemeSpec::parse(&json) {
                return spec;
            }
        }

        ThemeSpec::default_light()
    }

    /// Writes through to the store first, then mirrors into the cache. The
    /// in-session copy is refreshed when the target is the session user.
    pub async fn save_for_user(&self, username: &str, spec: &ThemeSpec) -> Result<(), AppError> {
        self.auth.save_theme_spec_for_user(username, spec).await?;
        self.cache.insert(username.to_string(), spec.to_json()).await;
        Ok(())
    }
}
