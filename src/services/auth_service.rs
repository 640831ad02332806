use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::info;

use crate::db::duckdb_service::{session_service, user_service, DuckDbPool};
use crate::db::entities::user::{self, Theme};
use crate::error::AppError;
use crate::theme_spec::ThemeSpec;

/// Deterministic one-way digest of a password (SHA-256, hex). There is
/// deliberately no plaintext fallback: if the digest cannot be produced the
/// operation is refused with `HashingUnavailable` rather than storing the
/// password as-is.
pub fn hash_password(plaintext: &str) -> Result<String, AppError> {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Manages registration, login, and the single per-process session.
///
/// One instance is constructed by the entry point and shared by reference;
/// the session snapshot it holds is persisted to the store on every mutation
/// and restored by `load` at construction time.
pub struct AuthManager {
    pool: DuckDbPool,
    current: RwLock<Option<user::Model>>,
}

impl AuthManager {
    /// Creates the manager, restoring any session persisted by a previous
    /// process.
    pub async fn load(pool: DuckDbPool) -> Result<Self, AppError> {
        let restored = session_service::load_session(pool.clone()).await?;
        if let Some(user) = &restored {
            info!(username = %user.username, "Restored persisted session.");
        }
        Ok(Self {
            pool,
            current: RwLock::new(restored),
        })
    }

    /// Registers a new user. Blank usernames or passwords are rejected
    /// before any storage access, and a taken username reports failure.
    /// Registration never logs the new user in.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        theme: Theme,
    ) -> Result<bool, AppError> {
        let username = username.trim();
        if username.is_empty() || password.trim().is_empty() {
            return Ok(false);
        }

        if user_service::get_user_by_username(self.pool.clone(), username.to_string())
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        match user_service::create_user(
            self.pool.clone(),
            username.to_string(),
            password_hash,
            theme,
        )
        .await
        {
            Ok(_) => Ok(true),
            // Lost a race with a concurrent registration for the same name.
            Err(AppError::UserAlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Authenticates and, on success, snapshots the user into the session
    /// and persists the session record.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool, AppError> {
        if username.is_empty() || password.is_empty() {
            return Ok(false);
        }

        let Some(user) =
            user_service::get_user_by_username(self.pool.clone(), username.to_string()).await?
        else {
            return Ok(false);
        };

        if user.password_hash != hash_password(password)? {
            return Ok(false);
        }

        session_service::save_session(self.pool.clone(), user.clone()).await?;
        *self.current.write().await = Some(user);
        Ok(true)
    }

    /// Clears the session and its persisted record. Idempotent.
    pub async fn logout(&self) -> Result<(), AppError> {
        *self.current.write().await = None;
        session_service::clear_session(self.pool.clone()).await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn current_user(&self) -> Option<user::Model> {
        self.current.read().await.clone()
    }

    /// Updates the stored password hash. When the target is the session
    /// user, the in-memory snapshot is refreshed too so session and store
    /// stay consistent.
    pub async fn reset_password(
        &self,
        username: &str,
        new_password: &str,
    ) -> Result<bool, AppError> {
        let username = username.trim();
        if username.is_empty() || new_password.trim().is_empty() {
            return Ok(false);
        }

        if user_service::get_user_by_username(self.pool.clone(), username.to_string())
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let new_hash = hash_password(new_password)?;
        if !user_service::update_password(
            self.pool.clone(),
            username.to_string(),
            new_hash.clone(),
        )
        .await?
        {
            return Ok(false);
        }

        let mut guard = self.current.write().await;
        if let Some(current) = guard.as_mut() {
            if current.username == username {
                current.password_hash = new_hash;
                session_service::save_session(self.pool.clone(), current.clone()).await?;
            }
        }
        Ok(true)
    }

    /// Updates the profile of the session user, writing through to both the
    /// snapshot and the store. Fails when no user is logged in.
    pub async fn update_profile(&self, name: &str, bio: &str) -> Result<bool, AppError> {
        let mut guard = self.current.write().await;
        let Some(current) = guard.as_mut() else {
            return Ok(false);
        };

        current.name = Some(name.to_string());
        current.bio = Some(bio.to_string());
        session_service::save_session(self.pool.clone(), current.clone()).await?;

        user_service::update_profile(
            self.pool.clone(),
            current.username.clone(),
            name.to_string(),
            bio.to_string(),
        )
        .await
    }

    /// Stores a theme spec for a user; the session copy is kept in sync when
    /// the target is the session user.
    pub async fn save_theme_spec_for_user(
        &self,
        username: &str,
        spec: &ThemeSpec,
    ) -> Result<(), AppError> {
        if username.trim().is_empty() {
            return Ok(());
        }

        let json = spec.to_json();
        user_service::update_theme_json(self.pool.clone(), username.to_string(), json.clone())
            .await?;

        let mut guard = self.current.write().await;
        if let Some(current) = guard.as_mut() {
            if current.username == username {
                current.theme_json = Some(json);
                session_service::save_session(self.pool.clone(), current.clone()).await?;
            }
        }
        Ok(())
    }

    /// Loads a user's stored theme spec. `None` when the user has no stored
    /// theme or the stored JSON does not parse.
    pub async fn load_theme_spec_for_user(
        &self,
        username: &str,
    ) -> Result<Option<ThemeSpec>, AppError> {
        if username.trim().is_empty() {
            return Ok(None);
        }

        let Some(json) =
            user_service::get_theme_json(self.pool.clone(), username.to_string()).await?
        else {
            return Ok(None);
        };
        Ok(ThemeSpec::parse(&json))
    }
}
