use chrono::Utc;
use duckdb::params;
use tokio::task;
use tracing::warn;

use super::DuckDbPool;
use crate::db::entities::user;
use crate::error::AppError;

const SESSION_KEY: &str = "current_user";

/// Persists the authenticated user snapshot so the session survives a
/// process restart. At most one record exists.
pub async fn save_session(pool: DuckDbPool, user: user::Model) -> Result<(), AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let value = serde_json::to_string(&user)?;
        conn.execute(
            "INSERT INTO app_state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![SESSION_KEY, value, Utc::now()],
        )?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn load_session(pool: DuckDbPool) -> Result<Option<user::Model>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let value: Option<String> = match conn.query_row(
            "SELECT value FROM app_state WHERE key = ?",
            params![SESSION_KEY],
            |row| row.get(0),
        ) {
            Ok(v) => Some(v),
            Err(duckdb::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        match value {
            Some(v) => match serde_json::from_str(&v) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    // An unreadable snapshot means no restorable session.
                    warn!(error = %e, "Discarding unparsable persisted session record.");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

/// Removes the persisted session record. Safe to call when none exists.
pub async fn clear_session(pool: DuckDbPool) -> Result<(), AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        conn.execute("DELETE FROM app_state WHERE key = ?", params![SESSION_KEY])?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}
