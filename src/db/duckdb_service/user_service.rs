use chrono::Utc;
use duckdb::{params, Result as DuckDbResult};
use tokio::task;

use super::{opt_from_empty, DuckDbPool};
use crate::db::entities::user::{self, Theme};
use crate::error::AppError;

fn row_to_user_model(row: &duckdb::Row<'_>) -> DuckDbResult<user::Model> {
    let theme: String = row.get("theme")?;
    let theme_json: String = row.get("theme_json")?;
    Ok(user::Model {
        id: row.get("id")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
        theme: Theme::parse(&theme),
        theme_json: opt_from_empty(theme_json),
        name: row.get("name")?,
        bio: row.get("bio")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_insert_err(e: duckdb::Error, username: &str) -> AppError {
    let msg = e.to_string();
    if msg.contains("Constraint") {
        AppError::UserAlreadyExists(username.to_string())
    } else {
        AppError::Database(msg)
    }
}

pub async fn create_user(
    pool: DuckDbPool,
    username: String,
    password_hash: String,
    theme: Theme,
) -> Result<user::Model, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let now = Utc::now();
        let user_model = conn
            .query_row(
                "INSERT INTO users (username, password_hash, theme, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING *",
                params![username, password_hash, theme.as_str(), now, now],
                row_to_user_model,
            )
            .map_err(|e| map_insert_err(e, &username))?;
        Ok(user_model)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn get_user_by_username(
    pool: DuckDbPool,
    username: String,
) -> Result<Option<user::Model>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM users WHERE username = ?")?;
        let mut user_iter = stmt.query_map(params![username], row_to_user_model)?;

        match user_iter.next() {
            Some(Ok(user)) => Ok(Some(user)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn update_password(
    pool: DuckDbPool,
    username: String,
    new_password_hash: String,
) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let rows_affected = conn.execute(
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE username = ?",
            params![new_password_hash, Utc::now(), username],
        )?;
        Ok(rows_affected > 0)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn update_theme_json(
    pool: DuckDbPool,
    username: String,
    theme_json: String,
) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let rows_affected = conn.execute(
            "UPDATE users SET theme_json = ?, updated_at = ? WHERE username = ?",
            params![theme_json, Utc::now(), username],
        )?;
        Ok(rows_affected > 0)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn get_theme_json(
    pool: DuckDbPool,
    username: String,
) -> Result<Option<String>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let mut stmt = conn.prepare("SELECT theme_json FROM users WHERE username = ?")?;
        let mut rows = stmt.query_map(params![username], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(Ok(json)) => Ok(opt_from_empty(json)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn update_profile(
    pool: DuckDbPool,
    username: String,
    name: String,
    bio: String,
) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let rows_affected = conn.execute(
            "UPDATE users SET name = ?, bio = ?, updated_at = ? WHERE username = ?",
            params![name, bio, Utc::now(), username],
        )?;
        Ok(rows_affected > 0)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn user_count(pool: DuckDbPool) -> Result<i64, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn delete_user(pool: DuckDbPool, username: String) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let rows_deleted = conn.execute(
            "DELETE FROM users WHERE username = ?",
            params![username],
        )?;
        Ok(rows_deleted > 0)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}
