use chrono::Utc;
use duckdb::{params, Result as DuckDbResult};
use tokio::task;

use super::{opt_from_empty, DuckDbPool};
use crate::db::entities::city;
use crate::error::AppError;

fn row_to_city_model(row: &duckdb::Row<'_>) -> DuckDbResult<city::Model> {
    let state: String = row.get("state")?;
    Ok(city::Model {
        id: row.get("id")?,
        name: row.get("name")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        country: row.get("country")?,
        state: opt_from_empty(state),
    })
}

/// Canonical storage form of the state component of the natural key:
/// absent, empty, and whitespace-only all collapse to ''.
fn normalize_state(state: Option<&str>) -> String {
    state
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Inserts a city or, when the (name, country, state) natural key already
/// exists, refreshes its coordinates and returns the existing row. A single
/// conflict-clause statement keeps the upsert atomic under concurrent calls.
pub async fn upsert_city(
    pool: DuckDbPool,
    name: String,
    latitude: f64,
    longitude: f64,
    country: String,
    state: Option<String>,
) -> Result<city::Model, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let state = normalize_state(state.as_deref());
        let city = conn.query_row(
            "INSERT INTO cities (name, latitude, longitude, country, state)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (name, country, state)
             DO UPDATE SET latitude = excluded.latitude, longitude = excluded.longitude
             RETURNING *",
            params![name, latitude, longitude, country, state],
            row_to_city_model,
        )?;
        Ok(city)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn get_city_by_id(
    pool: DuckDbPool,
    city_id: i32,
) -> Result<Option<city::Model>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM cities WHERE id = ?")?;
        let mut rows = stmt.query_map(params![city_id], row_to_city_model)?;

        match rows.next() {
            Some(Ok(city)) => Ok(Some(city)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn get_city_by_location(
    pool: DuckDbPool,
    name: String,
    country: String,
    state: Option<String>,
) -> Result<Option<city::Model>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let state = normalize_state(state.as_deref());
        let mut stmt =
            conn.prepare("SELECT * FROM cities WHERE name = ? AND country = ? AND state = ?")?;
        let mut rows = stmt.query_map(params![name, country, state], row_to_city_model)?;

        match rows.next() {
            Some(Ok(city)) => Ok(Some(city)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn get_all_cities(pool: DuckDbPool) -> Result<Vec<city::Model>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM cities ORDER BY id")?;
        let cities = stmt
            .query_map([], row_to_city_model)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cities)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

pub async fn delete_city(pool: DuckDbPool, city_id: i32) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let rows_deleted = conn.execute("DELETE FROM cities WHERE id = ?", params![city_id])?;
        Ok(rows_deleted > 0)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

fn lookup_user_id(conn: &duckdb::Connection, username: &str) -> Result<Option<i32>, AppError> {
    match conn.query_row(
        "SELECT id FROM users WHERE username = ?",
        params![username],
        |row| row.get(0),
    ) {
        Ok(id) => Ok(Some(id)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Associates a city with a user. Adding an already-present city is a no-op
/// that still reports success; only an unknown username fails.
pub async fn add_city_to_user(
    pool: DuckDbPool,
    username: String,
    city_id: i32,
) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let Some(user_id) = lookup_user_id(&conn, &username)? else {
            return Ok(false);
        };
        let next_position: i32 = conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM user_cities WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO user_cities (user_id, city_id, position, added_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, city_id) DO NOTHING",
            params![user_id, city_id, next_position, Utc::now()],
        )?;
        Ok(true)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

/// Removes a city association. Removing a city that was never associated is
/// treated as success.
pub async fn remove_city_from_user(
    pool: DuckDbPool,
    username: String,
    city_id: i32,
) -> Result<bool, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        conn.execute(
            "DELETE FROM user_cities
             WHERE user_id = (SELECT id FROM users WHERE username = ?) AND city_id = ?",
            params![username, city_id],
        )?;
        Ok(true)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

/// City ids for a user, in insertion order.
pub async fn get_user_city_ids(
    pool: DuckDbPool,
    username: String,
) -> Result<Vec<i32>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT uc.city_id FROM user_cities uc
             JOIN users u ON u.id = uc.user_id
             WHERE u.username = ?
             ORDER BY uc.position",
        )?;
        let ids = stmt
            .query_map(params![username], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}

/// Resolved cities for a user, in insertion order. Associations whose city
/// row no longer exists are skipped.
pub async fn get_user_cities(
    pool: DuckDbPool,
    username: String,
) -> Result<Vec<city::Model>, AppError> {
    task::spawn_blocking(move || {
        let conn = pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.* FROM user_cities uc
             JOIN users u ON u.id = uc.user_id
             JOIN cities c ON c.id = uc.city_id
             WHERE u.username = ?
             ORDER BY uc.position",
        )?;
        let cities = stmt
            .query_map(params![username], row_to_city_model)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cities)
    })
    .await
    .map_err(|e| AppError::Database(e.to_string()))?
}
