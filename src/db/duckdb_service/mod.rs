use tracing::{error, info};

use crate::error::AppError;

pub mod city_service;
pub mod session_service;
pub mod user_service;

pub type DuckDbPool = r2d2::Pool<duckdb::DuckdbConnectionManager>;

/// Opens (or creates) the store at `path` and runs migrations.
pub fn open_pool(path: &str) -> Result<DuckDbPool, AppError> {
    let manager = duckdb::DuckdbConnectionManager::file(path)?;
    let pool = r2d2::Pool::new(manager)?;
    initialize(&pool)?;
    Ok(pool)
}

fn initialize(pool: &DuckDbPool) -> Result<(), AppError> {
    info!("Running store migrations...");
    let conn = pool.get()?;
    let migrations = include_str!("../../../migrations/20250601000000_create_initial_tables.sql");
    conn.execute_batch(migrations).map_err(|e| {
        error!("Failed to execute store migrations: {}", e);
        AppError::from(e)
    })?;
    info!("Store migrations completed successfully.");
    Ok(())
}

/// Maps an empty stored string to `None`; columns that use '' as the
/// "absent" marker go through this on the way out.
pub(crate) fn opt_from_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
