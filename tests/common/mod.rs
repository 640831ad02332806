use cirrus::db::duckdb_service::{self, DuckDbPool};
use tempfile::TempDir;

/// Opens a migrated store in a fresh temporary directory. The directory
/// guard must stay alive for the duration of the test.
pub fn test_pool() -> (TempDir, DuckDbPool) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("cirrus-test.duckdb");
    let pool = duckdb_service::open_pool(path.to_str().expect("utf-8 temp path"))
        .expect("open test store");
    (dir, pool)
}
