use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Credential hashing unavailable")]
    HashingUnavailable,
}

impl From<duckdb::Error> for AppError {
    fn from(err: duckdb::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Database(format!("connection pool error: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Database(format!("JSON serialization/deserialization error: {err}"))
    }
}
