use std::result::Result as StdResult;
use thiserror::Error;
use reqwest;
use teloxide::RequestError;
use serde_json;
use anyhow;
use prometheus;
use std::io;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Coin not found: {0}")]
    CoinNotFound(String),
    #[error("No prices available: {0}")]
    NoPricesAvailable(String),
    #[error("Insufficient history for 1h change: {0}")]
    InsufficientHistoryForChange(String),
    #[error("Invalid interval: {0} (must be > 0 minutes)")]
    InvalidInterval(i64),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("API invalid data: {0}")]
    ApiInvalidData(String),
    #[error("API invalid format: {0}")]
    ApiInvalidFormat(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Notification error: {0}")]
    NotifyError(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// How a boundary (HTTP, bot) should present an error to an end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unprocessable,
    BadRequest,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CoinNotFound(_) | Error::NoPricesAvailable(_) => ErrorKind::NotFound,
            Error::InsufficientHistoryForChange(_) => ErrorKind::Unprocessable,
            Error::InvalidInterval(_) | Error::ValidationError(_) => ErrorKind::BadRequest,
            _ => ErrorKind::Internal,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ApiInvalidFormat(err.to_string())
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        Error::NotifyError(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Error::DatabaseError(format!("migration failed: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Error::Timeout(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::InternalError(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::InternalError(err.to_string())
    }
}

pub type Result<T> = StdResult<T, Error>;
