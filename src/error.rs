use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlocksError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Too many requests, please wait {:.1} seconds", .wait.as_secs_f64())]
    RateLimited { wait: Duration },

    #[error("Translation failed: {0}")]
    RequestFailed(String),

    #[error("Translation service returned no usable translation")]
    EmptyResult,

    #[error("Invalid block order: {0}")]
    InvalidOrder(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlocksError {
    /// Translation failures leave editor state untouched and may be retried by the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::RequestFailed(_) | Self::EmptyResult
        )
    }
}

pub type Result<T> = std::result::Result<T, BlocksError>;
