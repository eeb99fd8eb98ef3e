// Translation service client
//
// - http: JSON backend for the `POST /translate` endpoint
// - rate_limit: global minimum-interval gate between successful calls
// - batch: one combined request for every block, with per-token fallback

pub mod batch;
pub mod http;
pub mod rate_limit;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

pub use batch::{BatchMode, BatchTranslation};
pub use http::HttpBackend;
pub use rate_limit::RateLimiter;

use crate::config::TranslateConfig;
use crate::error::{BlocksError, Result};

/// Request body of `POST /translate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default)]
    pub to_english: bool,
}

/// Transport used by the client to reach a translation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Return the raw translation for one request
    async fn request(&self, request: &TranslateRequest) -> Result<String>;
}

/// Rate-limited bridge between the editor and a translation backend
pub struct TranslationClient {
    backend: Box<dyn TranslationBackend>,
    limiter: RateLimiter,
    to_english: bool,
    batch_separator: String,
}

impl std::fmt::Debug for TranslationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationClient")
            .field("limiter", &self.limiter)
            .field("to_english", &self.to_english)
            .field("batch_separator", &self.batch_separator)
            .finish_non_exhaustive()
    }
}

impl TranslationClient {
    /// Client talking HTTP to the configured endpoint
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let backend = HttpBackend::new(config)?;
        info!("Translation endpoint: {}", backend.url());
        Ok(Self::with_backend(Box::new(backend), config))
    }

    pub fn with_backend(backend: Box<dyn TranslationBackend>, config: &TranslateConfig) -> Self {
        Self {
            backend,
            limiter: RateLimiter::new(config.min_interval()),
            to_english: config.to_english,
            batch_separator: config.batch_separator.clone(),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Translate one text in the configured direction
    pub async fn translate(&self, text: &str) -> Result<String> {
        self.translate_with(text, self.to_english).await
    }

    pub async fn translate_with(&self, text: &str, to_english: bool) -> Result<String> {
        // Throttled calls never reach the network.
        self.limiter.check(Instant::now())?;

        let request = TranslateRequest {
            text: text.to_string(),
            to_english,
        };
        debug!("Translating '{}' (to_english: {})", text, to_english);

        let raw = self.backend.request(&request).await?;
        let translation = raw.trim();
        if translation.is_empty() {
            return Err(BlocksError::EmptyResult);
        }

        self.limiter.record_success(Instant::now());
        Ok(translation.to_string())
    }
}
