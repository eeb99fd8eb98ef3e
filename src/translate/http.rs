use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TranslateConfig;
use crate::error::{BlocksError, Result};
use super::{TranslateRequest, TranslationBackend};

/// Successful reply body of `POST /translate`
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation: Option<String>,
}

/// Failure reply body of `POST /translate`
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Translation backend talking JSON to `POST {endpoint}/translate`
pub struct HttpBackend {
    client: Client,
    url: String,
}

impl HttpBackend {
    pub fn new(config: &TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            url: translate_url(&config.endpoint),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TranslationBackend for HttpBackend {
    async fn request(&self, request: &TranslateRequest) -> Result<String> {
        debug!("Sending translation request to: {}", self.url);

        let response = self.client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| BlocksError::RequestFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| BlocksError::RequestFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!("Translation endpoint returned {}: {}", status, body);
            return Err(BlocksError::RequestFailed(error_message(status.as_u16(), &body)));
        }

        parse_success_body(&body)
    }
}

fn translate_url(endpoint: &str) -> String {
    format!("{}/translate", endpoint.trim_end_matches('/'))
}

/// Prefer the server-provided `error` field, fall back to a generic message.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.error.trim().is_empty() => parsed.error,
        _ => format!("translation service responded with status {}", status),
    }
}

fn parse_success_body(body: &str) -> Result<String> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| BlocksError::RequestFailed(format!("Failed to parse response: {}", e)))?;

    match parsed.translation {
        Some(translation) if !translation.trim().is_empty() => Ok(translation),
        _ => Err(BlocksError::EmptyResult),
    }
}
