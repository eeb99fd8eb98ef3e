use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, BlocksError};

// Default values for translation configuration
fn default_endpoint() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_separator() -> String {
    " | ".to_string()
}

// Default values for editor configuration
fn default_blur_grace_ms() -> u64 {
    100
}

fn default_notice_duration_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Base URL of the translation endpoint (`POST {endpoint}/translate`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Minimum time between a successful translation and the next request
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Default translation direction sent with every request
    #[serde(default)]
    pub to_english: bool,
    /// Separator used to join tokens into one batch request
    #[serde(default = "default_batch_separator")]
    pub batch_separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Delay before a focus loss commits the edit surface
    #[serde(default = "default_blur_grace_ms")]
    pub blur_grace_ms: u64,
    /// How long an error notice stays visible
    #[serde(default = "default_notice_duration_ms")]
    pub notice_duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Development: one translation per second
    Development,
    /// Production: longer interval to stay friendly with the upstream service
    Production,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
            to_english: false,
            batch_separator: default_batch_separator(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            blur_grace_ms: default_blur_grace_ms(),
            notice_duration_ms: default_notice_duration_ms(),
        }
    }
}

impl TranslateConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EditorConfig {
    pub fn blur_grace(&self) -> Duration {
        Duration::from_millis(self.blur_grace_ms)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }
}

impl Profile {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "development" | "dev" | "default" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(BlocksError::Config(format!(
                "Invalid profile '{}'. Valid profiles: development, production",
                name
            ))),
        }
    }
}

impl Config {
    /// Default configuration tuned for a deployment profile
    pub fn for_profile(profile: Profile) -> Self {
        let mut config = Self::default();
        config.apply_profile(profile);
        config
    }

    pub fn apply_profile(&mut self, profile: Profile) {
        self.translate.min_interval_ms = match profile {
            Profile::Development => 1000,
            Profile::Production => 2000,
        };
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BlocksError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| BlocksError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BlocksError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| BlocksError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.endpoint.trim().is_empty() {
            return Err(BlocksError::Config("Translation endpoint is empty".to_string()));
        }
        // Batch replies are split on '|', so the join separator must contain it.
        if !self.translate.batch_separator.contains('|') {
            return Err(BlocksError::Config(format!(
                "Batch separator '{}' must contain '|'",
                self.translate.batch_separator
            )));
        }
        if self.editor.notice_duration_ms == 0 {
            return Err(BlocksError::Config("Notice duration must be positive".to_string()));
        }
        Ok(())
    }
}
