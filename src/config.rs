//! Configuration file parser for ~/.config/newsdesk/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys may be specified. The
/// preference-style fields (`dark_mode`, `notifications_enabled`, ...) only
/// seed defaults: values saved through `newsdesk settings set` win.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// NewsAPI key. `NEWSAPI_KEY` in the environment takes precedence.
    pub api_key: Option<String>,

    /// Override for the API root (tests and self-hosted proxies).
    pub base_url: Option<String>,

    /// Country passed to `top-headlines`.
    pub country: String,

    /// Language passed to `everything`.
    pub language: String,

    pub headline_page_size: u32,

    pub search_page_size: u32,

    pub default_category: String,

    pub sort_by: String,

    pub dark_mode: bool,

    pub notifications_enabled: bool,

    pub auto_refresh: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            country: "us".to_string(),
            language: "en".to_string(),
            headline_page_size: 50,
            search_page_size: 20,
            default_category: "general".to_string(),
            sort_by: "publishedAt".to_string(),
            dark_mode: false,
            notifications_enabled: true,
            auto_refresh: false,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("country", &self.country)
            .field("language", &self.language)
            .field("headline_page_size", &self.headline_page_size)
            .field("search_page_size", &self.search_page_size)
            .field("default_category", &self.default_category)
            .field("sort_by", &self.sort_by)
            .field("dark_mode", &self.dark_mode)
            .field("notifications_enabled", &self.notifications_enabled)
            .field("auto_refresh", &self.auto_refresh)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "api_key",
        "base_url",
        "country",
        "language",
        "headline_page_size",
        "search_page_size",
        "default_category",
        "sort_by",
        "dark_mode",
        "notifications_enabled",
        "auto_refresh",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing, empty or whitespace-only file → `Ok(Config::default())`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
    /// - File over 1 MB → `Err(ConfigError::TooLarge)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), country = %config.country, "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
