//! User preferences: config.toml values as defaults, `app_settings` rows on top.
//!
//! Writes always go to the DB, never to the config file.
use std::collections::BTreeMap;

use anyhow::Result;
use secrecy::SecretString;

use crate::api::is_placeholder_key;
use crate::config::Config;
use crate::storage::Database;

pub const DARK_MODE: &str = "dark_mode";
pub const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
pub const AUTO_REFRESH: &str = "auto_refresh";
pub const API_KEY: &str = "api_key";
pub const SELECTED_CATEGORY: &str = "selected_category";
pub const SORT_BY: &str = "sort_by";

/// Every key the application reads, in display order.
pub const KNOWN_KEYS: &[&str] = &[
    DARK_MODE,
    NOTIFICATIONS_ENABLED,
    AUTO_REFRESH,
    API_KEY,
    SELECTED_CATEGORY,
    SORT_BY,
];

/// Environment variable that overrides any stored or configured API key.
pub const API_KEY_ENV: &str = "NEWSAPI_KEY";

// ============================================================================
// PreferenceManager
// ============================================================================

/// Merged preference store.
///
/// Reads are served from memory. `set` writes the row first and only then
/// updates the map, so a failed write leaves the old value visible.
#[derive(Debug, Clone)]
pub struct PreferenceManager {
    prefs: BTreeMap<String, String>,
}

impl PreferenceManager {
    /// Config defaults, then every stored setting layered on top.
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut prefs = Self::flatten_config(config);
        for setting in db.get_settings().await? {
            if let Some(value) = setting.value {
                prefs.insert(setting.key, value);
            }
        }
        tracing::debug!(count = prefs.len(), "Loaded preferences");
        Ok(Self { prefs })
    }

    /// Config values only. Used when the database cannot be read.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefs: Self::flatten_config(config),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prefs.get(key).map(String::as_str)
    }

    /// Persist `value` under `key` (upsert) and update the in-memory view.
    pub async fn set(&mut self, db: &Database, key: &str, value: &str) -> Result<()> {
        db.set_setting(key, value).await?;
        self.prefs.insert(key.to_string(), value.to_string());
        tracing::info!(key = %key, "Preference updated");
        Ok(())
    }

    pub async fn set_bool(&mut self, db: &Database, key: &str, value: bool) -> Result<()> {
        self.set(db, key, if value { "true" } else { "false" }).await
    }

    /// Effective values for display. The API key is masked.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.prefs
            .iter()
            .map(|(k, v)| {
                let shown = if k == API_KEY && !v.is_empty() {
                    "[set]".to_string()
                } else {
                    v.clone()
                };
                (k.clone(), shown)
            })
            .collect()
    }

    // ========================================================================
    // Type-safe Accessors
    // ========================================================================

    pub fn dark_mode(&self) -> bool {
        self.get_bool(DARK_MODE, false)
    }

    /// Whether a notification is recorded after a headlines load.
    pub fn notifications_enabled(&self) -> bool {
        self.get_bool(NOTIFICATIONS_ENABLED, true)
    }

    pub fn auto_refresh(&self) -> bool {
        self.get_bool(AUTO_REFRESH, false)
    }

    /// Stored key, or `""` when none was saved.
    pub fn api_key(&self) -> &str {
        self.get(API_KEY).unwrap_or("")
    }

    pub fn selected_category(&self) -> &str {
        match self.get(SELECTED_CATEGORY) {
            Some(c) if !c.trim().is_empty() => c,
            _ => "general",
        }
    }

    pub fn sort_by(&self) -> &str {
        match self.get(SORT_BY) {
            Some(s) if !s.trim().is_empty() => s,
            _ => "publishedAt",
        }
    }

    /// Unset or unparsable values read as `default`.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn flatten_config(config: &Config) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(DARK_MODE.to_string(), config.dark_mode.to_string());
        map.insert(
            NOTIFICATIONS_ENABLED.to_string(),
            config.notifications_enabled.to_string(),
        );
        map.insert(AUTO_REFRESH.to_string(), config.auto_refresh.to_string());
        map.insert(API_KEY.to_string(), String::new());
        map.insert(
            SELECTED_CATEGORY.to_string(),
            config.default_category.clone(),
        );
        map.insert(SORT_BY.to_string(), config.sort_by.clone());
        // config.api_key stays out of the map; see resolve_api_key.
        map
    }
}

/// Pick the API key to use: `NEWSAPI_KEY`, then the stored preference, then
/// the config file. Placeholder values are skipped at every level.
pub fn resolve_api_key(config: &Config, prefs: &PreferenceManager) -> Option<SecretString> {
    resolve_api_key_from(std::env::var(API_KEY_ENV).ok(), config, prefs)
}

fn resolve_api_key_from(
    env: Option<String>,
    config: &Config,
    prefs: &PreferenceManager,
) -> Option<SecretString> {
    env.into_iter()
        .chain(std::iter::once(prefs.api_key().to_string()))
        .chain(config.api_key.clone())
        .map(|k| k.trim().to_string())
        .find(|k| !is_placeholder_key(k))
        .map(SecretString::from)
}

// ============================================================================
// Tests
// ============================================================================
