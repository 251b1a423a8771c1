use anyhow::Result;

use super::schema::Database;
use super::types::{now_millis, AppSetting};

impl Database {
    // ========================================================================
    // App Settings Operations
    // ========================================================================

    /// Get a single setting row by key, or `None` if it was never written.
    pub async fn get_setting(&self, key: &str) -> Result<Option<AppSetting>> {
        let row = sqlx::query_as::<_, AppSetting>(
            "SELECT key, value, updated_at FROM app_settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Convenience wrapper returning just the stored value.
    pub async fn get_setting_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_setting(key).await?.and_then(|s| s.value))
    }

    /// All settings ordered by key.
    pub async fn get_settings(&self) -> Result<Vec<AppSetting>> {
        let rows = sqlx::query_as::<_, AppSetting>(
            "SELECT key, value, updated_at FROM app_settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Plain insert; fails if the key already exists.
    pub async fn insert_setting(&self, setting: &AppSetting) -> Result<()> {
        sqlx::query("INSERT INTO app_settings (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(&setting.key)
            .bind(&setting.value)
            .bind(setting.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Update the value of an existing key, refreshing `updated_at`.
    /// Missing keys are left missing.
    pub async fn update_setting(&self, setting: &AppSetting) -> Result<()> {
        sqlx::query("UPDATE app_settings SET value = ?, updated_at = ? WHERE key = ?")
            .bind(&setting.value)
            .bind(now_millis())
            .bind(&setting.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert or replace a setting value (UPSERT).
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM app_settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
