use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// Owned handle to the local news store.
///
/// Cloning is cheap (the pool is reference counted), so every component that
/// needs persistence receives its own clone instead of reaching for a global.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `":memory:"` for a throwaway store; tests rely on this.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another newsdesk process holds
    /// the database lock, `DatabaseError::Migration` if the schema could not be
    /// created, and `DatabaseError::Other` for anything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Create the file user-only before SQLite touches it
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() {
                if let Some(parent) = db_path.parent().filter(|p| p.exists()) {
                    tracing::trace!(parent = %parent.display(), "Pre-creating database file");
                    let _file = std::fs::OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .mode(0o600)
                        .open(db_path)
                        .ok(); // connect_with reports the real error if this fails
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        // An in-memory database lives and dies with its connection, so there
        // must be exactly one and it must never be recycled.
        let in_memory = path == ":memory:";
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout((!in_memory).then(|| Duration::from_secs(600)))
            .max_lifetime((!in_memory).then(|| Duration::from_secs(1800)))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let message = e.to_string();
            if DatabaseError::is_lock_message(&message) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(message)
            }
        })?;

        tracing::debug!(path = %path, "Database opened");
        Ok(db)
    }

    /// Create all tables inside one transaction.
    ///
    /// Every statement is `IF NOT EXISTS`, so running this against an existing
    /// database is a no-op. The six tables have no foreign keys between them.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // favorite_articles.url is deliberately not UNIQUE; the toggle path
        // looks the url up before inserting.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS favorite_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                description TEXT,
                url TEXT,
                url_to_image TEXT,
                author TEXT,
                published_at TEXT,
                source_name TEXT,
                saved_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_favorites_url ON favorite_articles(url)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                searched_at INTEGER NOT NULL,
                result_count INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                display_name TEXT NOT NULL,
                is_selected INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                message TEXT,
                created_at INTEGER NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                article_url TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cached_articles (
                url TEXT PRIMARY KEY NOT NULL,
                title TEXT,
                description TEXT,
                url_to_image TEXT,
                author TEXT,
                published_at TEXT,
                source_name TEXT,
                query TEXT,
                cached_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cached_articles_query ON cached_articles(query, cached_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
