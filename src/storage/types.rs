use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another newsdesk process holds the database lock
    #[error("Another instance of newsdesk appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Schema creation failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, promoting lock conditions to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if Self::is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }

    /// SQLITE_BUSY, SQLITE_LOCKED and SQLITE_CANTOPEN all surface as text only.
    pub(crate) fn is_lock_message(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("database is locked")
            || lower.contains("database table is locked")
            || lower.contains("sqlite_busy")
            || lower.contains("sqlite_locked")
            || lower.contains("unable to open database file")
    }
}

/// Current wall-clock time as epoch milliseconds, the unit every timestamp
/// column in the store uses.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Favorites
// ============================================================================

/// A user-pinned article, stored independently of the API response it came from.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FavoriteArticle {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<String>,
    pub source_name: Option<String>,
    /// Epoch millis, set when the favorite is created
    pub saved_at: i64,
}

/// Snapshot of an article's display fields, ready to be inserted as a favorite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFavorite {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<String>,
    pub source_name: Option<String>,
}

// ============================================================================
// Search History
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub query: String,
    pub searched_at: i64,
    /// Not a guaranteed count: often recorded before results arrive.
    pub result_count: i64,
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    /// API value passed as `category=` (e.g. `business`)
    pub name: String,
    pub display_name: String,
    pub is_selected: bool,
    pub sort_order: i64,
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AppSetting {
    pub key: String,
    pub value: Option<String>,
    pub updated_at: i64,
}

impl AppSetting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            updated_at: now_millis(),
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NotificationItem {
    pub id: i64,
    pub title: String,
    pub message: Option<String>,
    pub created_at: i64,
    pub is_read: bool,
    pub article_url: Option<String>,
}

// ============================================================================
// Cached Articles
// ============================================================================

/// An API article cached under the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CachedArticle {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url_to_image: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<String>,
    pub source_name: Option<String>,
    pub query: Option<String>,
    pub cached_at: i64,
}
