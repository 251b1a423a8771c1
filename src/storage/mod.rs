//! Local store: one SQLite database, six independent tables.
//!
//! Each table gets its own file of `impl Database` methods; row types and the
//! error enum live in `types`.

mod cached_articles;
mod categories;
mod favorites;
mod notifications;
mod schema;
mod search_history;
mod settings;
mod types;

pub use categories::DEFAULT_CATEGORIES;
pub use schema::Database;
pub use types::{
    now_millis, AppSetting, CachedArticle, Category, DatabaseError, FavoriteArticle, NewFavorite,
    NotificationItem, SearchHistoryEntry,
};
