use anyhow::Result;

use super::schema::Database;
use super::types::{now_millis, SearchHistoryEntry};

impl Database {
    // ========================================================================
    // Search History Operations
    // ========================================================================

    /// Append a search. History is never updated in place or de-duplicated.
    pub async fn insert_search(&self, query: &str, result_count: i64) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO search_history (query, searched_at, result_count) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(query)
        .bind(now_millis())
        .bind(result_count.max(0))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// The `limit` most recent searches, newest first.
    pub async fn get_recent_searches(&self, limit: u32) -> Result<Vec<SearchHistoryEntry>> {
        let rows = sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            SELECT id, query, searched_at, result_count
            FROM search_history
            ORDER BY searched_at DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_search_history(&self) -> Result<Vec<SearchHistoryEntry>> {
        let rows = sqlx::query_as::<_, SearchHistoryEntry>(
            "SELECT id, query, searched_at, result_count FROM search_history ORDER BY searched_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_searches(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn delete_search(&self, entry: &SearchHistoryEntry) -> Result<()> {
        sqlx::query("DELETE FROM search_history WHERE id = ?")
            .bind(entry.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_search_history(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM search_history")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
