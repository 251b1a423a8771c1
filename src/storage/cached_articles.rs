use anyhow::Result;

use super::schema::Database;
use super::types::CachedArticle;

const CACHED_COLUMNS: &str =
    "url, title, description, url_to_image, author, published_at, source_name, query, cached_at";

impl Database {
    // ========================================================================
    // Cached Article Operations
    // ========================================================================

    /// Articles cached for `query`, newest first.
    pub async fn get_cached_by_query(&self, query: &str) -> Result<Vec<CachedArticle>> {
        let sql = format!(
            "SELECT {CACHED_COLUMNS} FROM cached_articles WHERE query = ? ORDER BY cached_at DESC"
        );
        let rows = sqlx::query_as::<_, CachedArticle>(&sql)
            .bind(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_cached_by_url(&self, url: &str) -> Result<Option<CachedArticle>> {
        let sql = format!("SELECT {CACHED_COLUMNS} FROM cached_articles WHERE url = ?");
        let row = sqlx::query_as::<_, CachedArticle>(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_all_cached(&self) -> Result<Vec<CachedArticle>> {
        let sql = format!("SELECT {CACHED_COLUMNS} FROM cached_articles ORDER BY cached_at DESC");
        let rows = sqlx::query_as::<_, CachedArticle>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Cache one article. An existing row with the same url is replaced.
    pub async fn insert_cached(&self, article: &CachedArticle) -> Result<()> {
        Self::insert_cached_with(&self.pool, article).await
    }

    /// Cache a batch of articles in a single transaction. Returns the number written.
    pub async fn insert_cached_batch(&self, articles: &[CachedArticle]) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for article in articles {
            Self::insert_cached_with(&mut *tx, article).await?;
        }
        tx.commit().await?;
        Ok(articles.len())
    }

    async fn insert_cached_with<'e, E>(executor: E, article: &CachedArticle) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO cached_articles
                (url, title, description, url_to_image, author, published_at, source_name, query, cached_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.url_to_image)
        .bind(&article.author)
        .bind(&article.published_at)
        .bind(&article.source_name)
        .bind(&article.query)
        .bind(article.cached_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_cached(&self, article: &CachedArticle) -> Result<()> {
        sqlx::query("DELETE FROM cached_articles WHERE url = ?")
            .bind(&article.url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Evict every row cached strictly before `timestamp` (epoch millis).
    ///
    /// Returns the number of rows evicted.
    pub async fn delete_cached_older_than(&self, timestamp: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_articles WHERE cached_at < ?")
            .bind(timestamp)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_cached(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_articles")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{now_millis, CachedArticle, Database};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn cached(url: &str, query: &str, cached_at: i64) -> CachedArticle {
        CachedArticle {
            url: url.to_string(),
            title: Some(format!("Title for {url}")),
            description: None,
            url_to_image: None,
            author: None,
            published_at: Some("2024-01-01T00:00:00Z".to_string()),
            source_name: Some("Wire".to_string()),
            query: Some(query.to_string()),
            cached_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_by_url() {
        let db = test_db().await;
        db.insert_cached(&cached("https://example.com/a", "rust", now_millis()))
            .await
            .unwrap();

        let row = db
            .get_cached_by_url("https://example.com/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.query.as_deref(), Some("rust"));
        assert!(db
            .get_cached_by_url("https://example.com/missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces_same_url() {
        let db = test_db().await;
        db.insert_cached(&cached("https://example.com/a", "old", 1))
            .await
            .unwrap();
        db.insert_cached(&cached("https://example.com/a", "new", 2))
            .await
            .unwrap();

        let all = db.get_all_cached().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].query.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_get_by_query_newest_first() {
        let db = test_db().await;
        let batch = vec![
            cached("https://example.com/1", "rust", 100),
            cached("https://example.com/2", "rust", 300),
            cached("https://example.com/3", "go", 200),
        ];
        assert_eq!(db.insert_cached_batch(&batch).await.unwrap(), 3);

        let rust = db.get_cached_by_query("rust").await.unwrap();
        assert_eq!(rust.len(), 2);
        assert_eq!(rust[0].url, "https://example.com/2");
        assert_eq!(rust[1].url, "https://example.com/1");
    }

    #[tokio::test]
    async fn test_batch_empty_is_noop() {
        let db = test_db().await;
        assert_eq!(db.insert_cached_batch(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let db = test_db().await;
        let batch = vec![
            cached("https://example.com/old", "q", 1_000),
            cached("https://example.com/edge", "q", 2_000),
            cached("https://example.com/new", "q", 3_000),
        ];
        db.insert_cached_batch(&batch).await.unwrap();

        // Strictly older: the row at exactly 2_000 survives
        assert_eq!(db.delete_cached_older_than(2_000).await.unwrap(), 1);
        let urls: Vec<String> = db
            .get_all_cached()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.url)
            .collect();
        assert_eq!(urls, vec!["https://example.com/new", "https://example.com/edge"]);
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let db = test_db().await;
        let a = cached("https://example.com/a", "q", 1);
        db.insert_cached(&a).await.unwrap();
        db.insert_cached(&cached("https://example.com/b", "q", 2))
            .await
            .unwrap();

        db.delete_cached(&a).await.unwrap();
        assert!(db.get_cached_by_url(&a.url).await.unwrap().is_none());
        assert_eq!(db.delete_all_cached().await.unwrap(), 1);
    }
}
