use anyhow::Result;
use sqlx::SqliteConnection;

use super::schema::Database;
use super::types::{now_millis, FavoriteArticle, NewFavorite};

const FAVORITE_COLUMNS: &str = "id, title, description, url, url_to_image, author, published_at, source_name, saved_at";

impl Database {
    // ========================================================================
    // Favorite Article Operations
    // ========================================================================

    /// All favorites, most recently saved first.
    pub async fn get_favorites(&self) -> Result<Vec<FavoriteArticle>> {
        let sql = format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorite_articles ORDER BY saved_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, FavoriteArticle>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_favorite_by_id(&self, id: i64) -> Result<Option<FavoriteArticle>> {
        let sql = format!("SELECT {FAVORITE_COLUMNS} FROM favorite_articles WHERE id = ?");
        let row = sqlx::query_as::<_, FavoriteArticle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Look a favorite up by its natural key.
    ///
    /// The table has no uniqueness constraint on `url`; if duplicates were
    /// ever written, the oldest row is returned.
    pub async fn get_favorite_by_url(&self, url: &str) -> Result<Option<FavoriteArticle>> {
        let sql = format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorite_articles WHERE url = ? ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, FavoriteArticle>(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn is_favorite(&self, url: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM favorite_articles WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert a favorite snapshot unconditionally, stamping `saved_at`.
    ///
    /// Callers that must keep one row per url go through
    /// [`Database::add_favorite_if_absent`].
    pub async fn insert_favorite(&self, favorite: &NewFavorite) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO favorite_articles
                (title, description, url, url_to_image, author, published_at, source_name, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&favorite.title)
        .bind(&favorite.description)
        .bind(&favorite.url)
        .bind(&favorite.url_to_image)
        .bind(&favorite.author)
        .bind(&favorite.published_at)
        .bind(&favorite.source_name)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Returns the existing row's id when the url is already a favorite,
    /// otherwise inserts and returns the new id.
    pub async fn add_favorite_if_absent(&self, favorite: &NewFavorite) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        insert_favorite_if_absent(&mut conn, favorite).await
    }

    /// Overwrite every column of an existing favorite, keyed by `id`.
    pub async fn update_favorite(&self, favorite: &FavoriteArticle) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE favorite_articles
            SET title = ?, description = ?, url = ?, url_to_image = ?, author = ?,
                published_at = ?, source_name = ?, saved_at = ?
            WHERE id = ?
        "#,
        )
        .bind(&favorite.title)
        .bind(&favorite.description)
        .bind(&favorite.url)
        .bind(&favorite.url_to_image)
        .bind(&favorite.author)
        .bind(&favorite.published_at)
        .bind(&favorite.source_name)
        .bind(favorite.saved_at)
        .bind(favorite.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_favorite(&self, favorite: &FavoriteArticle) -> Result<()> {
        self.delete_favorite_by_id(favorite.id).await
    }

    pub async fn delete_favorite_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM favorite_articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove every favorite row carrying `url`. Returns the number removed.
    pub async fn delete_favorites_by_url(&self, url: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM favorite_articles WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_favorites(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM favorite_articles")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Flip the favorite state of `favorite.url` and return the new state.
    ///
    /// `true` means the article is now a favorite. A snapshot without a url
    /// cannot be looked up, so it is always inserted. The delete runs first
    /// so the transaction holds the write lock before it picks a direction.
    pub async fn toggle_favorite(&self, favorite: &NewFavorite) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if let Some(url) = favorite.url.as_deref() {
            let removed = sqlx::query("DELETE FROM favorite_articles WHERE url = ?")
                .bind(url)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if removed > 0 {
                tx.commit().await?;
                tracing::debug!(url = %url, removed = removed, "Removed favorite");
                return Ok(false);
            }
        }

        let id = insert_favorite_if_absent(&mut tx, favorite).await?;
        tx.commit().await?;
        tracing::debug!(url = ?favorite.url, id = id, "Added favorite");
        Ok(true)
    }
}

/// Insert `favorite` unless a row with the same url exists, in one statement.
///
/// A NULL url never matches, so url-less snapshots are always inserted.
async fn insert_favorite_if_absent(
    conn: &mut SqliteConnection,
    favorite: &NewFavorite,
) -> Result<i64> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO favorite_articles
            (title, description, url, url_to_image, author, published_at, source_name, saved_at)
        SELECT ?, ?, ?, ?, ?, ?, ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM favorite_articles WHERE url = ?)
        RETURNING id
    "#,
    )
    .bind(&favorite.title)
    .bind(&favorite.description)
    .bind(&favorite.url)
    .bind(&favorite.url_to_image)
    .bind(&favorite.author)
    .bind(&favorite.published_at)
    .bind(&favorite.source_name)
    .bind(now_millis())
    .bind(&favorite.url)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = inserted {
        return Ok(id);
    }

    let existing: (i64,) =
        sqlx::query_as("SELECT id FROM favorite_articles WHERE url = ? ORDER BY id LIMIT 1")
            .bind(&favorite.url)
            .fetch_one(&mut *conn)
            .await?;
    tracing::debug!(url = ?favorite.url, id = existing.0, "Article already a favorite");
    Ok(existing.0)
}
