use anyhow::Result;

use super::schema::Database;
use super::types::{now_millis, NotificationItem};

impl Database {
    // ========================================================================
    // Notification Operations
    // ========================================================================

    /// All notifications, newest first.
    pub async fn get_notifications(&self) -> Result<Vec<NotificationItem>> {
        let rows = sqlx::query_as::<_, NotificationItem>(
            r#"
            SELECT id, title, message, created_at, is_read, article_url
            FROM notifications
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_unread_notifications(&self) -> Result<Vec<NotificationItem>> {
        let rows = sqlx::query_as::<_, NotificationItem>(
            r#"
            SELECT id, title, message, created_at, is_read, article_url
            FROM notifications
            WHERE is_read = 0
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_notification_by_id(&self, id: i64) -> Result<Option<NotificationItem>> {
        let row = sqlx::query_as::<_, NotificationItem>(
            "SELECT id, title, message, created_at, is_read, article_url FROM notifications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Record a new unread notification and return its id.
    pub async fn insert_notification(
        &self,
        title: &str,
        message: Option<&str>,
        article_url: Option<&str>,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO notifications (title, message, created_at, is_read, article_url)
            VALUES (?, ?, ?, 0, ?)
            RETURNING id
        "#,
        )
        .bind(title)
        .bind(message)
        .bind(now_millis())
        .bind(article_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    pub async fn update_notification(&self, item: &NotificationItem) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET title = ?, message = ?, created_at = ?, is_read = ?, article_url = ?
            WHERE id = ?
        "#,
        )
        .bind(&item.title)
        .bind(&item.message)
        .bind(item.created_at)
        .bind(item.is_read)
        .bind(&item.article_url)
        .bind(item.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns `false` if no notification has that id.
    pub async fn mark_notification_read(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_notification(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_all_notifications(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_defaults_unread() {
        let db = test_db().await;
        let id = db
            .insert_notification("Breaking", Some("Something happened"), Some("https://example.com/x"))
            .await
            .unwrap();

        let item = db.get_notification_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.title, "Breaking");
        assert_eq!(item.message.as_deref(), Some("Something happened"));
        assert_eq!(item.article_url.as_deref(), Some("https://example.com/x"));
        assert!(!item.is_read);
    }

    #[tokio::test]
    async fn test_unread_filter_and_mark_read() {
        let db = test_db().await;
        let a = db.insert_notification("A", None, None).await.unwrap();
        db.insert_notification("B", None, None).await.unwrap();

        assert!(db.mark_notification_read(a).await.unwrap());
        assert!(!db.mark_notification_read(9999).await.unwrap());

        let unread = db.get_unread_notifications().await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "B");
        assert_eq!(db.get_notifications().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_notification() {
        let db = test_db().await;
        let id = db.insert_notification("Old", None, None).await.unwrap();

        let mut item = db.get_notification_by_id(id).await.unwrap().unwrap();
        item.title = "New".to_string();
        item.is_read = true;
        db.update_notification(&item).await.unwrap();

        let item = db.get_notification_by_id(id).await.unwrap().unwrap();
        assert_eq!(item.title, "New");
        assert!(item.is_read);
    }

    #[tokio::test]
    async fn test_delete_by_id_and_all() {
        let db = test_db().await;
        let a = db.insert_notification("A", None, None).await.unwrap();
        db.insert_notification("B", None, None).await.unwrap();

        db.delete_notification(a).await.unwrap();
        assert!(db.get_notification_by_id(a).await.unwrap().is_none());
        assert_eq!(db.delete_all_notifications().await.unwrap(), 1);
        assert!(db.get_notifications().await.unwrap().is_empty());
    }
}
