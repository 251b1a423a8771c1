use anyhow::{bail, Result};

use super::schema::Database;
use super::types::Category;
use crate::util::strip_control_chars;

/// NewsAPI's fixed category set as `(api name, display name)`, in tab order.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("general", "General"),
    ("business", "Business"),
    ("entertainment", "Entertainment"),
    ("health", "Health"),
    ("science", "Science"),
    ("sports", "Sports"),
    ("technology", "Technology"),
];

impl Database {
    // ========================================================================
    // Category Operations
    // ========================================================================

    /// Strip control characters and surrounding whitespace; reject empty names.
    fn sanitize_category_field(value: &str) -> Result<String> {
        let sanitized = strip_control_chars(value);
        let trimmed = sanitized.trim();
        if trimmed.is_empty() {
            bail!("Category name cannot be empty or whitespace-only");
        }
        Ok(trimmed.to_owned())
    }

    /// All categories in display order.
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, display_name, is_selected, sort_order FROM categories ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_selected_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, display_name, is_selected, sort_order FROM categories WHERE is_selected = 1 ORDER BY sort_order ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, display_name, is_selected, sort_order FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert a category and return its generated id. `category.id` is ignored.
    pub async fn insert_category(&self, category: &Category) -> Result<i64> {
        let name = Self::sanitize_category_field(&category.name)?;
        let display_name = Self::sanitize_category_field(&category.display_name)?;

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO categories (name, display_name, is_selected, sort_order) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&name)
        .bind(&display_name)
        .bind(category.is_selected)
        .bind(category.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Insert several categories atomically.
    pub async fn insert_categories(&self, categories: &[Category]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for category in categories {
            let name = Self::sanitize_category_field(&category.name)?;
            let display_name = Self::sanitize_category_field(&category.display_name)?;
            sqlx::query(
                "INSERT INTO categories (name, display_name, is_selected, sort_order) VALUES (?, ?, ?, ?)",
            )
            .bind(&name)
            .bind(&display_name)
            .bind(category.is_selected)
            .bind(category.sort_order)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        let name = Self::sanitize_category_field(&category.name)?;
        let display_name = Self::sanitize_category_field(&category.display_name)?;

        sqlx::query(
            "UPDATE categories SET name = ?, display_name = ?, is_selected = ?, sort_order = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&display_name)
        .bind(category.is_selected)
        .bind(category.sort_order)
        .bind(category.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_all_categories(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM categories")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Populate the table with [`DEFAULT_CATEGORIES`] when it is empty.
    ///
    /// `general` starts selected. Returns the number of rows inserted (0 when
    /// categories already exist).
    pub async fn seed_default_categories(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let categories: Vec<Category> = DEFAULT_CATEGORIES
            .iter()
            .enumerate()
            .map(|(i, (name, display_name))| Category {
                id: 0,
                name: (*name).to_string(),
                display_name: (*display_name).to_string(),
                is_selected: i == 0,
                sort_order: i as i64,
            })
            .collect();
        self.insert_categories(&categories).await?;

        tracing::debug!(count = categories.len(), "Seeded default categories");
        Ok(categories.len())
    }

    /// Mark exactly one category (by API name) as selected.
    ///
    /// Fails without changing anything if no category has that name.
    pub async fn select_category(&self, name: &str) -> Result<Category> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, Category>(
            "SELECT id, name, display_name, is_selected, sort_order FROM categories WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(mut target) = target else {
            bail!("Unknown category: {}", name);
        };

        sqlx::query("UPDATE categories SET is_selected = (id = ?)")
            .bind(target.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        target.is_selected = true;
        Ok(target)
    }
}
