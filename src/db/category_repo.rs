use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::{format_ts, parse_id, parse_ts};
use crate::models::{Category, CategoryFields, TransactionType};

pub struct CategoryRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    user_id: String,
    title: String,
    category_type: String,
    default_category: bool,
    icon_res: String,
    icon_color: String,
    created_at: String,
    updated_at: String,
}

impl CategoryRow {
    fn try_into_category(self) -> Result<Category, sqlx::Error> {
        Ok(Category {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            title: self.title,
            category_type: TransactionType::from_str(&self.category_type)
                .map_err(|e| sqlx::Error::Decode(e.into()))?,
            default_category: self.default_category,
            icon_res: self.icon_res,
            icon_color: self.icon_color,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &CategoryFields,
    ) -> Result<Category, sqlx::Error> {
        let now = format_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO categories (id, user_id, title, category_type, default_category, icon_res, icon_color, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(&fields.title)
        .bind(fields.category_type.to_string())
        .bind(fields.default_category)
        .bind(&fields.icon_res)
        .bind(&fields.icon_color)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(user_id, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Update mutable fields. `id`, `user_id` and `created_at` are never
    /// touched; `updated_at` is refreshed on every accepted write.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &CategoryFields,
    ) -> Result<Category, sqlx::Error> {
        let now = format_ts(Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE categories
            SET title = ?, category_type = ?, default_category = ?, icon_res = ?, icon_color = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&fields.title)
        .bind(fields.category_type.to_string())
        .bind(fields.default_category)
        .bind(&fields.icon_res)
        .bind(&fields.icon_color)
        .bind(&now)
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        self.get_by_id(user_id, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Delete-if-present. Deleting an absent id is not an error.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), sqlx::Error> {
        // CASCADE removes dependent transactions and budgets
        sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT * FROM categories WHERE id = ? AND user_id = ?")
                .bind(id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(CategoryRow::try_into_category).transpose()
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Category>, sqlx::Error> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT * FROM categories WHERE user_id = ? ORDER BY title")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(CategoryRow::try_into_category).collect()
    }

    /// Records with `updated_at` strictly after `since`.
    pub async fn list_modified_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT * FROM categories WHERE user_id = ? AND updated_at > ? ORDER BY updated_at",
        )
        .bind(user_id.to_string())
        .bind(format_ts(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CategoryRow::try_into_category).collect()
    }

    pub async fn max_updated_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT updated_at FROM categories WHERE user_id = ? ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(ts,)| parse_ts(&ts)).transpose()
    }
}
