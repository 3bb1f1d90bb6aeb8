use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_ts, parse_id, parse_ts};
use crate::models::{Budget, BudgetFields};

pub struct BudgetRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct BudgetRow {
    id: String,
    user_id: String,
    category_id: String,
    amount: f64,
    start_date: String,
    end_date: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BudgetRow {
    fn try_into_budget(self) -> Result<Budget, sqlx::Error> {
        Ok(Budget {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            category_id: parse_id(&self.category_id)?,
            amount: self.amount,
            start_date: parse_ts(&self.start_date)?,
            end_date: parse_ts(&self.end_date)?,
            description: self.description,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

impl BudgetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, sqlx::Error> {
        let now = format_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO budgets (id, user_id, category_id, amount, start_date, end_date, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(fields.category_id.to_string())
        .bind(fields.amount)
        .bind(format_ts(fields.start_date))
        .bind(format_ts(fields.end_date))
        .bind(&fields.description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(user_id, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, sqlx::Error> {
        let now = format_ts(Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE budgets
            SET category_id = ?, amount = ?, start_date = ?, end_date = ?, description = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(fields.category_id.to_string())
        .bind(fields.amount)
        .bind(format_ts(fields.start_date))
        .bind(format_ts(fields.end_date))
        .bind(&fields.description)
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
        sqlx::query("DELETE FROM budgets WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Budget>, sqlx::Error> {
        let row: Option<BudgetRow> =
            sqlx::query_as("SELECT * FROM budgets WHERE id = ? AND user_id = ?")
                .bind(id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(BudgetRow::try_into_budget).transpose()
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Budget>, sqlx::Error> {
        let rows: Vec<BudgetRow> =
            sqlx::query_as("SELECT * FROM budgets WHERE user_id = ? ORDER BY start_date DESC")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(BudgetRow::try_into_budget).collect()
    }

    pub async fn list_modified_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Budget>, sqlx::Error> {
        let rows: Vec<BudgetRow> = sqlx::query_as(
            "SELECT * FROM budgets WHERE user_id = ? AND updated_at > ? ORDER BY updated_at",
        )
        .bind(user_id.to_string())
        .bind(format_ts(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BudgetRow::try_into_budget).collect()
    }

    pub async fn max_updated_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT updated_at FROM budgets WHERE user_id = ? ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(ts,)| parse_ts(&ts)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory_db, CategoryRepository, UserRepository};
    use crate::models::{CategoryFields, TransactionType};

    #[tokio::test]
    async fn test_budget_lifecycle() {
        let pool = init_memory_db().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .create("+15550001111", "Test")
            .await
            .unwrap();
        let category = CategoryRepository::new(pool.clone())
            .create(
                user.id,
                Uuid::new_v4(),
                &CategoryFields {
                    title: "Food".to_string(),
                    category_type: TransactionType::Expense,
                    default_category: false,
                    icon_res: "food".to_string(),
                    icon_color: "#AA0000".to_string(),
                },
            )
            .await
            .unwrap();
        let repo = BudgetRepository::new(pool);

        let id = Uuid::new_v4();
        let fields = BudgetFields {
            category_id: category.id,
            amount: 300.0,
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::days(30),
            description: None,
        };

        let created = repo.create(user.id, id, &fields).await.unwrap();
        assert_eq!(created.amount, 300.0);

        let mut changed = fields.clone();
        changed.amount = 350.0;
        let updated = repo.update(user.id, id, &changed).await.unwrap();
        assert_eq!(updated.amount, 350.0);

        repo.delete(user.id, id).await.unwrap();
        assert!(repo.get_by_id(user.id, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_budget_requires_existing_category() {
        let pool = init_memory_db().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .create("+15550001111", "Test")
            .await
            .unwrap();
        let repo = BudgetRepository::new(pool);

        let result = repo
            .create(
                user.id,
                Uuid::new_v4(),
                &BudgetFields {
                    category_id: Uuid::new_v4(),
                    amount: 100.0,
                    start_date: Utc::now(),
                    end_date: Utc::now(),
                    description: None,
                },
            )
            .await;

        assert!(matches!(result, Err(sqlx::Error::Database(_))));
    }
}
