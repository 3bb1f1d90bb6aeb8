use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_ts, parse_id, parse_ts};
use crate::models::{Transaction, TransactionFields};

pub struct TransactionRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: String,
    category_id: String,
    source_id: String,
    amount: f64,
    description: Option<String>,
    date: String,
    created_at: String,
    updated_at: String,
}

impl TransactionRow {
    fn try_into_transaction(self) -> Result<Transaction, sqlx::Error> {
        Ok(Transaction {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            category_id: parse_id(&self.category_id)?,
            source_id: parse_id(&self.source_id)?,
            amount: self.amount,
            description: self.description,
            date: parse_ts(&self.date)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &TransactionFields,
    ) -> Result<Transaction, sqlx::Error> {
        let now = format_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, category_id, source_id, amount, description, date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(fields.category_id.to_string())
        .bind(fields.source_id.to_string())
        .bind(fields.amount)
        .bind(&fields.description)
        .bind(format_ts(fields.date))
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
        fields: &TransactionFields,
    ) -> Result<Transaction, sqlx::Error> {
        let now = format_ts(Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET category_id = ?, source_id = ?, amount = ?, description = ?, date = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(fields.category_id.to_string())
        .bind(fields.source_id.to_string())
        .bind(fields.amount)
        .bind(&fields.description)
        .bind(format_ts(fields.date))
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
        sqlx::query("DELETE FROM transactions WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let row: Option<TransactionRow> =
            sqlx::query_as("SELECT * FROM transactions WHERE id = ? AND user_id = ?")
                .bind(id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TransactionRow::try_into_transaction).transpose()
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows: Vec<TransactionRow> =
            sqlx::query_as("SELECT * FROM transactions WHERE user_id = ? ORDER BY date DESC")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(TransactionRow::try_into_transaction)
            .collect()
    }

    pub async fn list_modified_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT * FROM transactions WHERE user_id = ? AND updated_at > ? ORDER BY updated_at",
        )
        .bind(user_id.to_string())
        .bind(format_ts(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(TransactionRow::try_into_transaction)
            .collect()
    }

    pub async fn max_updated_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT updated_at FROM transactions WHERE user_id = ? ORDER BY updated_at DESC LIMIT 1",
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
    use crate::db::{init_memory_db, CategoryRepository, SourceRepository, UserRepository};
    use crate::models::{CategoryFields, SourceFields, SourceType, TransactionType};

    struct Fixture {
        repo: TransactionRepository,
        categories: CategoryRepository,
        user_id: Uuid,
        category_id: Uuid,
        source_id: Uuid,
    }

    async fn setup() -> Fixture {
        let pool = init_memory_db().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .create("+15550001111", "Test")
            .await
            .unwrap();

        let categories = CategoryRepository::new(pool.clone());
        let category = categories
            .create(
                user.id,
                Uuid::new_v4(),
                &CategoryFields {
                    title: "Groceries".to_string(),
                    category_type: TransactionType::Expense,
                    default_category: false,
                    icon_res: "cart".to_string(),
                    icon_color: "#00AA00".to_string(),
                },
            )
            .await
            .unwrap();

        let source = SourceRepository::new(pool.clone())
            .create(
                user.id,
                Uuid::new_v4(),
                &SourceFields {
                    source_type: SourceType::Custom,
                    initial_balance: 0.0,
                    bank_source_title: None,
                    bank_source_bank_name: None,
                    bank_source_card_number: None,
                    bank_source_sms_suggestion: false,
                    custom_source_title: Some("Cash".to_string()),
                    icon_res: "cash".to_string(),
                    icon_color: "#999999".to_string(),
                },
            )
            .await
            .unwrap();

        Fixture {
            repo: TransactionRepository::new(pool),
            categories,
            user_id: user.id,
            category_id: category.id,
            source_id: source.id,
        }
    }

    fn fields(fx: &Fixture, amount: f64) -> TransactionFields {
        TransactionFields {
            category_id: fx.category_id,
            source_id: fx.source_id,
            amount,
            description: Some("lunch".to_string()),
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let fx = setup().await;
        let id = Uuid::new_v4();

        let created = fx.repo.create(fx.user_id, id, &fields(&fx, 12.5)).await.unwrap();
        assert_eq!(created.amount, 12.5);
        assert_eq!(created.category_id, fx.category_id);

        let updated = fx.repo.update(fx.user_id, id, &fields(&fx, 20.0)).await.unwrap();
        assert_eq!(updated.amount, 20.0);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_create_with_missing_category_fails() {
        let fx = setup().await;
        let mut bad = fields(&fx, 5.0);
        bad.category_id = Uuid::new_v4();

        let result = fx.repo.create(fx.user_id, Uuid::new_v4(), &bad).await;
        assert!(matches!(result, Err(sqlx::Error::Database(_))));
    }

    #[tokio::test]
    async fn test_category_delete_cascades() {
        let fx = setup().await;
        let id = Uuid::new_v4();
        fx.repo.create(fx.user_id, id, &fields(&fx, 9.0)).await.unwrap();

        fx.categories.delete(fx.user_id, fx.category_id).await.unwrap();

        assert!(fx.repo.get_by_id(fx.user_id, id).await.unwrap().is_none());
    }
}
