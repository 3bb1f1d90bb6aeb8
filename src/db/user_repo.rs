use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_ts, parse_id, parse_ts};
use crate::models::User;

pub struct UserRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    phone_number: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, sqlx::Error> {
        Ok(User {
            id: parse_id(&self.id)?,
            phone_number: self.phone_number,
            name: self.name,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user. Fails with a unique-constraint error if the phone
    /// number is already registered.
    pub async fn create(&self, phone_number: &str, name: &str) -> Result<User, sqlx::Error> {
        let id = Uuid::new_v4();
        let now = format_ts(Utc::now());

        sqlx::query(
            "INSERT INTO users (id, phone_number, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(phone_number)
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::try_into_user).transpose()
    }

    pub async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE phone_number = ?")
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::try_into_user).transpose()
    }

    /// Delete a user and, via CASCADE, everything they own.
    pub async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = init_memory_db().await.unwrap();
        let repo = UserRepository::new(pool);

        let user = repo.create("+15550001111", "Alice").await.unwrap();
        assert_eq!(user.phone_number, "+15550001111");
        assert_eq!(user.name, "Alice");

        let by_id = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.id, user.id);

        let by_phone = repo.find_by_phone("+15550001111").await.unwrap().unwrap();
        assert_eq!(by_phone.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let pool = init_memory_db().await.unwrap();
        let repo = UserRepository::new(pool);

        repo.create("+15550001111", "Alice").await.unwrap();
        let result = repo.create("+15550001111", "Imposter").await;

        assert!(matches!(result, Err(sqlx::Error::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_records() {
        let pool = init_memory_db().await.unwrap();
        let repo = UserRepository::new(pool.clone());
        let user = repo.create("+15550001111", "Alice").await.unwrap();

        let categories = crate::db::CategoryRepository::new(pool);
        let category = categories
            .create(
                user.id,
                Uuid::new_v4(),
                &crate::models::CategoryFields {
                    title: "Groceries".to_string(),
                    category_type: crate::models::TransactionType::Expense,
                    default_category: false,
                    icon_res: "cart".to_string(),
                    icon_color: "#00AA00".to_string(),
                },
            )
            .await
            .unwrap();

        repo.delete(user.id).await.unwrap();

        assert!(repo.find_by_id(user.id).await.unwrap().is_none());
        assert!(categories
            .get_by_id(user.id, category.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_unknown_phone() {
        let pool = init_memory_db().await.unwrap();
        let repo = UserRepository::new(pool);

        assert!(repo.find_by_phone("+15559999999").await.unwrap().is_none());
    }
}
