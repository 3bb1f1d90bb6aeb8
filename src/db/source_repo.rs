use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::{format_ts, parse_id, parse_ts};
use crate::models::{Source, SourceFields, SourceType};

pub struct SourceRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: String,
    user_id: String,
    source_type: String,
    initial_balance: f64,
    bank_source_title: Option<String>,
    bank_source_bank_name: Option<String>,
    bank_source_card_number: Option<String>,
    bank_source_sms_suggestion: bool,
    custom_source_title: Option<String>,
    icon_res: String,
    icon_color: String,
    created_at: String,
    updated_at: String,
}

impl SourceRow {
    fn try_into_source(self) -> Result<Source, sqlx::Error> {
        Ok(Source {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            source_type: SourceType::from_str(&self.source_type)
                .map_err(|e| sqlx::Error::Decode(e.into()))?,
            initial_balance: self.initial_balance,
            bank_source_title: self.bank_source_title,
            bank_source_bank_name: self.bank_source_bank_name,
            bank_source_card_number: self.bank_source_card_number,
            bank_source_sms_suggestion: self.bank_source_sms_suggestion,
            custom_source_title: self.custom_source_title,
            icon_res: self.icon_res,
            icon_color: self.icon_color,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

impl SourceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &SourceFields,
    ) -> Result<Source, sqlx::Error> {
        let now = format_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO sources (id, user_id, source_type, initial_balance, bank_source_title,
                bank_source_bank_name, bank_source_card_number, bank_source_sms_suggestion,
                custom_source_title, icon_res, icon_color, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(fields.source_type.to_string())
        .bind(fields.initial_balance)
        .bind(&fields.bank_source_title)
        .bind(&fields.bank_source_bank_name)
        .bind(&fields.bank_source_card_number)
        .bind(fields.bank_source_sms_suggestion)
        .bind(&fields.custom_source_title)
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

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &SourceFields,
    ) -> Result<Source, sqlx::Error> {
        let now = format_ts(Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE sources
            SET source_type = ?, initial_balance = ?, bank_source_title = ?,
                bank_source_bank_name = ?, bank_source_card_number = ?,
                bank_source_sms_suggestion = ?, custom_source_title = ?,
                icon_res = ?, icon_color = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(fields.source_type.to_string())
        .bind(fields.initial_balance)
        .bind(&fields.bank_source_title)
        .bind(&fields.bank_source_bank_name)
        .bind(&fields.bank_source_card_number)
        .bind(fields.bank_source_sms_suggestion)
        .bind(&fields.custom_source_title)
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
        sqlx::query("DELETE FROM sources WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Source>, sqlx::Error> {
        let row: Option<SourceRow> =
            sqlx::query_as("SELECT * FROM sources WHERE id = ? AND user_id = ?")
                .bind(id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(SourceRow::try_into_source).transpose()
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Source>, sqlx::Error> {
        let rows: Vec<SourceRow> =
            sqlx::query_as("SELECT * FROM sources WHERE user_id = ? ORDER BY created_at")
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(SourceRow::try_into_source).collect()
    }

    pub async fn list_modified_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Source>, sqlx::Error> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            "SELECT * FROM sources WHERE user_id = ? AND updated_at > ? ORDER BY updated_at",
        )
        .bind(user_id.to_string())
        .bind(format_ts(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SourceRow::try_into_source).collect()
    }

    pub async fn max_updated_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT updated_at FROM sources WHERE user_id = ? ORDER BY updated_at DESC LIMIT 1",
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
    use crate::db::{init_memory_db, UserRepository};

    fn wallet() -> SourceFields {
        SourceFields {
            source_type: SourceType::Custom,
            initial_balance: 100.0,
            bank_source_title: None,
            bank_source_bank_name: None,
            bank_source_card_number: None,
            bank_source_sms_suggestion: false,
            custom_source_title: Some("Wallet".to_string()),
            icon_res: "wallet".to_string(),
            icon_color: "#336699".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let pool = init_memory_db().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .create("+15550001111", "Test")
            .await
            .unwrap();
        let repo = SourceRepository::new(pool);
        let id = Uuid::new_v4();

        let created = repo.create(user.id, id, &wallet()).await.unwrap();
        assert_eq!(created.custom_source_title.as_deref(), Some("Wallet"));
        assert_eq!(created.source_type, SourceType::Custom);

        let mut fields = wallet();
        fields.source_type = SourceType::Bank;
        fields.bank_source_title = Some("Checking".to_string());
        fields.bank_source_bank_name = Some("First National".to_string());
        let updated = repo.update(user.id, id, &fields).await.unwrap();
        assert_eq!(updated.source_type, SourceType::Bank);
        assert_eq!(updated.bank_source_title.as_deref(), Some("Checking"));

        repo.delete(user.id, id).await.unwrap();
        assert!(repo.get_by_id(user.id, id).await.unwrap().is_none());
        // Idempotent
        repo.delete(user.id, id).await.unwrap();
    }
}
