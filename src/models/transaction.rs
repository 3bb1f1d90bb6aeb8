use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single income or expense entry. References the owning user's category
/// and source by id; the ids are carried verbatim on the wire, never expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub source_id: Uuid,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutable portion of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFields {
    pub category_id: Uuid,
    pub source_id: Uuid,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_wire_names() {
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            amount: 50.99,
            description: None,
            date: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"categoryId\""));
        assert!(json.contains("\"sourceId\""));
        // Absent description is omitted, not null
        assert!(!json.contains("description"));
    }

    #[test]
    fn test_transaction_fields_description_optional() {
        let fields: TransactionFields = serde_json::from_str(&format!(
            r#"{{"categoryId":"{}","sourceId":"{}","amount":12.5,"date":"2025-06-01T10:00:00Z"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        ))
        .unwrap();

        assert_eq!(fields.amount, 12.5);
        assert!(fields.description.is_none());
    }
}
