use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Whether money flows in or out. Categories carry the type; transactions
/// inherit it from their category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => write!(f, "Income"),
            TransactionType::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Income" => Ok(TransactionType::Income),
            "Expense" => Ok(TransactionType::Expense),
            _ => Err(format!(
                "Invalid transaction type '{}'. Valid options: Income, Expense",
                s
            )),
        }
    }
}

/// A spending or income category owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    pub default_category: bool,
    pub icon_res: String,
    pub icon_color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutable portion of a category. Identity fields (`id`, `user_id`,
/// `created_at`) are never part of this set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFields {
    pub title: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
    #[serde(default)]
    pub default_category: bool,
    pub icon_res: String,
    pub icon_color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_display() {
        assert_eq!(format!("{}", TransactionType::Income), "Income");
        assert_eq!(format!("{}", TransactionType::Expense), "Expense");
    }

    #[test]
    fn test_transaction_type_from_str() {
        assert_eq!(
            TransactionType::from_str("Income").unwrap(),
            TransactionType::Income
        );
        assert_eq!(
            TransactionType::from_str("Expense").unwrap(),
            TransactionType::Expense
        );
        assert!(TransactionType::from_str("income").is_err());
        assert!(TransactionType::from_str("").is_err());
    }

    #[test]
    fn test_transaction_type_json_roundtrip() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"Expense\"");

        let parsed: TransactionType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TransactionType::Expense);
    }

    #[test]
    fn test_category_wire_names() {
        let category = Category {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Groceries".to_string(),
            category_type: TransactionType::Expense,
            default_category: true,
            icon_res: "cart".to_string(),
            icon_color: "#00FF00".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&category).unwrap();
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"type\":\"Expense\""));
        assert!(json.contains("\"defaultCategory\""));
        assert!(json.contains("\"iconRes\""));
    }
}
