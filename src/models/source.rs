use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Bank,
    Custom,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Bank => write!(f, "Bank"),
            SourceType::Custom => write!(f, "Custom"),
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bank" => Ok(SourceType::Bank),
            "Custom" => Ok(SourceType::Custom),
            _ => Err(format!(
                "Invalid source type '{}'. Valid options: Bank, Custom",
                s
            )),
        }
    }
}

/// A money source (bank account or user-defined wallet) owned by a single
/// user. Bank sources carry bank metadata; custom sources only a title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub initial_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_source_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_source_bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_source_card_number: Option<String>,
    pub bank_source_sms_suggestion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_source_title: Option<String>,
    pub icon_res: String,
    pub icon_color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutable portion of a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFields {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default)]
    pub initial_balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_card_number: Option<String>,
    #[serde(default)]
    pub bank_source_sms_suggestion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_source_title: Option<String>,
    pub icon_res: String,
    pub icon_color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_from_str() {
        assert_eq!(SourceType::from_str("Bank").unwrap(), SourceType::Bank);
        assert_eq!(SourceType::from_str("Custom").unwrap(), SourceType::Custom);
        assert!(SourceType::from_str("bank").is_err());
    }

    #[test]
    fn test_source_fields_defaults() {
        let fields: SourceFields = serde_json::from_str(
            r##"{"type":"Custom","customSourceTitle":"Wallet","iconRes":"wallet","iconColor":"#123456"}"##,
        )
        .unwrap();

        assert_eq!(fields.source_type, SourceType::Custom);
        assert_eq!(fields.initial_balance, 0.0);
        assert!(!fields.bank_source_sms_suggestion);
        assert!(fields.bank_source_title.is_none());
        assert_eq!(fields.custom_source_title.as_deref(), Some("Wallet"));
    }
}
