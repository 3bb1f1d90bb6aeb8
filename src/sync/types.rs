//! Wire types and error taxonomy for the sync protocol.
//!
//! A push request and a pull response share the same shape: four sequences
//! of change records, one per entity kind. A change record is the kind's
//! normal field set plus an optional `deleted` flag; when `deleted` is true
//! only the id is meaningful.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{
    Budget, BudgetFields, Category, CategoryFields, Source, SourceFields, SourceType, Transaction,
    TransactionFields, TransactionType,
};

/// The four syncable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Source,
    Transaction,
    Budget,
}

impl EntityKind {
    /// Plural name matching the wire keys of [`ChangeSet`] and [`SyncResults`].
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::Source => "sources",
            EntityKind::Transaction => "transactions",
            EntityKind::Budget => "budgets",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which mutation a classified change record produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    Created,
    Updated,
    Deleted,
}

/// Per-kind mutation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpCounts {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
}

/// Counters for one push, keyed by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResults {
    pub transactions: OpCounts,
    pub categories: OpCounts,
    pub sources: OpCounts,
    pub budgets: OpCounts,
}

impl SyncResults {
    pub fn record(&mut self, kind: EntityKind, op: SyncOp) {
        let counts = match kind {
            EntityKind::Transaction => &mut self.transactions,
            EntityKind::Category => &mut self.categories,
            EntityKind::Source => &mut self.sources,
            EntityKind::Budget => &mut self.budgets,
        };
        match op {
            SyncOp::Created => counts.created += 1,
            SyncOp::Updated => counts.updated += 1,
            SyncOp::Deleted => counts.deleted += 1,
        }
    }
}

/// Last-update watermarks per kind plus the server wall-clock time.
///
/// `last_sync` is the time this status was computed, not a stored value;
/// clients remember it as their next pull baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_sync: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_category_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_source_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_budget_update: Option<DateTime<Utc>>,
}

/// Response to a successful push.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub results: SyncResults,
    pub sync_status: SyncStatus,
}

/// A batch of change records spanning all kinds; also the pull response
/// shape, where `deleted` is never set because the store keeps no tombstones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub transactions: Vec<TransactionChange>,
    #[serde(default)]
    pub categories: Vec<CategoryChange>,
    #[serde(default)]
    pub sources: Vec<SourceChange>,
    #[serde(default)]
    pub budgets: Vec<BudgetChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.categories.is_empty()
            && self.sources.is_empty()
            && self.budgets.is_empty()
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A category change record. Field requirements are only enforced for
/// non-deleted records, when the fields are actually applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChange {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category_type: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_res: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CategoryChange {
    pub(crate) fn fields(&self) -> Result<CategoryFields, SyncError> {
        Ok(CategoryFields {
            title: require(self.title.clone(), "title")?,
            category_type: require(self.category_type, "type")?,
            default_category: self.default_category.unwrap_or(false),
            icon_res: require(self.icon_res.clone(), "iconRes")?,
            icon_color: require(self.icon_color.clone(), "iconColor")?,
        })
    }
}

impl From<Category> for CategoryChange {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            deleted: false,
            title: Some(c.title),
            category_type: Some(c.category_type),
            default_category: Some(c.default_category),
            icon_res: Some(c.icon_res),
            icon_color: Some(c.icon_color),
            created_at: Some(c.created_at),
            updated_at: Some(c.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceChange {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_source_sms_suggestion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_res: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SourceChange {
    pub(crate) fn fields(&self) -> Result<SourceFields, SyncError> {
        Ok(SourceFields {
            source_type: require(self.source_type, "type")?,
            initial_balance: self.initial_balance.unwrap_or(0.0),
            bank_source_title: self.bank_source_title.clone(),
            bank_source_bank_name: self.bank_source_bank_name.clone(),
            bank_source_card_number: self.bank_source_card_number.clone(),
            bank_source_sms_suggestion: self.bank_source_sms_suggestion.unwrap_or(false),
            custom_source_title: self.custom_source_title.clone(),
            icon_res: require(self.icon_res.clone(), "iconRes")?,
            icon_color: require(self.icon_color.clone(), "iconColor")?,
        })
    }
}

impl From<Source> for SourceChange {
    fn from(s: Source) -> Self {
        Self {
            id: s.id,
            deleted: false,
            source_type: Some(s.source_type),
            initial_balance: Some(s.initial_balance),
            bank_source_title: s.bank_source_title,
            bank_source_bank_name: s.bank_source_bank_name,
            bank_source_card_number: s.bank_source_card_number,
            bank_source_sms_suggestion: Some(s.bank_source_sms_suggestion),
            custom_source_title: s.custom_source_title,
            icon_res: Some(s.icon_res),
            icon_color: Some(s.icon_color),
            created_at: Some(s.created_at),
            updated_at: Some(s.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionChange {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransactionChange {
    pub(crate) fn fields(&self) -> Result<TransactionFields, SyncError> {
        Ok(TransactionFields {
            category_id: require(self.category_id, "categoryId")?,
            source_id: require(self.source_id, "sourceId")?,
            amount: require(self.amount, "amount")?,
            description: self.description.clone(),
            date: require(self.date, "date")?,
        })
    }
}

impl From<Transaction> for TransactionChange {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            deleted: false,
            category_id: Some(t.category_id),
            source_id: Some(t.source_id),
            amount: Some(t.amount),
            description: t.description,
            date: Some(t.date),
            created_at: Some(t.created_at),
            updated_at: Some(t.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetChange {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BudgetChange {
    pub(crate) fn fields(&self) -> Result<BudgetFields, SyncError> {
        Ok(BudgetFields {
            category_id: require(self.category_id, "categoryId")?,
            amount: require(self.amount, "amount")?,
            start_date: require(self.start_date, "startDate")?,
            end_date: require(self.end_date, "endDate")?,
            description: self.description.clone(),
        })
    }
}

impl From<Budget> for BudgetChange {
    fn from(b: Budget) -> Self {
        Self {
            id: b.id,
            deleted: false,
            category_id: Some(b.category_id),
            amount: Some(b.amount),
            start_date: Some(b.start_date),
            end_date: Some(b.end_date),
            description: b.description,
            created_at: Some(b.created_at),
            updated_at: Some(b.updated_at),
        }
    }
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, SyncError> {
    value.ok_or(SyncError::Validation { field })
}

/// A single record's failure, classified.
#[derive(Debug)]
pub enum SyncError {
    /// A non-deleted change record is missing a required field.
    Validation { field: &'static str },
    /// The record vanished between classification and mutation.
    NotFound,
    /// The record references a category or source that does not exist
    /// under this owner.
    Referential(String),
    /// Any other storage fault; the whole batch is safe to retry.
    Storage(sqlx::Error),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Validation { field } => write!(f, "missing required field '{}'", field),
            SyncError::NotFound => write!(f, "record not found"),
            SyncError::Referential(msg) => write!(f, "referential integrity violation: {}", msg),
            SyncError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => SyncError::NotFound,
            sqlx::Error::Database(db) if db.message().contains("FOREIGN KEY") => {
                SyncError::Referential(db.message().to_string())
            }
            other => SyncError::Storage(other),
        }
    }
}

/// A failed reconciliation: the batch was aborted at `kind`/`id` and the
/// counters reflect everything applied before that point. The store may be
/// partially updated; replaying the whole batch is safe because every
/// operation is idempotent.
#[derive(Debug)]
pub struct ReconcileError {
    pub partial: SyncResults,
    pub kind: EntityKind,
    pub id: Uuid,
    pub cause: SyncError,
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync aborted at {} {}: {}", self.kind, self.id, self.cause)
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_record() {
        let mut results = SyncResults::default();
        results.record(EntityKind::Category, SyncOp::Created);
        results.record(EntityKind::Category, SyncOp::Created);
        results.record(EntityKind::Transaction, SyncOp::Deleted);

        assert_eq!(results.categories.created, 2);
        assert_eq!(results.transactions.deleted, 1);
        assert_eq!(results.budgets, OpCounts::default());
    }

    #[test]
    fn test_changeset_partial_body() {
        // Missing arrays default to empty
        let set: ChangeSet = serde_json::from_str(r#"{"categories":[]}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_deleted_record_skips_field_requirements() {
        let change: TransactionChange = serde_json::from_str(&format!(
            r#"{{"id":"{}","deleted":true}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(change.deleted);
        // fields() would fail, but deleted records never reach it
        assert!(change.fields().is_err());
    }

    #[test]
    fn test_missing_required_field_is_validation_error() {
        let change = CategoryChange {
            id: Uuid::new_v4(),
            deleted: false,
            title: Some("Food".to_string()),
            category_type: None,
            default_category: None,
            icon_res: Some("x".to_string()),
            icon_color: Some("y".to_string()),
            created_at: None,
            updated_at: None,
        };

        match change.fields() {
            Err(SyncError::Validation { field }) => assert_eq!(field, "type"),
            other => panic!("expected validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_deleted_flag_not_serialized_when_false() {
        let change = CategoryChange {
            id: Uuid::new_v4(),
            deleted: false,
            title: Some("Food".to_string()),
            category_type: Some(TransactionType::Expense),
            default_category: Some(false),
            icon_res: Some("x".to_string()),
            icon_color: Some("y".to_string()),
            created_at: None,
            updated_at: None,
        };

        let json = serde_json::to_string(&change).unwrap();
        assert!(!json.contains("deleted"));
    }
}
