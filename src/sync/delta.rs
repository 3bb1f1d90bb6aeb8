//! Delta query engine: "what changed since this timestamp".
//!
//! Returns, per kind, every record owned by the user whose `updated_at` is
//! strictly greater than `since`; a record updated exactly at `since` is
//! not re-sent, so repeated polls at the same baseline cannot loop.
//!
//! The store keeps no tombstones, so server-side deletions that happened
//! after `since` are invisible here; the `deleted` flag on returned records
//! is always absent.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::types::{ChangeSet, SyncError};
use crate::db::{BudgetRepository, CategoryRepository, SourceRepository, TransactionRepository};

pub struct DeltaQuery {
    categories: CategoryRepository,
    sources: SourceRepository,
    transactions: TransactionRepository,
    budgets: BudgetRepository,
}

impl DeltaQuery {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            categories: CategoryRepository::new(pool.clone()),
            sources: SourceRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            budgets: BudgetRepository::new(pool),
        }
    }

    pub async fn changes(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<ChangeSet, SyncError> {
        let transactions = self.transactions.list_modified_since(user_id, since).await?;
        let categories = self.categories.list_modified_since(user_id, since).await?;
        let sources = self.sources.list_modified_since(user_id, since).await?;
        let budgets = self.budgets.list_modified_since(user_id, since).await?;

        Ok(ChangeSet {
            transactions: transactions.into_iter().map(Into::into).collect(),
            categories: categories.into_iter().map(Into::into).collect(),
            sources: sources.into_iter().map(Into::into).collect(),
            budgets: budgets.into_iter().map(Into::into).collect(),
        })
    }
}
