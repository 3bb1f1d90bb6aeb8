//! Reconciliation engine: applies a client batch against the store.
//!
//! Kinds are processed in dependency order (categories, sources,
//! transactions, budgets), so a batch may create a category and a
//! transaction referencing it in the same push. Within a kind, records are
//! applied in caller order; duplicate ids re-query the store per record, so
//! the last record in the list wins.
//!
//! The first failing record aborts the rest of the batch. There is no
//! rollback: the counters in the returned error say how far processing got,
//! and because every operation is idempotent the caller may replay the
//! whole batch.

use sqlx::SqlitePool;
use uuid::Uuid;

use super::classifier::{classify, ChangeAction};
use super::types::{
    BudgetChange, CategoryChange, ChangeSet, EntityKind, ReconcileError, SourceChange, SyncError,
    SyncOp, SyncResults, TransactionChange,
};
use crate::db::{BudgetRepository, CategoryRepository, SourceRepository, TransactionRepository};

pub struct ReconcileEngine {
    categories: CategoryRepository,
    sources: SourceRepository,
    transactions: TransactionRepository,
    budgets: BudgetRepository,
}

impl ReconcileEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            categories: CategoryRepository::new(pool.clone()),
            sources: SourceRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            budgets: BudgetRepository::new(pool),
        }
    }

    pub async fn reconcile(
        &self,
        user_id: Uuid,
        changes: &ChangeSet,
    ) -> Result<SyncResults, ReconcileError> {
        let mut results = SyncResults::default();

        for change in &changes.categories {
            match self.apply_category(user_id, change).await {
                Ok(op) => results.record(EntityKind::Category, op),
                Err(cause) => return Err(abort(results, EntityKind::Category, change.id, cause)),
            }
        }

        for change in &changes.sources {
            match self.apply_source(user_id, change).await {
                Ok(op) => results.record(EntityKind::Source, op),
                Err(cause) => return Err(abort(results, EntityKind::Source, change.id, cause)),
            }
        }

        for change in &changes.transactions {
            match self.apply_transaction(user_id, change).await {
                Ok(op) => results.record(EntityKind::Transaction, op),
                Err(cause) => return Err(abort(results, EntityKind::Transaction, change.id, cause)),
            }
        }

        for change in &changes.budgets {
            match self.apply_budget(user_id, change).await {
                Ok(op) => results.record(EntityKind::Budget, op),
                Err(cause) => return Err(abort(results, EntityKind::Budget, change.id, cause)),
            }
        }

        Ok(results)
    }

    async fn apply_category(
        &self,
        user_id: Uuid,
        change: &CategoryChange,
    ) -> Result<SyncOp, SyncError> {
        // Deletes need no existence lookup
        let exists = if change.deleted {
            false
        } else {
            self.categories.get_by_id(user_id, change.id).await?.is_some()
        };

        match classify(change.deleted, exists) {
            ChangeAction::Delete => {
                self.categories.delete(user_id, change.id).await?;
                Ok(SyncOp::Deleted)
            }
            ChangeAction::Create => {
                let fields = change.fields()?;
                self.categories.create(user_id, change.id, &fields).await?;
                Ok(SyncOp::Created)
            }
            ChangeAction::Update => {
                let fields = change.fields()?;
                self.categories.update(user_id, change.id, &fields).await?;
                Ok(SyncOp::Updated)
            }
        }
    }

    async fn apply_source(
        &self,
        user_id: Uuid,
        change: &SourceChange,
    ) -> Result<SyncOp, SyncError> {
        let exists = if change.deleted {
            false
        } else {
            self.sources.get_by_id(user_id, change.id).await?.is_some()
        };

        match classify(change.deleted, exists) {
            ChangeAction::Delete => {
                self.sources.delete(user_id, change.id).await?;
                Ok(SyncOp::Deleted)
            }
            ChangeAction::Create => {
                let fields = change.fields()?;
                self.sources.create(user_id, change.id, &fields).await?;
                Ok(SyncOp::Created)
            }
            ChangeAction::Update => {
                let fields = change.fields()?;
                self.sources.update(user_id, change.id, &fields).await?;
                Ok(SyncOp::Updated)
            }
        }
    }

    async fn apply_transaction(
        &self,
        user_id: Uuid,
        change: &TransactionChange,
    ) -> Result<SyncOp, SyncError> {
        let exists = if change.deleted {
            false
        } else {
            self.transactions.get_by_id(user_id, change.id).await?.is_some()
        };

        match classify(change.deleted, exists) {
            ChangeAction::Delete => {
                self.transactions.delete(user_id, change.id).await?;
                Ok(SyncOp::Deleted)
            }
            ChangeAction::Create => {
                let fields = change.fields()?;
                self.check_transaction_refs(user_id, &fields.category_id, &fields.source_id)
                    .await?;
                self.transactions.create(user_id, change.id, &fields).await?;
                Ok(SyncOp::Created)
            }
            ChangeAction::Update => {
                let fields = change.fields()?;
                self.check_transaction_refs(user_id, &fields.category_id, &fields.source_id)
                    .await?;
                self.transactions.update(user_id, change.id, &fields).await?;
                Ok(SyncOp::Updated)
            }
        }
    }

    async fn apply_budget(
        &self,
        user_id: Uuid,
        change: &BudgetChange,
    ) -> Result<SyncOp, SyncError> {
        let exists = if change.deleted {
            false
        } else {
            self.budgets.get_by_id(user_id, change.id).await?.is_some()
        };

        match classify(change.deleted, exists) {
            ChangeAction::Delete => {
                self.budgets.delete(user_id, change.id).await?;
                Ok(SyncOp::Deleted)
            }
            ChangeAction::Create => {
                let fields = change.fields()?;
                self.check_category_ref(user_id, &fields.category_id).await?;
                self.budgets.create(user_id, change.id, &fields).await?;
                Ok(SyncOp::Created)
            }
            ChangeAction::Update => {
                let fields = change.fields()?;
                self.check_category_ref(user_id, &fields.category_id).await?;
                self.budgets.update(user_id, change.id, &fields).await?;
                Ok(SyncOp::Updated)
            }
        }
    }

    /// Owner-scoped referential check. The schema's foreign keys cannot tell
    /// whose category a transaction points at, so a reference to another
    /// user's record must be rejected here.
    async fn check_transaction_refs(
        &self,
        user_id: Uuid,
        category_id: &Uuid,
        source_id: &Uuid,
    ) -> Result<(), SyncError> {
        self.check_category_ref(user_id, category_id).await?;
        if self.sources.get_by_id(user_id, *source_id).await?.is_none() {
            return Err(SyncError::Referential(format!(
                "source {} does not exist for this user",
                source_id
            )));
        }
        Ok(())
    }

    async fn check_category_ref(
        &self,
        user_id: Uuid,
        category_id: &Uuid,
    ) -> Result<(), SyncError> {
        if self.categories.get_by_id(user_id, *category_id).await?.is_none() {
            return Err(SyncError::Referential(format!(
                "category {} does not exist for this user",
                category_id
            )));
        }
        Ok(())
    }
}

fn abort(partial: SyncResults, kind: EntityKind, id: Uuid, cause: SyncError) -> ReconcileError {
    tracing::warn!("sync batch aborted at {} {}: {}", kind, id, cause);
    ReconcileError {
        partial,
        kind,
        id,
        cause,
    }
}
