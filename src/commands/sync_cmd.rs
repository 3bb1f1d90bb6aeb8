//! Sync commands: status, pull, push.

use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

use super::CommandError;
use crate::client::ApiClient;
use crate::config::Config;
use crate::sync::{ChangeSet, EntityKind, OpCounts, SyncResults};

/// Show per-kind last-update times on the server
#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let client = ApiClient::from_config(config);
        let status = client.sync_status().await?;

        println!("Server status as of {}", status.last_sync.to_rfc3339());
        println!();
        print_watermark(EntityKind::Category, status.last_category_update);
        print_watermark(EntityKind::Source, status.last_source_update);
        print_watermark(EntityKind::Transaction, status.last_transaction_update);
        print_watermark(EntityKind::Budget, status.last_budget_update);

        Ok(())
    }
}

fn print_watermark(kind: EntityKind, at: Option<DateTime<Utc>>) {
    match at {
        Some(at) => println!("  {:<13} {}", kind.as_str(), at.to_rfc3339()),
        None => println!("  {:<13} (no records)", kind.as_str()),
    }
}

/// Fetch server-side changes since a timestamp and print them as JSON
#[derive(Debug, Args)]
pub struct PullCommand {
    /// Baseline timestamp (RFC 3339); defaults to the epoch (everything)
    #[arg(long)]
    since: Option<DateTime<Utc>>,
}

impl PullCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let client = ApiClient::from_config(config);
        let since = self.since.unwrap_or(DateTime::UNIX_EPOCH);
        let changes = client.changes(since).await?;

        println!("{}", serde_json::to_string_pretty(&changes)?);
        Ok(())
    }
}

/// Submit a change batch read from a JSON file
#[derive(Debug, Args)]
pub struct PushCommand {
    /// Path to a JSON file holding the change batch
    file: PathBuf,
}

impl PushCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let contents = std::fs::read_to_string(&self.file)?;
        let batch: ChangeSet = serde_json::from_str(&contents)?;

        let client = ApiClient::from_config(config);
        let response = client.push(&batch).await?;

        println!("Push applied:");
        print_results(&response.results);
        println!();
        println!(
            "Next pull baseline: {}",
            response.sync_status.last_sync.to_rfc3339()
        );

        Ok(())
    }
}

fn print_results(results: &SyncResults) {
    print_counts(EntityKind::Category, results.categories);
    print_counts(EntityKind::Source, results.sources);
    print_counts(EntityKind::Transaction, results.transactions);
    print_counts(EntityKind::Budget, results.budgets);
}

fn print_counts(kind: EntityKind, counts: OpCounts) {
    println!(
        "  {:<13} {} created, {} updated, {} deleted",
        kind.as_str(),
        counts.created,
        counts.updated,
        counts.deleted
    );
}
