mod budget_repo;
mod category_repo;
mod source_repo;
mod transaction_repo;
mod user_repo;

pub use budget_repo::BudgetRepository;
pub use category_repo::CategoryRepository;
pub use source_repo::SourceRepository;
pub use transaction_repo::TransactionRepository;
pub use user_repo::UserRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Initialize the database connection pool and run migrations
pub async fn init_db(db_path: Option<PathBuf>) -> Result<SqlitePool, sqlx::Error> {
    let path = db_path.expect("database_path must be provided");

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create database directory");
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// In-memory database for tests and ephemeral use.
pub async fn init_memory_db() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // A single connection keeps the in-memory database alive and shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Format a timestamp as fixed-width RFC 3339 (microseconds, `Z` suffix).
///
/// Fixed width means SQLite TEXT comparison on these columns matches
/// chronological order, which the sync queries rely on (`updated_at > ?`).
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. A value that does not parse means the row is
/// corrupt, which surfaces as a decode error rather than a substitute value.
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Parse a stored UUID column, surfacing corrupt values as decode errors.
pub fn parse_id(s: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(s).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = init_db(Some(db_path)).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(table_names.contains(&"users"));
        assert!(table_names.contains(&"categories"));
        assert!(table_names.contains(&"sources"));
        assert!(table_names.contains(&"transactions"));
        assert!(table_names.contains(&"budgets"));
    }

    #[test]
    fn test_format_ts_fixed_width() {
        let a = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(5);

        let sa = format_ts(a);
        let sb = format_ts(b);

        assert_eq!(sa.len(), sb.len());
        assert!(sa < sb);
        assert!(sa.ends_with('Z'));
    }

    #[test]
    fn test_parse_ts_roundtrip() {
        let now = Utc::now();
        let parsed = parse_ts(&format_ts(now)).unwrap();
        // Microsecond precision is preserved
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_corrupt_values_are_decode_errors() {
        assert!(matches!(parse_ts("not a timestamp"), Err(sqlx::Error::Decode(_))));
        assert!(matches!(parse_id("not-a-uuid"), Err(sqlx::Error::Decode(_))));
    }
}
