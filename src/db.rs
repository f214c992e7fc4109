//! SQLite database connection management.
//!
//! The pool runs in WAL mode and is sized to the sync worker count, so the
//! per-show workers can write while the index is read. The database file and
//! its parent directories are created on first connect.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Writers wait this long for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool on the configured SQLite database.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let max_connections = u32::try_from(config.sync.concurrency)
        .unwrap_or(u32::MAX)
        .saturating_add(1);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    Ok(pool)
}
