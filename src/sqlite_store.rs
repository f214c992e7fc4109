//! SQLite-backed [`Store`] implementation.
//!
//! Each record is one row of the `records` table. Field merges happen in
//! Rust inside a write transaction: read the stored JSON, overlay the
//! incoming fields, write the result back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use tvgrid_core::store::{merge_fields, Collection, Fields, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read, merge and write one record under a write lock.
    ///
    /// The transaction opens with `BEGIN IMMEDIATE` so concurrent writers
    /// queue on the busy timeout instead of failing when a read lock upgrades.
    async fn merge_into(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        create: bool,
    ) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to lock {}/{} for writing", collection.as_str(), key))?;

        let merged = write_merged(&mut conn, collection, key, fields, create).await;
        let finish = if merged.is_ok() { "COMMIT" } else { "ROLLBACK" };
        if let Err(e) = sqlx::query(finish).execute(&mut *conn).await {
            // Leave no half-open transaction behind on a pooled connection.
            conn.close_on_drop();
            if merged.is_ok() {
                return Err(e).context("Failed to commit record");
            }
            tracing::warn!(error = %e, "rollback failed");
        }
        merged
    }
}

async fn write_merged(
    conn: &mut SqliteConnection,
    collection: Collection,
    key: &str,
    fields: Fields,
    create: bool,
) -> Result<bool> {
    let existing: Option<String> = sqlx::query_scalar(
        "SELECT fields_json FROM records WHERE collection = ? AND key = ?",
    )
    .bind(collection.as_str())
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;

    let mut record = match existing {
        Some(json) => parse_fields(&json)?,
        None if create => Fields::new(),
        None => return Ok(false),
    };
    merge_fields(&mut record, fields);

    sqlx::query(
        r#"
        INSERT INTO records (collection, key, fields_json, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(collection, key) DO UPDATE SET
            fields_json = excluded.fields_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(collection.as_str())
    .bind(key)
    .bind(serde_json::to_string(&record)?)
    .bind(chrono::Utc::now().timestamp())
    .execute(&mut *conn)
    .await?;

    Ok(true)
}

fn parse_fields(json: &str) -> Result<Fields> {
    serde_json::from_str(json).context("stored record is not a JSON object")
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert(&self, collection: Collection, key: &str, fields: Fields) -> Result<()> {
        self.merge_into(collection, key, fields, true).await?;
        Ok(())
    }

    async fn update(&self, collection: Collection, key: &str, fields: Fields) -> Result<bool> {
        self.merge_into(collection, key, fields, false).await
    }

    async fn find_one(&self, collection: Collection, key: &str) -> Result<Option<Fields>> {
        let json: Option<String> = sqlx::query_scalar(
            "SELECT fields_json FROM records WHERE collection = ? AND key = ?",
        )
        .bind(collection.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        json.as_deref().map(parse_fields).transpose()
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<(String, Fields)>> {
        let rows = sqlx::query(
            "SELECT key, fields_json FROM records WHERE collection = ? ORDER BY key",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let key: String = row.get("key");
                let json: String = row.get("fields_json");
                Ok((key, parse_fields(&json)?))
            })
            .collect()
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM records").execute(&self.pool).await?;
        Ok(())
    }
}
