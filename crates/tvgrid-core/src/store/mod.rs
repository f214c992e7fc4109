//! Storage abstraction for tvgrid.
//!
//! The [`Store`] trait is a small key-addressed document store: records are
//! JSON objects grouped into [`Collection`]s and addressed by a string key.
//! Writes are whole-field merges, never deltas, so replaying the same write
//! is always safe.
//!
//! Implementations must be `Send + Sync`; per-key writes are expected to be
//! atomic. No transactions are assumed across collections.

pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A stored record: a JSON object.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Key of the aggregate record in [`Collection::Index`].
pub const TOTAL_INDEX_KEY: &str = "totalindexlist";

/// Logical record groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Grid placements and episode lists, keyed by show id.
    Shows,
    /// Upcoming episodes, keyed by show id + episode title + index.
    Next,
    /// Show index entries, keyed by show id, plus the aggregate list.
    Index,
    /// Freshness records, keyed by target.
    Timestamps,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Shows => "shows",
            Collection::Next => "next",
            Collection::Index => "index",
            Collection::Timestamps => "timestamps",
        }
    }
}

/// Abstract document store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](Store::upsert) | Merge fields into a record, creating it if absent |
/// | [`update`](Store::update) | Merge fields into an existing record only |
/// | [`find_one`](Store::find_one) | Point lookup by key |
/// | [`find_all`](Store::find_all) | Full scan of a collection, ordered by key |
/// | [`clear`](Store::clear) | Drop every record in every collection |
#[async_trait]
pub trait Store: Send + Sync {
    /// Merge `fields` into the record at `key`, creating it if absent.
    async fn upsert(&self, collection: Collection, key: &str, fields: Fields) -> Result<()>;

    /// Merge `fields` into the record at `key` if it exists.
    ///
    /// Returns `false` (and writes nothing) when there is no such record.
    async fn update(&self, collection: Collection, key: &str, fields: Fields) -> Result<bool>;

    /// Fetch one record by key.
    async fn find_one(&self, collection: Collection, key: &str) -> Result<Option<Fields>>;

    /// Fetch every record of a collection as `(key, fields)`, ordered by key.
    async fn find_all(&self, collection: Collection) -> Result<Vec<(String, Fields)>>;

    /// Remove all records.
    async fn clear(&self) -> Result<()>;
}

/// Serialize a value into record fields. The value must serialize to an object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}

/// Deserialize record fields into a value.
pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(fields))
        .context("stored record does not match the expected shape")
}

/// Merge `incoming` over `existing`, field by field.
pub fn merge_fields(existing: &mut Fields, incoming: Fields) {
    for (k, v) in incoming {
        existing.insert(k, v);
    }
}
