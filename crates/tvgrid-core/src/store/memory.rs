//! In-memory [`Store`] implementation for tests and dry runs.
//!
//! Uses a `BTreeMap` per collection behind `std::sync::RwLock`, so
//! `find_all` comes back ordered by key like the SQLite store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{merge_fields, Collection, Fields, Store};

/// In-memory document store.
pub struct InMemoryStore {
    records: RwLock<HashMap<Collection, BTreeMap<String, Fields>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.records
            .read()
            .map(|r| r.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert(&self, collection: Collection, key: &str, fields: Fields) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let record = records
            .entry(collection)
            .or_default()
            .entry(key.to_string())
            .or_default();
        merge_fields(record, fields);
        Ok(())
    }

    async fn update(&self, collection: Collection, key: &str, fields: Fields) -> Result<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(&collection).and_then(|c| c.get_mut(key)) {
            Some(record) => {
                merge_fields(record, fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_one(&self, collection: Collection, key: &str) -> Result<Option<Fields>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&collection).and_then(|c| c.get(key)).cloned())
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<(String, Fields)>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .get(&collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().map_err(poisoned)?.clear();
        Ok(())
    }
}
