//! Freshness gate.
//!
//! Every source document (the grid as a whole, and each show's detail page)
//! advertises when it was last updated. The gate compares that stamp with
//! the one recorded after the last successful pass over the same target
//! and says whether the target needs reprocessing.
//!
//! The stamp is recorded only after a target has been fully reprocessed.
//! A pass that fails halfway leaves the old stamp in place, so the next run
//! retries the whole target. Store writes are full-field upserts, which
//! makes that retry safe.

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::models::FreshnessRecord;
use crate::store::{from_fields, to_fields, Collection, Store};

/// Outcome of [`FreshnessGate::is_latest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The recorded stamp is at least as new as the candidate.
    Latest,
    /// The candidate is newer than the recorded stamp.
    Stale,
    /// Nothing recorded for this target yet.
    Unknown,
}

impl Freshness {
    /// `Unknown` counts as "not latest": first sight always processes.
    pub fn needs_processing(self) -> bool {
        !matches!(self, Freshness::Latest)
    }
}

/// Reads and writes freshness records in [`Collection::Timestamps`].
pub struct FreshnessGate<'a> {
    store: &'a dyn Store,
}

impl<'a> FreshnessGate<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Compare `candidate` with the recorded stamp for `target`.
    pub async fn is_latest(&self, target: &str, candidate: NaiveDateTime) -> Result<Freshness> {
        let Some(fields) = self.store.find_one(Collection::Timestamps, target).await? else {
            return Ok(Freshness::Unknown);
        };
        let record: FreshnessRecord = from_fields(fields)?;
        if record.seen >= candidate {
            Ok(Freshness::Latest)
        } else {
            Ok(Freshness::Stale)
        }
    }

    /// Record `instant` as seen for `target`. Call only after a full,
    /// successful reprocessing pass.
    pub async fn record_seen(&self, target: &str, instant: NaiveDateTime) -> Result<()> {
        let record = FreshnessRecord {
            target: target.to_string(),
            seen: instant,
        };
        self.store
            .upsert(Collection::Timestamps, target, to_fields(&record)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2012, 6, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_target_needs_processing() {
        let store = InMemoryStore::new();
        let gate = FreshnessGate::new(&store);
        let state = gate.is_latest("grid", at(15)).await.unwrap();
        assert_eq!(state, Freshness::Unknown);
        assert!(state.needs_processing());
        assert_eq!(state.needs_processing(), Freshness::Stale.needs_processing());
    }

    #[tokio::test]
    async fn test_recorded_stamp_gates_reprocessing() {
        let store = InMemoryStore::new();
        let gate = FreshnessGate::new(&store);
        gate.record_seen("Lost", at(15)).await.unwrap();

        assert_eq!(gate.is_latest("Lost", at(15)).await.unwrap(), Freshness::Latest);
        assert_eq!(gate.is_latest("Lost", at(14)).await.unwrap(), Freshness::Latest);
        assert_eq!(gate.is_latest("Lost", at(16)).await.unwrap(), Freshness::Stale);
        assert_eq!(gate.is_latest("Other", at(16)).await.unwrap(), Freshness::Unknown);
    }

    #[tokio::test]
    async fn test_record_seen_overwrites() {
        let store = InMemoryStore::new();
        let gate = FreshnessGate::new(&store);
        gate.record_seen("grid", at(15)).await.unwrap();
        gate.record_seen("grid", at(20)).await.unwrap();
        assert_eq!(gate.is_latest("grid", at(18)).await.unwrap(), Freshness::Latest);
    }
}
