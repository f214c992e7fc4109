//! Read-side views over the store: the show index and upcoming episodes.
//!
//! Used by `tvgrid index` and `tvgrid upcoming`, and by the collector to
//! rebuild the aggregate index record.

use anyhow::Result;
use chrono::Utc;

use tvgrid_core::models::{AirTuple, NextEpisode, ShowIndexEntry};
use tvgrid_core::store::{from_fields, Collection, Store, TOTAL_INDEX_KEY};
use tvgrid_core::temporal::{resolve_zone, to_components};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// All per-show index entries, ordered by title then show id.
///
/// The aggregate record is not an entry and is left out.
pub async fn index_entries(store: &dyn Store) -> Result<Vec<ShowIndexEntry>> {
    let mut entries = Vec::new();
    for (key, fields) in store.find_all(Collection::Index).await? {
        if key == TOTAL_INDEX_KEY {
            continue;
        }
        entries.push(from_fields::<ShowIndexEntry>(fields)?);
    }
    entries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.show.cmp(&b.show)));
    Ok(entries)
}

/// The aggregate index as written by the last sync. Empty before the first.
pub async fn list_index(store: &dyn Store) -> Result<Vec<ShowIndexEntry>> {
    let Some(mut fields) = store.find_one(Collection::Index, TOTAL_INDEX_KEY).await? else {
        return Ok(Vec::new());
    };
    match fields.remove("list") {
        Some(list) => Ok(serde_json::from_value(list)?),
        None => Ok(Vec::new()),
    }
}

/// Upcoming episodes airing at or after `now`, soonest first.
pub async fn list_upcoming(store: &dyn Store, now: AirTuple) -> Result<Vec<NextEpisode>> {
    let mut upcoming = Vec::new();
    for (_, fields) in store.find_all(Collection::Next).await? {
        let next: NextEpisode = from_fields(fields)?;
        if next.air >= now {
            upcoming.push(next);
        }
    }
    upcoming.sort_by(|a, b| a.air.cmp(&b.air).then_with(|| a.key().cmp(&b.key())));
    Ok(upcoming)
}

/// Run the index command: print one line per show.
pub async fn run_index(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let entries = list_index(&store).await?;
    if entries.is_empty() {
        println!("No shows indexed yet. Run `tvgrid sync` first.");
        return Ok(());
    }

    for entry in &entries {
        println!("{:<40} {:<32} {}", entry.title, entry.show, entry.reference);
    }
    println!();
    println!("{} shows", entries.len());
    Ok(())
}

/// Run the upcoming command: print future episodes in the target zone.
pub async fn run_upcoming(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let zone = resolve_zone(&config.time.target_zone)?;
    let now = to_components(&Utc::now().with_timezone(&zone));

    let upcoming = list_upcoming(&store, now).await?;
    if upcoming.is_empty() {
        println!("No upcoming episodes.");
        return Ok(());
    }

    for next in &upcoming {
        println!(
            "{}  {:<32} #{:<4} {}",
            format_air(&next.air),
            next.show_title,
            next.index,
            next.episode_title
        );
    }
    Ok(())
}

fn format_air(air: &AirTuple) -> String {
    if *air == AirTuple::UNKNOWN {
        return "date unknown    ".to_string();
    }
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        air.year, air.month, air.day, air.hour, air.minute
    )
}
