//! Sync pipeline orchestration.
//!
//! One pass runs grid → shows → index:
//!
//! 1. Fetch the grid and walk it into placements.
//! 2. If the grid changed since the last pass, upsert every placement and
//!    queue the shows found on it. Otherwise (or with `--full-resync`)
//!    queue every stored show; each one is still gated by its own stamp.
//! 3. Process queued shows through a bounded worker pool: fetch the detail
//!    page, check its freshness, fetch and parse the episode listing, write
//!    episodes, upcoming entries, and the index entry, then record the stamp.
//! 4. Rebuild the aggregate index and record the grid stamp.
//!
//! A failing show is logged and skipped; its stamp is not written, so the
//! next pass retries it.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};

use tvgrid_core::detail::{listing_body, parse_detail, update_stamp};
use tvgrid_core::episode::{EpisodeParser, ListingContext};
use tvgrid_core::error::SyncError;
use tvgrid_core::freshness::FreshnessGate;
use tvgrid_core::grid::{walk_grid, GridLayout, GridScan};
use tvgrid_core::models::{GridPlacement, ShowId, ShowIndexEntry};
use tvgrid_core::store::{from_fields, to_fields, Collection, Fields, Store, TOTAL_INDEX_KEY};
use tvgrid_core::temporal::TemporalNormalizer;
use tvgrid_core::timeslot::ClockTime;

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::html::HtmlDocument;

/// Freshness target for the grid page.
pub const GRID_TARGET: &str = "grid";

/// Options for one sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Revisit every stored show even when the grid changed.
    pub full_resync: bool,
}

/// What happened to the grid target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridOutcome {
    Updated,
    Latest,
    Failed,
}

/// Counters for one sync pass.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub grid: GridOutcome,
    pub placements: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of syncing one show.
#[derive(Debug, Clone)]
pub enum ShowOutcome {
    Updated(ShowIndexEntry),
    Latest,
}

/// Runs sync passes against a store and a fetcher.
pub struct Collector<'a> {
    store: &'a dyn Store,
    fetcher: &'a dyn Fetcher,
    grid_url: String,
    base_url: String,
    layout: GridLayout,
    normalizer: TemporalNormalizer,
    target_zone: String,
    concurrency: usize,
}

impl<'a> Collector<'a> {
    pub fn new(config: &Config, store: &'a dyn Store, fetcher: &'a dyn Fetcher) -> Result<Self> {
        Ok(Self {
            store,
            fetcher,
            grid_url: config.source.grid_url.clone(),
            base_url: config.source.base_url.clone(),
            layout: config.grid_layout()?,
            normalizer: config.normalizer()?,
            target_zone: config.time.target_zone.clone(),
            concurrency: config.sync.concurrency.max(1),
        })
    }

    /// Run one full pass. `now` is the viewer's current time.
    pub async fn run(&self, now: DateTime<Tz>, options: &SyncOptions) -> Result<SyncReport> {
        let parser = EpisodeParser::new(self.normalizer.clone(), &self.target_zone, now)?;
        let gate = FreshnessGate::new(self.store);

        let mut report = SyncReport {
            grid: GridOutcome::Failed,
            placements: 0,
            processed: 0,
            skipped: 0,
            failed: 0,
        };
        let mut grid_stamp: Option<NaiveDateTime> = None;
        let mut queued: Option<Vec<ShowId>> = None;

        tracing::info!(url = %self.grid_url, "start updating grid");
        match self.load_grid().await {
            Ok((stamp, scan)) => {
                let freshness = gate.is_latest(GRID_TARGET, stamp).await?;
                if freshness.needs_processing() {
                    tracing::info!(%stamp, ?freshness, "grid is not latest, updating placements");
                    let shows = self.store_placements(&scan.placements).await?;
                    report.grid = GridOutcome::Updated;
                    report.placements = scan.placements.len();
                    grid_stamp = Some(stamp);
                    if !options.full_resync {
                        queued = Some(shows);
                    }
                } else {
                    tracing::info!(%stamp, "grid is latest, resyncing stored shows");
                    report.grid = GridOutcome::Latest;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "grid unavailable, resyncing stored shows");
            }
        }

        let targets = match queued {
            Some(shows) => shows,
            None => self.stored_shows().await?,
        };
        tracing::info!(shows = targets.len(), concurrency = self.concurrency, "updating shows");

        let parser = &parser;
        let results: Vec<(ShowId, Result<ShowOutcome>)> = stream::iter(targets)
            .map(|show| async move {
                let outcome = self.update_show(&show, parser).await;
                (show, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (show, outcome) in results {
            match outcome {
                Ok(ShowOutcome::Updated(_)) => report.processed += 1,
                Ok(ShowOutcome::Latest) => report.skipped += 1,
                Err(e) => {
                    let error = format!("{:#}", e);
                    tracing::error!(%show, %error, "show update failed");
                    report.failed += 1;
                }
            }
        }

        self.update_index().await?;

        if let Some(stamp) = grid_stamp {
            gate.record_seen(GRID_TARGET, stamp).await?;
        }

        Ok(report)
    }

    /// Sync one show's episodes. The show must already have a placement.
    pub async fn update_show(&self, show: &ShowId, parser: &EpisodeParser) -> Result<ShowOutcome> {
        let fields = self
            .store
            .find_one(Collection::Shows, show.as_str())
            .await?
            .ok_or_else(|| SyncError::MissingPrerequisite(show.clone()))?;
        let placement: GridPlacement = from_fields(fields)?;

        let page = self.fetcher.fetch(&placement.link).await?;
        let detail = parse_detail(
            &HtmlDocument::parse(&page).root(),
            &placement.link,
            &self.base_url,
        )?;

        let gate = FreshnessGate::new(self.store);
        if !gate
            .is_latest(show.as_str(), detail.updated)
            .await?
            .needs_processing()
        {
            tracing::info!(%show, "episodes are latest");
            return Ok(ShowOutcome::Latest);
        }

        let listing_page = self.fetcher.fetch(&detail.listing_url).await?;
        let body = listing_body(
            &HtmlDocument::parse(&listing_page).root(),
            &detail.listing_url,
        )?;

        // Hiatus shows have no slot; their air dates are taken at midnight.
        let ctx = ListingContext {
            show: show.clone(),
            show_title: detail.title.clone(),
            start: placement.slot.start().unwrap_or(ClockTime::new(0, 0)),
            duration_minutes: placement.slot.duration(),
        };
        let listing = parser.parse_listing(&body, &ctx);

        let mut episodes = Fields::new();
        episodes.insert(
            "episodes".to_string(),
            serde_json::to_value(&listing.episodes)?,
        );
        if !self
            .store
            .update(Collection::Shows, show.as_str(), episodes)
            .await?
        {
            return Err(SyncError::MissingPrerequisite(show.clone()).into());
        }

        for next in &listing.upcoming {
            self.store
                .upsert(Collection::Next, &next.key(), to_fields(next)?)
                .await?;
        }

        let entry = ShowIndexEntry {
            show: show.clone(),
            title: detail.title.clone(),
            reference: detail.reference.clone(),
        };
        self.store
            .upsert(Collection::Index, show.as_str(), to_fields(&entry)?)
            .await?;

        gate.record_seen(show.as_str(), detail.updated).await?;

        tracing::info!(
            %show,
            title = %detail.title,
            episodes = listing.episodes.len(),
            upcoming = listing.upcoming.len(),
            skipped_lines = listing.skipped,
            "episodes updated"
        );
        Ok(ShowOutcome::Updated(entry))
    }

    async fn load_grid(&self) -> Result<(NaiveDateTime, GridScan), SyncError> {
        let page = self.fetcher.fetch(&self.grid_url).await?;
        let doc = HtmlDocument::parse(&page);
        let stamp = update_stamp(&doc.root(), &self.grid_url)?;
        let scan = walk_grid(&doc.root(), &self.layout, &self.grid_url)?;
        if scan.skipped_rows > 0 {
            tracing::warn!(rows = scan.skipped_rows, "grid rows skipped");
        }
        Ok((stamp, scan))
    }

    /// Upsert placements and return the distinct shows in grid order.
    async fn store_placements(&self, placements: &[GridPlacement]) -> Result<Vec<ShowId>> {
        let mut seen = HashSet::new();
        let mut shows = Vec::new();
        for placement in placements {
            self.store
                .upsert(
                    Collection::Shows,
                    placement.show.as_str(),
                    to_fields(placement)?,
                )
                .await?;
            tracing::debug!(show = %placement.show, "show upserted");
            if seen.insert(placement.show.clone()) {
                shows.push(placement.show.clone());
            }
        }
        Ok(shows)
    }

    async fn stored_shows(&self) -> Result<Vec<ShowId>> {
        Ok(self
            .store
            .find_all(Collection::Shows)
            .await?
            .into_iter()
            .map(|(key, _)| ShowId::from_stored(key))
            .collect())
    }

    /// Rebuild the aggregate index from the per-show entries.
    async fn update_index(&self) -> Result<()> {
        let entries = crate::report::index_entries(self.store).await?;
        let mut fields = Fields::new();
        fields.insert("list".to_string(), serde_json::to_value(&entries)?);
        self.store
            .upsert(Collection::Index, TOTAL_INDEX_KEY, fields)
            .await?;
        tracing::info!(entries = entries.len(), "index updated");
        Ok(())
    }
}
