use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Weekday};
use chrono_tz::Tz;

use tvgrid::collector::{Collector, GridOutcome, SyncOptions, GRID_TARGET};
use tvgrid::config::Config;
use tvgrid::fetch::Fetcher;
use tvgrid::report::{list_index, list_upcoming};
use tvgrid_core::episode::EpisodeParser;
use tvgrid_core::error::SyncError;
use tvgrid_core::models::{
    AirTuple, EpisodeRecord, EpisodeStatus, GridPlacement, ShowId, Slot,
};
use tvgrid_core::store::memory::InMemoryStore;
use tvgrid_core::store::{from_fields, to_fields, Collection, Store};
use tvgrid_core::timeslot::ClockTime;

const BASE: &str = "http://www.epguides.com";
const GRID: &str = "http://www.epguides.com/grid/";

/// Serves fixture pages and counts requests per address.
#[derive(Default)]
struct FixtureFetcher {
    pages: Mutex<HashMap<String, String>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FixtureFetcher {
    fn set(&self, address: &str, body: impl Into<String>) {
        self.pages
            .lock()
            .unwrap()
            .insert(address.to_string(), body.into());
    }

    fn hits(&self, address: &str) -> usize {
        self.hits.lock().unwrap().get(address).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, address: &str) -> Result<String, SyncError> {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default() += 1;
        self.pages
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| SyncError::Fetch {
                address: address.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

fn config() -> Config {
    let mut config: Config = toml::from_str("[db]\npath = \"unused.sqlite\"\n").unwrap();
    config.source.grid_url = GRID.to_string();
    config.source.base_url = BASE.to_string();
    config.sync.concurrency = 2;
    config
}

fn kst(y: i32, m: u32, d: u32, h: u32) -> DateTime<Tz> {
    chrono_tz::Asia::Seoul
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .unwrap()
}

fn empty_day() -> &'static str {
    "<table><tr><th>Channel</th><th>8:00</th></tr></table>"
}

/// Monday: Example 20:00-21:00, a cell with trailing text (not a show),
/// Third 21:30-23:00. Sunday starts at 19:00. One show on hiatus.
fn grid_page(stamp: &str) -> String {
    let monday = r#"<table>
        <tr><th>Channel</th><th>8:00</th><th>8:30</th><th>9:00</th></tr>
        <tr>
          <td><a href="/cbs"><font>CBS</font></a></td>
          <td colspan="2"><a href="../Example/">Example</a></td>
          <td><a href="../Rerun/">Rerun</a> (r)</td>
          <td colspan="3"><a href="../Third/">Third</a></td>
        </tr>
        <tr>
          <td><a href="/nbc">NBC</a></td>
          <td colspan="x"><a href="../Broken/">Broken</a></td>
        </tr>
    </table>"#;
    let sunday = r#"<table>
        <tr><th>Channel</th><th>7:00</th></tr>
        <tr>
          <td><a href="/fox"><font>FOX</font></a></td>
          <td colspan="2"><a href="../Sunday/">Sunday</a></td>
        </tr>
    </table>"#;
    let hiatus = r#"<table><tr><td><ul>
        <li><a href="../Resting/">Resting</a> <span>Returning Sep 2012</span></li>
    </ul></td></tr></table>"#;

    let mut days = vec![monday.to_string()];
    days.extend((0..5).map(|_| empty_day().to_string()));
    days.push(sunday.to_string());

    format!(
        "<html><body><em>{}</em>\
         <table><tr><td>header</td></tr></table>\
         <table><tr><td>menu</td></tr></table>\
         {}{}</body></html>",
        stamp,
        days.join(""),
        hiatus
    )
}

fn detail_page(stamp: &str, title: &str, imdb: &str, listing: &str) -> String {
    format!(
        r#"<html><body>
        <h1><a href="http://www.imdb.com/title/tt{imdb}/">{title}</a></h1>
        <p>last updated <em>{stamp}</em></p>
        <p><a href="{listing}">list as</a></p>
        </body></html>"#
    )
}

fn listing_page(lines: &[&str]) -> String {
    format!(
        "<html><body><pre>\nnumber,season,episode,production code,airdate,title,special?\n{}\n</pre></body></html>",
        lines.join("\n")
    )
}

fn listing_url(show: &str) -> String {
    format!("{}/common/exportToCSV.asp?show={}", BASE, show)
}

/// Grid plus detail and listing pages for every show except Third.
fn fixture() -> FixtureFetcher {
    let fetcher = FixtureFetcher::default();
    fetcher.set(GRID, grid_page("Fri, 15 Jun 2012 10:05 EST Standard Time"));

    fetcher.set(
        &format!("{}/Example/", BASE),
        detail_page("Fri, 15 Jun 2012 09:00", "Example Show", "123", &listing_url("Example")),
    );
    fetcher.set(
        &listing_url("Example"),
        listing_page(&[
            "1,1,1,,08/Jun/12,Pilot,n",
            "2,1,2,,15/Jun/12,\"Second, Part 1\",n",
            "3,1,3,,22/Jun/12,Third Episode,n",
            "4,1,4,,UNAIRED,Fourth,n",
            "broken line",
        ]),
    );

    fetcher.set(
        &format!("{}/Sunday/", BASE),
        detail_page("Thu, 14 Jun 2012 08:00", "Sunday Nights", "4567", &listing_url("Sunday")),
    );
    fetcher.set(
        &listing_url("Sunday"),
        listing_page(&["1,1,1,,10/Jun/12,Opener,n"]),
    );

    fetcher.set(
        &format!("{}/Resting/", BASE),
        detail_page("Wed, 13 Jun 2012 08:00", "A Resting Show", "89", &listing_url("Resting")),
    );
    fetcher.set(
        &listing_url("Resting"),
        listing_page(&["1,1,1,,01/Sep/12,Return,n", "2,1,2,,UNKNOWN,Later,n"]),
    );

    fetcher
}

async fn placement(store: &dyn Store, show: &str) -> GridPlacement {
    from_fields(store.find_one(Collection::Shows, show).await.unwrap().unwrap()).unwrap()
}

async fn episodes(store: &dyn Store, show: &str) -> Vec<EpisodeRecord> {
    let mut fields = store.find_one(Collection::Shows, show).await.unwrap().unwrap();
    serde_json::from_value(fields.remove("episodes").unwrap()).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_first_sync_walks_grid_and_stores_everything() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    let config = config();
    let collector = Collector::new(&config, &store, &fetcher).unwrap();

    let report = collector
        .run(kst(2012, 6, 16, 12), &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.grid, GridOutcome::Updated);
    assert_eq!(report.placements, 4);
    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 1); // Third has no detail page
    assert_eq!(store.len(Collection::Shows), 4);

    let example = placement(&store, "Example").await;
    assert_eq!(example.link, "http://www.epguides.com/Example/");
    assert_eq!(
        example.slot,
        Slot::Scheduled {
            channel: "CBS".to_string(),
            day: Weekday::Mon,
            start: ClockTime::new(20, 0),
            end: ClockTime::new(21, 0),
            duration: 60,
        }
    );
    let third = placement(&store, "Third").await;
    assert_eq!(third.slot.start(), Some(ClockTime::new(21, 30)));
    assert_eq!(third.slot.duration(), 90);
    let sunday = placement(&store, "Sunday").await;
    assert_eq!(sunday.slot.start(), Some(ClockTime::new(19, 0)));
    let resting = placement(&store, "Resting").await;
    assert_eq!(
        resting.slot,
        Slot::Hiatus {
            return_date: Some("Sep 2012".to_string())
        }
    );
    assert!(store.find_one(Collection::Shows, "Rerun").await.unwrap().is_none());
    assert!(store.find_one(Collection::Shows, "Broken").await.unwrap().is_none());

    let eps = episodes(&store, "Example").await;
    assert_eq!(eps.len(), 4);
    assert_eq!(eps[0].status, EpisodeStatus::Aired);
    assert_eq!(eps[1].title, "Second, Part 1");
    assert_eq!(eps[1].air, AirTuple::new(2012, 6, 16, 9, 0));
    assert_eq!(eps[1].status, EpisodeStatus::Aired);
    assert_eq!(eps[2].status, EpisodeStatus::Yet);
    assert_eq!(eps[3].air, AirTuple::UNAIRED);
    // Placement fields survive the episode update.
    assert_eq!(placement(&store, "Example").await, example);

    let resting_eps = episodes(&store, "Resting").await;
    assert_eq!(resting_eps[0].air, AirTuple::new(2012, 9, 1, 13, 0));
    assert_eq!(resting_eps[1].air, AirTuple::UNKNOWN);

    let upcoming = list_upcoming(&store, AirTuple::new(2012, 6, 16, 12, 0))
        .await
        .unwrap();
    let keys: Vec<String> = upcoming.iter().map(|n| n.key()).collect();
    assert_eq!(keys, vec!["ExampleThird Episode3", "RestingReturn1"]);
    assert_eq!(upcoming[0].show_title, "Example Show");

    let index = list_index(&store).await.unwrap();
    let titles: Vec<&str> = index.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["A Resting Show", "Example Show", "Sunday Nights"]);
    assert_eq!(index[1].reference, "http://m.imdb.com/title/tt0000123");

    assert!(store
        .find_one(Collection::Timestamps, GRID_TARGET)
        .await
        .unwrap()
        .is_some());
    assert!(store
        .find_one(Collection::Timestamps, "Example")
        .await
        .unwrap()
        .is_some());
    assert!(store
        .find_one(Collection::Timestamps, "Third")
        .await
        .unwrap()
        .is_none());
}

#[test_log::test(tokio::test)]
async fn test_rerun_skips_unchanged_pages() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    let config = config();
    let collector = Collector::new(&config, &store, &fetcher).unwrap();
    let now = kst(2012, 6, 16, 12);

    collector.run(now, &SyncOptions::default()).await.unwrap();
    let before = episodes(&store, "Example").await;

    let report = collector.run(now, &SyncOptions::default()).await.unwrap();
    assert_eq!(report.grid, GridOutcome::Latest);
    assert_eq!(report.placements, 0);
    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.failed, 1);

    assert_eq!(fetcher.hits(&listing_url("Example")), 1);
    assert_eq!(fetcher.hits(&format!("{}/Example/", BASE)), 2);
    assert_eq!(episodes(&store, "Example").await, before);
    assert_eq!(list_index(&store).await.unwrap().len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_newer_detail_stamp_reprocesses_show() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    let config = config();
    let collector = Collector::new(&config, &store, &fetcher).unwrap();
    let now = kst(2012, 6, 16, 12);

    collector.run(now, &SyncOptions::default()).await.unwrap();

    fetcher.set(
        &format!("{}/Example/", BASE),
        detail_page("Sat, 16 Jun 2012 09:00", "Example Show", "123", &listing_url("Example")),
    );
    fetcher.set(
        &listing_url("Example"),
        listing_page(&["1,1,1,,08/Jun/12,Pilot,n", "5,1,5,,29/Jun/12,Fifth,n"]),
    );

    let report = collector.run(now, &SyncOptions::default()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 2);

    let eps = episodes(&store, "Example").await;
    assert_eq!(eps.len(), 2);
    assert_eq!(eps[1].title, "Fifth");
    assert!(store
        .find_one(Collection::Next, "ExampleFifth5")
        .await
        .unwrap()
        .is_some());
}

#[test_log::test(tokio::test)]
async fn test_grid_failure_leaves_grid_stamp_unwritten() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    fetcher.pages.lock().unwrap().remove(GRID);
    let config = config();

    let seeded = GridPlacement {
        show: ShowId::from_stored("Example"),
        link: format!("{}/Example/", BASE),
        slot: Slot::Scheduled {
            channel: "CBS".to_string(),
            day: Weekday::Mon,
            start: ClockTime::new(20, 0),
            end: ClockTime::new(21, 0),
            duration: 60,
        },
    };
    store
        .upsert(Collection::Shows, "Example", to_fields(&seeded).unwrap())
        .await
        .unwrap();

    let collector = Collector::new(&config, &store, &fetcher).unwrap();
    let report = collector
        .run(kst(2012, 6, 16, 12), &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.grid, GridOutcome::Failed);
    assert_eq!(report.processed, 1);
    assert!(store
        .find_one(Collection::Timestamps, GRID_TARGET)
        .await
        .unwrap()
        .is_none());
    assert_eq!(episodes(&store, "Example").await.len(), 4);
}

#[test_log::test(tokio::test)]
async fn test_malformed_grid_counts_as_failure() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    fetcher.set(
        GRID,
        "<html><body><em>Fri, 15 Jun 2012 10:05</em><table></table></body></html>",
    );
    let config = config();
    let collector = Collector::new(&config, &store, &fetcher).unwrap();

    let report = collector
        .run(kst(2012, 6, 16, 12), &SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(report.grid, GridOutcome::Failed);
    assert_eq!(report.processed, 0);
    assert_eq!(store.len(Collection::Shows), 0);
}

#[test_log::test(tokio::test)]
async fn test_full_resync_visits_stored_shows_off_the_grid() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    let config = config();
    let collector = Collector::new(&config, &store, &fetcher).unwrap();
    let now = kst(2012, 6, 16, 12);

    collector.run(now, &SyncOptions::default()).await.unwrap();

    // A show stored earlier but no longer on the grid.
    let extra = GridPlacement {
        show: ShowId::from_stored("Extra"),
        link: format!("{}/Extra/", BASE),
        slot: Slot::Hiatus { return_date: None },
    };
    store
        .upsert(Collection::Shows, "Extra", to_fields(&extra).unwrap())
        .await
        .unwrap();
    fetcher.set(
        &format!("{}/Extra/", BASE),
        detail_page("Fri, 15 Jun 2012 09:00", "Extra", "42", &listing_url("Extra")),
    );
    fetcher.set(&listing_url("Extra"), listing_page(&["1,1,1,,UNKNOWN,Pilot,n"]));

    fetcher.set(GRID, grid_page("Sat, 16 Jun 2012 10:05 EST Standard Time"));
    let plain = collector.run(now, &SyncOptions::default()).await.unwrap();
    assert_eq!(plain.grid, GridOutcome::Updated);
    assert_eq!(fetcher.hits(&format!("{}/Extra/", BASE)), 0);

    fetcher.set(GRID, grid_page("Sun, 17 Jun 2012 10:05 EST Standard Time"));
    let report = collector
        .run(now, &SyncOptions { full_resync: true })
        .await
        .unwrap();
    assert_eq!(report.grid, GridOutcome::Updated);
    assert_eq!(report.placements, 4);
    assert_eq!(report.processed, 1);
    assert_eq!(report.processed + report.skipped + report.failed, 5);
    assert_eq!(fetcher.hits(&format!("{}/Extra/", BASE)), 1);
    assert_eq!(list_index(&store).await.unwrap().len(), 4);
}

#[test_log::test(tokio::test)]
async fn test_update_show_requires_placement() {
    let store = InMemoryStore::new();
    let fetcher = fixture();
    let config = config();
    let collector = Collector::new(&config, &store, &fetcher).unwrap();
    let parser = EpisodeParser::new(config.normalizer().unwrap(), "kst", kst(2012, 6, 16, 12))
        .unwrap();

    let err = collector
        .update_show(&ShowId::from_stored("Ghost"), &parser)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::MissingPrerequisite(show)) if show.as_str() == "Ghost"
    ));
    assert_eq!(fetcher.hits(&format!("{}/Ghost/", BASE)), 0);
}
