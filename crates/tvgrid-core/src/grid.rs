//! Weekly grid walker.
//!
//! The grid page is a stack of tables. The first two are page layout; the
//! next seven are Monday through Sunday, one row per channel; the one after
//! those lists shows on hiatus.
//!
//! ```text
//! | channel | cell (colspan 2) | cell (1) | cell (3)      |
//!             20:00 - 21:00      21:00-21:30  21:30 - 23:00
//! ```
//!
//! Every cell after the channel cell advances a [`TimeSlot`] by its
//! `colspan`, whether or not a show occupies it, so empty cells still move
//! the clock.

use chrono::Weekday;

use crate::error::SyncError;
use crate::markup::MarkupNode;
use crate::models::{GridPlacement, ShowId, Slot};
use crate::timeslot::{ClockTime, TimeSlot};

/// Days in the order the grid lists them.
pub const DAYS_OF_WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Number of page-layout tables before the first day table.
const LAYOUT_TABLES: usize = 2;

/// Widest colspan accepted. A week of one-minute slots fits well inside it.
const MAX_COLSPAN: u32 = 1000;

/// How the grid's columns map onto clock time.
#[derive(Debug, Clone)]
pub struct GridLayout {
    /// Prefix for relative show links.
    pub base_url: String,
    /// First slot of a normal day.
    pub start: ClockTime,
    /// First slot of the last day of the week.
    pub last_day_start: ClockTime,
    pub slot_minutes: u32,
}

/// Result of walking a grid document.
#[derive(Debug, Clone, Default)]
pub struct GridScan {
    /// Scheduled placements in grid order, then hiatus placements.
    pub placements: Vec<GridPlacement>,
    /// Rows abandoned because a cell was unreadable.
    pub skipped_rows: usize,
}

/// Walk a parsed grid document and collect every placement.
pub fn walk_grid<N: MarkupNode>(
    root: &N,
    layout: &GridLayout,
    address: &str,
) -> Result<GridScan, SyncError> {
    let tables = root.all("table");
    if tables.len() < LAYOUT_TABLES + DAYS_OF_WEEK.len() {
        return Err(SyncError::malformed(
            address,
            format!("expected at least 9 tables, found {}", tables.len()),
        ));
    }
    let tables = &tables[LAYOUT_TABLES..];

    let mut scan = GridScan::default();
    for (table, day) in tables.iter().zip(DAYS_OF_WEEK) {
        tracing::debug!(?day, "walking grid day");
        let mut slots = TimeSlot::new(layout.start, layout.slot_minutes);
        if day == Weekday::Sun {
            slots.reset(Some(layout.last_day_start));
        }
        for row in table.all("tr").iter().skip(1) {
            walk_row(row, day, &mut slots, layout, &mut scan);
        }
    }

    match tables.get(DAYS_OF_WEEK.len()) {
        Some(hiatus) => collect_hiatus(hiatus, layout, &mut scan),
        None => tracing::warn!(address, "grid has no hiatus table"),
    }

    Ok(scan)
}

fn walk_row<N: MarkupNode>(
    row: &N,
    day: Weekday,
    slots: &mut TimeSlot,
    layout: &GridLayout,
    scan: &mut GridScan,
) {
    let cells = row.all("td");
    let Some(channel) = cells.first().and_then(|c| c.first("a")) else {
        return;
    };
    let channel_name = channel
        .first("font")
        .map(|f| f.text())
        .unwrap_or_else(|| channel.text())
        .trim()
        .to_string();

    slots.reset(None);
    for cell in cells.iter().skip(1) {
        let units = match cell.attr("colspan") {
            None => 1,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 && n <= MAX_COLSPAN => n,
                _ => {
                    tracing::warn!(channel = %channel_name, colspan = %raw, "unreadable colspan, skipping row");
                    scan.skipped_rows += 1;
                    return;
                }
            },
        };
        let Some((start, end)) = slots.checked_advance(units) else {
            tracing::warn!(channel = %channel_name, colspan = units, "row runs past the clock, skipping row");
            scan.skipped_rows += 1;
            return;
        };

        let Some(link) = occupied_link(cell, &layout.base_url) else {
            continue;
        };
        let Some(show) = ShowId::from_address(&link) else {
            tracing::warn!(%link, "show link has no path");
            continue;
        };
        tracing::debug!(%show, channel = %channel_name, %start, %end, "show placed");
        scan.placements.push(GridPlacement {
            show,
            link,
            slot: Slot::Scheduled {
                channel: channel_name.clone(),
                day,
                start,
                end,
                duration: units * slots.unit_minutes(),
            },
        });
    }
}

/// A cell holds a show when its link is the last thing in it.
fn occupied_link<N: MarkupNode>(cell: &N, base_url: &str) -> Option<String> {
    let anchor = cell.first("a")?;
    if anchor.has_next_sibling() {
        return None;
    }
    anchor.attr("href").map(|href| join_link(base_url, &href))
}

fn collect_hiatus<N: MarkupNode>(table: &N, layout: &GridLayout, scan: &mut GridScan) {
    for item in table.all("li") {
        let Some(href) = item.first("a").and_then(|a| a.attr("href")) else {
            continue;
        };
        let link = join_link(&layout.base_url, &href);
        let Some(show) = ShowId::from_address(&link) else {
            continue;
        };
        let return_date = item.first("span").and_then(|s| {
            let text = s.text();
            let date = text.trim().trim_start_matches("Returning").trim();
            (!date.is_empty()).then(|| date.to_string())
        });
        tracing::debug!(%show, ?return_date, "show on hiatus");
        scan.placements.push(GridPlacement {
            show,
            link,
            slot: Slot::Hiatus { return_date },
        });
    }
}

/// Resolve a possibly-relative link (`../Lost/`) against `base_url`.
pub fn join_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let mut path = href;
    loop {
        if let Some(rest) = path.strip_prefix("../") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else {
            break;
        }
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
