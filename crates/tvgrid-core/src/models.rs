//! Core data models used throughout tvgrid.
//!
//! These types represent the grid placements, episode records, and
//! denormalized views that flow from the parsers into the document store.

use std::fmt;

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::episode::FieldError;
use crate::timeslot::ClockTime;

/// Stable show identifier (the camel-case name, or CCN).
///
/// Derived from the show's detail-page address, so deriving it twice from
/// the same address always gives the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(String);

impl ShowId {
    /// Derive the identifier from a detail-page address.
    ///
    /// `http://www.epguides.com/BigBangTheory/` becomes `BigBangTheory`.
    /// Relative addresses (`../BigBangTheory/`) give the same result.
    /// Returns `None` when the address has no path.
    pub fn from_address(address: &str) -> Option<Self> {
        let path = match address.find("://") {
            Some(scheme_end) => {
                let rest = &address[scheme_end + 3..];
                rest.find('/').map(|i| &rest[i..]).unwrap_or("")
            }
            None => address,
        };
        let path = path.trim_start_matches("../").trim_matches('/');
        if path.is_empty() {
            None
        } else {
            Some(ShowId(path.to_string()))
        }
    }

    /// Wrap an identifier that was already derived (e.g. read from the store).
    pub fn from_stored(id: impl Into<String>) -> Self {
        ShowId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where (and whether) a show sits on the weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Slot {
    /// A regular weekly slot.
    Scheduled {
        channel: String,
        day: Weekday,
        start: ClockTime,
        end: ClockTime,
        duration: u32,
    },
    /// Off the air for now; no time slot at all.
    Hiatus { return_date: Option<String> },
}

impl Slot {
    /// Scheduled start, if the show has a slot.
    pub fn start(&self) -> Option<ClockTime> {
        match self {
            Slot::Scheduled { start, .. } => Some(*start),
            Slot::Hiatus { .. } => None,
        }
    }

    /// Slot length in minutes (zero while on hiatus).
    pub fn duration(&self) -> u32 {
        match self {
            Slot::Scheduled { duration, .. } => *duration,
            Slot::Hiatus { .. } => 0,
        }
    }
}

/// One show's placement as discovered on the grid.
///
/// Upserted by show id on every grid parse; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPlacement {
    pub show: ShowId,
    /// Absolute address of the show's detail page.
    pub link: String,
    #[serde(flatten)]
    pub slot: Slot,
}

/// Temporal status of an episode relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Yet,
    Airing,
    Aired,
    Unknown,
}

/// Canonical `(year, month, day, hour, minute)` air-time tuple.
///
/// Ordering is lexicographic, so the sentinels sort where listings expect
/// them: [`UNKNOWN`](AirTuple::UNKNOWN) after every real date,
/// [`UNAIRED`](AirTuple::UNAIRED) and [`INVALID`](AirTuple::INVALID)
/// before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 5]", into = "[i32; 5]")]
pub struct AirTuple {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
}

impl AirTuple {
    /// Air date announced as unknown.
    pub const UNKNOWN: AirTuple = AirTuple::new(9999, 12, 31, 23, 59);
    /// Episode listed as not yet aired, with no date.
    pub const UNAIRED: AirTuple = AirTuple::new(0, 1, 1, 0, 0);
    /// Air date that could not be interpreted.
    pub const INVALID: AirTuple = AirTuple::new(-1, -1, -1, -1, -1);

    pub const fn new(year: i32, month: i32, day: i32, hour: i32, minute: i32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }
}

impl From<[i32; 5]> for AirTuple {
    fn from(v: [i32; 5]) -> Self {
        AirTuple::new(v[0], v[1], v[2], v[3], v[4])
    }
}

impl From<AirTuple> for [i32; 5] {
    fn from(t: AirTuple) -> Self {
        [t.year, t.month, t.day, t.hour, t.minute]
    }
}

/// One parsed line of a show's episode listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Running index; `0` for specials without one, `-1` when invalid.
    pub index: i64,
    pub season: i64,
    pub number: i64,
    pub production_code: String,
    pub air: AirTuple,
    pub title: String,
    pub is_special: bool,
    pub status: EpisodeStatus,
    /// Field-level problems found while parsing; the record is kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl EpisodeRecord {
    pub fn is_flagged(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Last source update instant seen for a target document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessRecord {
    pub target: String,
    pub seen: NaiveDateTime,
}

/// Denormalized summary of a show for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowIndexEntry {
    pub show: ShowId,
    pub title: String,
    /// Canonical external reference link (mobile IMDb page).
    pub reference: String,
}

/// An upcoming episode, surfaced without scanning full episode lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextEpisode {
    pub show: ShowId,
    pub show_title: String,
    pub episode_title: String,
    pub index: i64,
    pub air: AirTuple,
}

impl NextEpisode {
    /// Composite key: show id, episode title, and index concatenated.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.show, self.episode_title, self.index)
    }
}
