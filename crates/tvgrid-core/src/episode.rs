//! Episode listing parser and classifier.
//!
//! A show's episode listing is a delimited text export, one episode per
//! line:
//!
//! ```text
//! number,season,episode,production code,airdate,title,special?
//! 5,2,10,,15/Jun/12,"Episode Title, Part 1",n
//! ```
//!
//! Each field is validated on its own. A bad field never drops the line:
//! it is replaced by a sentinel and the problem is recorded on the record
//! as a [`FieldError`]. Only a line too short to carry the fixed columns is
//! skipped.
//!
//! # Air dates
//!
//! | Raw value | Stored tuple | Status |
//! |-----------|--------------|--------|
//! | `UNKNOWN` | [`AirTuple::UNKNOWN`] | `unknown` |
//! | `UNAIRED` | [`AirTuple::UNAIRED`] | `unknown` |
//! | a date in the configured format (`dd/Mon/yy` by default) | converted to the viewer's zone | `yet` / `airing` / `aired` |
//! | anything else | [`AirTuple::INVALID`] | `unknown` |

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::{AirTuple, EpisodeRecord, EpisodeStatus, NextEpisode, ShowId};
use crate::temporal::{resolve_zone, to_components, TemporalError, TemporalNormalizer, TemporalSpec};
use crate::timeslot::ClockTime;

/// Field delimiter of the listing export.
pub const DELIMITER: char = ',';

/// Minimum column count: five leading fields and the special flag. The
/// title between them may be absent.
const MIN_FIELDS: usize = 6;

/// A per-field validation problem. Never aborts the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    #[error("index must be a number")]
    InvalidIndex,
    #[error("only special episodes can have an empty index")]
    MissingIndex,
    #[error("season must be a number")]
    InvalidSeason,
    #[error("episode number must be a number")]
    InvalidEpisodeNumber,
}

/// A line that cannot be read as an episode at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected at least 6 fields, found {0}")]
    TooFewFields(usize),
}

/// Best-effort value of one field plus the error that forced a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub error: Option<FieldError>,
}

impl<T> Parsed<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn fallback(value: T, error: FieldError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }
}

/// What the parser needs to know about the show a listing belongs to.
#[derive(Debug, Clone)]
pub struct ListingContext {
    pub show: ShowId,
    pub show_title: String,
    /// Scheduled local start of the show's slot.
    pub start: ClockTime,
    pub duration_minutes: u32,
}

/// Output of [`EpisodeParser::parse_listing`].
#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    /// Episodes in input order.
    pub episodes: Vec<EpisodeRecord>,
    /// Episodes classified `yet`, for the next-episode view.
    pub upcoming: Vec<NextEpisode>,
    /// Lines skipped because they could not be read as episodes.
    pub skipped: usize,
}

/// Parses listing lines into [`EpisodeRecord`]s in the viewer's zone.
#[derive(Debug, Clone)]
pub struct EpisodeParser {
    normalizer: TemporalNormalizer,
    target_zone: String,
    now: DateTime<Tz>,
}

impl EpisodeParser {
    /// `now` should already be expressed in `target_zone`; only its absolute
    /// instant matters for classification.
    pub fn new(
        normalizer: TemporalNormalizer,
        target_zone: &str,
        now: DateTime<Tz>,
    ) -> Result<Self, TemporalError> {
        resolve_zone(target_zone)?;
        Ok(Self {
            normalizer,
            target_zone: target_zone.to_string(),
            now,
        })
    }

    /// Parse a whole listing body. The first non-blank line is a header.
    pub fn parse_listing(&self, body: &str, ctx: &ListingContext) -> ParsedListing {
        let mut out = ParsedListing::default();
        let lines = body
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .skip(1);
        for line in lines {
            match self.parse_line(line, ctx) {
                Ok(record) => {
                    if record.status == EpisodeStatus::Yet {
                        out.upcoming.push(NextEpisode {
                            show: ctx.show.clone(),
                            show_title: ctx.show_title.clone(),
                            episode_title: record.title.clone(),
                            index: record.index,
                            air: record.air,
                        });
                    }
                    out.episodes.push(record);
                }
                Err(e) => {
                    tracing::error!(show = %ctx.show, line, error = %e, "skipping episode line");
                    out.skipped += 1;
                }
            }
        }
        out
    }

    /// Parse a single listing line.
    ///
    /// The last field is always the special flag; every field between the
    /// air date and it is rejoined as the title.
    pub fn parse_line(&self, line: &str, ctx: &ListingContext) -> Result<EpisodeRecord, RecordError> {
        let fields = split_fields(line, DELIMITER);
        if fields.len() < MIN_FIELDS {
            return Err(RecordError::TooFewFields(fields.len()));
        }

        let last = fields.len() - 1;
        let is_special = fields[last] != "n";
        let title = fields[5..last].join(&DELIMITER.to_string());

        let index = parse_index(&fields[0], is_special);
        let season = parse_season(&fields[1]);
        let number = parse_number(&fields[2], is_special);
        let (air, status) = self.classify_air_date(&fields[4].replace('"', ""), ctx);

        let errors: Vec<FieldError> = [index.error, season.error, number.error]
            .into_iter()
            .flatten()
            .collect();
        for e in &errors {
            tracing::warn!(show = %ctx.show, title = %ctx.show_title, line, error = %e, "episode field error");
        }

        Ok(EpisodeRecord {
            index: index.value,
            season: season.value,
            number: number.value,
            production_code: fields[3].clone(),
            air,
            title,
            is_special,
            status,
            errors,
        })
    }

    fn classify_air_date(&self, raw: &str, ctx: &ListingContext) -> (AirTuple, EpisodeStatus) {
        match raw {
            "UNKNOWN" => return (AirTuple::UNKNOWN, EpisodeStatus::Unknown),
            "UNAIRED" => return (AirTuple::UNAIRED, EpisodeStatus::Unknown),
            _ => {}
        }
        let spec = TemporalSpec::listing(raw, ctx.start);
        match self.normalizer.convert(&self.target_zone, &spec, None) {
            Ok(air) => {
                let duration = Duration::minutes(i64::from(ctx.duration_minutes));
                (to_components(&air), classify(&air, duration, &self.now))
            }
            Err(e) => {
                tracing::warn!(show = %ctx.show, airdate = raw, error = %e, "unusable air date");
                (AirTuple::INVALID, EpisodeStatus::Unknown)
            }
        }
    }
}

/// Classify an air instant against `now`.
///
/// Starts after now: `yet`. Ended before now: `aired`. Otherwise `airing`.
pub fn classify(air: &DateTime<Tz>, duration: Duration, now: &DateTime<Tz>) -> EpisodeStatus {
    if air > now {
        EpisodeStatus::Yet
    } else if *air + duration < *now {
        EpisodeStatus::Aired
    } else {
        EpisodeStatus::Airing
    }
}

/// Split a line on `delimiter`, keeping delimiters inside double quotes,
/// then strip one layer of matching quotes from each field.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
        } else if c == delimiter && !in_quotes {
            fields.push(strip_quotes(&current).to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(strip_quotes(&current).to_string());
    fields
}

fn strip_quotes(field: &str) -> &str {
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        &field[1..field.len() - 1]
    } else {
        field
    }
}

fn all_digits(s: &str) -> Option<i64> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

fn parse_index(raw: &str, is_special: bool) -> Parsed<i64> {
    if raw.is_empty() {
        return if is_special {
            Parsed::ok(0)
        } else {
            Parsed::fallback(-1, FieldError::MissingIndex)
        };
    }
    match all_digits(raw) {
        Some(v) => Parsed::ok(v),
        None => Parsed::fallback(-1, FieldError::InvalidIndex),
    }
}

fn parse_season(raw: &str) -> Parsed<i64> {
    match all_digits(raw) {
        Some(v) => Parsed::ok(v),
        None => Parsed::fallback(-1, FieldError::InvalidSeason),
    }
}

fn parse_number(raw: &str, is_special: bool) -> Parsed<i64> {
    match all_digits(raw) {
        Some(v) => Parsed::ok(v),
        None if is_special => Parsed::ok(0),
        None => Parsed::fallback(-1, FieldError::InvalidEpisodeNumber),
    }
}
