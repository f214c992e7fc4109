//! Date/time normalization and timezone conversion.
//!
//! Listing pages describe air dates in several shapes: a bare date string
//! that must be combined with the grid's time slot, a pre-parsed date with
//! a textual time, or both sides as text with per-call formats. Each shape
//! is one constructor of [`TemporalSpec`]; [`TemporalNormalizer`] resolves
//! any of them to a naive instant and then attaches a real timezone.
//!
//! # Zones
//!
//! Zone names go through a short alias table first (`est`, `kst`, ...)
//! and then through the full IANA database via `chrono-tz`. Aliases map to
//! DST-aware regions, so `est` in July is really EDT (UTC-4). This is why
//! the alias table wins over the database, which has a fixed-offset `EST`.
//!
//! | Alias | Zone |
//! |-------|------|
//! | `utc`, `gmt` | `UTC` |
//! | `est`, `edt`, `eastern`, `us-eastern` | `America/New_York` |
//! | `cst`, `cdt`, `central`, `us-central` | `America/Chicago` |
//! | `kst`, `korea`, `seoul` | `Asia/Seoul` |

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike,
};
use chrono_tz::Tz;

use crate::models::AirTuple;
use crate::timeslot::ClockTime;

/// Default format for textual dates on episode listings (`15/Jun/12`).
pub const DEFAULT_DATE_FORMAT: &str = "%d/%b/%y";

/// Default format for textual times (`20:30`).
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

/// Errors raised while resolving a [`TemporalSpec`] or a zone name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemporalError {
    /// The input's shape is invalid or a string does not match its format.
    #[error("Malformed temporal input: {0}")]
    MalformedTemporalInput(String),

    /// Neither the alias table nor the zone database knows the name.
    #[error("Unknown timezone: {0}")]
    UnknownTimeZone(String),

    /// The wall-clock time falls in a DST gap of the zone.
    #[error("Local time {time} does not exist in {zone}")]
    NonexistentLocalTime { time: NaiveDateTime, zone: String },
}

/// The date half of a temporal spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatePart {
    Parts(NaiveDate),
    Text(String),
}

/// The time half of a temporal spec. Clock hours past 23 roll into the next day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePart {
    Parts(ClockTime),
    Text(String),
}

/// A date/time description in one of four accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalSpec {
    /// Already-resolved instant, passed through.
    Resolved(NaiveDateTime),
    /// Date and time; textual sides use the configured formats.
    Combined { date: DatePart, time: TimePart },
    /// One side structured, the other textual and parsed with `format`.
    /// Exactly one side must be [`DatePart::Text`] / [`TimePart::Text`].
    Overridden {
        date: DatePart,
        time: TimePart,
        format: String,
    },
    /// Both sides textual. `None` selects the configured default format.
    Explicit {
        date: String,
        date_format: Option<String>,
        time: String,
        time_format: Option<String>,
    },
}

impl TemporalSpec {
    /// Shorthand for a listing date string combined with a grid clock time.
    pub fn listing(date: impl Into<String>, time: ClockTime) -> Self {
        TemporalSpec::Combined {
            date: DatePart::Text(date.into()),
            time: TimePart::Parts(time),
        }
    }
}

/// Resolves [`TemporalSpec`]s and moves instants between zones.
#[derive(Debug, Clone)]
pub struct TemporalNormalizer {
    default_zone: Tz,
    date_format: String,
    time_format: String,
}

impl TemporalNormalizer {
    /// Create a normalizer whose default source zone is `default_zone`.
    pub fn new(default_zone: &str) -> Result<Self, TemporalError> {
        Ok(Self {
            default_zone: resolve_zone(default_zone)?,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        })
    }

    /// Replace the configured default date and time formats.
    pub fn with_formats(mut self, date_format: &str, time_format: &str) -> Self {
        self.date_format = date_format.to_string();
        self.time_format = time_format.to_string();
        self
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    /// Resolve a spec to a naive (zone-less) instant.
    pub fn resolve(&self, spec: &TemporalSpec) -> Result<NaiveDateTime, TemporalError> {
        match spec {
            TemporalSpec::Resolved(instant) => Ok(*instant),
            TemporalSpec::Combined { date, time } => {
                let date = self.date_part(date, &self.date_format)?;
                let time = self.time_part(time, &self.time_format)?;
                Ok(combine(date, time))
            }
            TemporalSpec::Overridden { date, time, format } => match (date, time) {
                (DatePart::Text(_), TimePart::Parts(_)) => {
                    let date = self.date_part(date, format)?;
                    let time = self.time_part(time, &self.time_format)?;
                    Ok(combine(date, time))
                }
                (DatePart::Parts(_), TimePart::Text(_)) => {
                    let date = self.date_part(date, &self.date_format)?;
                    let time = self.time_part(time, format)?;
                    Ok(combine(date, time))
                }
                _ => Err(TemporalError::MalformedTemporalInput(
                    "format override needs exactly one textual side".to_string(),
                )),
            },
            TemporalSpec::Explicit {
                date,
                date_format,
                time,
                time_format,
            } => {
                let date_fmt = date_format.as_deref().unwrap_or(&self.date_format);
                let time_fmt = time_format.as_deref().unwrap_or(&self.time_format);
                let date = parse_date(date, date_fmt)?;
                let time = parse_time(time, time_fmt)?;
                Ok(combine(date, time))
            }
        }
    }

    /// Resolve `spec` and attach `zone`, honouring that zone's DST rules.
    pub fn localize(&self, zone: &str, spec: &TemporalSpec) -> Result<DateTime<Tz>, TemporalError> {
        let tz = resolve_zone(zone)?;
        attach_zone(tz, self.resolve(spec)?)
    }

    /// Localize `spec` in `source` (or the default zone) and re-render the
    /// same absolute instant in `target`.
    pub fn convert(
        &self,
        target: &str,
        spec: &TemporalSpec,
        source: Option<&str>,
    ) -> Result<DateTime<Tz>, TemporalError> {
        let target_tz = resolve_zone(target)?;
        let source_tz = match source {
            Some(name) => resolve_zone(name)?,
            None => self.default_zone,
        };
        let local = attach_zone(source_tz, self.resolve(spec)?)?;
        Ok(local.with_timezone(&target_tz))
    }

    fn date_part(&self, part: &DatePart, format: &str) -> Result<NaiveDate, TemporalError> {
        match part {
            DatePart::Parts(date) => Ok(*date),
            DatePart::Text(text) => parse_date(text, format),
        }
    }

    fn time_part(&self, part: &TimePart, format: &str) -> Result<ClockTime, TemporalError> {
        match part {
            TimePart::Parts(clock) => Ok(*clock),
            TimePart::Text(text) => parse_time(text, format),
        }
    }
}

/// Map a zone name to a `chrono-tz` zone, aliases first.
pub fn resolve_zone(name: &str) -> Result<Tz, TemporalError> {
    let alias = match name.trim().to_ascii_lowercase().as_str() {
        "utc" | "gmt" => Some(Tz::UTC),
        "est" | "edt" | "eastern" | "us-eastern" | "us/eastern" => Some(Tz::America__New_York),
        "cst" | "cdt" | "central" | "us-central" | "us/central" => Some(Tz::America__Chicago),
        "kst" | "korea" | "seoul" | "asia/seoul" => Some(Tz::Asia__Seoul),
        _ => None,
    };
    match alias {
        Some(tz) => Ok(tz),
        None => name
            .trim()
            .parse::<Tz>()
            .map_err(|_| TemporalError::UnknownTimeZone(name.to_string())),
    }
}

/// Attach `tz` to a naive instant.
///
/// A time repeated by a DST fold resolves to the later (standard-time)
/// reading; a time skipped by a DST gap is an error.
pub fn attach_zone(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, TemporalError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(_, later) => Ok(later),
        LocalResult::None => Err(TemporalError::NonexistentLocalTime {
            time: naive,
            zone: tz.name().to_string(),
        }),
    }
}

/// Canonical `(year, month, day, hour, minute)` exchange tuple.
pub fn to_components(instant: &DateTime<Tz>) -> AirTuple {
    AirTuple::new(
        instant.year(),
        instant.month() as i32,
        instant.day() as i32,
        instant.hour() as i32,
        instant.minute() as i32,
    )
}

fn parse_date(text: &str, format: &str) -> Result<NaiveDate, TemporalError> {
    NaiveDate::parse_from_str(text.trim(), format).map_err(|e| {
        TemporalError::MalformedTemporalInput(format!(
            "date '{}' does not match '{}': {}",
            text, format, e
        ))
    })
}

fn parse_time(text: &str, format: &str) -> Result<ClockTime, TemporalError> {
    let time = NaiveTime::parse_from_str(text.trim(), format).map_err(|e| {
        TemporalError::MalformedTemporalInput(format!(
            "time '{}' does not match '{}': {}",
            text, format, e
        ))
    })?;
    Ok(ClockTime::new(time.hour(), time.minute()))
}

fn combine(date: NaiveDate, time: ClockTime) -> NaiveDateTime {
    date.and_time(NaiveTime::default()) + Duration::minutes(time.minutes_from_midnight())
}
