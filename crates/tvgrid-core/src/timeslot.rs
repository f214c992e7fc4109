//! Grid time-slot allocation.
//!
//! A grid row is a sequence of cells whose widths are measured in slots
//! (30 minutes each on the weekly prime-time grid). [`TimeSlot`] walks a
//! row left to right and hands out the wall-clock start and end of every
//! cell, carrying minutes into hours as it goes.
//!
//! Hours are never wrapped: a slot running past midnight ends at `24:30`
//! rather than `00:30`. Callers that need a calendar instant add the clock
//! offset to a date (see [`ClockTime::minutes_from_midnight`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 24-hour wall-clock time local to the grid's convention.
///
/// `hour` may exceed 23 for slots that cross midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Offset of this clock time from the start of its day.
    pub fn minutes_from_midnight(&self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = String;

    /// Parses `HH:MM`. Minutes must be below 60; hours are unbounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{}'", s))?;
        let hour: u32 = h.parse().map_err(|_| format!("bad hour in '{}'", s))?;
        let minute: u32 = m.parse().map_err(|_| format!("bad minute in '{}'", s))?;
        if minute >= 60 {
            return Err(format!("minute out of range in '{}'", s));
        }
        Ok(Self { hour, minute })
    }
}

/// Stateful cursor over one day's schedule.
///
/// Mutated only through [`advance`](TimeSlot::advance) within a row and
/// [`reset`](TimeSlot::reset) between rows.
#[derive(Debug, Clone)]
pub struct TimeSlot {
    start: ClockTime,
    unit_minutes: u32,
    current: ClockTime,
}

impl TimeSlot {
    /// Create a cursor positioned at `start` with `unit_minutes` per slot.
    pub fn new(start: ClockTime, unit_minutes: u32) -> Self {
        Self {
            start,
            unit_minutes,
            current: start,
        }
    }

    /// Minutes covered by one slot.
    pub fn unit_minutes(&self) -> u32 {
        self.unit_minutes
    }

    /// The clock time the next [`advance`](TimeSlot::advance) will start at.
    pub fn current(&self) -> ClockTime {
        self.current
    }

    /// Move the cursor back to the configured start.
    ///
    /// With `Some(new_start)` the configured start itself is replaced first,
    /// so later plain resets return to the override.
    pub fn reset(&mut self, new_start: Option<ClockTime>) {
        if let Some(start) = new_start {
            self.start = start;
        }
        self.current = self.start;
    }

    /// Allocate the next `units` slots and return their `(start, end)`.
    ///
    /// # Panics
    ///
    /// Panics when `units` is zero or the end time overflows; see
    /// [`checked_advance`](TimeSlot::checked_advance).
    pub fn advance(&mut self, units: u32) -> (ClockTime, ClockTime) {
        assert!(units > 0, "TimeSlot::advance requires a positive slot count");
        let from = self.current;
        self.checked_advance(units).unwrap_or_else(|| {
            panic!(
                "TimeSlot::advance overflow: {} slots of {} minutes from {}",
                units, self.unit_minutes, from
            )
        })
    }

    /// Like [`advance`](TimeSlot::advance), but returns `None` and leaves the
    /// cursor alone when `units` is zero or the end time would overflow.
    pub fn checked_advance(&mut self, units: u32) -> Option<(ClockTime, ClockTime)> {
        if units == 0 {
            return None;
        }
        let minutes = self
            .unit_minutes
            .checked_mul(units)?
            .checked_add(self.current.minute)?;
        let end = ClockTime {
            hour: self.current.hour.checked_add(minutes / 60)?,
            minute: minutes % 60,
        };
        let start = self.current;
        self.current = end;
        Some((start, end))
    }
}
