//! Local wall-clock times of day, rendered as zero-padded 24-hour `HH:MM`.
//!
//! No timezone is attached. The store keeps these in `time` columns, which
//! PostgREST returns as `HH:MM:SS`, so parsing accepts either form. Like
//! those columns, `24:00` is accepted as the end of the day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Invalid time format '{0}', expected HH:MM")]
    Format(String),

    #[error("Time out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),
}

/// Calendar day of an ISO-8601 date or date-time string. A date-time keeps
/// its own local date; no timezone conversion happens.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, TimeParseError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| TimeParseError::Date(raw.to_string()))
}

/// Minutes since midnight. Values run from 00:00 to 24:00 inclusive; 24:00
/// only makes sense as the end of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub const END_OF_DAY: TimeOfDay = TimeOfDay {
        minutes: MINUTES_PER_DAY as u16,
    };

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self {
            minutes: minutes as u16,
        })
    }

    pub fn minutes(&self) -> u32 {
        u32::from(self.minutes)
    }

    pub fn hour(&self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes() % 60
    }

    /// `None` when the result would pass midnight. Landing exactly on
    /// midnight gives `END_OF_DAY`.
    pub fn checked_add_minutes(&self, minutes: u32) -> Option<Self> {
        let total = self.minutes().checked_add(minutes)?;
        if total == MINUTES_PER_DAY {
            return Some(Self::END_OF_DAY);
        }
        Self::from_minutes(total)
    }
}

fn two_digits(raw: &str, field: &str) -> Result<u32, TimeParseError> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::Format(raw.to_string()));
    }
    field
        .parse()
        .map_err(|_| TimeParseError::Format(raw.to_string()))
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split(':').collect();
        let (hour, minute) = match parts.as_slice() {
            [h, m] => (two_digits(raw, h)?, two_digits(raw, m)?),
            [h, m, s] => {
                // Sub-minute precision is never stored; reject rather than truncate.
                if two_digits(raw, s)? != 0 {
                    return Err(TimeParseError::OutOfRange(raw.to_string()));
                }
                (two_digits(raw, h)?, two_digits(raw, m)?)
            }
            _ => return Err(TimeParseError::Format(raw.to_string())),
        };

        if (hour, minute) == (24, 0) {
            return Ok(Self::END_OF_DAY);
        }
        Self::from_hm(hour, minute).ok_or_else(|| TimeParseError::OutOfRange(raw.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
