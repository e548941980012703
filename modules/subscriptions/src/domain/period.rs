//! `MM-YYYY` period codec.
//!
//! A [`Period`] is a calendar month stored as the first day of that month, so
//! two periods of the same month compare equal and order chronologically.
//! This module is the only place that parses or formats period text.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Wire format of a period: two-digit month, hyphen, four-digit year.
pub const PERIOD_PATTERN: &str = r"^(\d{2})-(\d{4})$";

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

static PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PERIOD_PATTERN).expect("valid period pattern"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodParseError {
    #[error("expected MM-YYYY")]
    Shape,
    #[error("month {0} is outside 1-12")]
    Month(u32),
    #[error("year {0} is outside 1900-9999")]
    Year(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(NaiveDate);

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodParseError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodParseError::Month(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PeriodParseError::Year(year));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(PeriodParseError::Shape)
    }

    /// Parse a named input field, reporting failures as
    /// [`DomainError::InvalidPeriodFormat`].
    pub fn parse_field(field: &str, value: &str) -> Result<Self, DomainError> {
        value
            .parse()
            .map_err(|_| DomainError::invalid_period(field, value))
    }

    /// Truncates any date to the month it falls in.
    pub fn containing(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC of the first day.
    pub fn first_instant(&self) -> DateTime<Utc> {
        self.0.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = PERIOD_RE.captures(s).ok_or(PeriodParseError::Shape)?;
        let month: u32 = caps[1].parse().map_err(|_| PeriodParseError::Shape)?;
        let year: i32 = caps[2].parse().map_err(|_| PeriodParseError::Shape)?;
        Self::new(year, month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month(), self.year())
    }
}

impl From<Period> for NaiveDate {
    fn from(p: Period) -> Self {
        p.0
    }
}
