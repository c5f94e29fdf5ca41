//! Validity window computation.
//!
//! A window is anchored at an explicit `now`, which keeps [`ValidityWindow::compute`]
//! deterministic. Production code reads `now` from a [`Clock`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Result, RootCaError};

/// Unit of a validity duration.
///
/// Years are a flat 365 days; leap days are not accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidityUnit {
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "y")]
    Year,
}

impl ValidityUnit {
    /// The exact length of one unit.
    pub const fn duration(self) -> Duration {
        match self {
            ValidityUnit::Day => Duration::days(1),
            ValidityUnit::Week => Duration::days(7),
            ValidityUnit::Year => Duration::days(365),
        }
    }

    /// The single-letter symbol accepted by [`FromStr`].
    pub const fn symbol(self) -> &'static str {
        match self {
            ValidityUnit::Day => "d",
            ValidityUnit::Week => "w",
            ValidityUnit::Year => "y",
        }
    }
}

impl FromStr for ValidityUnit {
    type Err = RootCaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "d" => Ok(ValidityUnit::Day),
            "w" => Ok(ValidityUnit::Week),
            "y" => Ok(ValidityUnit::Year),
            other => Err(RootCaError::InvalidUnit(other.to_string())),
        }
    }
}

impl fmt::Display for ValidityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Certificate validity period, `since < till`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct ValidityWindow {
    #[serde(with = "time::serde::rfc3339")]
    since: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    till: OffsetDateTime,
}

#[derive(Deserialize)]
struct RawWindow {
    #[serde(with = "time::serde::rfc3339")]
    since: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    till: OffsetDateTime,
}

impl TryFrom<RawWindow> for ValidityWindow {
    type Error = RootCaError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        Self::from_bounds(raw.since, raw.till)
    }
}

impl ValidityWindow {
    /// Computes the window `[now, now + count * unit)` in UTC.
    ///
    /// # Errors
    /// `InvalidDuration` when `count` is not positive or the end of the window
    /// is not representable.
    pub fn compute(count: i64, unit: ValidityUnit, now: OffsetDateTime) -> Result<Self> {
        if count <= 0 {
            return Err(RootCaError::InvalidDuration(count));
        }
        let since = now.to_offset(time::UtcOffset::UTC);
        let till = count
            .checked_mul(unit.duration().whole_seconds())
            .map(Duration::seconds)
            .and_then(|length| since.checked_add(length))
            .ok_or(RootCaError::InvalidDuration(count))?;
        Ok(Self { since, till })
    }

    /// Builds a window from explicit bounds, enforcing `since < till`.
    pub fn from_bounds(since: OffsetDateTime, till: OffsetDateTime) -> Result<Self> {
        if since >= till {
            return Err(RootCaError::DecodingError(format!(
                "validity window must end after it starts ({since} >= {till})"
            )));
        }
        Ok(Self { since, till })
    }

    pub fn since(&self) -> OffsetDateTime {
        self.since
    }

    pub fn till(&self) -> OffsetDateTime {
        self.till
    }

    pub fn length(&self) -> Duration {
        self.till - self.since
    }

    /// Whether `instant` falls within `[since, till)`.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.since <= instant && instant < self.till
    }
}

/// Computes a window from a unit symbol (`d`, `w` or `y`).
///
/// # Errors
/// `InvalidUnit` for an unknown symbol, `InvalidDuration` for a non-positive count.
/// No window is produced in either case.
pub fn compute_window(count: i64, unit: &str, now: OffsetDateTime) -> Result<ValidityWindow> {
    let unit = unit.parse::<ValidityUnit>()?;
    ValidityWindow::compute(count, unit, now)
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// The system wall clock, in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_one_year_has_no_leap_adjustment() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        let window = compute_window(1, "y", now).unwrap();
        assert_eq!(window.since(), now);
        assert_eq!(window.till(), datetime!(2024-12-31 00:00:00 UTC));
    }

    #[test]
    fn test_day_and_week_lengths() {
        let now = datetime!(2024-03-10 12:30:15 UTC);
        let days = compute_window(3, "d", now).unwrap();
        assert_eq!(days.till(), datetime!(2024-03-13 12:30:15 UTC));
        assert_eq!(days.length(), Duration::hours(72));

        let weeks = compute_window(2, "w", now).unwrap();
        assert_eq!(weeks.till(), datetime!(2024-03-24 12:30:15 UTC));
    }

    #[test]
    fn test_window_is_normalized_to_utc() {
        let now = datetime!(2024-01-01 02:00:00 +02:00);
        let window = compute_window(1, "d", now).unwrap();
        assert_eq!(window.since().offset(), time::UtcOffset::UTC);
        assert_eq!(window.since(), datetime!(2024-01-01 00:00:00 UTC));
    }

    #[test]
    fn test_same_inputs_same_window() {
        let now = datetime!(2030-06-15 08:00:00 UTC);
        assert_eq!(
            compute_window(10, "w", now).unwrap(),
            compute_window(10, "w", now).unwrap()
        );
    }

    #[test]
    fn test_non_positive_count_is_rejected() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        assert_eq!(
            compute_window(0, "d", now),
            Err(RootCaError::InvalidDuration(0))
        );
        assert_eq!(
            compute_window(-3, "y", now),
            Err(RootCaError::InvalidDuration(-3))
        );
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        assert_eq!(
            compute_window(5, "x", now),
            Err(RootCaError::InvalidUnit("x".to_string()))
        );
        assert!(matches!(
            compute_window(5, "D", now),
            Err(RootCaError::InvalidUnit(_))
        ));
        assert!(matches!(
            compute_window(5, "", now),
            Err(RootCaError::InvalidUnit(_))
        ));
    }

    #[test]
    fn test_unit_is_checked_before_count() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        assert!(matches!(
            compute_window(0, "m", now),
            Err(RootCaError::InvalidUnit(_))
        ));
    }

    #[test]
    fn test_overflowing_window_is_rejected() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        assert_eq!(
            compute_window(1_000_000, "y", now),
            Err(RootCaError::InvalidDuration(1_000_000))
        );
        assert_eq!(
            compute_window(i64::MAX, "d", now),
            Err(RootCaError::InvalidDuration(i64::MAX))
        );
    }

    #[test]
    fn test_window_serde_checks_bounds() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        let window = compute_window(1, "d", now).unwrap();
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(
            json,
            r#"{"since":"2024-01-01T00:00:00Z","till":"2024-01-02T00:00:00Z"}"#
        );
        assert_eq!(
            serde_json::from_str::<ValidityWindow>(&json).unwrap(),
            window
        );

        let inverted = r#"{"since":"2024-01-02T00:00:00Z","till":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<ValidityWindow>(inverted).is_err());
    }

    #[test]
    fn test_unit_symbols() {
        for unit in [ValidityUnit::Day, ValidityUnit::Week, ValidityUnit::Year] {
            assert_eq!(unit.symbol().parse::<ValidityUnit>().unwrap(), unit);
            assert_eq!(unit.to_string(), unit.symbol());
        }
        assert_eq!(serde_json::to_string(&ValidityUnit::Week).unwrap(), "\"w\"");
    }

    #[test]
    fn test_contains_is_half_open() {
        let now = datetime!(2024-01-01 00:00:00 UTC);
        let window = compute_window(1, "d", now).unwrap();
        assert!(window.contains(now));
        assert!(window.contains(datetime!(2024-01-01 23:59:59 UTC)));
        assert!(!window.contains(window.till()));
    }
}
