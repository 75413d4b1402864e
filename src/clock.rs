//! Calendar adapter
//!
//! Wall-clock access goes through [`Clock`] so streak bookkeeping can be
//! driven by a fixed or manually advanced time in tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A calendar day with no time component, persisted as `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from year, month and day
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse a `YYYY-MM-DD` key
    pub fn parse(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date key: {}", s))?;
        Ok(Self(date))
    }

    /// Whole calendar days from `self` to `later` (negative if `later` is earlier)
    pub fn days_until(&self, later: DateKey) -> i64 {
        (later.0 - self.0).num_days()
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Source of "now" and "today"
pub trait Clock {
    /// Current instant, used for entry timestamps
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day, used for streak comparisons
    fn today(&self) -> DateKey;
}

/// Wall clock; days follow the local calendar
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> DateKey {
        DateKey(Local::now().date_naive())
    }
}

/// Clock that only moves when told to. Days follow the UTC calendar.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Start at midday UTC on the given day
    pub fn at_day(day: DateKey) -> Self {
        let noon = day
            .date()
            .and_hms_opt(12, 0, 0)
            .unwrap_or_default()
            .and_utc();
        Self::new(noon)
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(chrono::Duration::days(days));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> DateKey {
        DateKey(self.now().date_naive())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> DateKey {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key_round_trips_through_display() {
        let key = DateKey::parse("2024-03-09").unwrap();
        assert_eq!(key.to_string(), "2024-03-09");
        assert_eq!(key, DateKey::from_ymd(2024, 3, 9).unwrap());
    }

    #[test]
    fn test_date_key_rejects_garbage() {
        assert!(DateKey::parse("yesterday").is_err());
        assert!(DateKey::parse("2024-13-01").is_err());
    }

    #[test]
    fn test_days_until_uses_calendar_days() {
        let a = DateKey::from_ymd(2024, 2, 28).unwrap();
        let b = DateKey::from_ymd(2024, 3, 1).unwrap();
        assert_eq!(a.days_until(b), 2); // leap year
        assert_eq!(b.days_until(a), -2);
        assert_eq!(a.days_until(a), 0);
    }

    #[test]
    fn test_date_key_serializes_as_plain_string() {
        let key = DateKey::from_ymd(2024, 1, 2).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2024-01-02\"");
        let back: DateKey = serde_json::from_str("\"2024-01-02\"").unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_manual_clock_day_changes_at_midnight_utc() {
        let clock = ManualClock::at_day(DateKey::from_ymd(2024, 1, 1).unwrap());
        assert_eq!(clock.today().to_string(), "2024-01-01");

        clock.advance(chrono::Duration::hours(11));
        assert_eq!(clock.today().to_string(), "2024-01-01");

        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.today().to_string(), "2024-01-02");

        clock.advance_days(3);
        assert_eq!(clock.today().to_string(), "2024-01-05");
    }
}
