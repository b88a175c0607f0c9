//! Event boundaries and query windows.
//!
//! An event boundary is either an instant ([`EventTime::DateTime`]) or a
//! calendar date for all-day events ([`EventTime::AllDay`]). Instants are
//! normalized to UTC on construction so durations never depend on the
//! offset the API reported them in.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Start or end of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A point in time, in UTC.
    DateTime(DateTime<Utc>),
    /// A date without time of day.
    AllDay(NaiveDate),
}

impl EventTime {
    /// An instant already expressed in UTC.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// An instant in any offset, converted to UTC.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// A date-only boundary.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` for a date-only boundary.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }
}

/// The `[start, end)` range events are requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// The `days` days ending at `now`, or `None` when the start falls
    /// outside the representable date range.
    pub fn trailing(now: DateTime<Utc>, days: u32) -> Option<Self> {
        let start = now.checked_sub_signed(Duration::days(i64::from(days)))?;
        Some(Self::new(start, now))
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `timeMin` query value.
    pub fn time_min_param(&self) -> String {
        api_timestamp(self.start)
    }

    /// `timeMax` query value.
    pub fn time_max_param(&self) -> String {
        api_timestamp(self.end)
    }
}

/// ISO-8601 in UTC with a `Z` suffix, keeping sub-second digits only when
/// they are non-zero.
pub fn api_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, d, h, min, 0).unwrap()
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let plus_two = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let local = plus_two.with_ymd_and_hms(2025, 2, 5, 12, 0, 0).unwrap();
        assert_eq!(EventTime::from_local(local), EventTime::from_utc(utc(5, 10, 0)));
    }

    #[test]
    fn all_day_detection() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        assert!(EventTime::from_date(day).is_all_day());
        assert!(!EventTime::from_utc(utc(5, 9, 0)).is_all_day());
    }

    #[test]
    fn trailing_week_ends_now() {
        let now = utc(12, 9, 0);
        let window = TimeWindow::trailing(now, 7).unwrap();
        assert_eq!(window.start, utc(5, 9, 0));
        assert_eq!(window.end, now);
        assert_eq!(window.duration(), Duration::days(7));
    }

    #[test]
    fn trailing_out_of_range_is_none() {
        assert!(TimeWindow::trailing(utc(12, 9, 0), u32::MAX).is_none());
    }

    #[test]
    #[should_panic(expected = "start must be <= end")]
    fn reversed_window_panics() {
        TimeWindow::new(utc(5, 17, 0), utc(5, 9, 0));
    }

    #[test]
    fn query_params_end_in_z() {
        let window = TimeWindow::trailing(utc(12, 9, 0), 7).unwrap();
        assert_eq!(window.time_min_param(), "2025-02-05T09:00:00Z");
        assert_eq!(window.time_max_param(), "2025-02-12T09:00:00Z");
    }

    #[test]
    fn subsecond_precision_is_kept() {
        let dt = utc(5, 9, 0) + Duration::milliseconds(250);
        assert_eq!(api_timestamp(dt), "2025-02-05T09:00:00.250Z");
    }
}
