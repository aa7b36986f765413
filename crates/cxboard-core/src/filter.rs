//! Filter engine: selects the call records matching a period, category and time of day
//!
//! All queries are order-preserving: results are a subsequence of the store in
//! insertion order.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::{CallRecord, CategoryFilter};
use crate::period::DateRange;
use crate::store::RecordStore;

/// Last minute of the day, the default upper bound
const LAST_MINUTE: u16 = 23 * 60 + 59;

/// Inclusive time-of-day window, evaluated per calendar day
///
/// A window whose start is after its end wraps over midnight (e.g. 22:00-06:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDayBounds {
    /// Minutes since midnight
    start: u16,
    /// Minutes since midnight, inclusive
    end: u16,
}

impl Default for TimeOfDayBounds {
    fn default() -> Self {
        Self {
            start: 0,
            end: LAST_MINUTE,
        }
    }
}

impl TimeOfDayBounds {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: minute_of(start),
            end: minute_of(end),
        }
    }

    /// Parse `HH:MM` bounds
    pub fn parse(start: &str, end: &str) -> Result<Self, CoreError> {
        Ok(Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?))
    }

    pub fn is_full_day(&self) -> bool {
        self.start == 0 && self.end == LAST_MINUTE
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Check a minute-of-day against the window
    pub fn contains_minute(&self, minute: u32) -> bool {
        let (start, end) = (u32::from(self.start), u32::from(self.end));
        if self.wraps_midnight() {
            minute >= start || minute <= end
        } else {
            start <= minute && minute <= end
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.contains_minute(u32::from(minute_of(time)))
    }
}

impl fmt::Display for TimeOfDayBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

fn minute_of(time: NaiveTime) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

/// Parse `HH:MM` (24h)
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| CoreError::InvalidTimeOfDay {
        input: s.to_string(),
    })
}

impl FromStr for TimeOfDayBounds {
    type Err = CoreError;

    /// `HH:MM-HH:MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or_else(|| CoreError::InvalidTimeOfDay {
            input: s.to_string(),
        })?;
        Self::parse(start, end)
    }
}

/// Everything a filter pass needs besides the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordQuery {
    pub range: DateRange,
    pub category: CategoryFilter,
    pub time_of_day: TimeOfDayBounds,
}

impl RecordQuery {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            category: CategoryFilter::All,
            time_of_day: TimeOfDayBounds::default(),
        }
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn with_time_of_day(mut self, bounds: TimeOfDayBounds) -> Self {
        self.time_of_day = bounds;
        self
    }

    pub fn matches(&self, record: &CallRecord) -> bool {
        self.range.contains(&record.timestamp)
            && self.category.matches(record.intent)
            && self.time_of_day.contains_minute(record.minute_of_day())
    }
}

/// Records inside `range` matching the category and time-of-day window
pub fn filter_records<'a>(
    store: &'a RecordStore,
    range: &DateRange,
    category: CategoryFilter,
    time_of_day: TimeOfDayBounds,
) -> Vec<&'a CallRecord> {
    let query = RecordQuery {
        range: *range,
        category,
        time_of_day,
    };
    apply(store, &query)
}

/// Run a prepared query against the store
pub fn apply<'a>(store: &'a RecordStore, query: &RecordQuery) -> Vec<&'a CallRecord> {
    let matched: Vec<&CallRecord> = store.iter().filter(|r| query.matches(r)).collect();
    tracing::debug!(
        range = %query.range.label(),
        category = %query.category,
        window = %query.time_of_day,
        matched = matched.len(),
        scanned = store.len(),
        "Filtered call records"
    );
    matched
}

/// Number of calls on a calendar day
pub fn calls_on_date(store: &RecordStore, date: NaiveDate) -> usize {
    store.iter().filter(|r| r.date() == date).count()
}

/// Calls whose day falls in `first..=last`
pub fn calls_between(
    store: &RecordStore,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<&CallRecord>, CoreError> {
    let range = DateRange::from_days(first, last)?;
    Ok(apply(store, &RecordQuery::new(range)))
}

/// Case-insensitive text search over caller, agent and transcript
pub fn search<'a>(records: &[&'a CallRecord], query: &str) -> Vec<&'a CallRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| {
            r.caller.to_lowercase().contains(&needle)
                || r.agent.to_lowercase().contains(&needle)
                || r.transcript.to_lowercase().contains(&needle)
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Intent;
    use crate::period::{range_for, Granularity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day_range(d: NaiveDate) -> DateRange {
        range_for(d, Granularity::Day).unwrap()
    }

    #[test]
    fn test_filter_is_order_preserving_subsequence() {
        let store = RecordStore::builtin();
        let range = range_for(date(2025, 10, 23), Granularity::Week).unwrap();
        let matched = filter_records(&store, &range, CategoryFilter::All, Default::default());

        let positions: Vec<usize> = matched
            .iter()
            .map(|r| store.iter().position(|s| s.id == r.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(!matched.is_empty());
    }

    #[test]
    fn test_filter_is_deterministic() {
        let store = RecordStore::builtin();
        let range = day_range(date(2025, 10, 22));
        let first = filter_records(&store, &range, CategoryFilter::All, Default::default());
        let second = filter_records(&store, &range, CategoryFilter::All, Default::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_category_filter_applies() {
        let store = RecordStore::builtin();
        let range = day_range(date(2025, 10, 23));
        let fraud = filter_records(
            &store,
            &range,
            CategoryFilter::Intent(Intent::FraudReporting),
            Default::default(),
        );
        assert_eq!(fraud.len(), 2);
        assert!(fraud.iter().all(|r| r.intent == Intent::FraudReporting));
    }

    #[test]
    fn test_next_day_record_excluded_regardless_of_window() {
        let store = RecordStore::builtin();
        let range = day_range(date(2025, 10, 23));
        for bounds in [
            TimeOfDayBounds::default(),
            TimeOfDayBounds::new(time(11, 0), time(12, 0)),
            TimeOfDayBounds::new(time(22, 0), time(12, 0)),
        ] {
            let matched = filter_records(&store, &range, CategoryFilter::All, bounds);
            assert!(matched.iter().all(|r| r.id != "27"));
        }
    }

    #[test]
    fn test_time_of_day_window_inclusive() {
        let store = RecordStore::builtin();
        let range = day_range(date(2025, 10, 23));
        // 09:15 and 10:15, 10:30 fall in 09:15-10:30 inclusive
        let bounds = TimeOfDayBounds::parse("09:15", "10:30").unwrap();
        let matched = filter_records(&store, &range, CategoryFilter::All, bounds);
        let ids: Vec<&str> = matched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "13"]);
    }

    #[test]
    fn test_time_of_day_applies_per_day_across_week() {
        let store = RecordStore::builtin();
        let range = range_for(date(2025, 10, 23), Granularity::Week).unwrap();
        let bounds = TimeOfDayBounds::parse("17:00", "23:59").unwrap();
        let matched = filter_records(&store, &range, CategoryFilter::All, bounds);
        assert!(!matched.is_empty());
        assert!(matched.iter().all(|r| r.time_of_day() >= time(17, 0)));
        let days: std::collections::BTreeSet<NaiveDate> = matched.iter().map(|r| r.date()).collect();
        assert!(days.len() > 1);
    }

    #[test]
    fn test_overnight_window() {
        let bounds = TimeOfDayBounds::parse("22:00", "06:00").unwrap();
        assert!(bounds.wraps_midnight());
        assert!(bounds.contains(time(23, 30)));
        assert!(bounds.contains(time(6, 0)));
        assert!(!bounds.contains(time(12, 0)));
    }

    #[test]
    fn test_time_bounds_parse() {
        let bounds: TimeOfDayBounds = "08:30-17:45".parse().unwrap();
        assert_eq!(bounds.to_string(), "08:30-17:45");
        assert!(TimeOfDayBounds::default().is_full_day());
        assert!(matches!(
            "25:00-26:00".parse::<TimeOfDayBounds>(),
            Err(CoreError::InvalidTimeOfDay { .. })
        ));
        assert!("0800".parse::<TimeOfDayBounds>().is_err());
    }

    #[test]
    fn test_calls_on_date_and_between() {
        let store = RecordStore::builtin();
        assert_eq!(calls_on_date(&store, date(2025, 10, 23)), 15);
        assert_eq!(calls_on_date(&store, date(2025, 10, 18)), 0);

        let all = calls_between(&store, date(2025, 10, 19), date(2025, 10, 24)).unwrap();
        assert_eq!(all.len(), store.len());
        assert!(calls_between(&store, date(2025, 10, 24), date(2025, 10, 19)).is_err());
    }

    #[test]
    fn test_search_matches_caller_and_transcript() {
        let store = RecordStore::builtin();
        let records: Vec<&CallRecord> = store.iter().collect();
        let by_caller = search(&records, "john smith");
        assert_eq!(by_caller.len(), 1);
        let by_transcript = search(&records, "chargeback");
        assert!(by_transcript.len() > 1);
        assert!(by_transcript
            .iter()
            .all(|r| r.transcript.to_lowercase().contains("chargeback")));
        assert_eq!(search(&records, "  ").len(), records.len());
    }
}
