//! Time series trends for the line and bar charts
//!
//! Aggregates calls by hour of day, by calendar day and by week of the month.

use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::OutcomeThresholds;
use crate::models::CallRecord;
use crate::period::{week_of_month, weeks_in_month, DateRange};

/// Calls on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub calls: usize,
}

/// Calls in one week of a month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBucket {
    /// 1-based week of the month
    pub week: u32,
    /// "Week N"
    pub label: String,
    pub calls: usize,
    pub resolved: usize,
    pub escalated: usize,
}

/// Time series trends data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendsData {
    /// Hourly distribution (0-23)
    pub hourly_distribution: [usize; 24],
    /// One entry per day of the range, zero-filled, chronological
    pub daily: Vec<DailyCount>,
}

impl TrendsData {
    /// Check if empty (no calls in period)
    pub fn is_empty(&self) -> bool {
        self.daily.iter().all(|d| d.calls == 0)
    }

    /// Busiest hour, earliest on ties
    pub fn peak_hour(&self) -> Option<usize> {
        let max = *self.hourly_distribution.iter().max()?;
        if max == 0 {
            return None;
        }
        self.hourly_distribution.iter().position(|&c| c == max)
    }
}

/// Calls per hour of day
pub fn hourly_distribution(records: &[&CallRecord]) -> [usize; 24] {
    let mut hourly = [0usize; 24];
    for record in records {
        hourly[record.timestamp.hour() as usize] += 1;
    }
    hourly
}

/// Calls per calendar day of `range`, including empty days
///
/// Records outside the range are ignored.
pub fn daily_counts(records: &[&CallRecord], range: &DateRange) -> Vec<DailyCount> {
    let mut per_day: BTreeMap<NaiveDate, usize> = range.days().map(|d| (d, 0)).collect();
    for record in records {
        if let Some(count) = per_day.get_mut(&record.date()) {
            *count += 1;
        }
    }
    per_day
        .into_iter()
        .map(|(date, calls)| DailyCount { date, calls })
        .collect()
}

/// Compute hourly and daily trends for a filtered set
pub fn compute_trends(records: &[&CallRecord], range: &DateRange) -> TrendsData {
    TrendsData {
        hourly_distribution: hourly_distribution(records),
        daily: daily_counts(records, range),
    }
}

/// Week-of-month buckets for the month containing `month_anchor`
///
/// Buckets run from week 1 to the current week when `today` falls in that month,
/// otherwise to the month's last week. Records from other months are ignored.
pub fn weekly_buckets(
    records: &[&CallRecord],
    month_anchor: NaiveDate,
    today: NaiveDate,
    thresholds: &OutcomeThresholds,
) -> Vec<WeekBucket> {
    let same_month =
        today.year() == month_anchor.year() && today.month() == month_anchor.month();
    let last_week = if same_month {
        week_of_month(today)
    } else {
        weeks_in_month(month_anchor)
    };

    let mut buckets: Vec<WeekBucket> = (1..=last_week)
        .map(|week| WeekBucket {
            week,
            label: format!("Week {}", week),
            calls: 0,
            resolved: 0,
            escalated: 0,
        })
        .collect();

    for record in records {
        let date = record.date();
        if date.year() != month_anchor.year() || date.month() != month_anchor.month() {
            continue;
        }
        let Some(bucket) = buckets.get_mut(week_of_month(date) as usize - 1) else {
            continue;
        };
        bucket.calls += 1;
        if thresholds.is_resolved(record) {
            bucket.resolved += 1;
        }
        if thresholds.is_escalated(record) {
            bucket.escalated += 1;
        }
    }

    buckets
}
