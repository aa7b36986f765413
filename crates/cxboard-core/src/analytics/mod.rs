//! Aggregator: KPI values and chart series over a filtered set of calls
//!
//! Resolution and escalation are duration heuristics, not recorded outcomes: a call
//! longer than `resolved_above_secs` counts as resolved, one shorter than
//! `escalated_below_secs` as escalated. Both thresholds are configurable.
//!
//! Every function here is total. Empty input yields zero counts, `0%` rates and a
//! `0:00` average so the presentation layer never has to special-case missing data.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::filter::{self, RecordQuery, TimeOfDayBounds};
use crate::models::{CallDuration, CallRecord, Intent, PeriodSelection};
use crate::period::{self, DateRange, Granularity};
use crate::store::RecordStore;

pub mod trends;


pub use trends::{
    compute_trends, daily_counts, hourly_distribution, weekly_buckets, DailyCount, TrendsData,
    WeekBucket,
};

/// Duration thresholds standing in for real outcome data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeThresholds {
    /// Calls strictly longer than this count as resolved
    pub resolved_above_secs: u32,
    /// Calls strictly shorter than this count as escalated
    pub escalated_below_secs: u32,
}

impl Default for OutcomeThresholds {
    fn default() -> Self {
        Self {
            resolved_above_secs: 120,
            escalated_below_secs: 90,
        }
    }
}

impl OutcomeThresholds {
    pub fn is_resolved(&self, record: &CallRecord) -> bool {
        record.duration_seconds() > self.resolved_above_secs
    }

    pub fn is_escalated(&self, record: &CallRecord) -> bool {
        record.duration_seconds() < self.escalated_below_secs
    }
}

/// One labelled value on a chart axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: usize,
}

/// Handled-by-AI vs escalated counts for one intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentOutcome {
    pub intent: Intent,
    pub handled: usize,
    pub escalated: usize,
}

/// KPI values and distributions for one filtered set of calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub total_count: usize,
    pub average_duration_seconds: u32,
    /// Whole percent
    pub resolution_rate: u32,
    /// Whole percent
    pub escalation_rate: u32,
    /// Count per intent, every intent present, in category order
    pub category_distribution: BTreeMap<Intent, usize>,
    /// `(short label, count)` per intent for chart axes
    pub intent_series: Vec<SeriesPoint>,
    pub intent_outcomes: Vec<IntentOutcome>,
}

impl AggregateResult {
    /// Zero-valued result with every category present
    pub fn empty() -> Self {
        aggregate(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn average_duration(&self) -> CallDuration {
        CallDuration::from_secs(self.average_duration_seconds)
    }

    /// `M:SS`
    pub fn average_duration_label(&self) -> String {
        self.average_duration().to_string()
    }

    /// e.g. "1 min 37 s"
    pub fn average_duration_human(&self) -> String {
        self.average_duration().human()
    }

    pub fn resolution_rate_label(&self) -> String {
        format!("{}%", self.resolution_rate)
    }

    pub fn escalation_rate_label(&self) -> String {
        format!("{}%", self.escalation_rate)
    }

    pub fn count_for(&self, intent: Intent) -> usize {
        self.category_distribution.get(&intent).copied().unwrap_or(0)
    }
}

/// Rounded whole percentage, zero when there is nothing to divide by
fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Aggregate with the default thresholds
pub fn aggregate(records: &[&CallRecord]) -> AggregateResult {
    aggregate_with(records, &OutcomeThresholds::default())
}

/// Reduce a filtered sequence of calls into KPI values and chart series
pub fn aggregate_with(records: &[&CallRecord], thresholds: &OutcomeThresholds) -> AggregateResult {
    let total_count = records.len();

    let mut total_seconds: u64 = 0;
    let mut resolved = 0usize;
    let mut escalated = 0usize;
    let mut per_intent = [(0usize, 0usize, 0usize); Intent::ALL.len()];

    for record in records {
        total_seconds += u64::from(record.duration_seconds());
        let slot = &mut per_intent[record.intent.index()];
        slot.0 += 1;
        if thresholds.is_resolved(record) {
            resolved += 1;
            slot.1 += 1;
        }
        if thresholds.is_escalated(record) {
            escalated += 1;
            slot.2 += 1;
        }
    }

    let average_duration_seconds = if total_count == 0 {
        0
    } else {
        (total_seconds as f64 / total_count as f64).round() as u32
    };

    let category_distribution = Intent::ALL
        .iter()
        .map(|intent| (*intent, per_intent[intent.index()].0))
        .collect();

    let intent_series = Intent::ALL
        .iter()
        .map(|intent| SeriesPoint {
            label: intent.short_label().to_string(),
            value: per_intent[intent.index()].0,
        })
        .collect();

    let intent_outcomes = Intent::ALL
        .iter()
        .map(|intent| {
            let (_, handled, escalated) = per_intent[intent.index()];
            IntentOutcome {
                intent: *intent,
                handled,
                escalated,
            }
        })
        .collect();

    AggregateResult {
        total_count,
        average_duration_seconds,
        resolution_rate: percent(resolved, total_count),
        escalation_rate: percent(escalated, total_count),
        category_distribution,
        intent_series,
        intent_outcomes,
    }
}

/// Everything the report view shows for one selection
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub selection: PeriodSelection,
    /// Canonical key of the selected bucket
    pub anchor_key: String,
    pub range: DateRange,
    pub summary: AggregateResult,
    pub trends: TrendsData,
    /// Week-of-month buckets for the anchor's month
    pub weekly: Vec<WeekBucket>,
    /// Timestamp of computation
    pub computed_at: DateTime<Local>,
}

impl DashboardReport {
    /// Normalize the selection, filter the store and aggregate (sync function)
    ///
    /// The only failure is a selection whose range cannot be derived.
    pub fn compute(
        store: &RecordStore,
        selection: &PeriodSelection,
        time_of_day: TimeOfDayBounds,
        thresholds: &OutcomeThresholds,
        today: NaiveDate,
    ) -> Result<Self, CoreError> {
        let range = period::compute_range(selection)?;
        let query = RecordQuery::new(range)
            .with_category(selection.category)
            .with_time_of_day(time_of_day);
        let records = filter::apply(store, &query);

        let month_range = period::range_for(selection.anchor, Granularity::Month)?;
        let month_records = filter::apply(
            store,
            &RecordQuery::new(month_range)
                .with_category(selection.category)
                .with_time_of_day(time_of_day),
        );

        Ok(Self {
            selection: *selection,
            anchor_key: selection.anchor_key(),
            range,
            summary: aggregate_with(&records, thresholds),
            trends: compute_trends(&records, &range),
            weekly: weekly_buckets(&month_records, selection.anchor, today, thresholds),
            computed_at: Local::now(),
        })
    }
}
