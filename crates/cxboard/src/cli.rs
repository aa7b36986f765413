//! Terminal rendering for reports, call history and the current selection
//!
//! Every formatter returns a `String` (table or JSON) so the command handlers only print.

use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use cxboard_core::analytics::DashboardReport;
use cxboard_core::error::CoreError;
use cxboard_core::filter::TimeOfDayBounds;
use cxboard_core::models::{CallRecord, CategoryFilter, PeriodSelection};
use cxboard_core::period::{DateRange, Granularity};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum CliError {
    InvalidFlag {
        flag: &'static str,
        value: String,
        expected: &'static str,
    },
    Core(CoreError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::InvalidFlag {
                flag,
                value,
                expected,
            } => write!(f, "Invalid {} '{}' (expected: {})", flag, value, expected),
            CliError::Core(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        CliError::Core(e)
    }
}

// ============================================================================
// Flag Parsing
// ============================================================================

pub fn parse_period(value: &str) -> Result<Granularity, CliError> {
    value.parse().map_err(|_| CliError::InvalidFlag {
        flag: "--period",
        value: value.to_string(),
        expected: "day, week or month",
    })
}

pub fn parse_category(value: &str) -> Result<CategoryFilter, CliError> {
    value.parse().map_err(|_| CliError::InvalidFlag {
        flag: "--category",
        value: value.to_string(),
        expected: "all, an intent label or fraud|disputes|due-date|credit-report|auto-pay|balance|customer-trade|tnc",
    })
}

/// Time-of-day window from optional `--from` / `--to`, whole day by default
pub fn parse_time_bounds(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<TimeOfDayBounds, CliError> {
    let bounds = TimeOfDayBounds::parse(from.unwrap_or("00:00"), to.unwrap_or("23:59"))?;
    Ok(bounds)
}

// ============================================================================
// Formatters
// ============================================================================

fn header(table: &mut Table, columns: &[&str], no_color: bool) {
    if no_color {
        table.set_header(columns.to_vec());
    } else {
        table.set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
}

fn new_table(columns: &[&str], no_color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    header(&mut table, columns, no_color);
    table
}

/// One-line description of a selection, e.g. "week 2025-W43 (2025-10-19 to 2025-10-25), all intents"
pub fn describe_selection(selection: &PeriodSelection, range: &DateRange) -> String {
    let category = match selection.category {
        CategoryFilter::All => "all intents".to_string(),
        CategoryFilter::Intent(intent) => intent.label().to_string(),
    };
    if selection.granularity == Granularity::Day {
        format!("day {}, {}", selection.anchor_key(), category)
    } else {
        format!(
            "{} {} ({}), {}",
            selection.granularity,
            selection.anchor_key(),
            range.label(),
            category
        )
    }
}

/// KPI tiles plus the per-intent breakdown
pub fn format_report(report: &DashboardReport, json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    }

    let summary = &report.summary;
    let mut lines = vec![
        "cxboard - Voice Agent CX Report".to_string(),
        "===============================".to_string(),
        String::new(),
        format!(
            "Selection:        {}",
            describe_selection(&report.selection, &report.range)
        ),
        format!("Total Calls:      {}", summary.total_count),
        format!(
            "Avg Duration:     {} ({})",
            summary.average_duration_label(),
            summary.average_duration_human()
        ),
        format!("Resolution Rate:  {}", summary.resolution_rate_label()),
        format!("Escalation Rate:  {}", summary.escalation_rate_label()),
    ];
    if let Some(hour) = report.trends.peak_hour() {
        lines.push(format!("Peak Hour:        {:02}:00", hour));
    }
    lines.push(String::new());

    if summary.is_empty() {
        lines.push("No calls in this period.".to_string());
        return lines.join("\n");
    }

    let mut table = new_table(&["Intent", "Calls", "AI Handled", "Escalated"], no_color);
    for outcome in &summary.intent_outcomes {
        let calls = summary.count_for(outcome.intent).to_string();
        let handled = outcome.handled.to_string();
        let escalated = outcome.escalated.to_string();
        table.add_row(Row::from(vec![
            outcome.intent.label(),
            &calls,
            &handled,
            &escalated,
        ]));
    }
    lines.push(table.to_string());

    lines.join("\n")
}

/// Call-history table
pub fn format_calls_table(records: &[&CallRecord], json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
    }

    if records.is_empty() {
        return "No calls found.".to_string();
    }

    let mut table = new_table(
        &["ID", "Date", "Caller", "Agent", "Duration", "Intent", "Audio", "Transcript"],
        no_color,
    );
    for record in records {
        let date = record.timestamp_display();
        let duration = record.duration.to_string();
        let audio = if record.has_audio { "yes" } else { "-" };
        let transcript = truncate(&record.transcript, 40);
        table.add_row(Row::from(vec![
            record.id.as_str(),
            &date,
            &record.caller,
            &record.agent,
            &duration,
            record.intent.short_label(),
            audio,
            &transcript,
        ]));
    }

    format!("{}\n{} calls", table, records.len())
}

/// Current selection as stored, with its derived range
pub fn format_selection(
    selection: &PeriodSelection,
    range: &DateRange,
    persisting: bool,
    json: bool,
) -> String {
    if json {
        let value = serde_json::json!({
            "selectedDate": cxboard_core::selection::stored_date(selection),
            "selectedPeriod": selection.granularity,
            "selectedCategory": selection.category,
            "key": selection.anchor_key(),
            "range": range,
            "persisted": persisting,
        });
        return serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    }

    let mut lines = vec![
        format!("Date:      {}", cxboard_core::selection::stored_date(selection)),
        format!("Period:    {}", selection.granularity),
        format!("Category:  {}", selection.category),
        format!("Range:     {}", range.label()),
    ];
    if !persisting {
        lines.push("(selection storage unavailable, not saved)".to_string());
    }
    lines.join("\n")
}

/// Hourly, daily and week-of-month series
pub fn format_trends(report: &DashboardReport, json: bool, no_color: bool) -> String {
    if json {
        let value = serde_json::json!({
            "key": report.anchor_key,
            "range": report.range,
            "trends": report.trends,
            "weekly": report.weekly,
        });
        return serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    }

    let mut sections = Vec::new();

    let max_hourly = report
        .trends
        .hourly_distribution
        .iter()
        .copied()
        .max()
        .unwrap_or(0);
    let mut hourly = new_table(&["Hour", "Calls", ""], no_color);
    for (hour, &calls) in report.trends.hourly_distribution.iter().enumerate() {
        if calls == 0 {
            continue;
        }
        hourly.add_row(Row::from(vec![
            format!("{:02}:00", hour),
            calls.to_string(),
            bar(calls, max_hourly, 30),
        ]));
    }
    if report.trends.is_empty() {
        sections.push(format!("No calls in {}.", report.range.label()));
    } else {
        sections.push(format!("Calls by hour ({})\n{}", report.range.label(), hourly));
    }

    if report.trends.daily.len() > 1 {
        let mut daily = new_table(&["Date", "Calls"], no_color);
        for day in &report.trends.daily {
            daily.add_row(Row::from(vec![
                day.date.format("%a %Y-%m-%d").to_string(),
                day.calls.to_string(),
            ]));
        }
        sections.push(format!("Calls by day\n{}", daily));
    }

    let mut weekly = new_table(&["Week", "Calls", "Resolved", "Escalated"], no_color);
    for bucket in &report.weekly {
        weekly.add_row(Row::from(vec![
            bucket.label.clone(),
            bucket.calls.to_string(),
            bucket.resolved.to_string(),
            bucket.escalated.to_string(),
        ]));
    }
    sections.push(format!("Calls by week of month\n{}", weekly));

    sections.join("\n\n")
}

// ============================================================================
// Utilities
// ============================================================================

fn bar(value: usize, max: usize, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (value * width).div_ceil(max);
    "#".repeat(len)
}

fn truncate(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        // Char-based so multi-byte text never splits
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cxboard_core::analytics::OutcomeThresholds;
    use cxboard_core::filter::filter_records;
    use cxboard_core::models::Intent;
    use cxboard_core::period::compute_range;
    use cxboard_core::store::RecordStore;

    fn oct_23() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 23).unwrap()
    }

    fn report_for(selection: PeriodSelection) -> DashboardReport {
        DashboardReport::compute(
            &RecordStore::builtin(),
            &selection,
            TimeOfDayBounds::default(),
            &OutcomeThresholds::default(),
            oct_23(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_period_flag() {
        assert_eq!(parse_period("Week").unwrap(), Granularity::Week);
        assert!(matches!(
            parse_period("fortnight"),
            Err(CliError::InvalidFlag { flag: "--period", .. })
        ));
    }

    #[test]
    fn test_parse_category_flag() {
        assert_eq!(
            parse_category("tnc").unwrap(),
            CategoryFilter::Intent(Intent::TermsRequests)
        );
        assert_eq!(parse_category("all").unwrap(), CategoryFilter::All);
        assert!(parse_category("billing").is_err());
    }

    #[test]
    fn test_parse_time_bounds() {
        assert!(parse_time_bounds(None, None).unwrap().is_full_day());
        assert!(parse_time_bounds(Some("22:00"), Some("06:00"))
            .unwrap()
            .wraps_midnight());
        assert!(matches!(
            parse_time_bounds(Some("9am"), None),
            Err(CliError::Core(CoreError::InvalidTimeOfDay { .. }))
        ));
        assert!(matches!(
            parse_time_bounds(None, Some("24:00")),
            Err(CliError::Core(CoreError::InvalidTimeOfDay { .. }))
        ));
    }

    #[test]
    fn test_describe_selection() {
        let week = PeriodSelection::new(Granularity::Week, oct_23(), CategoryFilter::All);
        let range = compute_range(&week).unwrap();
        assert_eq!(
            describe_selection(&week, &range),
            "week 2025-W43 (2025-10-19 to 2025-10-25), all intents"
        );

        let day = PeriodSelection::new(
            Granularity::Day,
            oct_23(),
            CategoryFilter::Intent(Intent::BalanceEnquiry),
        );
        let range = compute_range(&day).unwrap();
        assert_eq!(describe_selection(&day, &range), "day 2025-10-23, Balance Enquiry");
    }

    #[test]
    fn test_format_report_tiles() {
        let output = format_report(&report_for(PeriodSelection::default_for(oct_23())), false, true);
        assert!(output.contains("Total Calls:      15"));
        assert!(output.contains("Resolution Rate:  60%"));
        assert!(output.contains("Escalation Rate:  13%"));
        assert!(output.contains("Fraud Reporting"));
    }

    #[test]
    fn test_format_report_empty_period() {
        let empty_day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let output = format_report(&report_for(PeriodSelection::default_for(empty_day)), false, true);
        assert!(output.contains("Avg Duration:     0:00"));
        assert!(output.contains("No calls in this period."));
    }

    #[test]
    fn test_format_report_json() {
        let output = format_report(&report_for(PeriodSelection::default_for(oct_23())), true, false);
        assert!(output.starts_with('{'));
        assert!(output.contains("\"anchor_key\": \"2025-10-23\""));
    }

    #[test]
    fn test_format_calls_table() {
        let store = RecordStore::builtin();
        let range = compute_range(&PeriodSelection::default_for(oct_23())).unwrap();
        let records = filter_records(
            &store,
            &range,
            CategoryFilter::Intent(Intent::FraudReporting),
            TimeOfDayBounds::default(),
        );

        let output = format_calls_table(&records, false, true);
        assert!(output.contains("John Smith"));
        assert!(output.ends_with("2 calls"));

        let json = format_calls_table(&records, true, false);
        assert!(json.starts_with('['));
        assert!(json.contains("\"date\": \"2025-10-23 09:15\""));
    }

    #[test]
    fn test_format_calls_table_empty() {
        assert_eq!(format_calls_table(&[], false, false), "No calls found.");
    }

    #[test]
    fn test_format_selection_json() {
        let month = PeriodSelection::new(Granularity::Month, oct_23(), CategoryFilter::All);
        let range = compute_range(&month).unwrap();
        let output = format_selection(&month, &range, true, true);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["selectedDate"], "2025-10");
        assert_eq!(value["selectedPeriod"], "month");
        assert_eq!(value["selectedCategory"], "all");
    }

    #[test]
    fn test_format_trends_week() {
        let week = PeriodSelection::new(Granularity::Week, oct_23(), CategoryFilter::All);
        let output = format_trends(&report_for(week), false, true);
        assert!(output.contains("Calls by hour"));
        assert!(output.contains("Thu 2025-10-23"));
        assert!(output.contains("Week 4"));
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(0, 0, 10), "");
        assert_eq!(bar(5, 5, 10), "##########");
        assert_eq!(bar(1, 10, 10), "#");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello world", 20), "hello world");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("café au lait", 4), "caf…");
    }
}
