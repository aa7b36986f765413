//! Period normalizer
//!
//! Turns an anchor date plus a granularity into a concrete half-open range
//! `[start, end)` of naive local date-times.
//!
//! Weeks follow the dashboard's own numbering, not ISO-8601:
//! `week = ceil((day_of_year0 + weekday(Jan 1) + 1) / 7)` with weekdays counted from
//! Sunday = 0. Every week therefore runs Sunday to Saturday and week 1 is the one
//! containing January 1st.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::PeriodSelection;

static DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid day regex"));
static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("valid month regex"));
static WEEK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-W(\d{2})$").expect("valid week regex"));

/// Highest week number the formula can produce (Dec 31 of a leap year starting on Saturday)
pub const MAX_WEEK: u32 = 54;

/// Bucket size of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            _ => Err(CoreError::InvalidGranularity {
                input: s.to_string(),
            }),
        }
    }
}

/// Half-open range of local date-times `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    /// Range covering whole calendar days `first..=last`
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Result<Self, CoreError> {
        if last < first {
            return Err(CoreError::invalid_date(
                last.to_string(),
                format!("range ends before it starts ({})", first),
            ));
        }
        let end = last
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| CoreError::invalid_date(last.to_string(), "out of calendar range"))?;
        Ok(Self {
            start: first.and_time(NaiveTime::MIN),
            end: end.and_time(NaiveTime::MIN),
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        self.start <= *timestamp && *timestamp < self.end
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date()
    }

    /// Last calendar day touched by the range
    pub fn last_day(&self) -> NaiveDate {
        (self.end - Duration::minutes(1)).date()
    }

    pub fn num_days(&self) -> i64 {
        (self.last_day() - self.first_day()).num_days() + 1
    }

    /// Every calendar day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }

    /// Short human label, e.g. "2025-10-23" or "2025-10-19 to 2025-10-25"
    pub fn label(&self) -> String {
        if self.num_days() == 1 {
            self.first_day().to_string()
        } else {
            format!("{} to {}", self.first_day(), self.last_day())
        }
    }
}

/// Weekday of January 1st, Sunday = 0
fn jan1_weekday(year: i32) -> Option<(NaiveDate, u32)> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    Some((jan1, jan1.weekday().num_days_from_sunday()))
}

/// Dashboard week number of a date within its own year
pub fn week_number(date: NaiveDate) -> u32 {
    let first_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.ordinal0() + first_weekday + 1).div_ceil(7)
}

/// Number of dashboard weeks in `year` (53 or 54)
pub fn weeks_in_year(year: i32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, 12, 31).map(week_number)
}

/// First day (a Sunday) of the given dashboard week
///
/// Week 1 may start in the previous calendar year. Weeks past the one holding
/// 31 December of `year` are rejected.
pub fn date_from_week(year: i32, week: u32) -> Result<NaiveDate, CoreError> {
    let input = format!("{:04}-W{:02}", year, week);
    if !(1..=MAX_WEEK).contains(&week) {
        return Err(CoreError::invalid_date(
            input,
            format!("week must be between 1 and {}", MAX_WEEK),
        ));
    }
    let last_week = weeks_in_year(year)
        .ok_or_else(|| CoreError::invalid_date(&input, "year out of range"))?;
    if week > last_week {
        return Err(CoreError::invalid_date(
            input,
            format!("{} has {} weeks", year, last_week),
        ));
    }
    let (jan1, first_weekday) =
        jan1_weekday(year).ok_or_else(|| CoreError::invalid_date(&input, "year out of range"))?;
    let offset = (week as i64 - 1) * 7 - first_weekday as i64;
    jan1.checked_add_signed(Duration::days(offset))
        .ok_or_else(|| CoreError::invalid_date(input, "out of calendar range"))
}

/// Sunday starting the week that contains `date`
pub fn week_start(date: NaiveDate) -> Result<NaiveDate, CoreError> {
    date_from_week(date.year(), week_number(date))
}

/// Week of the month, same formula relative to the 1st of the month
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_weekday = date
        .with_day(1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.day0() + first_weekday + 1).div_ceil(7)
}

/// Number of dashboard weeks touching the month of `date`
pub fn weeks_in_month(date: NaiveDate) -> u32 {
    let last = date
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    week_of_month(last)
}

/// Concrete range for a selection
pub fn compute_range(selection: &PeriodSelection) -> Result<DateRange, CoreError> {
    range_for(selection.anchor, selection.granularity)
}

/// Concrete range for an anchor date at a granularity
pub fn range_for(anchor: NaiveDate, granularity: Granularity) -> Result<DateRange, CoreError> {
    let overflow = || CoreError::invalid_date(anchor.to_string(), "out of calendar range");

    let (first, next) = match granularity {
        Granularity::Day => (anchor, anchor.succ_opt().ok_or_else(overflow)?),
        Granularity::Week => {
            let start = week_start(anchor)?;
            let next = start
                .checked_add_signed(Duration::days(7))
                .ok_or_else(overflow)?;
            (start, next)
        }
        Granularity::Month => {
            let first = anchor.with_day(1).ok_or_else(overflow)?;
            let next = first
                .checked_add_months(Months::new(1))
                .ok_or_else(overflow)?;
            (first, next)
        }
    };

    Ok(DateRange {
        start: first.and_time(NaiveTime::MIN),
        end: next.and_time(NaiveTime::MIN),
    })
}

/// Parse a user or stored anchor string for a granularity
///
/// - Day: `YYYY-MM-DD`
/// - Week: `YYYY-Www`, or a `YYYY-MM-DD` date inside the week
/// - Month: `YYYY-MM`, or a `YYYY-MM-DD` date (moved to the 1st)
pub fn parse_anchor(text: &str, granularity: Granularity) -> Result<NaiveDate, CoreError> {
    let text = text.trim();

    if DAY_RE.is_match(text) {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| CoreError::invalid_date(text, e.to_string()))?;
        return Ok(match granularity {
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Day | Granularity::Week => date,
        });
    }

    match granularity {
        Granularity::Month => {
            let caps = MONTH_RE
                .captures(text)
                .ok_or_else(|| CoreError::invalid_date(text, "expected YYYY-MM"))?;
            let year: i32 = caps[1]
                .parse()
                .map_err(|_| CoreError::invalid_date(text, "bad year"))?;
            let month: u32 = caps[2]
                .parse()
                .map_err(|_| CoreError::invalid_date(text, "bad month"))?;
            NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| CoreError::invalid_date(text, "month out of range"))
        }
        Granularity::Week => {
            let caps = WEEK_RE
                .captures(text)
                .ok_or_else(|| CoreError::invalid_date(text, "expected YYYY-Www or YYYY-MM-DD"))?;
            let year: i32 = caps[1]
                .parse()
                .map_err(|_| CoreError::invalid_date(text, "bad year"))?;
            let week: u32 = caps[2]
                .parse()
                .map_err(|_| CoreError::invalid_date(text, "bad week"))?;
            let start = date_from_week(year, week)?;
            // Week 1 can start in December; keep the anchor inside the named year
            let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| CoreError::invalid_date(text, "year out of range"))?;
            Ok(start.max(jan1))
        }
        Granularity::Day => Err(CoreError::invalid_date(text, "expected YYYY-MM-DD")),
    }
}

/// Canonical key of the bucket holding `anchor`
pub fn anchor_key(anchor: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => anchor.format("%Y-%m-%d").to_string(),
        Granularity::Week => format!("{:04}-W{:02}", anchor.year(), week_number(anchor)),
        Granularity::Month => anchor.format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryFilter;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_day_range_is_24_hours_from_midnight() {
        for anchor in [date(2025, 10, 23), date(2024, 2, 29), date(2025, 12, 31)] {
            let range = range_for(anchor, Granularity::Day).unwrap();
            assert_eq!(range.start(), anchor.and_time(NaiveTime::MIN));
            assert_eq!(range.end() - range.start(), Duration::hours(24));
            assert_eq!(range.num_days(), 1);
        }
    }

    #[test]
    fn test_month_range_spans_calendar_month() {
        let cases = [
            (date(2025, 2, 14), 28),
            (date(2024, 2, 1), 29),
            (date(2025, 4, 30), 30),
            (date(2025, 12, 5), 31),
        ];
        for (anchor, days) in cases {
            let range = range_for(anchor, Granularity::Month).unwrap();
            assert_eq!(range.first_day(), anchor.with_day(1).unwrap());
            assert_eq!(range.num_days(), days, "month of {}", anchor);
            assert_eq!(range.end().date().day(), 1);
        }
    }

    #[test]
    fn test_week_number_formula() {
        // 2025-01-01 is a Wednesday (weekday 3)
        assert_eq!(week_number(date(2025, 1, 1)), 1);
        assert_eq!(week_number(date(2025, 1, 4)), 1);
        assert_eq!(week_number(date(2025, 1, 5)), 2);
        // 2025-10-23 is day 295 (0-based): ceil((295 + 3 + 1) / 7) = 43
        assert_eq!(week_number(date(2025, 10, 23)), 43);
        // 2028 is a leap year starting on a Saturday
        assert_eq!(week_number(date(2028, 12, 31)), MAX_WEEK);
    }

    #[test]
    fn test_week_range_runs_sunday_to_saturday() {
        let range = range_for(date(2025, 10, 23), Granularity::Week).unwrap();
        assert_eq!(range.first_day(), date(2025, 10, 19));
        assert_eq!(range.last_day(), date(2025, 10, 25));
        assert_eq!(range.num_days(), 7);
        assert!(range.contains(&at(2025, 10, 25, 23, 59)));
        assert!(!range.contains(&at(2025, 10, 26, 0, 0)));
    }

    #[test]
    fn test_week_one_starts_in_previous_year() {
        assert_eq!(date_from_week(2025, 1).unwrap(), date(2024, 12, 29));
        let range = range_for(date(2025, 1, 2), Granularity::Week).unwrap();
        assert_eq!(range.first_day(), date(2024, 12, 29));
    }

    #[test]
    fn test_week_roundtrip_stays_in_bucket() {
        let mut day = date(2023, 1, 1);
        while day <= date(2026, 12, 31) {
            let start = date_from_week(day.year(), week_number(day)).unwrap();
            let gap = (day - start).num_days();
            assert!((0..=6).contains(&gap), "{} -> {}", day, start);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_date_from_week_rejects_bad_weeks() {
        assert!(matches!(
            date_from_week(2025, 0),
            Err(CoreError::InvalidDate { .. })
        ));
        assert!(date_from_week(2025, MAX_WEEK + 1).is_err());
    }

    #[test]
    fn test_week_bounded_by_year_length() {
        assert_eq!(weeks_in_year(2025), Some(53));
        assert_eq!(weeks_in_year(2026), Some(53));
        assert_eq!(weeks_in_year(2028), Some(MAX_WEEK));

        for (year, week) in [(2026, 54), (2025, 54)] {
            assert!(
                matches!(
                    date_from_week(year, week),
                    Err(CoreError::InvalidDate { .. })
                ),
                "{}-W{}",
                year,
                week
            );
        }
        assert!(parse_anchor("2026-W54", Granularity::Week).is_err());

        assert_eq!(date_from_week(2025, 53).unwrap(), date(2025, 12, 28));
        assert_eq!(date_from_week(2028, 54).unwrap(), date(2028, 12, 31));
    }

    #[test]
    fn test_week_of_month() {
        // 2025-10-01 is a Wednesday
        assert_eq!(week_of_month(date(2025, 10, 1)), 1);
        assert_eq!(week_of_month(date(2025, 10, 4)), 1);
        assert_eq!(week_of_month(date(2025, 10, 5)), 2);
        assert_eq!(week_of_month(date(2025, 10, 23)), 4);
        assert_eq!(weeks_in_month(date(2025, 10, 23)), 5);
    }

    #[test]
    fn test_parse_anchor_per_granularity() {
        assert_eq!(
            parse_anchor("2025-10-23", Granularity::Day).unwrap(),
            date(2025, 10, 23)
        );
        assert_eq!(
            parse_anchor("2025-10", Granularity::Month).unwrap(),
            date(2025, 10, 1)
        );
        assert_eq!(
            parse_anchor("2025-10-23", Granularity::Month).unwrap(),
            date(2025, 10, 1)
        );
        assert_eq!(
            parse_anchor("2025-W43", Granularity::Week).unwrap(),
            date(2025, 10, 19)
        );
        assert_eq!(
            parse_anchor("2025-W01", Granularity::Week).unwrap(),
            date(2025, 1, 1)
        );
    }

    #[test]
    fn test_parse_anchor_rejects_garbage() {
        for (text, granularity) in [
            ("2025-10", Granularity::Day),
            ("2025-13", Granularity::Month),
            ("2025-02-30", Granularity::Day),
            ("2025-W60", Granularity::Week),
            ("yesterday", Granularity::Week),
            ("", Granularity::Day),
        ] {
            assert!(
                matches!(
                    parse_anchor(text, granularity),
                    Err(CoreError::InvalidDate { .. })
                ),
                "{:?} as {}",
                text,
                granularity
            );
        }
    }

    #[test]
    fn test_anchor_key_formats() {
        let anchor = date(2025, 10, 23);
        assert_eq!(anchor_key(anchor, Granularity::Day), "2025-10-23");
        assert_eq!(anchor_key(anchor, Granularity::Week), "2025-W43");
        assert_eq!(anchor_key(anchor, Granularity::Month), "2025-10");
        assert_eq!(anchor_key(date(2025, 1, 3), Granularity::Week), "2025-W01");
    }

    #[test]
    fn test_compute_range_overflow_is_invalid_date() {
        let selection = PeriodSelection::new(Granularity::Day, NaiveDate::MAX, CategoryFilter::All);
        assert!(matches!(
            compute_range(&selection),
            Err(CoreError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_range_days_iterates_in_order() {
        let range = DateRange::from_days(date(2025, 10, 30), date(2025, 11, 2)).unwrap();
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(
            days,
            vec![
                date(2025, 10, 30),
                date(2025, 10, 31),
                date(2025, 11, 1),
                date(2025, 11, 2)
            ]
        );
        assert_eq!(range.label(), "2025-10-30 to 2025-11-02");
        assert!(DateRange::from_days(date(2025, 11, 2), date(2025, 10, 30)).is_err());
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("Week".parse::<Granularity>().unwrap(), Granularity::Week);
        assert!("quarter".parse::<Granularity>().is_err());
    }
}
