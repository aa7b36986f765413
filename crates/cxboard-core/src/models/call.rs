//! Call record models
//!
//! The record wire shape mirrors the dashboard's mock data: durations as `M:SS`,
//! timestamps as naive local `YYYY-MM-DD HH:MM`, audio as `"available"`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::CoreError;

/// Timestamp layout used by call records
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// chrono lets a space match zero characters, so the layout is checked up front
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}$").expect("valid timestamp regex"));

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4}):([0-5]\d)$").expect("valid duration regex"));

/// Newtype for call record IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for CallId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for CallId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for CallId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Call purpose as classified by the voice agent
///
/// Declaration order is the dashboard's fixed category order, used for every
/// distribution and chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "Fraud Reporting")]
    FraudReporting,
    #[serde(rename = "Change Disputes")]
    ChangeDisputes,
    #[serde(rename = "Due Date Changes")]
    DueDateChanges,
    #[serde(rename = "Credit Report Disputes")]
    CreditReportDisputes,
    #[serde(rename = "Auto-pay Enrollment")]
    AutoPayEnrollment,
    #[serde(rename = "Balance Enquiry")]
    BalanceEnquiry,
    #[serde(rename = "Customer Trade Lines")]
    CustomerTradeLines,
    #[serde(rename = "T&C requests")]
    TermsRequests,
}

impl Intent {
    /// Every intent, in category order
    pub const ALL: [Intent; 8] = [
        Intent::FraudReporting,
        Intent::ChangeDisputes,
        Intent::DueDateChanges,
        Intent::CreditReportDisputes,
        Intent::AutoPayEnrollment,
        Intent::BalanceEnquiry,
        Intent::CustomerTradeLines,
        Intent::TermsRequests,
    ];

    /// Full label as shown in the call-history table
    pub fn label(&self) -> &'static str {
        match self {
            Intent::FraudReporting => "Fraud Reporting",
            Intent::ChangeDisputes => "Change Disputes",
            Intent::DueDateChanges => "Due Date Changes",
            Intent::CreditReportDisputes => "Credit Report Disputes",
            Intent::AutoPayEnrollment => "Auto-pay Enrollment",
            Intent::BalanceEnquiry => "Balance Enquiry",
            Intent::CustomerTradeLines => "Customer Trade Lines",
            Intent::TermsRequests => "T&C requests",
        }
    }

    /// Short label for chart axes
    pub fn short_label(&self) -> &'static str {
        match self {
            Intent::FraudReporting => "Fraud",
            Intent::ChangeDisputes => "Disputes",
            Intent::DueDateChanges => "Due Date",
            Intent::CreditReportDisputes => "Credit Report",
            Intent::AutoPayEnrollment => "Auto-pay",
            Intent::BalanceEnquiry => "Balance",
            Intent::CustomerTradeLines => "Trade Lines",
            Intent::TermsRequests => "T&C",
        }
    }

    /// Report-type slug used by the filter buttons
    pub fn slug(&self) -> &'static str {
        match self {
            Intent::FraudReporting => "fraud",
            Intent::ChangeDisputes => "disputes",
            Intent::DueDateChanges => "due-date",
            Intent::CreditReportDisputes => "credit-report",
            Intent::AutoPayEnrollment => "auto-pay",
            Intent::BalanceEnquiry => "balance",
            Intent::CustomerTradeLines => "customer-trade",
            Intent::TermsRequests => "tnc",
        }
    }

    /// Position in the fixed category order
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Intent {
    type Err = CoreError;

    /// Accepts the label (any case) or the slug
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Intent::ALL
            .into_iter()
            .find(|intent| {
                intent.label().eq_ignore_ascii_case(needle) || intent.slug() == needle
            })
            .ok_or_else(|| CoreError::UnknownIntent {
                input: s.to_string(),
            })
    }
}

/// Call length in whole seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallDuration(u32);

impl CallDuration {
    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u32 {
        self.0
    }

    /// Human form used on the KPI tiles, e.g. "1 min 37 s"
    pub fn human(&self) -> String {
        let (minutes, seconds) = (self.0 / 60, self.0 % 60);
        if minutes == 0 {
            format!("{} s", seconds)
        } else {
            format!("{} min {} s", minutes, seconds)
        }
    }
}

impl fmt::Display for CallDuration {
    /// `M:SS`
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for CallDuration {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDuration {
            input: s.to_string(),
        };
        let caps = DURATION_RE.captures(s.trim()).ok_or_else(invalid)?;
        let minutes: u32 = caps[1].parse().map_err(|_| invalid())?;
        let seconds: u32 = caps[2].parse().map_err(|_| invalid())?;
        Ok(Self(minutes * 60 + seconds))
    }
}

/// Parse a record timestamp (`YYYY-MM-DD HH:MM`, naive local time)
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, CoreError> {
    let invalid = || CoreError::InvalidTimestamp {
        input: s.to_string(),
    };
    if !TIMESTAMP_RE.is_match(s) {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|_| invalid())
}

/// A single voice-agent call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCallRecord", into = "RawCallRecord")]
pub struct CallRecord {
    pub id: CallId,
    pub caller: String,
    pub agent: String,
    pub duration: CallDuration,
    pub intent: Intent,
    /// Minute precision, naive local time
    pub timestamp: NaiveDateTime,
    pub has_audio: bool,
    pub transcript: String,
}

impl CallRecord {
    pub fn duration_seconds(&self) -> u32 {
        self.duration.as_secs()
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Minutes since local midnight
    pub fn minute_of_day(&self) -> u32 {
        self.timestamp.hour() * 60 + self.timestamp.minute()
    }

    /// Timestamp in record layout
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Record as stored in JSON record files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCallRecord {
    pub id: String,
    pub caller: String,
    pub agent: String,
    pub duration: String,
    pub intent: String,
    #[serde(default)]
    pub audio: String,
    #[serde(default)]
    pub transcript: String,
    pub date: String,
}

impl TryFrom<RawCallRecord> for CallRecord {
    type Error = CoreError;

    fn try_from(raw: RawCallRecord) -> Result<Self, Self::Error> {
        Ok(CallRecord {
            duration: raw.duration.parse()?,
            intent: raw.intent.parse()?,
            timestamp: parse_timestamp(&raw.date)?,
            has_audio: raw.audio.eq_ignore_ascii_case("available"),
            id: CallId::from(raw.id),
            caller: raw.caller,
            agent: raw.agent,
            transcript: raw.transcript,
        })
    }
}

impl From<CallRecord> for RawCallRecord {
    fn from(record: CallRecord) -> Self {
        RawCallRecord {
            duration: record.duration.to_string(),
            intent: record.intent.label().to_string(),
            audio: if record.has_audio {
                "available".to_string()
            } else {
                "unavailable".to_string()
            },
            date: record.timestamp_display(),
            id: record.id.as_str().to_string(),
            caller: record.caller,
            agent: record.agent,
            transcript: record.transcript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parse() {
        assert_eq!("2:34".parse::<CallDuration>().unwrap().as_secs(), 154);
        assert_eq!("0:07".parse::<CallDuration>().unwrap().as_secs(), 7);
        assert_eq!("12:00".parse::<CallDuration>().unwrap().as_secs(), 720);
    }

    #[test]
    fn test_duration_rejects_malformed() {
        assert!("2:7".parse::<CallDuration>().is_err());
        assert!("2:60".parse::<CallDuration>().is_err());
        assert!("154".parse::<CallDuration>().is_err());
        assert!("-1:30".parse::<CallDuration>().is_err());
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(CallDuration::from_secs(141).to_string(), "2:21");
        assert_eq!(CallDuration::from_secs(0).to_string(), "0:00");
        assert_eq!(CallDuration::from_secs(97).human(), "1 min 37 s");
        assert_eq!(CallDuration::from_secs(42).human(), "42 s");
    }

    #[test]
    fn test_intent_parse_label_and_slug() {
        assert_eq!(
            "Auto-pay enrollment".parse::<Intent>().unwrap(),
            Intent::AutoPayEnrollment
        );
        assert_eq!("tnc".parse::<Intent>().unwrap(), Intent::TermsRequests);
        assert_eq!(
            "fraud reporting".parse::<Intent>().unwrap(),
            Intent::FraudReporting
        );
        assert!("Mortgage".parse::<Intent>().is_err());
    }

    #[test]
    fn test_intent_order_matches_index() {
        for (i, intent) in Intent::ALL.iter().enumerate() {
            assert_eq!(intent.index(), i);
        }
    }

    #[test]
    fn test_timestamp_requires_space() {
        assert!(parse_timestamp("2025-10-24 11:30").is_ok());
        assert!(matches!(
            parse_timestamp("2025-10-2411:30"),
            Err(CoreError::InvalidTimestamp { .. })
        ));
        assert!(parse_timestamp("2025-02-30 10:00").is_err());
    }

    #[test]
    fn test_record_json_roundtrip_shape() {
        let json = r#"{
            "id": "7",
            "caller": "Robert Taylor",
            "agent": "AI Agent 3",
            "duration": "2:45",
            "intent": "Customer Trade Lines",
            "audio": "available",
            "transcript": "Trade line request.",
            "date": "2025-10-23 15:30"
        }"#;
        let record: CallRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.duration_seconds(), 165);
        assert_eq!(record.intent, Intent::CustomerTradeLines);
        assert!(record.has_audio);
        assert_eq!(record.minute_of_day(), 15 * 60 + 30);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["duration"], "2:45");
        assert_eq!(value["date"], "2025-10-23 15:30");
    }
}
