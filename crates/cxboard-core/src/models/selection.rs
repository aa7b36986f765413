//! Period selection model: what bucket of calls the dashboard is looking at

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::call::Intent;
use crate::period::{self, Granularity};

/// Category filter applied on top of the period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Intent(Intent),
}

impl CategoryFilter {
    /// Check if a record with this intent passes the filter
    pub fn matches(&self, intent: Intent) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Intent(wanted) => *wanted == intent,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Intent(intent) => f.write_str(intent.label()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Intent)
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}

impl From<Intent> for CategoryFilter {
    fn from(intent: Intent) -> Self {
        CategoryFilter::Intent(intent)
    }
}

/// The dashboard's current selection: granularity, anchor date and category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSelection {
    pub granularity: Granularity,
    /// Reference date; for months this is always the 1st
    pub anchor: NaiveDate,
    pub category: CategoryFilter,
}

impl PeriodSelection {
    pub fn new(granularity: Granularity, anchor: NaiveDate, category: CategoryFilter) -> Self {
        Self {
            granularity,
            anchor,
            category,
        }
        .normalized()
    }

    /// Default selection on first load: today, by day, every category
    pub fn default_for(today: NaiveDate) -> Self {
        Self::new(Granularity::Day, today, CategoryFilter::All)
    }

    /// Parse a selection from its stored string forms
    pub fn parse(date: &str, granularity: &str, category: &str) -> Result<Self, CoreError> {
        let granularity: Granularity = granularity.parse()?;
        let anchor = period::parse_anchor(date, granularity)?;
        Ok(Self::new(granularity, anchor, category.parse()?))
    }

    /// Switch granularity, re-deriving the anchor
    ///
    /// Month keeps the year and month (anchor moves to the 1st); Day and Week keep the
    /// anchor date itself rather than a bucket start.
    pub fn with_granularity(self, granularity: Granularity) -> Self {
        Self::new(granularity, self.anchor, self.category)
    }

    pub fn with_anchor(self, anchor: NaiveDate) -> Self {
        Self::new(self.granularity, anchor, self.category)
    }

    pub fn with_category(self, category: CategoryFilter) -> Self {
        Self { category, ..self }
    }

    /// Canonical key of the selected bucket (`YYYY-MM-DD`, `YYYY-Www` or `YYYY-MM`)
    pub fn anchor_key(&self) -> String {
        period::anchor_key(self.anchor, self.granularity)
    }

    fn normalized(self) -> Self {
        match self.granularity {
            Granularity::Month => Self {
                anchor: self.anchor.with_day(1).unwrap_or(self.anchor),
                ..self
            },
            Granularity::Day | Granularity::Week => self,
        }
    }
}
