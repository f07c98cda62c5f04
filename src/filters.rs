use chrono::{Duration, NaiveDate};
use std::fmt;

use crate::model::{ClaimRecord, RiskLevel};

/// Date-range window selected in the `dateRange` control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    All,
    LastDays(u32),
}

impl DateRange {
    /// `"all"` or a whole number of days.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == "all" {
            return Some(DateRange::All);
        }
        value.parse().ok().map(DateRange::LastDays)
    }

    /// Earliest date kept by the window, inclusive.
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateRange::All => None,
            DateRange::LastDays(n) => today.checked_sub_signed(Duration::days(i64::from(*n))),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRange::All => f.write_str("all"),
            DateRange::LastDays(n) => write!(f, "{}", n),
        }
    }
}

/// Risk-level category selected in the `riskFilter` control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskFilter {
    #[default]
    All,
    Only(RiskLevel),
}

impl RiskFilter {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == "all" {
            return Some(RiskFilter::All);
        }
        RiskLevel::parse(value).map(RiskFilter::Only)
    }

    pub fn matches(&self, level: RiskLevel) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Only(wanted) => *wanted == level,
        }
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFilter::All => f.write_str("all"),
            RiskFilter::Only(level) => f.write_str(level.as_str()),
        }
    }
}

/// Filters applied uniformly to every chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterState {
    pub date_range: DateRange,
    pub risk: RiskFilter,
}

/// Keep the records that pass the date window, then the risk filter.
///
/// The result borrows from `records` and preserves their order. With a window
/// active, records without a parseable `date_of_loss` are dropped.
pub fn apply_filters<'a>(
    records: &'a [ClaimRecord],
    filters: &FilterState,
    today: NaiveDate,
) -> Vec<&'a ClaimRecord> {
    let cutoff = filters.date_range.cutoff(today);
    let dated: Vec<&ClaimRecord> = match (filters.date_range, cutoff) {
        (DateRange::All, _) => records.iter().collect(),
        (DateRange::LastDays(_), Some(cutoff)) => records
            .iter()
            .filter(|r| r.loss_date().map_or(false, |d| d >= cutoff))
            .collect(),
        // window reaches past the calendar's start; only dated records qualify
        (DateRange::LastDays(_), None) => records.iter().filter(|r| r.loss_date().is_some()).collect(),
    };
    dated.into_iter().filter(|r| filters.risk.matches(r.risk_level)).collect()
}
