//! Page controls and the events they emit.

use serde::Deserialize;

use crate::charts::DEFAULT_CLAIMANT_LIMIT;

pub const DATE_RANGE: &str = "dateRange";
pub const RISK_FILTER: &str = "riskFilter";
pub const REFRESH_CHARTS: &str = "refreshCharts";
pub const CLAIMANT_LIMIT: &str = "claimantLimit";
pub const MAP_METRIC: &str = "mapMetric";

/// One user interaction, tagged by the id of the control that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "control")]
pub enum ControlEvent {
    #[serde(rename = "dateRange")]
    DateRange { value: String },
    #[serde(rename = "riskFilter")]
    RiskFilter { value: String },
    #[serde(rename = "refreshCharts")]
    RefreshCharts,
    #[serde(rename = "claimantLimit")]
    ClaimantLimit { value: String },
    #[serde(rename = "mapMetric")]
    MapMetric { value: String },
    /// Download button under a chart; `chart` is the mount point id.
    #[serde(rename = "download")]
    Download { chart: String },
}

impl ControlEvent {
    /// Shorthand form `control=value`, or a bare `refreshCharts`.
    pub fn parse_pair(input: &str) -> Option<Self> {
        let input = input.trim();
        let (control, value) = match input.split_once('=') {
            Some((c, v)) => (c.trim(), v.trim().to_string()),
            None => (input, String::new()),
        };
        match control {
            DATE_RANGE => Some(ControlEvent::DateRange { value }),
            RISK_FILTER => Some(ControlEvent::RiskFilter { value }),
            REFRESH_CHARTS if value.is_empty() => Some(ControlEvent::RefreshCharts),
            CLAIMANT_LIMIT => Some(ControlEvent::ClaimantLimit { value }),
            MAP_METRIC => Some(ControlEvent::MapMetric { value }),
            "download" if !value.is_empty() => Some(ControlEvent::Download { chart: value }),
            _ => None,
        }
    }

    /// Accepts a JSON object line or the `control=value` shorthand.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.starts_with('{') {
            serde_json::from_str(line).ok()
        } else {
            Self::parse_pair(line)
        }
    }

    pub fn control_id(&self) -> &'static str {
        match self {
            ControlEvent::DateRange { .. } => DATE_RANGE,
            ControlEvent::RiskFilter { .. } => RISK_FILTER,
            ControlEvent::RefreshCharts => REFRESH_CHARTS,
            ControlEvent::ClaimantLimit { .. } => CLAIMANT_LIMIT,
            ControlEvent::MapMetric { .. } => MAP_METRIC,
            ControlEvent::Download { .. } => "download",
        }
    }
}

/// Largest limit the claimants chart accepts.
pub const MAX_CLAIMANT_LIMIT: usize = 100;

/// Limit from the `claimantLimit` select; anything but a positive integer means
/// the default, and larger values are capped at [`MAX_CLAIMANT_LIMIT`].
pub fn parse_claimant_limit(value: &str) -> usize {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => n.min(MAX_CLAIMANT_LIMIT),
        _ => DEFAULT_CLAIMANT_LIMIT,
    }
}

pub const REFRESH_IDLE_LABEL: &str = "Refresh Charts";
pub const REFRESH_BUSY_LABEL: &str = "Refreshing...";

/// State of the refresh button. Disabled while a reload is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshButton {
    pub disabled: bool,
    pub label: &'static str,
}

impl Default for RefreshButton {
    fn default() -> Self {
        Self {
            disabled: false,
            label: REFRESH_IDLE_LABEL,
        }
    }
}

impl RefreshButton {
    /// Returns false if a reload is already running.
    pub fn begin(&mut self) -> bool {
        if self.disabled {
            return false;
        }
        self.disabled = true;
        self.label = REFRESH_BUSY_LABEL;
        true
    }

    pub fn finish(&mut self) {
        self.disabled = false;
        self.label = REFRESH_IDLE_LABEL;
    }
}
