//! Aggregators and renderers, one submodule per dashboard chart.
//!
//! Each chart turns the filtered records of its category into a series, then
//! the series into a Plotly [`Figure`]. Both steps are pure; only
//! [`ChartRenderer::render`] touches the engine.

use anyhow::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

use crate::model::{ChartCategory, ClaimRecord, RiskLevel};
use crate::plot::{Figure, PlotEngine};

pub mod claimants;
pub mod fraud_scores;
pub mod geographic;
pub mod indicators;
pub mod injuries;
pub mod time_lag;
pub mod timeline;

pub use claimants::{ClaimantRow, ClaimantSeries, ClaimantsChart};
pub use fraud_scores::{FraudScoreChart, FraudScoreSeries};
pub use geographic::{GeoSeries, MapChart, MapMetric, StateRow};
pub use indicators::{clean_flag, IndicatorRow, IndicatorsChart};
pub use injuries::{InjuryChart, InjuryRow};
pub use time_lag::{TimeLagChart, TimeLagPoint};
pub use timeline::{TimelineChart, TimelinePoint};

pub const DEFAULT_CLAIMANT_LIMIT: usize = 10;

/// Mount points of the dashboard, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartId {
    FraudScore,
    Timeline,
    Claimants,
    Indicators,
    Injury,
    TimeLag,
    Map,
}

impl ChartId {
    pub const ALL: [ChartId; 7] = [
        ChartId::FraudScore,
        ChartId::Timeline,
        ChartId::Claimants,
        ChartId::Indicators,
        ChartId::Injury,
        ChartId::TimeLag,
        ChartId::Map,
    ];

    pub fn container(&self) -> &'static str {
        match self {
            ChartId::FraudScore => "fraudScoreChart",
            ChartId::Timeline => "timelineChart",
            ChartId::Claimants => "claimantsChart",
            ChartId::Indicators => "indicatorsChart",
            ChartId::Injury => "injuryChart",
            ChartId::TimeLag => "timeLagChart",
            ChartId::Map => "mapChart",
        }
    }

    pub fn from_container(container: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.container() == container)
    }

    pub fn category(&self) -> ChartCategory {
        match self {
            ChartId::FraudScore => ChartCategory::FraudScores,
            ChartId::Timeline => ChartCategory::Timeline,
            ChartId::Claimants => ChartCategory::Claimants,
            ChartId::Indicators => ChartCategory::Indicators,
            ChartId::Injury => ChartCategory::Injuries,
            ChartId::TimeLag => ChartCategory::TimeLag,
            ChartId::Map => ChartCategory::Geographic,
        }
    }

    pub fn containers() -> Vec<&'static str> {
        Self::ALL.iter().map(ChartId::container).collect()
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container())
    }
}

/// Per-chart control values, read at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartControls {
    pub claimant_limit: usize,
    pub map_metric: MapMetric,
}

impl Default for ChartControls {
    fn default() -> Self {
        Self {
            claimant_limit: DEFAULT_CLAIMANT_LIMIT,
            map_metric: MapMetric::Count,
        }
    }
}

/// Nothing left to draw after filtering. A terminal branch, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyDataset {
    pub message: &'static str,
}

pub trait ChartRenderer {
    type Series;

    fn id(&self) -> ChartId;

    /// Placeholder text when no filtered records survive.
    fn empty_message(&self) -> &'static str;

    /// Build the series from a non-empty filtered slice.
    fn aggregate(&self, records: &[&ClaimRecord], controls: &ChartControls) -> Result<Self::Series, EmptyDataset>;

    fn figure(&self, series: &Self::Series) -> Figure;

    /// Hand the figure to the engine, replacing the container's contents.
    fn render(&self, container: &str, series: &Self::Series, engine: &mut dyn PlotEngine) -> Result<Figure> {
        let figure = self.figure(series);
        engine.new_plot(container, &figure)?;
        Ok(figure)
    }

    fn empty(&self) -> EmptyDataset {
        EmptyDataset {
            message: self.empty_message(),
        }
    }
}

/// What a render pass produced for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Live(Figure),
    Empty(&'static str),
    Failed(String),
}

/// Aggregate, then render or fall into the empty state. Empty never reaches the engine's plot call.
pub fn draw<R: ChartRenderer>(
    renderer: &R,
    records: &[&ClaimRecord],
    controls: &ChartControls,
    engine: &mut dyn PlotEngine,
) -> RenderOutcome {
    let container = renderer.id().container();
    let series = if records.is_empty() {
        Err(renderer.empty())
    } else {
        renderer.aggregate(records, controls)
    };
    match series {
        Err(empty) => RenderOutcome::Empty(empty.message),
        Ok(series) => match renderer.render(container, &series, engine) {
            Ok(figure) => RenderOutcome::Live(figure),
            Err(err) => RenderOutcome::Failed(err.to_string()),
        },
    }
}

/// Dispatch a render to the chart behind `id`.
pub fn draw_chart(
    id: ChartId,
    records: &[&ClaimRecord],
    controls: &ChartControls,
    engine: &mut dyn PlotEngine,
) -> RenderOutcome {
    match id {
        ChartId::FraudScore => draw(&FraudScoreChart, records, controls, engine),
        ChartId::Timeline => draw(&TimelineChart, records, controls, engine),
        ChartId::Claimants => draw(&ClaimantsChart, records, controls, engine),
        ChartId::Indicators => draw(&IndicatorsChart, records, controls, engine),
        ChartId::Injury => draw(&InjuryChart, records, controls, engine),
        ChartId::TimeLag => draw(&TimeLagChart, records, controls, engine),
        ChartId::Map => draw(&MapChart, records, controls, engine),
    }
}

// =============================================================================
// Shared aggregation helpers
// =============================================================================

/// Running score/count/high-risk totals for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Tally {
    pub total: f64,
    pub count: usize,
    pub high: usize,
}

impl Tally {
    pub fn add(&mut self, score: f64, level: RiskLevel) {
        self.total += score;
        self.count += 1;
        if level.is_high() {
            self.high += 1;
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    pub fn high_pct(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.high as f64 / self.count as f64 * 100.0
        }
    }
}

/// Keyed groups that remember first-seen order, so stable sorts break ties by appearance.
#[derive(Debug)]
pub(crate) struct Groups<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T: Default> Groups<T> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn entry(&mut self, key: &str) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), T::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

// =============================================================================
// Shared style
// =============================================================================

pub(crate) const TRANSPARENT: &str = "rgba(0,0,0,0)";
pub(crate) const SCORE_COLOR: &str = "#ff6b6b";
pub(crate) const COUNT_COLOR: &str = "#4ecdc4";

pub(crate) fn responsive() -> Value {
    json!({ "responsive": true })
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::model::{ClaimRecord, RiskLevel};

    pub fn scored(score: f64, level: RiskLevel) -> ClaimRecord {
        ClaimRecord {
            fraud_score: score,
            risk_level: level,
            ..Default::default()
        }
    }

    pub fn refs(records: &[ClaimRecord]) -> Vec<&ClaimRecord> {
        records.iter().collect()
    }
}
