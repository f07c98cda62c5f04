use serde_json::json;
use std::collections::BTreeMap;

use super::{responsive, ChartControls, ChartId, ChartRenderer, EmptyDataset, Tally, COUNT_COLOR, SCORE_COLOR, TRANSPARENT};
use crate::model::ClaimRecord;
use crate::plot::Figure;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePoint {
    pub date: String,
    pub avg_score: f64,
    pub count: usize,
    pub high_risk_count: usize,
}

/// Per-day statistics, ascending by date. Records without a date are skipped.
pub fn aggregate_timeline(records: &[&ClaimRecord]) -> Vec<TimelinePoint> {
    // ISO dates sort lexicographically in calendar order
    let mut days: BTreeMap<&str, Tally> = BTreeMap::new();
    for r in records {
        let Some(date) = r.date_of_loss.as_deref().filter(|d| !d.is_empty()) else {
            continue;
        };
        days.entry(date).or_default().add(r.fraud_score, r.risk_level);
    }
    days.into_iter()
        .map(|(date, t)| TimelinePoint {
            date: date.to_string(),
            avg_score: t.mean(),
            count: t.count,
            high_risk_count: t.high,
        })
        .collect()
}

pub struct TimelineChart;

impl ChartRenderer for TimelineChart {
    type Series = Vec<TimelinePoint>;

    fn id(&self) -> ChartId {
        ChartId::Timeline
    }

    fn empty_message(&self) -> &'static str {
        "No timeline data available"
    }

    fn aggregate(&self, records: &[&ClaimRecord], _controls: &ChartControls) -> Result<Vec<TimelinePoint>, EmptyDataset> {
        let points = aggregate_timeline(records);
        if points.is_empty() {
            return Err(self.empty());
        }
        Ok(points)
    }

    fn figure(&self, points: &Vec<TimelinePoint>) -> Figure {
        let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
        let avg: Vec<f64> = points.iter().map(|p| p.avg_score).collect();
        let counts: Vec<usize> = points.iter().map(|p| p.count).collect();

        let score_line = json!({
            "x": dates,
            "y": avg,
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Avg Fraud Score",
            "yaxis": "y",
            "line": { "color": SCORE_COLOR, "width": 3 },
            "marker": { "size": 6 },
            "hovertemplate": "Date: %{x}<br>Avg Score: %{y:.2f}<extra></extra>"
        });
        let count_bars = json!({
            "x": dates,
            "y": counts,
            "type": "bar",
            "name": "Total Claims",
            "yaxis": "y2",
            "opacity": 0.6,
            "marker": { "color": COUNT_COLOR },
            "hovertemplate": "Date: %{x}<br>Claims: %{y}<extra></extra>"
        });

        Figure {
            data: vec![score_line, count_bars],
            layout: json!({
                "title": "Claims Timeline with Fraud Score Trends",
                "xaxis": { "title": "Date", "type": "date" },
                "yaxis": { "title": "Average Fraud Score", "side": "left", "color": SCORE_COLOR },
                "yaxis2": {
                    "title": "Number of Claims",
                    "side": "right",
                    "overlaying": "y",
                    "color": COUNT_COLOR
                },
                "showlegend": true,
                "height": 400,
                "margin": { "t": 50, "b": 50, "l": 60, "r": 60 },
                "hovermode": "x unified",
                "plot_bgcolor": TRANSPARENT
            }),
            config: responsive(),
        }
    }
}
