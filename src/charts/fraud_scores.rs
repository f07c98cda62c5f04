use serde_json::json;

use super::{ChartControls, ChartId, ChartRenderer, EmptyDataset, TRANSPARENT};
use crate::model::ClaimRecord;
use crate::plot::Figure;

/// Score thresholds marked on the histogram.
pub const HIGH_THRESHOLD: f64 = 6.0;
pub const CRITICAL_THRESHOLD: f64 = 10.0;
const BINS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct FraudScoreSeries {
    pub scores: Vec<f64>,
}

/// Histogram of raw scores; the engine does the binning.
pub struct FraudScoreChart;

impl ChartRenderer for FraudScoreChart {
    type Series = FraudScoreSeries;

    fn id(&self) -> ChartId {
        ChartId::FraudScore
    }

    fn empty_message(&self) -> &'static str {
        "No data available for current filters"
    }

    fn aggregate(&self, records: &[&ClaimRecord], _controls: &ChartControls) -> Result<FraudScoreSeries, EmptyDataset> {
        Ok(FraudScoreSeries {
            scores: records.iter().map(|r| r.fraud_score).collect(),
        })
    }

    fn figure(&self, series: &FraudScoreSeries) -> Figure {
        let trace = json!({
            "x": series.scores,
            "type": "histogram",
            "nbinsx": BINS,
            "opacity": 0.7,
            "marker": {
                "color": "rgba(66, 165, 245, 0.7)",
                "line": { "color": "rgba(66, 165, 245, 1)", "width": 1 }
            },
            "name": "Claims Count",
            "hovertemplate": "Score Range: %{x}<br>Count: %{y}<extra></extra>"
        });

        let marks = [(HIGH_THRESHOLD, "orange", "High Risk"), (CRITICAL_THRESHOLD, "red", "Critical Risk")];
        let shapes: Vec<_> = marks
            .iter()
            .map(|(x, color, _)| {
                json!({
                    "type": "line",
                    "x0": x, "x1": x, "y0": 0, "y1": 1,
                    "yref": "paper",
                    "line": { "color": color, "width": 2, "dash": "dash" }
                })
            })
            .collect();
        let annotations: Vec<_> = marks
            .iter()
            .map(|(x, color, text)| {
                json!({
                    "x": x, "y": 0.9, "yref": "paper",
                    "text": text, "showarrow": false,
                    "font": { "color": color, "size": 12 }
                })
            })
            .collect();

        Figure {
            data: vec![trace],
            layout: json!({
                "title": {
                    "text": "Distribution of Fraud Risk Scores",
                    "font": { "size": 16, "family": "Arial, sans-serif" }
                },
                "xaxis": { "title": "Fraud Risk Score", "gridcolor": "#e5e5e5" },
                "yaxis": { "title": "Number of Claims", "gridcolor": "#e5e5e5" },
                "showlegend": false,
                "height": 400,
                "margin": { "t": 50, "b": 50, "l": 60, "r": 30 },
                "shapes": shapes,
                "annotations": annotations,
                "plot_bgcolor": TRANSPARENT,
                "paper_bgcolor": TRANSPARENT
            }),
            config: json!({
                "responsive": true,
                "displayModeBar": true,
                "modeBarButtonsToRemove": ["pan2d", "lasso2d", "select2d"],
                "displaylogo": false
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::testutil::*;
    use crate::model::RiskLevel;

    #[test]
    fn test_scores_passed_through_in_order() {
        let records = vec![scored(3.5, RiskLevel::Low), scored(11.0, RiskLevel::Critical), scored(0.0, RiskLevel::Low)];
        let series = FraudScoreChart
            .aggregate(&refs(&records), &ChartControls::default())
            .unwrap();
        assert_eq!(series.scores, vec![3.5, 11.0, 0.0]);

        let fig = FraudScoreChart.figure(&series);
        assert_eq!(fig.data[0]["type"], "histogram");
        assert_eq!(fig.data[0]["nbinsx"], 30);
        assert_eq!(fig.layout["shapes"][0]["x0"], 6.0);
        assert_eq!(fig.layout["shapes"][1]["x0"], 10.0);
        assert_eq!(fig.layout["annotations"][1]["text"], "Critical Risk");
    }
}
