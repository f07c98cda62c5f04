use serde_json::json;

use super::{responsive, ChartControls, ChartId, ChartRenderer, EmptyDataset, TRANSPARENT};
use crate::model::{ClaimRecord, RiskLevel};
use crate::plot::Figure;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeLagPoint {
    pub claim_number: String,
    pub days_to_report: i64,
    pub fraud_score: f64,
    pub risk_level: RiskLevel,
}

pub fn risk_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "#28a745",
        RiskLevel::Medium => "#17a2b8",
        RiskLevel::High => "#ffc107",
        RiskLevel::Critical => "#dc3545",
        RiskLevel::Unknown => "#666",
    }
}

/// Scatter points for records that report a delay.
pub fn aggregate_time_lag(records: &[&ClaimRecord]) -> Vec<TimeLagPoint> {
    records
        .iter()
        .filter_map(|r| {
            r.days_to_report.map(|days| TimeLagPoint {
                claim_number: r.claim_number.clone(),
                days_to_report: days,
                fraud_score: r.fraud_score,
                risk_level: r.risk_level,
            })
        })
        .collect()
}

pub struct TimeLagChart;

impl ChartRenderer for TimeLagChart {
    type Series = Vec<TimeLagPoint>;

    fn id(&self) -> ChartId {
        ChartId::TimeLag
    }

    fn empty_message(&self) -> &'static str {
        "No time lag data available"
    }

    fn aggregate(&self, records: &[&ClaimRecord], _controls: &ChartControls) -> Result<Vec<TimeLagPoint>, EmptyDataset> {
        let points = aggregate_time_lag(records);
        if points.is_empty() {
            return Err(self.empty());
        }
        Ok(points)
    }

    fn figure(&self, points: &Vec<TimeLagPoint>) -> Figure {
        let trace = json!({
            "x": points.iter().map(|p| p.days_to_report).collect::<Vec<_>>(),
            "y": points.iter().map(|p| p.fraud_score).collect::<Vec<_>>(),
            "mode": "markers",
            "type": "scatter",
            "marker": {
                "size": 8,
                "color": points.iter().map(|p| risk_color(p.risk_level)).collect::<Vec<_>>(),
                "opacity": 0.7,
                "line": { "color": "#333", "width": 1 }
            },
            "text": points
                .iter()
                .map(|p| format!(
                    "Claim: {}<br>Days to Report: {}<br>Fraud Score: {}<br>Risk: {}",
                    p.claim_number, p.days_to_report, p.fraud_score, p.risk_level
                ))
                .collect::<Vec<_>>(),
            "hovertemplate": "%{text}<extra></extra>",
            "showlegend": false
        });

        Figure {
            data: vec![trace],
            layout: json!({
                "title": "Reporting Delay vs Fraud Risk Correlation",
                "xaxis": { "title": "Days to Report Claim", "zeroline": true },
                "yaxis": { "title": "Fraud Risk Score", "zeroline": true },
                "showlegend": false,
                "height": 400,
                "margin": { "t": 50, "b": 50, "l": 60, "r": 30 },
                "plot_bgcolor": TRANSPARENT
            }),
            config: responsive(),
        }
    }
}
