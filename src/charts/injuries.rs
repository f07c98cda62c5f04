use serde_json::json;

use super::{responsive, ChartControls, ChartId, ChartRenderer, EmptyDataset, Groups, Tally, COUNT_COLOR, SCORE_COLOR, TRANSPARENT};
use crate::model::ClaimRecord;
use crate::plot::Figure;

const TOP_INJURIES: usize = 20;
const LABEL_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct InjuryRow {
    /// Axis label, shortened to 30 characters plus `...`.
    pub label: String,
    pub full_label: String,
    pub count: usize,
    pub avg_score: f64,
    pub high_risk_pct: f64,
}

fn short_label(label: &str) -> String {
    if label.chars().count() > LABEL_CHARS {
        let head: String = label.chars().take(LABEL_CHARS).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

/// Injury types by mean score, highest first, top 20.
pub fn aggregate_injuries(records: &[&ClaimRecord]) -> Vec<InjuryRow> {
    let mut groups: Groups<Tally> = Groups::new();
    for r in records {
        let injury = r
            .injury_type
            .as_deref()
            .filter(|i| !i.is_empty())
            .unwrap_or("Unknown");
        groups.entry(injury).add(r.fraud_score, r.risk_level);
    }
    let mut rows: Vec<InjuryRow> = groups
        .into_entries()
        .into_iter()
        .map(|(injury, t)| InjuryRow {
            label: short_label(&injury),
            full_label: injury,
            count: t.count,
            avg_score: t.mean(),
            high_risk_pct: t.high_pct(),
        })
        .collect();
    rows.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
    rows.truncate(TOP_INJURIES);
    rows
}

pub struct InjuryChart;

impl ChartRenderer for InjuryChart {
    type Series = Vec<InjuryRow>;

    fn id(&self) -> ChartId {
        ChartId::Injury
    }

    fn empty_message(&self) -> &'static str {
        "No injury data available"
    }

    fn aggregate(&self, records: &[&ClaimRecord], _controls: &ChartControls) -> Result<Vec<InjuryRow>, EmptyDataset> {
        Ok(aggregate_injuries(records))
    }

    fn figure(&self, rows: &Vec<InjuryRow>) -> Figure {
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        let full: Vec<&str> = rows.iter().map(|r| r.full_label.as_str()).collect();
        let avg: Vec<f64> = rows.iter().map(|r| r.avg_score).collect();
        let counts: Vec<usize> = rows.iter().map(|r| r.count).collect();

        let score_bars = json!({
            "x": labels,
            "y": avg,
            "type": "bar",
            "name": "Avg Fraud Score",
            "marker": { "color": avg, "colorscale": "Reds", "showscale": false },
            "hovertemplate": "Injury: %{customdata}<br>Avg Score: %{y:.1f}<br>Claims: %{text}<extra></extra>",
            "customdata": full,
            "text": counts
        });
        let count_bars = json!({
            "x": labels,
            "y": counts,
            "type": "bar",
            "name": "Claims Count",
            "yaxis": "y2",
            "marker": { "color": "rgba(78, 205, 196, 0.6)" },
            "hovertemplate": "Injury: %{customdata}<br>Count: %{y}<extra></extra>",
            "customdata": full
        });

        Figure {
            data: vec![score_bars, count_bars],
            layout: json!({
                "title": "Injury Types vs Fraud Risk",
                "xaxis": { "title": "Injury Type", "tickangle": -45, "automargin": true },
                "yaxis": { "title": "Average Fraud Score", "color": SCORE_COLOR },
                "yaxis2": {
                    "title": "Number of Claims",
                    "overlaying": "y",
                    "side": "right",
                    "color": COUNT_COLOR
                },
                "showlegend": true,
                "height": 500,
                "margin": { "t": 50, "b": 120, "l": 60, "r": 60 },
                "plot_bgcolor": TRANSPARENT
            }),
            config: responsive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::testutil::*;
    use crate::model::RiskLevel;

    fn injured(kind: Option<&str>, score: f64, level: RiskLevel) -> ClaimRecord {
        ClaimRecord {
            injury_type: kind.map(str::to_string),
            ..scored(score, level)
        }
    }

    #[test]
    fn test_high_risk_percentage() {
        let records = vec![
            injured(Some("Whiplash"), 9.0, RiskLevel::High),
            injured(Some("Whiplash"), 12.0, RiskLevel::Critical),
            injured(Some("Whiplash"), 7.0, RiskLevel::High),
            injured(Some("Whiplash"), 2.0, RiskLevel::Low),
        ];
        let rows = aggregate_injuries(&refs(&records));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].high_risk_pct, 75.0);
        assert_eq!(rows[0].avg_score, 7.5);
        assert_eq!(rows[0].count, 4);
    }

    #[test]
    fn test_sorted_by_mean_and_unknown_default() {
        let records = vec![
            injured(Some("Sprain"), 2.0, RiskLevel::Low),
            injured(None, 9.0, RiskLevel::High),
            injured(Some(""), 7.0, RiskLevel::High),
            injured(Some("Fracture"), 6.0, RiskLevel::Medium),
        ];
        let rows = aggregate_injuries(&refs(&records));
        let labels: Vec<&str> = rows.iter().map(|r| r.full_label.as_str()).collect();
        assert_eq!(labels, vec!["Unknown", "Fracture", "Sprain"]);
        assert_eq!(rows[0].avg_score, 8.0);
    }

    #[test]
    fn test_long_labels_truncated_for_axis_only() {
        let long = "Soft tissue injury of the lower lumbar region";
        let records = vec![injured(Some(long), 3.0, RiskLevel::Low)];
        let rows = aggregate_injuries(&refs(&records));
        assert_eq!(rows[0].label, "Soft tissue injury of the lowe...");
        assert_eq!(rows[0].label.chars().count(), 33);
        assert_eq!(rows[0].full_label, long);

        let fig = InjuryChart.figure(&rows);
        assert_eq!(fig.data[0]["x"][0], "Soft tissue injury of the lowe...");
        assert_eq!(fig.data[0]["customdata"][0], long);
    }

    #[test]
    fn test_top_twenty() {
        let records: Vec<ClaimRecord> = (0..25)
            .map(|i| injured(Some(&format!("injury {}", i)), i as f64, RiskLevel::Low))
            .collect();
        let rows = aggregate_injuries(&refs(&records));
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].full_label, "injury 24");
    }
}
