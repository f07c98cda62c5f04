use serde_json::json;

use super::{responsive, ChartControls, ChartId, ChartRenderer, EmptyDataset, Groups, Tally, TRANSPARENT};
use crate::model::ClaimRecord;
use crate::plot::Figure;

pub const UNKNOWN_CLAIMANT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimantRow {
    pub name: String,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimantSeries {
    pub rows: Vec<ClaimantRow>,
    /// Selected limit; drives title and height even when fewer rows exist.
    pub limit: usize,
}

/// Claims per claimant, most frequent first, cut to `limit`.
pub fn aggregate_claimants(records: &[&ClaimRecord], limit: usize) -> Vec<ClaimantRow> {
    let mut groups: Groups<Tally> = Groups::new();
    for r in records {
        let name = r
            .claimant_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_CLAIMANT);
        groups.entry(name).add(r.fraud_score, r.risk_level);
    }
    let mut rows: Vec<ClaimantRow> = groups
        .into_entries()
        .into_iter()
        .map(|(name, t)| ClaimantRow {
            name,
            count: t.count,
            avg_score: t.mean(),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(limit);
    rows
}

pub struct ClaimantsChart;

impl ChartRenderer for ClaimantsChart {
    type Series = ClaimantSeries;

    fn id(&self) -> ChartId {
        ChartId::Claimants
    }

    fn empty_message(&self) -> &'static str {
        "No claimant data available"
    }

    fn aggregate(&self, records: &[&ClaimRecord], controls: &ChartControls) -> Result<ClaimantSeries, EmptyDataset> {
        Ok(ClaimantSeries {
            rows: aggregate_claimants(records, controls.claimant_limit),
            limit: controls.claimant_limit,
        })
    }

    fn figure(&self, series: &ClaimantSeries) -> Figure {
        let rows = &series.rows;
        let trace = json!({
            "x": rows.iter().map(|r| r.count).collect::<Vec<_>>(),
            "y": rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "type": "bar",
            "orientation": "h",
            "marker": {
                "color": rows.iter().map(|r| r.avg_score).collect::<Vec<_>>(),
                "colorscale": "Reds",
                "showscale": true,
                "colorbar": { "title": "Avg Fraud Score", "titleside": "right" },
                "line": { "color": "#333", "width": 1 }
            },
            "text": rows
                .iter()
                .map(|r| format!("{} claims ({:.1} avg)", r.count, r.avg_score))
                .collect::<Vec<_>>(),
            "textposition": "outside",
            "hovertemplate": "Claimant: %{y}<br>Claims: %{x}<br>Avg Score: %{marker.color:.1f}<extra></extra>"
        });

        Figure {
            data: vec![trace],
            layout: json!({
                "title": format!("Top {} Repeat Claimants", series.limit),
                "xaxis": { "title": "Number of Claims" },
                "yaxis": { "title": "Claimant Name", "automargin": true },
                "showlegend": false,
                "height": series.limit.saturating_mul(30).max(400),
                "margin": { "t": 50, "b": 50, "l": 200, "r": 80 },
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

    fn named(name: &str, score: f64) -> ClaimRecord {
        ClaimRecord {
            claimant_name: Some(name.to_string()),
            ..scored(score, RiskLevel::Medium)
        }
    }

    #[test]
    fn test_counts_and_means() {
        let records = vec![named("A", 5.0), named("A", 7.0), named("B", 3.0)];
        let rows = aggregate_claimants(&refs(&records), 10);
        assert_eq!(rows[0], ClaimantRow { name: "A".into(), count: 2, avg_score: 6.0 });
        assert_eq!(rows[1], ClaimantRow { name: "B".into(), count: 1, avg_score: 3.0 });

        let top = aggregate_claimants(&refs(&records), 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "A");
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = vec![named("Z", 1.0), named("Y", 1.0), named("X", 1.0), named("X", 2.0)];
        let names: Vec<String> = aggregate_claimants(&refs(&records), 10)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["X", "Z", "Y"]);
    }

    #[test]
    fn test_missing_name_grouped_as_unknown() {
        let records = vec![scored(1.0, RiskLevel::Low), named("", 3.0)];
        let rows = aggregate_claimants(&refs(&records), 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, UNKNOWN_CLAIMANT);
        assert_eq!(rows[0].count, 2);
    }

    #[test]
    fn test_figure_layout_follows_limit() {
        let records = vec![named("A", 5.0)];
        let controls = ChartControls {
            claimant_limit: 20,
            ..Default::default()
        };
        let series = ClaimantsChart.aggregate(&refs(&records), &controls).unwrap();
        let fig = ClaimantsChart.figure(&series);
        assert_eq!(fig.layout["title"], "Top 20 Repeat Claimants");
        assert_eq!(fig.layout["height"], 600);
        assert_eq!(fig.data[0]["text"][0], "1 claims (5.0 avg)");

        let series = ClaimantsChart.aggregate(&refs(&records), &ChartControls::default()).unwrap();
        assert_eq!(ClaimantsChart.figure(&series).layout["height"], 400);
    }

    #[test]
    fn test_height_saturates_for_huge_limit() {
        let series = ClaimantSeries {
            rows: Vec::new(),
            limit: usize::MAX,
        };
        assert_eq!(ClaimantsChart.figure(&series).layout["height"], usize::MAX);
    }
}
