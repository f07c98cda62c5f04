use serde_json::json;
use std::fmt;

use super::{responsive, ChartControls, ChartId, ChartRenderer, EmptyDataset, Groups, Tally, TRANSPARENT};
use crate::model::ClaimRecord;
use crate::plot::Figure;

/// Value shaded on the choropleth, chosen with the `mapMetric` control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMetric {
    #[default]
    Count,
    AvgScore,
    HighRiskPct,
}

impl MapMetric {
    /// Unrecognized values fall back to the claim count.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "avg_score" => MapMetric::AvgScore,
            "high_risk_pct" => MapMetric::HighRiskPct,
            _ => MapMetric::Count,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MapMetric::Count => "count",
            MapMetric::AvgScore => "avg_score",
            MapMetric::HighRiskPct => "high_risk_pct",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MapMetric::Count => "Number of Claims",
            MapMetric::AvgScore => "Average Fraud Score",
            MapMetric::HighRiskPct => "High Risk Percentage",
        }
    }

    fn colorscale(&self) -> &'static str {
        match self {
            MapMetric::Count => "Blues",
            _ => "Reds",
        }
    }
}

impl fmt::Display for MapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateRow {
    pub state: String,
    pub count: usize,
    pub avg_score: f64,
    pub high_risk_count: usize,
    pub high_risk_pct: f64,
}

impl StateRow {
    pub fn value(&self, metric: MapMetric) -> f64 {
        match metric {
            MapMetric::Count => self.count as f64,
            MapMetric::AvgScore => self.avg_score,
            MapMetric::HighRiskPct => self.high_risk_pct,
        }
    }

    fn hover(&self, metric: MapMetric) -> String {
        match metric {
            MapMetric::Count => format!(
                "{}<br>Claims: {}<br>High Risk: {}",
                self.state, self.count, self.high_risk_count
            ),
            MapMetric::AvgScore => format!(
                "{}<br>Avg Score: {:.2}<br>Claims: {}",
                self.state, self.avg_score, self.count
            ),
            MapMetric::HighRiskPct => format!(
                "{}<br>High Risk %: {:.1}%<br>Claims: {}",
                self.state, self.high_risk_pct, self.count
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoSeries {
    pub metric: MapMetric,
    pub rows: Vec<StateRow>,
}

impl GeoSeries {
    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value(self.metric)).collect()
    }
}

fn known_state(state: Option<&str>) -> Option<&str> {
    state.filter(|s| !s.is_empty() && *s != "Unknown")
}

/// Per-state statistics in first-seen order. Records without a known state are dropped.
pub fn aggregate_states(records: &[&ClaimRecord]) -> Vec<StateRow> {
    let mut groups: Groups<Tally> = Groups::new();
    for r in records {
        if let Some(state) = known_state(r.state.as_deref()) {
            groups.entry(state).add(r.fraud_score, r.risk_level);
        }
    }
    groups
        .into_entries()
        .into_iter()
        .map(|(state, t)| StateRow {
            state,
            count: t.count,
            avg_score: t.mean(),
            high_risk_count: t.high,
            high_risk_pct: t.high_pct(),
        })
        .collect()
}

pub struct MapChart;

impl ChartRenderer for MapChart {
    type Series = GeoSeries;

    fn id(&self) -> ChartId {
        ChartId::Map
    }

    fn empty_message(&self) -> &'static str {
        "No geographic data available"
    }

    // A map with every state excluded still renders, as an empty choropleth.
    fn aggregate(&self, records: &[&ClaimRecord], controls: &ChartControls) -> Result<GeoSeries, EmptyDataset> {
        Ok(GeoSeries {
            metric: controls.map_metric,
            rows: aggregate_states(records),
        })
    }

    fn figure(&self, series: &GeoSeries) -> Figure {
        let metric = series.metric;
        let trace = json!({
            "type": "choropleth",
            "locationmode": "USA-states",
            "locations": series.rows.iter().map(|r| r.state.as_str()).collect::<Vec<_>>(),
            "z": series.values(),
            "text": series.rows.iter().map(|r| r.hover(metric)).collect::<Vec<_>>(),
            "colorscale": metric.colorscale(),
            "colorbar": { "title": { "text": metric.title(), "side": "right" } },
            "hovertemplate": "%{text}<extra></extra>"
        });

        Figure {
            data: vec![trace],
            layout: json!({
                "title": format!("Geographic Distribution: {}", metric.title()),
                "geo": {
                    "scope": "usa",
                    "projection": { "type": "albers usa" },
                    "showlakes": true,
                    "lakecolor": "rgb(255, 255, 255)",
                    "bgcolor": TRANSPARENT
                },
                "height": 500,
                "margin": { "t": 50, "b": 20, "l": 20, "r": 20 },
                "plot_bgcolor": TRANSPARENT,
                "paper_bgcolor": TRANSPARENT
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

    fn located(state: Option<&str>, score: f64, level: RiskLevel) -> ClaimRecord {
        ClaimRecord {
            state: state.map(str::to_string),
            ..scored(score, level)
        }
    }

    #[test]
    fn test_unknown_state_excluded_from_every_metric() {
        let records = vec![
            located(Some("TX"), 4.0, RiskLevel::High),
            located(Some("Unknown"), 100.0, RiskLevel::Critical),
            located(None, 100.0, RiskLevel::Critical),
            located(Some(""), 100.0, RiskLevel::Critical),
            located(Some("TX"), 2.0, RiskLevel::Low),
            located(Some("CA"), 9.0, RiskLevel::Critical),
        ];
        let rows = aggregate_states(&refs(&records));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, "TX");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].avg_score, 3.0);
        assert_eq!(rows[0].high_risk_pct, 50.0);
        assert_eq!(rows[1].state, "CA");
        assert!(rows.iter().all(|r| r.state != "Unknown"));
    }

    #[test]
    fn test_metric_selects_values_and_scale() {
        let records = vec![
            located(Some("NY"), 6.0, RiskLevel::High),
            located(Some("NY"), 2.0, RiskLevel::Low),
        ];
        for (metric, value, scale) in [
            (MapMetric::Count, 2.0, "Blues"),
            (MapMetric::AvgScore, 4.0, "Reds"),
            (MapMetric::HighRiskPct, 50.0, "Reds"),
        ] {
            let controls = ChartControls {
                map_metric: metric,
                ..Default::default()
            };
            let series = MapChart.aggregate(&refs(&records), &controls).unwrap();
            let fig = MapChart.figure(&series);
            assert_eq!(fig.data[0]["z"], json!([value]));
            assert_eq!(fig.data[0]["colorscale"], scale);
            assert_eq!(
                fig.layout["title"],
                format!("Geographic Distribution: {}", metric.title())
            );
        }
    }

    #[test]
    fn test_metric_parse_falls_back_to_count() {
        assert_eq!(MapMetric::parse("avg_score"), MapMetric::AvgScore);
        assert_eq!(MapMetric::parse("high_risk_pct"), MapMetric::HighRiskPct);
        assert_eq!(MapMetric::parse("density"), MapMetric::Count);
    }

    #[test]
    fn test_hover_text_rounding() {
        let row = StateRow {
            state: "FL".into(),
            count: 3,
            avg_score: 6.666_666,
            high_risk_count: 2,
            high_risk_pct: 66.666_666,
        };
        assert_eq!(row.hover(MapMetric::AvgScore), "FL<br>Avg Score: 6.67<br>Claims: 3");
        assert_eq!(row.hover(MapMetric::HighRiskPct), "FL<br>High Risk %: 66.7%<br>Claims: 3");
        assert_eq!(row.hover(MapMetric::Count), "FL<br>Claims: 3<br>High Risk: 2");
    }
}
