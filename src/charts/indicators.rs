use serde_json::json;

use super::{responsive, ChartControls, ChartId, ChartRenderer, EmptyDataset, Groups, TRANSPARENT};
use crate::model::ClaimRecord;
use crate::plot::Figure;

const TOP_INDICATORS: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub flag: String,
    pub count: usize,
    pub avg_score: f64,
}

/// Drop one leading `[...]` token and the whitespace after it, then trim.
///
/// Only the first closing bracket ends the token, and the token may not span
/// a line break.
pub fn clean_flag(flag: &str) -> &str {
    let stripped = flag
        .strip_prefix('[')
        .and_then(|rest| rest.find(']').map(|end| (rest, end)))
        .filter(|(rest, end)| !rest[..*end].contains(|c: char| c == '\n' || c == '\r'))
        .map(|(rest, end)| rest[end + 1..].trim_start())
        .unwrap_or(flag);
    stripped.trim()
}

#[derive(Debug, Default, Clone, Copy)]
struct FlagTally {
    count: usize,
    total: f64,
}

/// Flag frequencies across records; a record contributes its score once per flag it carries.
pub fn aggregate_indicators(records: &[&ClaimRecord]) -> Vec<IndicatorRow> {
    let mut groups: Groups<FlagTally> = Groups::new();
    for r in records {
        for flag in &r.red_flags {
            let t = groups.entry(clean_flag(flag));
            t.count += 1;
            t.total += r.fraud_score;
        }
    }
    let mut rows: Vec<IndicatorRow> = groups
        .into_entries()
        .into_iter()
        .map(|(flag, t)| IndicatorRow {
            flag,
            count: t.count,
            avg_score: t.total / t.count as f64,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(TOP_INDICATORS);
    rows
}

pub struct IndicatorsChart;

impl ChartRenderer for IndicatorsChart {
    type Series = Vec<IndicatorRow>;

    fn id(&self) -> ChartId {
        ChartId::Indicators
    }

    fn empty_message(&self) -> &'static str {
        "No indicators data available"
    }

    fn aggregate(&self, records: &[&ClaimRecord], _controls: &ChartControls) -> Result<Vec<IndicatorRow>, EmptyDataset> {
        let rows = aggregate_indicators(records);
        if rows.is_empty() {
            return Err(EmptyDataset {
                message: "No fraud indicators found",
            });
        }
        Ok(rows)
    }

    fn figure(&self, rows: &Vec<IndicatorRow>) -> Figure {
        let trace = json!({
            "x": rows.iter().map(|r| r.count).collect::<Vec<_>>(),
            "y": rows.iter().map(|r| r.flag.as_str()).collect::<Vec<_>>(),
            "type": "bar",
            "orientation": "h",
            "marker": {
                "color": rows.iter().map(|r| r.avg_score).collect::<Vec<_>>(),
                "colorscale": "Reds",
                "showscale": true,
                "colorbar": { "title": "Avg Fraud Score", "titleside": "right" }
            },
            "text": rows
                .iter()
                .map(|r| format!("{} ({:.1})", r.count, r.avg_score))
                .collect::<Vec<_>>(),
            "textposition": "outside",
            "hovertemplate": "Indicator: %{y}<br>Count: %{x}<br>Avg Score: %{marker.color:.1f}<extra></extra>"
        });

        Figure {
            data: vec![trace],
            layout: json!({
                "title": "Most Common Fraud Indicators",
                "xaxis": { "title": "Number of Claims" },
                "yaxis": { "title": "Fraud Indicator", "automargin": true },
                "showlegend": false,
                "height": (rows.len() * 35).max(500),
                "margin": { "t": 50, "b": 50, "l": 300, "r": 80 },
                "plot_bgcolor": TRANSPARENT
            }),
            config: responsive(),
        }
    }
}
