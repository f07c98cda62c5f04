//! Render the fraud-analysis chart dashboard for one analysis.
//!
//! Usage: fraudcharts [EVENT...] [-]
//!
//! Each EVENT is a control interaction such as `dateRange=30`,
//! `riskFilter=High`, `claimantLimit=20`, `mapMetric=avg_score`,
//! `refreshCharts` or `download=mapChart`. A `-` reads further events from
//! stdin, one per line, either in that form or as JSON
//! (`{"control":"dateRange","value":"90"}`).

use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead};

use fraudcharts::charts::{ChartControls, ChartId, MapMetric};
use fraudcharts::config::Config;
use fraudcharts::controls::{parse_claimant_limit, ControlEvent};
use fraudcharts::filters::{DateRange, FilterState, RiskFilter};
use fraudcharts::loader::{HttpLoader, PayloadSource, StaticSource};
use fraudcharts::logging::{log, obj, v_str, Domain, Level};
use fraudcharts::manager::ChartsManager;
use fraudcharts::page::resolve_analysis_id;
use fraudcharts::plot::HtmlEngine;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let page = match &cfg.page_html {
        Some(path) => Some(
            std::fs::read_to_string(path).with_context(|| format!("read page {}", path.display()))?,
        ),
        None => None,
    };
    let analysis_id = resolve_analysis_id(cfg.analysis_id.as_deref(), page.as_deref()).ok_or_else(|| {
        log(
            Level::Error,
            Domain::System,
            "charts.no_analysis_id",
            obj(&[("msg", v_str("Analysis ID not found for charts initialization"))]),
        );
        anyhow!("no analysis id: set ANALYSIS_ID or PAGE_HTML")
    })?;

    let engine = HtmlEngine::new(cfg.out_dir.clone(), &ChartId::containers())?;
    match &cfg.payload_file {
        Some(path) => run(&cfg, &analysis_id, StaticSource::from_file(path)?, engine).await,
        None => {
            let loader = HttpLoader::new(&cfg.base_url, cfg.http_timeout_secs)?;
            run(&cfg, &analysis_id, loader, engine).await
        }
    }
}

fn initial_selection(cfg: &Config) -> (FilterState, ChartControls) {
    let date_range = DateRange::parse(&cfg.date_range).unwrap_or_else(|| {
        warn_config("DATE_RANGE", &cfg.date_range);
        DateRange::All
    });
    let risk = RiskFilter::parse(&cfg.risk_level).unwrap_or_else(|| {
        warn_config("RISK_LEVEL", &cfg.risk_level);
        RiskFilter::All
    });
    (
        FilterState { date_range, risk },
        ChartControls {
            claimant_limit: parse_claimant_limit(&cfg.claimant_limit),
            map_metric: MapMetric::parse(&cfg.map_metric),
        },
    )
}

fn warn_config(key: &str, value: &str) {
    log(
        Level::Warn,
        Domain::System,
        "config.ignored",
        obj(&[("key", v_str(key)), ("value", v_str(value))]),
    );
}

fn collect_events() -> Vec<ControlEvent> {
    let mut events = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "-" {
            for line in io::stdin().lock().lines().map_while(Result::ok) {
                if line.trim().is_empty() {
                    continue;
                }
                match ControlEvent::parse_line(&line) {
                    Some(event) => events.push(event),
                    None => eprintln!("bad control event: {}", line),
                }
            }
        } else {
            match ControlEvent::parse_line(&arg) {
                Some(event) => events.push(event),
                None => eprintln!("bad control event: {}", arg),
            }
        }
    }
    events
}

async fn run<S: PayloadSource>(cfg: &Config, analysis_id: &str, source: S, engine: HtmlEngine) -> Result<()> {
    let (filters, controls) = initial_selection(cfg);
    let mut manager = ChartsManager::new(analysis_id, source, engine).with_selection(filters, controls);
    let title = format!("Fraud Analysis {} Charts", analysis_id);

    if let Err(err) = manager.init().await {
        manager.engine().write_page(&title)?;
        return Err(anyhow!("loading charts for analysis {} failed: {}", analysis_id, err));
    }
    for event in collect_events() {
        manager.handle(event).await?;
    }

    let path = manager.engine().write_page(&title)?;
    let live: Vec<&str> = manager.state().live.iter().map(|id| id.container()).collect();
    log(
        Level::Info,
        Domain::System,
        "charts.written",
        obj(&[
            ("analysis_id", v_str(analysis_id)),
            ("page", v_str(&path.to_string_lossy())),
            ("live", serde_json::json!(live)),
        ]),
    );
    Ok(())
}
