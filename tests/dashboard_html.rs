//! Full pipeline into the HTML engine: payload file in, dashboard page out.

use std::fs;

use chrono::NaiveDate;
use tempfile::TempDir;

use fraudcharts::charts::ChartId;
use fraudcharts::controls::ControlEvent;
use fraudcharts::loader::{LoadError, StaticSource};
use fraudcharts::manager::{ChartsManager, FixedClock, LOAD_ERROR_MESSAGE};
use fraudcharts::plot::HtmlEngine;

const PAYLOAD: &str = r#"{
    "fraudScores": [
        {"score": 3.0, "fraud_score": 3.0, "risk_level": "Low", "claim_number": "A1"},
        {"score": 10.5, "fraud_score": 10.5, "risk_level": "Critical", "claim_number": "A2"}
    ],
    "timeline": [{"date_of_loss": "2024-05-01", "fraud_score": 3.0, "risk_level": "Low"}],
    "geographic": [{"state": "Unknown", "fraud_score": 3.0, "risk_level": "Low"}]
}"#;

#[tokio::test]
async fn writes_dashboard_with_plots_and_placeholders() {
    let dir = TempDir::new().unwrap();
    let payload_path = dir.path().join("payload.json");
    fs::write(&payload_path, PAYLOAD).unwrap();
    let out = dir.path().join("out");

    let source = StaticSource::from_file(&payload_path).unwrap();
    let engine = HtmlEngine::new(out.clone(), &ChartId::containers()).unwrap();
    let mut m = ChartsManager::new("8", source, engine)
        .with_clock(FixedClock(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()));
    m.init().await.unwrap();
    m.handle(ControlEvent::Download { chart: "fraudScoreChart".into() }).await.unwrap();

    let page = fs::read_to_string(m.engine().write_page("Fraud Analysis 8 Charts").unwrap()).unwrap();
    assert!(page.contains("<title>Fraud Analysis 8 Charts</title>"));
    assert!(page.contains("Plotly.newPlot('fraudScoreChart'"));
    assert!(page.contains("Plotly.newPlot('timelineChart'"));
    assert!(page.contains("No claimant data available"));
    assert!(page.contains("No injury data available"));
    // every state was excluded, the map still draws
    assert!(page.contains("Plotly.newPlot('mapChart'"));
    assert_eq!(page.matches("class=\"plotly-chart\"").count(), 7);

    assert!(out.join("fraudScoreChart.json").exists());
    assert!(!out.join("claimantsChart.json").exists());
    let export = fs::read_to_string(out.join("fraudScoreChart_analysis_8.html")).unwrap();
    assert!(export.contains("Plotly.downloadImage('fraudScoreChart'"));
    assert!(export.contains("\"format\":\"png\""));
}

#[tokio::test]
async fn load_failure_page_shows_error_everywhere() {
    let dir = TempDir::new().unwrap();
    let engine = HtmlEngine::new(dir.path().to_path_buf(), &ChartId::containers()).unwrap();
    let mut m = ChartsManager::new("8", StaticSource::failing(LoadError::Status(502)), engine);
    assert!(m.init().await.is_err());

    let page = fs::read_to_string(m.engine().write_page("Charts").unwrap()).unwrap();
    assert_eq!(page.matches(LOAD_ERROR_MESSAGE).count(), 7);
    assert!(!page.contains("Plotly.newPlot("));
}
