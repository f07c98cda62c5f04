//! The controller that owns dashboard state.
//!
//! `ChartsManager` holds the loaded payload, the global filters, per-chart
//! control values and which charts are live. Charts only ever see this state
//! by reference, through [`crate::charts::draw_chart`].

use chrono::{Local, NaiveDate};
use serde_json::json;
use std::collections::BTreeSet;

use crate::charts::{draw_chart, ChartControls, ChartId, MapMetric, RenderOutcome};
use crate::controls::{parse_claimant_limit, ControlEvent, RefreshButton};
use crate::filters::{apply_filters, DateRange, FilterState, RiskFilter};
use crate::loader::{LoadError, PayloadSource};
use crate::logging::{log, log_empty, log_filter, log_render, obj, v_str, Domain, Level};
use crate::model::ChartsPayload;
use crate::plot::{ImageExport, Panel, PlotEngine};

pub const LOAD_ERROR_MESSAGE: &str = "Error loading chart data. Please refresh the page.";
pub const RENDER_ERROR_MESSAGE: &str = "Error rendering chart.";

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date, like the browser's `new Date()`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub analysis_id: String,
    /// Replaced only by a successful load.
    pub payload: Option<ChartsPayload>,
    pub filters: FilterState,
    pub controls: ChartControls,
    /// Charts whose mount point currently shows a plot; only these can be exported.
    pub live: BTreeSet<ChartId>,
    pub refresh: RefreshButton,
}

impl AppState {
    pub fn new(analysis_id: &str) -> Self {
        Self {
            analysis_id: analysis_id.to_string(),
            payload: None,
            filters: FilterState::default(),
            controls: ChartControls::default(),
            live: BTreeSet::new(),
            refresh: RefreshButton::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Reloaded,
    /// Previous payload and charts were kept.
    Failed(LoadError),
    /// A reload was already in flight.
    Busy,
}

pub struct ChartsManager<S, E> {
    state: AppState,
    source: S,
    engine: E,
    clock: Box<dyn Clock>,
}

impl<S: PayloadSource, E: PlotEngine> ChartsManager<S, E> {
    pub fn new(analysis_id: &str, source: S, engine: E) -> Self {
        Self {
            state: AppState::new(analysis_id),
            source,
            engine,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Initial control values, applied before the first render.
    pub fn with_selection(mut self, filters: FilterState, controls: ChartControls) -> Self {
        self.state.filters = filters;
        self.state.controls = controls;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn is_live(&self, id: ChartId) -> bool {
        self.state.live.contains(&id)
    }

    /// Load the payload and draw every chart. On failure every mount point
    /// shows the load error and no chart is live.
    pub async fn init(&mut self) -> Result<(), LoadError> {
        log(
            Level::Info,
            Domain::System,
            "charts.init",
            obj(&[("analysis_id", v_str(&self.state.analysis_id))]),
        );
        match self.source.fetch(&self.state.analysis_id).await {
            Ok(payload) => {
                self.state.payload = Some(payload);
                self.render_all();
                Ok(())
            }
            Err(err) => {
                self.show_load_error();
                Err(err)
            }
        }
    }

    fn show_load_error(&mut self) {
        let panel = Panel::Error {
            message: LOAD_ERROR_MESSAGE.to_string(),
        };
        for id in ChartId::ALL {
            self.engine.show_panel(id.container(), &panel);
        }
        self.state.live.clear();
    }

    pub fn render_all(&mut self) {
        for id in ChartId::ALL {
            self.render_chart(id);
        }
    }

    /// Filter, aggregate and draw one chart. Returns `None` before a payload is loaded.
    pub fn render_chart(&mut self, id: ChartId) -> Option<RenderOutcome> {
        let payload = self.state.payload.as_ref()?;
        let today = self.clock.today();
        let records = apply_filters(payload.records(id.category()), &self.state.filters, today);
        let outcome = draw_chart(id, &records, &self.state.controls, &mut self.engine);

        let container = id.container();
        match &outcome {
            RenderOutcome::Live(figure) => {
                log_render(container, figure.data.len(), &figure.fingerprint());
                self.state.live.insert(id);
            }
            RenderOutcome::Empty(message) => {
                log_empty(container, message);
                self.engine.show_panel(
                    container,
                    &Panel::Empty {
                        message: message.to_string(),
                    },
                );
                self.state.live.remove(&id);
            }
            RenderOutcome::Failed(err) => {
                log(
                    Level::Error,
                    Domain::Render,
                    "render.failed",
                    obj(&[("chart", v_str(container)), ("error", v_str(err))]),
                );
                self.engine.show_panel(
                    container,
                    &Panel::Error {
                        message: RENDER_ERROR_MESSAGE.to_string(),
                    },
                );
                self.state.live.remove(&id);
            }
        }
        Some(outcome)
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.state.filters.date_range = range;
        log_filter("dateRange", &range.to_string());
        self.render_all();
    }

    pub fn set_risk_level(&mut self, risk: RiskFilter) {
        self.state.filters.risk = risk;
        log_filter("riskLevel", &risk.to_string());
        self.render_all();
    }

    pub fn set_claimant_limit(&mut self, limit: usize) {
        self.state.controls.claimant_limit = limit;
        self.render_chart(ChartId::Claimants);
    }

    pub fn set_map_metric(&mut self, metric: MapMetric) {
        self.state.controls.map_metric = metric;
        self.render_chart(ChartId::Map);
    }

    /// Re-fetch and redraw everything. The refresh button stays disabled for
    /// the duration of the fetch and is re-enabled whatever the result.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        if !self.state.refresh.begin() {
            return RefreshOutcome::Busy;
        }
        let result = self.source.fetch(&self.state.analysis_id).await;
        let outcome = match result {
            Ok(payload) => {
                self.state.payload = Some(payload);
                self.render_all();
                RefreshOutcome::Reloaded
            }
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Load,
                    "refresh.failed",
                    obj(&[
                        ("analysis_id", v_str(&self.state.analysis_id)),
                        ("error", v_str(&err.to_string())),
                        ("msg", v_str("keeping previous charts")),
                    ]),
                );
                RefreshOutcome::Failed(err)
            }
        };
        self.state.refresh.finish();
        outcome
    }

    /// Export a live chart as a 1200x600 PNG. Returns false if the chart is not live.
    pub fn download_chart(&mut self, id: ChartId) -> anyhow::Result<bool> {
        if !self.is_live(id) {
            log(
                Level::Debug,
                Domain::Export,
                "export.skipped",
                obj(&[("chart", v_str(id.container())), ("msg", v_str("chart not live"))]),
            );
            return Ok(false);
        }
        let export = ImageExport::png(id.container(), &self.state.analysis_id);
        self.engine.download_image(id.container(), &export)?;
        log(
            Level::Info,
            Domain::Export,
            "export.ok",
            obj(&[("chart", v_str(id.container())), ("filename", v_str(&export.filename))]),
        );
        Ok(true)
    }

    /// Apply one control event. Values outside a control's accepted set are ignored.
    pub async fn handle(&mut self, event: ControlEvent) -> anyhow::Result<()> {
        if self.state.payload.is_none() {
            // setup never finished, controls are not wired
            log(
                Level::Warn,
                Domain::Control,
                "control.ignored",
                obj(&[("control", v_str(event.control_id())), ("msg", v_str("charts not loaded"))]),
            );
            return Ok(());
        }
        log(
            Level::Debug,
            Domain::Control,
            "control.event",
            obj(&[("control", v_str(event.control_id())), ("event", json!(format!("{:?}", event)))]),
        );
        match event {
            ControlEvent::DateRange { value } => match DateRange::parse(&value) {
                Some(range) => self.set_date_range(range),
                None => reject(&event_name(&value, "dateRange")),
            },
            ControlEvent::RiskFilter { value } => match RiskFilter::parse(&value) {
                Some(risk) => self.set_risk_level(risk),
                None => reject(&event_name(&value, "riskFilter")),
            },
            ControlEvent::ClaimantLimit { value } => self.set_claimant_limit(parse_claimant_limit(&value)),
            ControlEvent::MapMetric { value } => self.set_map_metric(MapMetric::parse(&value)),
            ControlEvent::RefreshCharts => {
                self.refresh().await;
            }
            ControlEvent::Download { chart } => match ChartId::from_container(&chart) {
                Some(id) => {
                    self.download_chart(id)?;
                }
                None => reject(&event_name(&chart, "download")),
            },
        }
        Ok(())
    }
}

fn event_name(value: &str, control: &str) -> String {
    format!("{}={}", control, value)
}

fn reject(event: &str) {
    log(
        Level::Warn,
        Domain::Control,
        "control.rejected",
        obj(&[("event", v_str(event))]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticSource;
    use crate::model::{ChartCategory, ClaimRecord, RiskLevel};
    use crate::plot::RecordingEngine;

    fn payload() -> ChartsPayload {
        let rec = |score: f64, level: RiskLevel, date: &str| ClaimRecord {
            fraud_score: score,
            risk_level: level,
            date_of_loss: Some(date.to_string()),
            claimant_name: Some("A".into()),
            ..Default::default()
        };
        ChartsPayload::new()
            .with(
                ChartCategory::FraudScores,
                vec![rec(3.0, RiskLevel::Low, "2024-06-01"), rec(11.0, RiskLevel::Critical, "2024-01-01")],
            )
            .with(ChartCategory::Claimants, vec![rec(3.0, RiskLevel::Low, "2024-06-01")])
    }

    fn manager() -> ChartsManager<StaticSource, RecordingEngine> {
        ChartsManager::new("5", StaticSource::new(payload()), RecordingEngine::new())
            .with_clock(FixedClock(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()))
    }

    #[tokio::test]
    async fn test_init_marks_rendered_charts_live() {
        let mut m = manager();
        m.init().await.unwrap();
        assert!(m.is_live(ChartId::FraudScore));
        assert!(m.is_live(ChartId::Claimants));
        assert!(!m.is_live(ChartId::Map));
        assert_eq!(m.engine().plots().len(), 2);
        assert_eq!(m.engine().panels().len(), 5);
    }

    #[tokio::test]
    async fn test_events_ignored_before_load() {
        let mut m = ChartsManager::new("5", StaticSource::failing(LoadError::Status(500)), RecordingEngine::new());
        assert!(m.init().await.is_err());
        m.engine_mut().clear();
        m.handle(ControlEvent::DateRange { value: "30".into() }).await.unwrap();
        assert!(m.engine().calls.is_empty());
        assert_eq!(m.state().filters, FilterState::default());
    }

    #[tokio::test]
    async fn test_bad_control_value_leaves_filters() {
        let mut m = manager();
        m.init().await.unwrap();
        m.engine_mut().clear();
        m.handle(ControlEvent::RiskFilter { value: "Severe".into() }).await.unwrap();
        assert_eq!(m.state().filters.risk, RiskFilter::All);
        assert!(m.engine().calls.is_empty());
    }

    #[tokio::test]
    async fn test_download_only_when_live() {
        let mut m = manager();
        m.init().await.unwrap();
        assert!(!m.download_chart(ChartId::Map).unwrap());
        assert!(m.download_chart(ChartId::FraudScore).unwrap());
    }
}
