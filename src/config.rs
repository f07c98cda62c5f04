use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    /// Backend prefix the charts endpoint hangs off, e.g. `http://host/fraud_detector`.
    pub base_url: String,
    pub analysis_id: Option<String>,
    /// Page markup to read `data-analysis-id` from when no id is configured.
    pub page_html: Option<PathBuf>,
    /// Render from a payload file instead of the backend.
    pub payload_file: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub date_range: String,
    pub risk_level: String,
    pub claimant_limit: String,
    pub map_metric: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CHARTS_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000/fraud_detector".to_string()),
            analysis_id: std::env::var("ANALYSIS_ID").ok().filter(|v| !v.trim().is_empty()),
            page_html: std::env::var("PAGE_HTML").ok().map(PathBuf::from),
            payload_file: std::env::var("PAYLOAD_FILE").ok().map(PathBuf::from),
            out_dir: std::env::var("OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("out/dashboard")),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            date_range: std::env::var("DATE_RANGE").unwrap_or_else(|_| "all".to_string()),
            risk_level: std::env::var("RISK_LEVEL").unwrap_or_else(|_| "all".to_string()),
            claimant_limit: std::env::var("CLAIMANT_LIMIT").unwrap_or_else(|_| "10".to_string()),
            map_metric: std::env::var("MAP_METRIC").unwrap_or_else(|_| "count".to_string()),
        }
    }
}
