use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::ChartsPayload;

/// Why a payload could not be loaded. Every variant is shown to the user the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// Connection, timeout or URL failure before a response arrived.
    Transport(String),
    /// The body was not a charts payload.
    Decode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Status(code) => write!(f, "HTTP {}", code),
            LoadError::Transport(msg) => write!(f, "transport error: {}", msg),
            LoadError::Decode(msg) => write!(f, "bad charts payload: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

#[async_trait]
pub trait PayloadSource {
    async fn fetch(&self, analysis_id: &str) -> Result<ChartsPayload, LoadError>;
}

/// Fetches `GET {base}/api/charts-data/{analysis_id}/`.
pub struct HttpLoader {
    client: Client,
    base: Url,
}

impl HttpLoader {
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: Url::parse(base_url)?,
        })
    }

    pub fn endpoint(&self, analysis_id: &str) -> Result<Url, LoadError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| LoadError::Transport(format!("base url cannot take a path: {}", self.base)))?;
            segments.pop_if_empty();
            segments.extend(["api", "charts-data", analysis_id, ""]);
        }
        Ok(url)
    }
}

#[async_trait]
impl PayloadSource for HttpLoader {
    async fn fetch(&self, analysis_id: &str) -> Result<ChartsPayload, LoadError> {
        let url = self.endpoint(analysis_id)?;
        log(
            Level::Info,
            Domain::Load,
            "load.start",
            obj(&[("analysis_id", v_str(analysis_id)), ("url", v_str(url.as_str()))]),
        );
        let result = fetch_payload(&self.client, url).await;
        log_outcome(analysis_id, &result);
        result
    }
}

async fn fetch_payload(client: &Client, url: Url) -> Result<ChartsPayload, LoadError> {
    let resp = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| LoadError::Transport(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LoadError::Status(status.as_u16()));
    }
    let body: Value = resp.json().await.map_err(|e| {
        if e.is_decode() {
            LoadError::Decode(e.to_string())
        } else {
            LoadError::Transport(e.to_string())
        }
    })?;
    ChartsPayload::from_json(body).map_err(|e| LoadError::Decode(e.to_string()))
}

fn log_outcome(analysis_id: &str, result: &Result<ChartsPayload, LoadError>) {
    match result {
        Ok(payload) => log(
            Level::Info,
            Domain::Load,
            "load.ok",
            obj(&[("analysis_id", v_str(analysis_id)), ("counts", json!(payload.counts()))]),
        ),
        Err(err) => log(
            Level::Error,
            Domain::Load,
            "load.failed",
            obj(&[("analysis_id", v_str(analysis_id)), ("error", v_str(&err.to_string()))]),
        ),
    }
}

/// A source that always answers with the same payload, or the same error.
#[derive(Debug, Clone)]
pub struct StaticSource {
    result: Result<ChartsPayload, LoadError>,
}

impl StaticSource {
    pub fn new(payload: ChartsPayload) -> Self {
        Self { result: Ok(payload) }
    }

    pub fn failing(err: LoadError) -> Self {
        Self { result: Err(err) }
    }

    /// Read a payload JSON file, shaped like the endpoint's response body.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        Ok(Self::new(ChartsPayload::from_json(value)?))
    }

    pub fn set(&mut self, result: Result<ChartsPayload, LoadError>) {
        self.result = result;
    }
}

#[async_trait]
impl PayloadSource for StaticSource {
    async fn fetch(&self, analysis_id: &str) -> Result<ChartsPayload, LoadError> {
        let result = self.result.clone();
        log_outcome(analysis_id, &result);
        result
    }
}
