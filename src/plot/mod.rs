//! Seam to the external charting engine.
//!
//! Charts hand a fully built [`Figure`] (Plotly `data`/`layout`/`config`) to a
//! [`PlotEngine`], which replaces whatever the mount point showed before.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

mod html;
mod recording;

pub use html::HtmlEngine;
pub use recording::{EngineCall, RecordingEngine};

/// Everything Plotly needs to draw one mount point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
    pub config: Value,
}

impl Figure {
    /// SHA-256 of the serialized figure; equal figures share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// Placeholder contents shown instead of a plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Empty { message: String },
    Error { message: String },
}

impl Panel {
    pub fn message(&self) -> &str {
        match self {
            Panel::Empty { message } | Panel::Error { message } => message,
        }
    }
}

pub const EXPORT_WIDTH: u32 = 1200;
pub const EXPORT_HEIGHT: u32 = 600;

/// Options for a one-shot image download of a live chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExport {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub filename: String,
}

impl ImageExport {
    pub fn png(chart_id: &str, analysis_id: &str) -> Self {
        Self {
            format: "png".to_string(),
            width: EXPORT_WIDTH,
            height: EXPORT_HEIGHT,
            filename: format!("{}_analysis_{}", chart_id, analysis_id),
        }
    }
}

pub trait PlotEngine {
    /// Create or fully replace the plot in `container`.
    fn new_plot(&mut self, container: &str, figure: &Figure) -> Result<()>;
    /// Replace the contents of `container` with a placeholder panel.
    fn show_panel(&mut self, container: &str, panel: &Panel);
    fn download_image(&mut self, container: &str, export: &ImageExport) -> Result<()>;
}
