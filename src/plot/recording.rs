use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

use super::{Figure, ImageExport, Panel, PlotEngine};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    NewPlot { container: String, figure: Figure },
    Panel { container: String, panel: Panel },
    Download { container: String, export: ImageExport },
}

impl EngineCall {
    pub fn container(&self) -> &str {
        match self {
            EngineCall::NewPlot { container, .. }
            | EngineCall::Panel { container, .. }
            | EngineCall::Download { container, .. } => container,
        }
    }
}

/// Engine double that records calls instead of drawing anything.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<EngineCall>,
    failing: BTreeSet<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `new_plot` fail for `container`.
    pub fn fail_on(mut self, container: &str) -> Self {
        self.failing.insert(container.to_string());
        self
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn plots(&self) -> Vec<(&str, &Figure)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::NewPlot { container, figure } => Some((container.as_str(), figure)),
                _ => None,
            })
            .collect()
    }

    pub fn panels(&self) -> Vec<(&str, &Panel)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Panel { container, panel } => Some((container.as_str(), panel)),
                _ => None,
            })
            .collect()
    }

    pub fn last_plot(&self, container: &str) -> Option<&Figure> {
        self.plots()
            .into_iter()
            .rev()
            .find(|(c, _)| *c == container)
            .map(|(_, f)| f)
    }

    pub fn calls_for(&self, container: &str) -> Vec<&EngineCall> {
        self.calls.iter().filter(|c| c.container() == container).collect()
    }
}

impl PlotEngine for RecordingEngine {
    fn new_plot(&mut self, container: &str, figure: &Figure) -> Result<()> {
        if self.failing.contains(container) {
            return Err(anyhow!("engine refused plot for {}", container));
        }
        self.calls.push(EngineCall::NewPlot {
            container: container.to_string(),
            figure: figure.clone(),
        });
        Ok(())
    }

    fn show_panel(&mut self, container: &str, panel: &Panel) {
        self.calls.push(EngineCall::Panel {
            container: container.to_string(),
            panel: panel.clone(),
        });
    }

    fn download_image(&mut self, container: &str, export: &ImageExport) -> Result<()> {
        self.calls.push(EngineCall::Download {
            container: container.to_string(),
            export: export.clone(),
        });
        Ok(())
    }
}
