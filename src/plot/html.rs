use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Figure, ImageExport, Panel, PlotEngine};
use crate::logging::{log, obj, v_str, Domain, Level};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

#[derive(Debug, Clone)]
enum Mount {
    Blank,
    Plot(Figure),
    Panel(Panel),
}

/// Engine that materializes the dashboard as static Plotly HTML.
///
/// Each mount point keeps only its latest contents. `new_plot` also writes the
/// figure to `{container}.json`; `write_page` renders `dashboard.html`.
pub struct HtmlEngine {
    out_dir: PathBuf,
    order: Vec<String>,
    mounts: BTreeMap<String, Mount>,
}

impl HtmlEngine {
    pub fn new(out_dir: impl Into<PathBuf>, containers: &[&str]) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
        Ok(Self {
            out_dir,
            order: containers.iter().map(|c| c.to_string()).collect(),
            mounts: containers.iter().map(|c| (c.to_string(), Mount::Blank)).collect(),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn ensure_mount(&mut self, container: &str) {
        if !self.mounts.contains_key(container) {
            self.order.push(container.to_string());
        }
    }

    pub fn page_path(&self) -> PathBuf {
        self.out_dir.join("dashboard.html")
    }

    /// Render every mount point in order and write `dashboard.html`.
    pub fn write_page(&self, title: &str) -> Result<PathBuf> {
        let mut body = String::new();
        let mut scripts = String::new();
        for container in &self.order {
            body.push_str(&format!(
                "<section class=\"chart-card\">\n<div id=\"{}\" class=\"plotly-chart\">",
                escape_html(container)
            ));
            match self.mounts.get(container) {
                None | Some(Mount::Blank) => {}
                Some(Mount::Panel(panel)) => body.push_str(&panel_markup(panel)),
                Some(Mount::Plot(figure)) => {
                    scripts.push_str(&new_plot_script(container, figure)?);
                    scripts.push('\n');
                }
            }
            body.push_str("</div>\n</section>\n");
        }

        let page = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <script src=\"{cdn}\"></script>\n</head>\n<body>\n{body}<script>\n{scripts}</script>\n</body>\n</html>\n",
            title = escape_html(title),
            cdn = PLOTLY_CDN,
            body = body,
            scripts = scripts,
        );
        let path = self.page_path();
        fs::write(&path, page).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

impl PlotEngine for HtmlEngine {
    fn new_plot(&mut self, container: &str, figure: &Figure) -> Result<()> {
        let path = self.out_dir.join(format!("{}.json", container));
        let body = serde_json::to_vec_pretty(figure)?;
        fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
        self.ensure_mount(container);
        self.mounts.insert(container.to_string(), Mount::Plot(figure.clone()));
        Ok(())
    }

    fn show_panel(&mut self, container: &str, panel: &Panel) {
        let path = self.out_dir.join(format!("{}.json", container));
        if let Err(err) = remove_figure_file(&path) {
            // a stale figure file now outlives the placeholder
            log(
                Level::Warn,
                Domain::Render,
                "render.stale_figure",
                obj(&[
                    ("chart", v_str(container)),
                    ("path", v_str(&path.to_string_lossy())),
                    ("error", v_str(&err.to_string())),
                ]),
            );
        }
        self.ensure_mount(container);
        self.mounts.insert(container.to_string(), Mount::Panel(panel.clone()));
    }

    /// Writes `{filename}.html`, which draws the figure and triggers the browser download.
    fn download_image(&mut self, container: &str, export: &ImageExport) -> Result<()> {
        let Some(Mount::Plot(figure)) = self.mounts.get(container) else {
            anyhow::bail!("no live plot in {}", container);
        };
        let options = script_json(&serde_json::to_value(export)?)?;
        let page = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<script src=\"{cdn}\"></script>\n</head>\n\
             <body>\n<div id=\"{id}\"></div>\n<script>\n{plot}\nPlotly.downloadImage('{id}', {options});\n</script>\n</body>\n</html>\n",
            cdn = PLOTLY_CDN,
            id = escape_html(container),
            plot = new_plot_script(container, figure)?,
            options = options,
        );
        let path = self.out_dir.join(format!("{}.html", export.filename));
        fs::write(&path, page).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

/// Remove a figure file; a file that was never written is not an error.
fn remove_figure_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn new_plot_script(container: &str, figure: &Figure) -> Result<String> {
    Ok(format!(
        "Plotly.newPlot('{}', {}, {}, {});",
        escape_html(container),
        script_json(&serde_json::to_value(&figure.data)?)?,
        script_json(&figure.layout)?,
        script_json(&figure.config)?,
    ))
}

/// JSON safe to inline inside a `<script>` element.
fn script_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn panel_markup(panel: &Panel) -> String {
    match panel {
        Panel::Empty { message } => format!(
            "<div class=\"chart-empty\" style=\"height: 400px; display: flex; align-items: center; justify-content: center;\">\
             <p class=\"text-muted\">{}</p></div>",
            escape_html(message)
        ),
        Panel::Error { message } => format!(
            "<div class=\"alert alert-danger text-center\">{}</div>",
            escape_html(message)
        ),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
