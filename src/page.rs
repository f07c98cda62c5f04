/// Pick the analysis id: a non-empty global value wins, else the page's first
/// `data-analysis-id` attribute.
pub fn resolve_analysis_id(global: Option<&str>, page_html: Option<&str>) -> Option<String> {
    if let Some(id) = global.map(str::trim).filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    page_html.and_then(data_attribute)
}

fn data_attribute(html: &str) -> Option<String> {
    const ATTR: &str = "data-analysis-id";
    let mut rest = html;
    while let Some(pos) = rest.find(ATTR) {
        let after = &rest[pos + ATTR.len()..];
        if let Some(value) = attribute_value(after) {
            return Some(value);
        }
        rest = after;
    }
    None
}

/// Parses `="..."` or `='...'` with optional whitespace around `=`.
fn attribute_value(s: &str) -> Option<String> {
    let s = s.trim_start().strip_prefix('=')?.trim_start();
    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &s[1..];
    let end = body.find(quote)?;
    let value = body[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}
