use std::path::Path;

use crate::error::AppResult;

const DEFAULT_TEMPLATE: &str = include_str!("../../../templates/table_viewer.html");
const PLACEHOLDER: &str = "{{ table_name }}";

/// Viewer page source with `{{ table_name }}` placeholders.
#[derive(Debug, Clone)]
pub struct ViewerTemplate {
    source: String,
}

impl Default for ViewerTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl ViewerTemplate {
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(p) => Ok(Self {
                source: std::fs::read_to_string(p)?,
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn render(&self, table_name: &str) -> String {
        self.source.replace(PLACEHOLDER, &html_escape(table_name))
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
