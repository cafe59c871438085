pub mod page;

use tracing::warn;

use crate::orchestrator::PageView;

pub const TEXT_WIDTH: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

fn html_to_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), TEXT_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "could not convert fragment to text");
            html.to_string()
        }
    }
}

/// Visible surfaces as plain text, each headed by its title, followed by
/// the detail overlay when it is open.
pub fn render_text(view: &PageView) -> Vec<u8> {
    let mut out = String::new();
    for surface in view.surfaces().into_iter().filter(|s| s.visible) {
        out.push_str("== ");
        out.push_str(&surface.title);
        out.push_str(" ==\n");
        if let Some(message) = surface.message.as_ref() {
            out.push_str(&message.text);
            out.push('\n');
        }
        for card in &surface.cards {
            out.push_str(&html_to_text(card.html.as_str()));
        }
        if surface.load_more {
            out.push_str("[load more]\n");
        }
        out.push('\n');
    }

    let modal = &view.modal;
    if modal.open {
        out.push_str("== ");
        out.push_str(&modal.title);
        out.push_str(" ==\n");
        out.push_str(&html_to_text(modal.body.as_str()));
        if let Some(message) = modal.recommendations_message.as_ref() {
            out.push_str(&message.text);
            out.push('\n');
        }
        for card in &modal.recommendations {
            out.push_str(&html_to_text(card.html.as_str()));
        }
    }
    out.into_bytes()
}

pub fn render_json(view: &PageView) -> Vec<u8> {
    serde_json::to_vec_pretty(view).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_html(view: &PageView) -> Vec<u8> {
    page::render_html(view)
}

pub fn render(view: &PageView, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(view),
        OutputFormat::Json => render_json(view),
        OutputFormat::Html => render_html(view),
    }
}
