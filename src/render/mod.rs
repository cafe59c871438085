//! Pure string construction: records in, HTML fragments out.

pub mod price;
pub mod rating;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{CardRecord, ProductRecord, ScoredSuggestion};

pub use price::CurrencyFormat;
pub use rating::StarRating;

pub const PLACEHOLDER_IMAGE: &str = "placeholder.png";

/// A rendered piece of markup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-visible fixed texts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub no_results: String,
    pub price_fallback: String,
    pub loading: String,
    pub detail_button: String,
    pub details_title: String,
    pub no_description: String,
    pub no_recommendations: String,
    pub data_error: String,
    pub recommendation_error: String,
    pub error_title: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            no_results: "No results found.".to_string(),
            price_fallback: "Contact for price".to_string(),
            loading: "Loading...".to_string(),
            detail_button: "Details".to_string(),
            details_title: "Details".to_string(),
            no_description: "No description.".to_string(),
            no_recommendations: "No recommendations.".to_string(),
            data_error: "Data error".to_string(),
            recommendation_error: "Could not load recommendations.".to_string(),
            error_title: "Error".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    pub currency: CurrencyFormat,
    pub labels: Labels,
}

/// Similarity badge text and its tooltip, e.g. `87%` / `87.3%`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreLabel {
    pub badge: String,
    pub tooltip: String,
}

/// Halves round away from zero (`12.5` gives `13`), unlike `{:.0}`.
pub fn score_label(score: f64) -> ScoreLabel {
    let pct = score * 100.0;
    let tenths = (pct * 10.0).round() / 10.0;
    ScoreLabel {
        badge: format!("{:.0}%", pct.round()),
        tooltip: format!("{tenths:.1}%"),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
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

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

pub fn message(text: &str, is_error: bool) -> Fragment {
    let class = if is_error { "message error" } else { "message" };
    Fragment(format!(r#"<p class="{class}">{}</p>"#, escape_html(text)))
}

pub fn error_card(opts: &RenderOptions) -> Fragment {
    Fragment(format!(
        r#"<div class="product-card error-card"><p>{}</p></div>"#,
        escape_html(&opts.labels.data_error)
    ))
}

fn product_card(
    doc_id: &str,
    product: &ProductRecord,
    score: Option<f64>,
    opts: &RenderOptions,
) -> Fragment {
    let name = product.name.as_deref();
    let title = escape_html(or_default(name, "Product"));
    let image = escape_html(or_default(product.image_url.as_deref(), PLACEHOLDER_IMAGE));
    let alt = escape_html(or_default(name, "Product image"));
    let heading = escape_html(or_default(name, "N/A"));
    let category = escape_html(or_default(product.category.as_deref(), "N/A"));
    let stars = rating::cosmetic_rating(product.source_id.as_ref(), rating::CARD_SEED_MULTIPLIER);
    let price = escape_html(&opts.currency.label(product.price, &opts.labels.price_fallback));
    let button = escape_html(&opts.labels.detail_button);
    let aria = escape_html(&format!("{} {}", opts.labels.detail_button, name.unwrap_or("")));
    let badge = match score {
        Some(score) => {
            let label = score_label(score);
            format!(
                r#"<div class="reco-score" title="Similarity: {}">{}</div>"#,
                label.tooltip, label.badge
            )
        }
        None => String::new(),
    };

    Fragment(format!(
        r#"<div class="product-card" data-doc-id="{doc_id}" tabindex="0" title="{title}"><div class="card-image-container"><img src="{image}" alt="{alt}" loading="lazy"></div><div class="card-content"><h4>{heading}</h4><span class="category">{category}</span>{stars}<div class="card-footer"><span class="price">{price}</span><button class="btn-detail" aria-label="{aria}">{button}</button></div></div>{badge}</div>"#,
        doc_id = escape_html(doc_id),
        stars = stars.to_html(),
    ))
}

/// Renders one grid card. Invalid records become an inline error card; they
/// never abort the rest of the grid.
pub fn render_card(record: &CardRecord, opts: &RenderOptions) -> Fragment {
    match record {
        CardRecord::Product(product) => match product.doc_id.as_deref() {
            Some(doc_id) if !doc_id.is_empty() => product_card(doc_id, product, None, opts),
            _ => {
                warn!("product record without doc-id");
                error_card(opts)
            }
        },
        CardRecord::Suggestion(s) => product_card(&s.doc_id, &s.product, Some(s.score), opts),
        CardRecord::Invalid(invalid) => {
            warn!(reason = %invalid.reason, "skipping malformed record");
            error_card(opts)
        }
    }
}

/// Body of the detail overlay for a single product.
pub fn render_detail(product: &ProductRecord, opts: &RenderOptions) -> Fragment {
    let name = or_default(product.name.as_deref(), "N/A");
    let stars = rating::cosmetic_rating(product.source_id.as_ref(), rating::CARD_SEED_MULTIPLIER);
    Fragment(format!(
        r#"<img src="{image}" alt="{name}"><h3>{name}</h3><div class="category">Category: {category}</div>{stars}<div class="price">{price}</div><h4>Description</h4><p class="description">{description}</p>"#,
        image = escape_html(or_default(product.image_url.as_deref(), PLACEHOLDER_IMAGE)),
        name = escape_html(name),
        category = escape_html(or_default(product.category.as_deref(), "N/A")),
        stars = stars.to_html(),
        price = escape_html(&opts.currency.label(product.price, &opts.labels.price_fallback)),
        description = escape_html(or_default(
            product.description.as_deref(),
            &opts.labels.no_description
        )),
    ))
}

pub fn render_recommendation(suggestion: &ScoredSuggestion) -> Fragment {
    let product = &suggestion.product;
    let name = or_default(product.name.as_deref(), "N/A");
    let label = score_label(suggestion.score);
    let stars = rating::cosmetic_rating(
        product.source_id.as_ref(),
        rating::RECOMMENDATION_SEED_MULTIPLIER,
    );
    Fragment(format!(
        r#"<div class="reco-card-modal" data-doc-id="{doc_id}" tabindex="0" title="{title} - Similarity: {tooltip}"><img src="{image}" alt="{name}" loading="lazy"><div class="reco-card-modal-info"><p>{name}</p>{stars}</div></div>"#,
        doc_id = escape_html(&suggestion.doc_id),
        title = escape_html(or_default(product.name.as_deref(), "Product")),
        tooltip = label.tooltip,
        image = escape_html(or_default(product.image_url.as_deref(), PLACEHOLDER_IMAGE)),
        name = escape_html(name),
        stars = stars.to_html(),
    ))
}
