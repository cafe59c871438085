//! Outbound calls to the catalog backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{CardRecord, ProductDetail, ProductPage, ProductRecord};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Normalized failure of a single backend call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("API error {status}{}: {message}", status_suffix(.status_text))]
    Status {
        status: u16,
        status_text: String,
        message: String,
    },

    #[error("network error: {message}")]
    Transport { message: String },

    #[error("unexpected response: {message}")]
    Decode { message: String },

    #[error("incomplete data: {message}")]
    Shape { message: String },
}

fn status_suffix(status_text: &str) -> String {
    if status_text.is_empty() {
        String::new()
    } else {
        format!(" ({status_text})")
    }
}

#[derive(Debug, Error)]
pub enum GatewayBuildError {
    #[error("invalid API URL: {url}")]
    InvalidUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub size: u32,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordQuery {
    pub query: String,
    pub page: u32,
    pub size: u32,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemanticQuery {
    pub query: String,
    pub category: Option<String>,
}

fn push_category(pairs: &mut Vec<(&'static str, String)>, category: &Option<String>) {
    if let Some(c) = category.as_deref().filter(|c| !c.is_empty()) {
        pairs.push(("category", c.to_string()));
    }
}

impl ListQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        push_category(&mut pairs, &self.category);
        pairs
    }
}

impl KeywordQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("query", self.query.clone()),
            ("size", self.size.to_string()),
            ("page", self.page.to_string()),
        ];
        push_category(&mut pairs, &self.category);
        pairs
    }
}

impl SemanticQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("query", self.query.clone())];
        push_category(&mut pairs, &self.category);
        pairs
    }
}

/// The four catalog operations plus the category list.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_products(&self, query: &ListQuery) -> Result<ProductPage, ApiError>;

    async fn categories(&self) -> Result<Vec<String>, ApiError>;

    async fn search_keyword(&self, query: &KeywordQuery) -> Result<Vec<CardRecord>, ApiError>;

    async fn semantic_suggestions(
        &self,
        query: &SemanticQuery,
    ) -> Result<Vec<CardRecord>, ApiError>;

    async fn recommend(&self, doc_id: &str) -> Result<ProductDetail, ApiError>;
}

/// Best-effort message from an error body: `detail` or `message` of a JSON
/// body, the raw text otherwise, `default` when neither yields anything.
pub fn error_message(content_type: Option<&str>, body: &str, default: &str) -> String {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if is_json {
        let parsed: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "could not parse error body");
                return default.to_string();
            }
        };
        for key in ["detail", "message"] {
            match parsed.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Null) | Some(Value::String(_)) | None => {}
                Some(other) => return other.to_string(),
            }
        }
        return default.to_string();
    }
    let text = body.trim();
    if text.is_empty() {
        default.to_string()
    } else {
        text.to_string()
    }
}

#[derive(Deserialize)]
struct RawPage {
    data: Vec<Value>,
    #[serde(default)]
    total: u64,
}

#[derive(Deserialize)]
struct RawDetail {
    #[serde(default)]
    original_product: Option<ProductRecord>,
    #[serde(default)]
    recommendations: Option<Vec<Value>>,
}

fn decode_error(endpoint: &str, e: serde_json::Error) -> ApiError {
    ApiError::Decode {
        message: format!("{endpoint}: {e}"),
    }
}

pub fn decode_page(value: Value) -> Result<ProductPage, ApiError> {
    let raw: RawPage = serde_json::from_value(value).map_err(|e| decode_error("/products", e))?;
    Ok(ProductPage {
        data: CardRecord::classify_all(raw.data),
        total: raw.total,
    })
}

pub fn decode_records(endpoint: &str, value: Value) -> Result<Vec<CardRecord>, ApiError> {
    let raw: Vec<Value> = serde_json::from_value(value).map_err(|e| decode_error(endpoint, e))?;
    Ok(CardRecord::classify_all(raw))
}

pub fn decode_detail(value: Value) -> Result<ProductDetail, ApiError> {
    let raw: RawDetail = serde_json::from_value(value).map_err(|e| decode_error("/recommend", e))?;
    let original_product = raw.original_product.ok_or_else(|| ApiError::Shape {
        message: "no original product in response".to_string(),
    })?;
    Ok(ProductDetail {
        original_product,
        recommendations: CardRecord::classify_all(raw.recommendations.unwrap_or_default()),
    })
}

/// [`CatalogApi`] over HTTP with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base: Url,
}

impl HttpCatalog {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, GatewayBuildError> {
        let base = Url::parse(api_url.trim()).map_err(|_| GatewayBuildError::InvalidUrl {
            url: api_url.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(GatewayBuildError::InvalidUrl {
                url: api_url.to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayBuildError::HttpClientBuild { source: e })?;
        Ok(Self { client, base })
    }

    pub fn endpoint_url(&self, segments: &[&str], pairs: &[(&'static str, String)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }
        url
    }

    async fn get_json(&self, url: Url, default_message: &str) -> Result<Value, ApiError> {
        debug!(url = %url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                message: format!("{default_message}: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                message: error_message(content_type.as_deref(), &body, default_message),
            });
        }

        let text = resp.text().await.map_err(|e| ApiError::Transport {
            message: format!("{default_message}: {e}"),
        })?;
        serde_json::from_str(&text).map_err(|e| decode_error(url.path(), e))
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn list_products(&self, query: &ListQuery) -> Result<ProductPage, ApiError> {
        let url = self.endpoint_url(&["products"], &query.query_pairs());
        decode_page(self.get_json(url, "Could not load products").await?)
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint_url(&["categories"], &[]);
        let value = self.get_json(url, "Could not load categories").await?;
        serde_json::from_value(value).map_err(|e| decode_error("/categories", e))
    }

    async fn search_keyword(&self, query: &KeywordQuery) -> Result<Vec<CardRecord>, ApiError> {
        let url = self.endpoint_url(&["search-keyword"], &query.query_pairs());
        decode_records(
            "/search-keyword",
            self.get_json(url, "Keyword search failed").await?,
        )
    }

    async fn semantic_suggestions(
        &self,
        query: &SemanticQuery,
    ) -> Result<Vec<CardRecord>, ApiError> {
        let url = self.endpoint_url(&["search-semantic-suggestions"], &query.query_pairs());
        decode_records(
            "/search-semantic-suggestions",
            self.get_json(url, "Could not load suggestions").await?,
        )
    }

    async fn recommend(&self, doc_id: &str) -> Result<ProductDetail, ApiError> {
        let url = self.endpoint_url(&["recommend", doc_id], &[]);
        decode_detail(
            self.get_json(url, "Could not load details and recommendations")
                .await?,
        )
    }
}
