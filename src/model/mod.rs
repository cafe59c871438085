//! Catalog records as the backend sends them, classified once at the
//! gateway boundary into [`CardRecord`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The product's own identifier. Only used to seed the cosmetic star rating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Int(i64),
    Text(String),
}

impl SourceId {
    pub fn as_text(&self) -> String {
        match self {
            SourceId::Int(v) => v.to_string(),
            SourceId::Text(v) => v.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de_price")]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Prices arrive as numbers, numeric strings or null depending on how the
/// catalog was imported.
fn de_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredSuggestion {
    pub doc_id: String,
    pub product: ProductRecord,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidRecord {
    pub reason: String,
}

/// A single entry of a result list.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardRecord {
    Product(ProductRecord),
    Suggestion(ScoredSuggestion),
    Invalid(InvalidRecord),
}

#[derive(Deserialize)]
struct RawSuggestion {
    #[serde(rename = "_id", default)]
    doc_id: Option<String>,
    #[serde(default)]
    product: Option<ProductRecord>,
    #[serde(default)]
    score: Option<f64>,
}

impl CardRecord {
    fn invalid(reason: impl Into<String>) -> Self {
        CardRecord::Invalid(InvalidRecord {
            reason: reason.into(),
        })
    }

    /// Decides the record variant from the keys present on the object.
    ///
    /// An object carrying both `product` and `score` is a suggestion, one
    /// carrying `id` without a nested `product` is a bare product, anything
    /// else is invalid. A record without a doc-id is invalid too.
    pub fn classify(value: Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::invalid("record is not an object");
        };

        if obj.contains_key("product") && obj.contains_key("score") {
            let raw: RawSuggestion = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => return Self::invalid(format!("malformed suggestion: {e}")),
            };
            let Some(doc_id) = raw.doc_id.filter(|id| !id.is_empty()) else {
                return Self::invalid("suggestion is missing _id");
            };
            let Some(product) = raw.product else {
                return Self::invalid(format!("suggestion {doc_id} has no product"));
            };
            let Some(score) = raw.score else {
                return Self::invalid(format!("suggestion {doc_id} has no numeric score"));
            };
            return CardRecord::Suggestion(ScoredSuggestion {
                doc_id,
                product,
                score,
            });
        }

        if obj.contains_key("id") && !obj.contains_key("product") {
            let product: ProductRecord = match serde_json::from_value(value) {
                Ok(p) => p,
                Err(e) => return Self::invalid(format!("malformed product: {e}")),
            };
            if product.doc_id.as_deref().unwrap_or("").is_empty() {
                return Self::invalid("product is missing _id");
            }
            return CardRecord::Product(product);
        }

        Self::invalid("unrecognized record shape")
    }

    pub fn classify_all(values: Vec<Value>) -> Vec<CardRecord> {
        values.into_iter().map(Self::classify).collect()
    }

    pub fn doc_id(&self) -> Option<&str> {
        match self {
            CardRecord::Product(p) => p.doc_id.as_deref(),
            CardRecord::Suggestion(s) => Some(s.doc_id.as_str()),
            CardRecord::Invalid(_) => None,
        }
    }

    pub fn product(&self) -> Option<&ProductRecord> {
        match self {
            CardRecord::Product(p) => Some(p),
            CardRecord::Suggestion(s) => Some(&s.product),
            CardRecord::Invalid(_) => None,
        }
    }
}

/// One page of the product listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductPage {
    pub data: Vec<CardRecord>,
    pub total: u64,
}

/// Detail lookup: the product itself plus similar items.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductDetail {
    pub original_product: ProductRecord,
    pub recommendations: Vec<CardRecord>,
}
