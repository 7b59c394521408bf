//! Raw field set produced by one site adapter.
//!
//! Every field is an explicitly defaulted string (or string list), so
//! "missing" and "empty" are the same representable state by construction.
//! Adapters fill whatever the page offers and leave the rest empty.

use serde::{Deserialize, Serialize};

/// Fixed superset of fields a detail-page adapter can extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFields {
    pub title: String,
    /// Multi-line body text (spec/description blocks).
    pub body: String,
    pub images: Vec<String>,
    pub maker: String,
    pub materials: String,
    pub modeler: String,
    pub price_value: String,
    pub price_currency: String,
    /// Tri-state: "TRUE", "FALSE" or "" (unknown).
    pub price_tax_included: String,
    pub release_date: String,
    pub shipping_date: String,
    pub preorder_start: String,
    pub preorder_end: String,
    pub tags: String,
    pub series: String,
    pub character: String,
    pub copyright: String,
    pub jan: String,
    pub overview: String,
    pub bonus: String,
    pub age_rating: String,
    /// Manual category override; passed through as-is when supplied.
    pub category: String,
}

impl RawFields {
    /// True when the adapter found nothing usable at all.
    pub fn is_blank(&self) -> bool {
        self.title.is_empty() && self.body.is_empty() && self.images.is_empty()
    }
}
