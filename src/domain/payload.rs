//! Canonical publishing payload.
//!
//! A fixed-schema record of 36 named string fields, matching the sheet
//! header order of the downstream publisher. Values are never null;
//! empty string is the canonical "no value" state.

use serde::{Deserialize, Serialize};

/// Sheet header order consumed by the publishing collaborators.
pub const PAYLOAD_HEADERS: [&str; 36] = [
    "Date",
    "Title",
    "SourceTitle",
    "slug",
    "BodySource",
    "Body",
    "Tags",
    "category",
    "Keyword",
    "AffiliateLink",
    "ImageURL",
    "PriceValue",
    "PriceTaxIncluded",
    "PriceCurrency",
    "JAN",
    "TitleKey",
    "PreorderStart",
    "PreorderEnd",
    "ReleaseDate",
    "ShippingDate",
    "Maker",
    "Materials",
    "AgeRating",
    "Copyright",
    "Series",
    "Modeler",
    "Character",
    "SourceURL",
    "Bonus",
    "overview",
    "UpdatedAt",
    "WPPostID",
    "WPPostURL",
    "SourceHash",
    "NeedsReview",
    "status",
];

/// Normalized, deduplicated record for one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPayload {
    /// Ingestion timestamp in JST, `YYYY/MM/DD HH:MM:SS`.
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Title")]
    pub title: String,
    /// Link anchor text downstream; defaults to `Title` at ingestion.
    #[serde(rename = "SourceTitle")]
    pub source_title: String,
    #[serde(rename = "slug")]
    pub slug: String,
    /// JSON snapshot of the prompt subset (title, body, price and date fields).
    #[serde(rename = "BodySource")]
    pub body_source: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "Tags")]
    pub tags: String,
    #[serde(rename = "category")]
    pub category: String,
    #[serde(rename = "Keyword")]
    pub keyword: String,
    #[serde(rename = "AffiliateLink")]
    pub affiliate_link: String,
    /// Image URL list serialized as a `",\n"`-delimited multi-line string.
    #[serde(rename = "ImageURL")]
    pub image_url: String,
    #[serde(rename = "PriceValue")]
    pub price_value: String,
    #[serde(rename = "PriceTaxIncluded")]
    pub price_tax_included: String,
    #[serde(rename = "PriceCurrency")]
    pub price_currency: String,
    #[serde(rename = "JAN")]
    pub jan: String,
    /// `series|character|variant` grouping key.
    #[serde(rename = "TitleKey")]
    pub title_key: String,
    #[serde(rename = "PreorderStart")]
    pub preorder_start: String,
    #[serde(rename = "PreorderEnd")]
    pub preorder_end: String,
    #[serde(rename = "ReleaseDate")]
    pub release_date: String,
    #[serde(rename = "ShippingDate")]
    pub shipping_date: String,
    #[serde(rename = "Maker")]
    pub maker: String,
    #[serde(rename = "Materials")]
    pub materials: String,
    #[serde(rename = "AgeRating")]
    pub age_rating: String,
    #[serde(rename = "Copyright")]
    pub copyright: String,
    #[serde(rename = "Series")]
    pub series: String,
    #[serde(rename = "Modeler")]
    pub modeler: String,
    #[serde(rename = "Character")]
    pub character: String,
    #[serde(rename = "SourceURL")]
    pub source_url: String,
    #[serde(rename = "Bonus")]
    pub bonus: String,
    #[serde(rename = "overview")]
    pub overview: String,
    /// UTC ISO-8601 build timestamp.
    #[serde(rename = "UpdatedAt")]
    pub updated_at: String,
    #[serde(rename = "WPPostID")]
    pub wp_post_id: String,
    #[serde(rename = "WPPostURL")]
    pub wp_post_url: String,
    /// Content signature over the normalized field subset.
    #[serde(rename = "SourceHash")]
    pub source_hash: String,
    #[serde(rename = "NeedsReview")]
    pub needs_review: String,
    #[serde(rename = "status")]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_sheet_field_names() {
        let payload = CanonicalPayload {
            title: "figure".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&payload).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), PAYLOAD_HEADERS.len());
        for header in PAYLOAD_HEADERS {
            assert!(map.contains_key(header), "missing field {header}");
        }
        assert_eq!(map["Title"], "figure");
        // Empty fields serialize as empty strings, never null.
        assert_eq!(map["JAN"], "");
    }
}
