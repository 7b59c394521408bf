//! Listing-page entities and the persisted per-site cursor state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One row of a storefront's listing page.
///
/// `id` is a site-stable identifier (numeric code, product handle or a
/// regex-captured token); uniqueness holds only within one site's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub price: String,
}

impl ListingItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            price: String::new(),
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }
}

/// Persisted per-site state between polling runs.
///
/// `head_id` is either empty (no prior run) or the id of the most-recent
/// item observed in a prior run's filtered listing. The id set catches
/// items that reappear out of order; the head cursor bounds how far back
/// new-item detection scans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteState {
    /// All ids seen in the last successful run, serialized sorted.
    #[serde(default)]
    pub ids: BTreeSet<String>,
    #[serde(default)]
    pub head_id: String,
}

impl SiteState {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.head_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_ids_sorted() {
        let mut state = SiteState::default();
        state.ids.insert("b".to_string());
        state.ids.insert("a".to_string());
        state.head_id = "a".to_string();

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.find("\"a\"").unwrap() < json.find("\"b\"").unwrap());

        let back: SiteState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn state_tolerates_missing_fields() {
        let state: SiteState = serde_json::from_str("{}").unwrap();
        assert!(state.is_empty());
    }
}
