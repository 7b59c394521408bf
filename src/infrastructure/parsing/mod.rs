//! HTML extraction layer.
//!
//! One [`SiteAdapter`] per storefront layout, dispatched by host suffix
//! (plus a path gate where one host serves several layouts). Adapters
//! share the normalizers in the sibling modules and report per-field
//! misses as [`ExtractionGap`] values, which the cascade helpers turn
//! into fallback chains.

pub mod adapters;
pub mod dates;
pub mod error;
pub mod images;
pub mod listing;
pub mod price;
pub mod text;
pub mod title_key;

pub use error::{ExtractionGap, FieldResult, ParseError};

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::RawFields;

/// Extraction strategy for one storefront layout.
pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pull raw fields out of a parsed product page. Adapters never
    /// fail as a whole; fields a layout cannot supply stay empty.
    fn extract(&self, url: &Url, doc: &Html) -> RawFields;
}

/// Host-suffix dispatch rule. `path_contains` gates hosts that serve
/// more than one layout under different path prefixes.
pub struct HostRule {
    pub suffix: &'static str,
    pub path_contains: Option<&'static str>,
}

impl HostRule {
    fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        if !host.ends_with(self.suffix) {
            return false;
        }
        match self.path_contains {
            Some(fragment) => url.path().contains(fragment),
            None => true,
        }
    }
}

/// Ordered adapter table; first matching rule wins, unmatched URLs fall
/// through to the generic adapter.
pub struct AdapterRegistry {
    rules: Vec<(HostRule, Box<dyn SiteAdapter>)>,
    fallback: Box<dyn SiteAdapter>,
}

impl AdapterRegistry {
    /// The production adapter table.
    pub fn standard() -> Self {
        let rule = |suffix: &'static str| HostRule {
            suffix,
            path_contains: None,
        };
        let rules: Vec<(HostRule, Box<dyn SiteAdapter>)> = vec![
            (rule("amiami.jp"), Box::new(adapters::AmiamiAdapter::new())),
            (
                HostRule {
                    suffix: "bandai.co.jp",
                    path_contains: Some("/candy/"),
                },
                Box::new(adapters::BandaiCandyAdapter::new()),
            ),
            (
                rule("kotobukiya.co.jp"),
                Box::new(adapters::KotobukiyaAdapter::new()),
            ),
            (
                rule("palverse-figure.com"),
                Box::new(adapters::PalverseAdapter::new()),
            ),
            (
                rule("goodsmile.com"),
                Box::new(adapters::GoodsmileAdapter::new()),
            ),
            (
                rule("shop.hololivepro.com"),
                Box::new(adapters::HololiveShopAdapter::new()),
            ),
            (rule("amazon.co.jp"), Box::new(adapters::AmazonAdapter::new())),
            (rule("gamers.co.jp"), Box::new(adapters::GamersAdapter::new())),
            (
                rule("animate-onlineshop.jp"),
                Box::new(adapters::AnimateAdapter::new()),
            ),
        ];
        Self {
            rules,
            fallback: Box::new(adapters::GenericAdapter::new()),
        }
    }

    pub fn resolve(&self, url: &Url) -> &dyn SiteAdapter {
        for (rule, adapter) in &self.rules {
            if rule.matches(url) {
                return adapter.as_ref();
            }
        }
        self.fallback.as_ref()
    }

    /// Parse the document and run the adapter chosen for the URL.
    pub fn extract(&self, url: &Url, html: &str) -> RawFields {
        let adapter = self.resolve(url);
        debug!(adapter = adapter.name(), url = %url, "extracting detail page");
        let doc = Html::parse_document(html);
        adapter.extract(url, &doc)
    }
}

/// First element matched by a selector string.
pub fn select_first<'a>(doc: &'a Html, raw: &str) -> Result<ElementRef<'a>, ExtractionGap> {
    let selector =
        Selector::parse(raw).map_err(|_| ExtractionGap::BadSelector(raw.to_string()))?;
    doc.select(&selector)
        .next()
        .ok_or_else(|| ExtractionGap::NoMatch(raw.to_string()))
}

/// All elements matched by a selector string, empty when the selector
/// does not compile.
pub fn select_all<'a>(doc: &'a Html, raw: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(raw) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Collapsed text of the first selector match; a match whose text is
/// empty counts as a miss so cascades keep going.
pub fn first_text(doc: &Html, raw: &str) -> FieldResult {
    let value = text::element_text(select_first(doc, raw)?);
    if value.is_empty() {
        Err(ExtractionGap::NoMatch(raw.to_string()))
    } else {
        Ok(value)
    }
}

/// Multi-line text of the first selector match.
pub fn first_text_with_breaks(doc: &Html, raw: &str) -> FieldResult {
    let value = text::text_with_breaks(select_first(doc, raw)?);
    if value.is_empty() {
        Err(ExtractionGap::NoMatch(raw.to_string()))
    } else {
        Ok(value)
    }
}

/// Attribute of the first selector match.
pub fn first_attr(doc: &Html, raw: &str, attr: &'static str) -> FieldResult {
    let el = select_first(doc, raw)?;
    el.value()
        .attr(attr)
        .map(str::to_string)
        .ok_or(ExtractionGap::MissingAttr(attr))
}

/// Terminal of a fallback cascade: the extracted value, or empty with
/// the gap logged at debug level.
pub fn field_or_empty(adapter: &'static str, field: &'static str, result: FieldResult) -> String {
    match result {
        Ok(value) => value,
        Err(gap) => {
            debug!(adapter, field, %gap, "field not extracted");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn registry_dispatches_by_host_suffix() {
        let registry = AdapterRegistry::standard();
        assert_eq!(
            registry.resolve(&url("https://www.amiami.jp/top/detail/detail?gcode=FIGURE-1")).name(),
            "amiami"
        );
        assert_eq!(
            registry.resolve(&url("https://shop.hololivepro.com/products/foo")).name(),
            "hololive_shop"
        );
        assert_eq!(
            registry.resolve(&url("https://unknown.example.com/item/1")).name(),
            "generic"
        );
    }

    #[test]
    fn path_gate_restricts_shared_host() {
        let registry = AdapterRegistry::standard();
        assert_eq!(
            registry
                .resolve(&url("https://www.bandai.co.jp/candy/products/2025/12345.html"))
                .name(),
            "bandai_candy"
        );
        // Same host without the gated path falls through to generic.
        assert_eq!(
            registry.resolve(&url("https://www.bandai.co.jp/toys/item/1")).name(),
            "generic"
        );
    }

    #[test]
    fn first_text_treats_empty_match_as_miss() {
        let doc = Html::parse_document("<html><body><h1></h1><h2>name</h2></body></html>");
        let value = first_text(&doc, "h1").or_else(|_| first_text(&doc, "h2"));
        assert_eq!(value.unwrap(), "name");
    }

    #[test]
    fn bad_selector_is_a_gap_not_a_panic() {
        let doc = Html::parse_document("<p>x</p>");
        assert!(matches!(
            first_text(&doc, "p["),
            Err(ExtractionGap::BadSelector(_))
        ));
    }
}
