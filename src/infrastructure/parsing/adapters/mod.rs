//! Per-site detail-page adapters.
//!
//! Each adapter owns the selector cascades for one storefront layout.
//! They share the JSON-LD and line-scan helpers below; everything else
//! comes from the normalizer modules.

mod amazon;
mod amiami;
mod animate;
mod bandai_candy;
mod gamers;
mod generic;
mod goodsmile;
mod hololive_shop;
mod kotobukiya;
mod palverse;

pub use amazon::AmazonAdapter;
pub use amiami::AmiamiAdapter;
pub use animate::AnimateAdapter;
pub use bandai_candy::BandaiCandyAdapter;
pub use gamers::GamersAdapter;
pub use generic::GenericAdapter;
pub use goodsmile::GoodsmileAdapter;
pub use hololive_shop::HololiveShopAdapter;
pub use kotobukiya::KotobukiyaAdapter;
pub use palverse::PalverseAdapter;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::text::{collapse_ws, fold_fullwidth_digits};

/// 13-digit code from a JSON-LD block's `gtin13`/`gtin`/`sku`, after
/// width folding. Malformed blocks are skipped, not errors.
pub(crate) fn jan_from_json_ld(doc: &Html) -> Option<String> {
    static LD_JSON: Lazy<Selector> =
        Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector"));
    for script in doc.select(&LD_JSON) {
        let raw: String = script.text().collect();
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        let candidate = ["gtin13", "gtin", "sku"]
            .iter()
            .filter_map(|key| data.get(*key))
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .next();
        if let Some(candidate) = candidate {
            let digits: String = fold_fullwidth_digits(&candidate)
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            if digits.len() == 13 {
                return Some(digits);
            }
        }
    }
    None
}

/// First line matching the regex, collapsed.
pub(crate) fn first_matching_line(lines: &str, re: &Regex) -> Option<String> {
    lines
        .lines()
        .map(collapse_ws)
        .find(|line| re.is_match(line))
}

/// First line matching the regex with the label prefix stripped.
pub(crate) fn line_value_after_label(lines: &str, re: &Regex) -> Option<String> {
    first_matching_line(lines, re).map(|line| collapse_ws(&re.replace(&line, "")))
}
