//! Marketplace detail pages (amazon.co.jp).
//!
//! The image block hides its full-resolution URLs in a
//! `data-a-dynamic-image` JSON attribute mapping URL to pixel size, so
//! candidates are ranked by area before the usual dedup. A per-field
//! selector override table (CSV, pointed at by `AMAZON_SELECTOR_CSV`)
//! patches holes in whatever the marketplace A/B-tests next.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::{is_iso_date_like, normalize_jp_date};
use crate::infrastructure::parsing::images::{
    best_from_srcset, has_image_ext, has_small_size_suffix, truncate_after_ext,
};
use crate::infrastructure::parsing::price::tax_flag_alt;
use crate::infrastructure::parsing::text::{collapse_ws, digits_only, element_text, text_with_breaks};
use crate::infrastructure::parsing::{
    field_or_empty, first_text, first_text_with_breaks, select_all, select_first, SiteAdapter,
};

/// Environment variable naming the selector-override CSV.
pub const SELECTOR_CSV_ENV: &str = "AMAZON_SELECTOR_CSV";

static DYNAMIC_IMAGE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(https?://[^"\s]+?\.(?:jpe?g|png|webp))"?\s*:\s*\[(\d+),(\d+)\]"#)
        .expect("static regex")
});
static BARE_IMAGE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://[^\x22\s]+?\.(?:jpe?g|png|webp)").expect("static regex"));
static DETAIL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[/年]\s*(\d{1,2})[/月]\s*(\d{1,2})").expect("static regex"));

const NAME: &str = "amazon";

/// Per-field selector overrides loaded from the first CSV data row.
#[derive(Debug, Default)]
struct SelectorOverrides {
    map: HashMap<String, String>,
}

impl SelectorOverrides {
    fn load(path: &Path) -> Self {
        let mut out = Self::default();
        let mut reader = match csv::Reader::from_path(path) {
            Ok(reader) => reader,
            Err(err) => {
                debug!(path = %path.display(), %err, "selector override csv unreadable");
                return out;
            }
        };
        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(_) => return out,
        };
        if let Some(Ok(record)) = reader.records().next() {
            for (key, value) in headers.iter().zip(record.iter()) {
                let selector = value.replace('\n', " ").trim().to_string();
                if !selector.is_empty() {
                    out.map.insert(key.trim_start_matches('\u{feff}').to_string(), selector);
                }
            }
        }
        out
    }

    fn from_env() -> Self {
        match std::env::var(SELECTOR_CSV_ENV) {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Self::default(),
        }
    }

    fn get(&self, field: &str) -> Option<&str> {
        self.map.get(field).map(String::as_str)
    }
}

pub struct AmazonAdapter;

impl AmazonAdapter {
    pub fn new() -> Self {
        Self
    }

    fn images(&self, doc: &Html) -> Vec<String> {
        // (url, area) candidates; area 0 when unknown.
        let mut candidates: Vec<(String, u64)> = Vec::new();
        for node in select_all(
            doc,
            "#imageBlock_feature_div [data-a-dynamic-image], #imageBlock_feature_div img, \
             #imageBlock_feature_div source, #imageBlock_feature_div span",
        ) {
            let value = node.value();
            let Some(s) = value
                .attr("data-a-dynamic-image")
                .or_else(|| value.attr("data-old-hires"))
                .or_else(|| value.attr("srcset"))
                .or_else(|| value.attr("src"))
            else {
                continue;
            };

            let pairs: Vec<_> = DYNAMIC_IMAGE_PAIR.captures_iter(s).collect();
            if !pairs.is_empty() {
                for caps in pairs {
                    let clean = truncate_after_ext(&caps[1]);
                    if !has_image_ext(&clean) {
                        continue;
                    }
                    let area = caps[2].parse::<u64>().unwrap_or(0) * caps[3].parse::<u64>().unwrap_or(0);
                    candidates.push((clean, area));
                }
                continue;
            }
            if value.attr("srcset").is_some() {
                if let Some(best) = best_from_srcset(s) {
                    let clean = truncate_after_ext(&best);
                    if has_image_ext(&clean) {
                        candidates.push((clean, 0));
                    }
                }
                continue;
            }
            let mut urls: Vec<String> =
                BARE_IMAGE_URL.find_iter(s).map(|m| m.as_str().to_string()).collect();
            if urls.is_empty() && s.starts_with("http") {
                urls.push(s.to_string());
            }
            for u in urls {
                let clean = truncate_after_ext(&u);
                if has_image_ext(&clean) {
                    candidates.push((clean, 0));
                }
            }
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        let mut seen = std::collections::HashSet::new();
        candidates
            .into_iter()
            .map(|(u, _)| u)
            .filter(|u| has_image_ext(u))
            .filter(|u| !has_small_size_suffix(u))
            .filter(|u| seen.insert(u.clone()))
            .collect()
    }

    fn apply_overrides(&self, doc: &Html, out: &mut RawFields) {
        let overrides = SelectorOverrides::from_env();
        if overrides.map.is_empty() {
            return;
        }
        if out.body.is_empty() {
            if let Some(sel) = overrides.get("Body") {
                let parts: Vec<String> = select_all(doc, sel)
                    .into_iter()
                    .map(text_with_breaks)
                    .filter(|p| !p.is_empty())
                    .collect();
                if !parts.is_empty() {
                    out.body = parts.join("\n");
                }
            }
        }
        if out.price_value.is_empty() {
            if let Some(sel) = overrides.get("PriceValue") {
                if let Ok(text) = first_text(doc, sel) {
                    out.price_value = digits_only(&text);
                    if !out.price_value.is_empty() && out.price_currency.is_empty() {
                        out.price_currency = "JPY".to_string();
                    }
                }
            }
        }
        if out.price_currency.is_empty() {
            if let Some(sel) = overrides.get("PriceCurrency") {
                if let Ok(sym) = first_text(doc, sel) {
                    let upper = sym.to_uppercase();
                    if sym.contains('¥') || sym.contains('円') || upper.contains("JPY") {
                        out.price_currency = "JPY".to_string();
                    }
                }
            }
        }
        if out.price_tax_included.is_empty() {
            if let Some(sel) = overrides.get("PriceTaxIncluded") {
                if let Ok(text) = first_text(doc, sel) {
                    out.price_tax_included = tax_flag_alt(&text).to_string();
                }
            }
        }
        if out.shipping_date.is_empty() {
            if let Some(sel) = overrides.get("ShippingDate") {
                if let Ok(text) = first_text(doc, sel) {
                    let value = normalize_jp_date(&text);
                    if is_iso_date_like(&value) {
                        out.shipping_date = value;
                    }
                }
            }
        }
        if out.copyright.is_empty() {
            if let Some(sel) = overrides.get("Copyright") {
                if let Ok(text) = first_text(doc, sel) {
                    out.copyright = text;
                }
            }
        }
    }
}

impl SiteAdapter for AmazonAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, _url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(NAME, "title", first_text(doc, "#productTitle"));
        out.images = self.images(doc);

        if let Ok(price_text) = first_text(doc, ".a-price .a-offscreen") {
            out.price_value = digits_only(&price_text);
            out.price_currency = "JPY".to_string();
        }

        if let Ok(bullets) = select_first(
            doc,
            "#detailBullets_feature_div, #productDetails_detailBullets_sections1, #availability",
        ) {
            let text = element_text(bullets);
            if let Some(caps) = DETAIL_DATE.captures(&text) {
                let month: u32 = caps[2].parse().unwrap_or(0);
                let day: u32 = caps[3].parse().unwrap_or(0);
                out.release_date = format!("{}-{:02}-{:02}", &caps[1], month, day);
            }
        }

        if let Ok(tax_text) = first_text(doc, "#taxInclusiveMessage") {
            out.price_tax_included = tax_flag_alt(&tax_text).to_string();
        }

        // Details table keyed by row label, then legacy fixed positions.
        for row in select_all(doc, "table.prodDetTable tr") {
            let th = select_first_in(row, "th");
            let td = select_first_in(row, "td");
            let (Some(th), Some(td)) = (th, td) else { continue };
            let key = element_text(th);
            if key.contains("メーカー名") || key.contains("ブランド名") {
                out.maker = element_text(td);
                break;
            }
        }
        if out.maker.is_empty() {
            out.maker = first_text(
                doc,
                "#productDetails_expanderTables_depthRightSections > div > div > div > table \
                 > tbody > tr:nth-child(3) > td",
            )
            .or_else(|_| {
                first_text(
                    doc,
                    "#productDetails_expanderTables_depthRightSections > div > div > div > table \
                     > tbody > tr:nth-child(1) > th",
                )
            })
            .unwrap_or_default();
        }

        if let Ok(alert) = first_text_with_breaks(
            doc,
            r#"[data-card-metrics-id="universal-product-alert_DetailPage_0"]"#,
        ) {
            out.overview = collapse_ws(&alert);
        }

        self.apply_overrides(doc, &mut out);
        out
    }
}

fn select_first_in<'a>(
    el: scraper::ElementRef<'a>,
    raw: &str,
) -> Option<scraper::ElementRef<'a>> {
    scraper::Selector::parse(raw)
        .ok()
        .and_then(|sel| el.select(&sel).next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_image_attribute_ranked_by_area() {
        let html = r#"<div id="imageBlock_feature_div">
            <img data-a-dynamic-image='{"https://m.media.example/a.jpg":[116,116],"https://m.media.example/b.jpg":[500,500]}'>
            <img src="https://m.media.example/c.US40_.jpg">
          </div>"#;
        let doc = Html::parse_document(html);
        let out = AmazonAdapter::new().images(&doc);
        // Largest area first; the 40px thumbnail is dropped.
        assert_eq!(
            out,
            vec!["https://m.media.example/b.jpg", "https://m.media.example/a.jpg"]
        );
    }

    #[test]
    fn maker_from_detail_table_label() {
        let html = r#"<html><body>
            <span id="productTitle"> ホロライブ ねんどろいど 尾丸ポルカ </span>
            <div class="a-price"><span class="a-offscreen">￥8,140</span></div>
            <div id="detailBullets_feature_div">発売日 ： 2026/3/31</div>
            <table class="prodDetTable">
              <tr><th>梱包サイズ</th><td>10 x 10 cm</td></tr>
              <tr><th>メーカー名</th><td>グッドスマイルカンパニー</td></tr>
            </table>
          </body></html>"#;
        let doc = Html::parse_document(html);
        let url = Url::parse("https://www.amazon.co.jp/dp/B0EXAMPLE").unwrap();
        let out = AmazonAdapter::new().extract(&url, &doc);
        assert_eq!(out.title, "ホロライブ ねんどろいど 尾丸ポルカ");
        assert_eq!(out.price_value, "8140");
        assert_eq!(out.price_currency, "JPY");
        assert_eq!(out.release_date, "2026-03-31");
        assert_eq!(out.maker, "グッドスマイルカンパニー");
    }
}
