//! Listing-page extractors.
//!
//! Four parser kinds cover the monitored storefronts: the figure
//! retailer's anchor grid, a selector-driven generic HTML parser, a
//! Shopify JSON product feed, and the candy-toy publisher's front page.
//! All of them return items in page order, newest first.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::error::ParseError;
use super::images::absolutize;
use super::text::{collapse_ws, element_text};
use crate::domain::ListingItem;

/// Which listing extractor a site uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    #[default]
    Amiami,
    Generic,
    Shopify,
    BandaiCandy,
}

/// How the generic extractor derives a stable item id from a link URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdRule {
    QueryParam { param: String },
    Regex { pattern: String },
}

/// Selector set driving [`extract_generic`].
#[derive(Debug, Clone, Deserialize)]
pub struct GenericSelectors {
    pub item: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    pub id: IdRule,
}

/// Options for the Shopify feed extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopifyOptions {
    /// Store origin override for building product URLs from handles.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn query_param(url: &Url, param: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Figure-retailer listing: every anchor carrying a `gcode` query
/// parameter is one item.
pub fn extract_amiami(html: &str, base: &Url) -> Vec<ListingItem> {
    static ANCHOR: Lazy<Selector> =
        Lazy::new(|| Selector::parse(r#"a[href*="detail?gcode="]"#).expect("static selector"));
    static NAME: Lazy<Selector> =
        Lazy::new(|| Selector::parse(".product_name_inner").expect("static selector"));
    static PRICE: Lazy<Selector> =
        Lazy::new(|| Selector::parse(".product_price").expect("static selector"));

    let doc = Html::parse_document(html);
    let mut items = Vec::new();
    for anchor in doc.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let full_url = absolutize(base, href);
        let Ok(parsed) = Url::parse(&full_url) else {
            continue;
        };
        let Some(gcode) = query_param(&parsed, "gcode") else {
            continue;
        };
        let title = anchor.select(&NAME).next().map(element_text).unwrap_or_default();
        let price = anchor.select(&PRICE).next().map(element_text).unwrap_or_default();
        items.push(ListingItem::new(gcode, title, full_url).with_price(price));
    }
    items
}

/// Selector-driven extractor for sites without a dedicated parser.
pub fn extract_generic(html: &str, base: &Url, selectors: &GenericSelectors) -> Vec<ListingItem> {
    let Ok(item_sel) = Selector::parse(&selectors.item) else {
        return Vec::new();
    };
    let link_sel = selectors
        .link
        .as_deref()
        .and_then(|s| Selector::parse(s).ok());
    let title_sel = selectors
        .title
        .as_deref()
        .and_then(|s| Selector::parse(s).ok());
    let price_sel = selectors
        .price
        .as_deref()
        .and_then(|s| Selector::parse(s).ok());

    let doc = Html::parse_document(html);
    let mut items = Vec::new();
    for node in doc.select(&item_sel) {
        let link_node = match &link_sel {
            Some(sel) => node.select(sel).next(),
            None => Some(node),
        };
        let Some(href) = link_node.and_then(|n| n.value().attr("href")) else {
            continue;
        };
        let full_url = absolutize(base, href);

        let id = match &selectors.id {
            IdRule::QueryParam { param } => Url::parse(&full_url)
                .ok()
                .and_then(|u| query_param(&u, param)),
            IdRule::Regex { pattern } => Regex::new(pattern).ok().and_then(|re| {
                re.captures(&full_url).map(|caps| {
                    caps.get(1)
                        .map(|m| m.as_str())
                        .unwrap_or_else(|| caps.get(0).map(|m| m.as_str()).unwrap_or(""))
                        .to_string()
                })
            }),
        };
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            continue;
        };

        let title = title_sel
            .as_ref()
            .and_then(|sel| node.select(sel).next())
            .map(element_text)
            .unwrap_or_default();
        let price = price_sel
            .as_ref()
            .and_then(|sel| node.select(sel).next())
            .map(element_text)
            .unwrap_or_default();
        items.push(ListingItem::new(id, title, full_url).with_price(price));
    }
    items
}

/// Candy-toy front page: product links shaped
/// `/candy/products/YYYY/ID.html`, deduplicated by id. Titles come from
/// the anchor text or an image `alt`; prices are filled by the detail
/// fetch later.
pub fn extract_bandai_candy(html: &str, base: &Url) -> Vec<ListingItem> {
    static ANCHOR: Lazy<Selector> =
        Lazy::new(|| Selector::parse(r#"a[href*="/candy/products/"]"#).expect("static selector"));
    static ALT_IMG: Lazy<Selector> =
        Lazy::new(|| Selector::parse("img[alt]").expect("static selector"));
    static PRODUCT_PATH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"/candy/products/\d{4}/(\d+)\.html").expect("static regex"));

    let doc = Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut items = Vec::new();
    for anchor in doc.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let full_url = absolutize(base, href);
        let Some(caps) = PRODUCT_PATH.captures(&full_url) else {
            continue;
        };
        let id = caps[1].to_string();
        if !seen.insert(id.clone()) {
            continue;
        }
        let mut title = element_text(anchor);
        if title.is_empty() {
            title = anchor
                .select(&ALT_IMG)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(collapse_ws)
                .unwrap_or_default();
        }
        items.push(ListingItem::new(id, title, full_url));
    }
    items
}

/// Shopify `/products.json` feed, sorted newest first by
/// `published_at` (falling back to `created_at`).
pub fn extract_shopify(
    raw: &str,
    source_url: &Url,
    options: &ShopifyOptions,
) -> Result<Vec<ListingItem>, ParseError> {
    let data: Value = serde_json::from_str(raw)?;
    let mut products: Vec<&Value> = data
        .get("products")
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default();

    let published = |prod: &Value| -> String {
        prod.get("published_at")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| prod.get("created_at").and_then(Value::as_str))
            .unwrap_or("")
            .to_string()
    };
    products.sort_by(|a, b| published(b).cmp(&published(a)));

    let store_base = match &options.base_url {
        Some(base) => format!("{}/", base.trim_end_matches('/')),
        None => format!(
            "{}://{}/",
            source_url.scheme(),
            source_url.host_str().unwrap_or_default()
        ),
    };

    let mut items = Vec::new();
    for prod in products {
        let title = collapse_ws(prod.get("title").and_then(Value::as_str).unwrap_or(""));
        if title.is_empty() {
            continue;
        }
        let handle = prod.get("handle").and_then(Value::as_str).unwrap_or("");
        let mut product_url = prod
            .get("online_store_url")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if product_url.is_empty() && !handle.is_empty() {
            if let Ok(base) = Url::parse(&store_base) {
                product_url = absolutize(&base, &format!("products/{handle}"));
            }
        }
        if product_url.is_empty() {
            continue;
        }

        let id = match prod.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ if !handle.is_empty() => handle.to_string(),
            _ => product_url.clone(),
        };

        let price = prod
            .get("variants")
            .and_then(Value::as_array)
            .and_then(|variants| {
                variants
                    .iter()
                    .filter_map(|v| v.get("price").and_then(Value::as_str))
                    .find(|p| !p.is_empty())
                    .or_else(|| variants.first().and_then(|v| v.get("price").and_then(Value::as_str)))
            })
            .map(super::price::normalize_feed_price)
            .unwrap_or_default();

        items.push(ListingItem::new(id, title, product_url).with_price(price));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn amiami_listing_extracts_gcode_items() {
        let html = r#"
            <ul>
              <li><a href="/top/detail/detail?gcode=FIGURE-177013">
                <span class="product_name_inner">ねんどろいど さくらみこ</span>
                <span class="product_price">7,800円</span>
              </a></li>
              <li><a href="/top/detail/detail?gcode=">no code</a></li>
              <li><a href="/top/other">unrelated</a></li>
            </ul>"#;
        let items = extract_amiami(html, &base("https://slist.amiami.jp/top/search/list"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "FIGURE-177013");
        assert_eq!(items[0].title, "ねんどろいど さくらみこ");
        assert_eq!(items[0].price, "7,800円");
        assert!(items[0].url.starts_with("https://slist.amiami.jp/top/detail/detail?gcode="));
    }

    #[test]
    fn generic_listing_with_regex_id() {
        let html = r#"
            <div class="goods"><a href="/item/detail/12345"><h3>item A</h3></a></div>
            <div class="goods"><a href="/item/detail/"><h3>no id</h3></a></div>"#;
        let selectors = GenericSelectors {
            item: ".goods".into(),
            link: Some("a".into()),
            title: Some("h3".into()),
            price: None,
            id: IdRule::Regex {
                pattern: r"/item/detail/(\d+)".into(),
            },
        };
        let items = extract_generic(html, &base("https://shop.example.jp/list"), &selectors);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "12345");
        assert_eq!(items[0].title, "item A");
    }

    #[test]
    fn generic_listing_with_query_param_id() {
        let selectors = GenericSelectors {
            item: ".it".into(),
            link: None,
            title: None,
            price: None,
            id: IdRule::QueryParam { param: "pid".into() },
        };
        // Without a link selector the item node itself carries the href.
        let html = r#"<a class="it" href="/d?pid=9">x</a>"#;
        let items = extract_generic(html, &base("https://s.example.jp/"), &selectors);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "9");
    }

    #[test]
    fn bandai_candy_dedups_by_id() {
        let html = r#"
            <a href="/candy/products/2025/10234.html"><img alt="チョコ玩具A" src="a.jpg"></a>
            <a href="/candy/products/2025/10234.html">dup</a>
            <a href="/candy/products/2024/999.html">玩具B</a>
            <a href="/candy/news/index.html">news</a>"#;
        let items = extract_bandai_candy(html, &base("https://www.bandai.co.jp/candy/"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "10234");
        assert_eq!(items[0].title, "チョコ玩具A");
        assert_eq!(items[1].id, "999");
    }

    #[test]
    fn shopify_feed_sorted_newest_first() {
        let feed = r#"{"products":[
            {"id":1,"handle":"old","title":"Old","published_at":"2025-01-01T00:00:00+09:00",
             "variants":[{"price":"4800.00"}]},
            {"id":2,"handle":"new","title":"New","published_at":"2025-06-01T00:00:00+09:00",
             "variants":[{"price":"5500.00"}]}
        ]}"#;
        let items = extract_shopify(
            feed,
            &base("https://shop.hololivepro.com/products.json"),
            &ShopifyOptions::default(),
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "2");
        assert_eq!(items[0].price, "5500");
        assert_eq!(items[0].url, "https://shop.hololivepro.com/products/new");
    }

    #[test]
    fn shopify_invalid_json_is_an_error() {
        let err = extract_shopify(
            "<html>maintenance</html>",
            &base("https://shop.hololivepro.com/products.json"),
            &ShopifyOptions::default(),
        );
        assert!(matches!(err, Err(ParseError::InvalidFeed(_))));
    }
}
