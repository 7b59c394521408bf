//! Goodsmile storefront detail pages (goodsmile.com).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::{find_jp_full_dates, normalize_jp_date};
use crate::infrastructure::parsing::images::{absolutize, dedup_preserving_order, strip_query};
use crate::infrastructure::parsing::price::tax_flag;
use crate::infrastructure::parsing::text::{digits_only, element_text};
use crate::infrastructure::parsing::{
    field_or_empty, first_attr, first_text, first_text_with_breaks, select_all, SiteAdapter,
};

static PRODUCT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/product/(\d+)").expect("static regex"));
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}年\d{1,2}月").expect("static regex"));

const NAME: &str = "goodsmile";

pub struct GoodsmileAdapter;

impl GoodsmileAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for GoodsmileAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        let product_id = PRODUCT_ID
            .captures(url.path())
            .map(|caps| caps[1].to_string());

        out.title = first_text(
            doc,
            ".b-product-info__title, .b-product-info__heading h1, h1",
        )
        .or_else(|_| first_attr(doc, r#"meta[property="og:title"]"#, "content"))
        .unwrap_or_default();

        // Slider and modal share one CDN path keyed by product id; drop
        // anything that belongs to another product's cross-sell block.
        let mut images = Vec::new();
        for node in select_all(
            doc,
            ".c-photo-product-slider__main img, .c-photo-product-modal__slider img, \
             .c-photo-product-slider__thumbnail img",
        ) {
            let src = node
                .value()
                .attr("data-src")
                .or_else(|| node.value().attr("src"));
            let Some(src) = src else { continue };
            let full = strip_query(&absolutize(url, src));
            if let Some(id) = &product_id {
                if !full.contains(id.as_str()) {
                    continue;
                }
            }
            images.push(full);
        }
        out.images = dedup_preserving_order(images);

        out.body = field_or_empty(
            NAME,
            "body",
            first_text_with_breaks(
                doc,
                "#container > main > div.l-content > article > div > section:nth-child(3) \
                 > div > div > div > div",
            ),
        );

        if let Ok(price_text) = first_text(
            doc,
            "#container > main > div.l-infomation > div > div > div:nth-child(3) > div > p > span",
        ) {
            out.price_value = digits_only(&price_text);
            out.price_currency = "JPY".to_string();
            let scope = first_text(
                doc,
                "#container > main > div.l-infomation > div > div > div:nth-child(3) > div > p",
            )
            .unwrap_or_else(|_| price_text.clone());
            out.price_tax_included = tax_flag(&scope).to_string();
        }

        if let Ok(status) = first_text(doc, "#status-text-block > p.c-text-body.b-product-info__status")
        {
            let dates = find_jp_full_dates(&status);
            if let Some(start) = dates.first() {
                out.preorder_start = start.clone();
            }
            if let Some(end) = dates.get(1) {
                out.preorder_end = end.clone();
            }
        }

        if let Ok(note) = first_text(
            doc,
            "#status-text-block > p.c-text-body.c-text-body--secondary.b-product-info__note",
        ) {
            let full = find_jp_full_dates(&note);
            if let Some(date) = full.first() {
                out.shipping_date = date.clone();
            } else if let Some(ym) = YEAR_MONTH.find(&note) {
                out.shipping_date = normalize_jp_date(ym.as_str());
            }
        }

        out.maker = field_or_empty(
            NAME,
            "maker",
            first_text(doc, "#specification > dl:nth-child(5) > dd > div > div > a"),
        );
        out.copyright = field_or_empty(
            NAME,
            "copyright",
            first_text(doc, "#specification > dl:nth-child(7) > dd > p"),
        );

        let mut overview_parts = Vec::new();
        for sel in [
            "#container > main > div.l-content > article > div > section:nth-child(6) \
             > div > div > div:nth-child(1) > ul > li:nth-child(1)",
            "#purchase-notes > ul > li:nth-child(1)",
        ] {
            if let Ok(part) = first_text_with_breaks(doc, sel) {
                overview_parts.push(part);
            }
        }
        out.overview = overview_parts.join("\n");
        if out.body.is_empty() {
            out.body = out.overview.clone();
        }

        let tags: Vec<String> = select_all(doc, "#tags-list li")
            .into_iter()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        out.tags = dedup_preserving_order(tags).join(", ");

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preorder_window_and_image_scoping() {
        let html = r#"<html><body>
            <div class="b-product-info__heading"><h1 class="b-product-info__title">ねんどろいど 風真いろは</h1></div>
            <div class="c-photo-product-slider__main">
              <img data-src="https://cdn.goodsmile.com/images/17890/main.jpg?w=800">
              <img src="https://cdn.goodsmile.com/images/99999/other.jpg">
            </div>
            <div id="status-text-block">
              <p class="c-text-body b-product-info__status">予約期間：2025年7月10日～2025年9月3日</p>
              <p class="c-text-body c-text-body--secondary b-product-info__note">2026年2月発送予定</p>
            </div>
            <div id="tags-list-wrap"><ul id="tags-list"><li>hololive</li><li>ねんどろいど</li></ul></div>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let url = Url::parse("https://www.goodsmile.com/ja/product/17890/x").unwrap();
        let out = GoodsmileAdapter::new().extract(&url, &doc);
        assert_eq!(out.title, "ねんどろいど 風真いろは");
        assert_eq!(out.preorder_start, "2025-07-10");
        assert_eq!(out.preorder_end, "2025-09-03");
        assert_eq!(out.shipping_date, "2026-02");
        assert_eq!(out.images, vec!["https://cdn.goodsmile.com/images/17890/main.jpg"]);
        assert_eq!(out.tags, "hololive, ねんどろいど");
    }

    #[test]
    fn title_falls_back_to_og_meta() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:title" content="POP UP PARADE 常闇トワ"></head><body></body></html>"#,
        );
        let url = Url::parse("https://www.goodsmile.com/ja/product/2222/y").unwrap();
        let out = GoodsmileAdapter::new().extract(&url, &doc);
        assert_eq!(out.title, "POP UP PARADE 常闇トワ");
    }
}
