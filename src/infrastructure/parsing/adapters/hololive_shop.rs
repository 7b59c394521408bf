//! Talent-goods Shopify storefront detail pages (shop.hololivepro.com).
//!
//! Goods here sell in variants (sizes, voice bundles), so the price
//! field can hold a `name：price` list instead of a single number.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::find_jp_full_dates;
use crate::infrastructure::parsing::images::{dedup_preserving_order, images_from_srcset_or_src};
use crate::infrastructure::parsing::text::{collapse_ws, digits_only, element_text, text_with_breaks};
use crate::infrastructure::parsing::{field_or_empty, first_attr, first_text, select_all, SiteAdapter};

static MONEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)¥?\s*([0-9][0-9,]{2,})\s*(?:JPY)?").expect("static regex"));
static FULL_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)_1024x1024\.(?:jpe?g|png|webp)$").expect("static regex"));
static AUDITION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"試聴.*$").expect("static regex"));
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}\s*年\s*\d{1,2}\s*月").expect("static regex"));

const NAME: &str = "hololive_shop";

fn inner_of<'a>(details: ElementRef<'a>, selectors: &[&str]) -> ElementRef<'a> {
    for raw in selectors {
        if let Ok(sel) = Selector::parse(raw) {
            if let Some(el) = details.select(&sel).next() {
                return el;
            }
        }
    }
    details
}

fn summary_text(details: ElementRef<'_>) -> String {
    Selector::parse("summary")
        .ok()
        .and_then(|sel| details.select(&sel).next())
        .map(element_text)
        .unwrap_or_default()
}

/// First 3+ digit money group; decimal feed values lose their fraction.
fn extract_num(text: &str) -> String {
    if let Some(caps) = MONEY.captures(text) {
        let digits = digits_only(&caps[1]);
        if !digits.is_empty() {
            return digits;
        }
    }
    let whole = text.split('.').next().unwrap_or(text);
    digits_only(whole)
}

pub struct HololiveShopAdapter;

impl HololiveShopAdapter {
    pub fn new() -> Self {
        Self
    }

    fn body(&self, doc: &Html) -> String {
        let mut parts = Vec::new();
        if let Some(desc) = select_all(doc, ".Pdt_description").into_iter().next() {
            parts.push(text_with_breaks(desc));
        }
        let details = select_all(doc, "section.Pdt details, .Pdt details, details");
        let goods_detail = details
            .iter()
            .find(|d| summary_text(**d).contains("グッズ詳細"))
            .map(|d| inner_of(*d, &[".details_inner", "div", ".content", ".Accordion__Body"]));
        if let Some(inner) = goods_detail {
            parts.push(text_with_breaks(inner));
        } else {
            for d in &details {
                let text =
                    text_with_breaks(inner_of(*d, &["div", ".content", ".Accordion__Body"]));
                if !text.is_empty() {
                    parts.push(text);
                    break;
                }
            }
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }

    fn variant_prices(&self, doc: &Html) -> Vec<String> {
        let mut entries = Vec::new();
        for opt in select_all(doc, ".Pdt_variant .Option, .Pdt_options .Option, .Option") {
            let label = inner_of(opt, &["label.ProductOption__label"]);
            let title_node = inner_of(label, &[".Option_title"]);
            let title = collapse_ws(&AUDITION_SUFFIX.replace(&element_text(title_node), ""));
            let price_node = inner_of(
                label,
                &[
                    ".prtc_product_option_sp .Option_price .money",
                    ".prtc_product_option_flex_box .Option_price .money",
                    ".Option_price .money",
                    ".money",
                ],
            );
            let price = extract_num(&element_text(price_node));
            if title.is_empty() || price.is_empty() {
                continue;
            }
            entries.push(format!("{title}：{price}"));
        }
        dedup_preserving_order(entries)
    }
}

impl SiteAdapter for HololiveShopAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();

        out.title = first_text(
            doc,
            "section.Pdt_heading > h1.Pdt_title, .Pdt_heading > h1.Pdt_title, h1.Pdt_title, \
             section.Pdt_heading > h1, .Pdt_heading > h1, h1",
        )
        .or_else(|_| first_attr(doc, r#"meta[property="og:title"]"#, "content").map(|t| collapse_ws(&t)))
        .or_else(|_| first_text(doc, "section.Pdt_heading"))
        .unwrap_or_default();

        let imgs = images_from_srcset_or_src(
            doc,
            &[
                "#swiper-product .swiper-wrapper img",
                ".swiper-product .swiper-wrapper img",
                ".Product__Slideshow .swiper-wrapper img",
                ".swiper-wrapper .swiper-slide img",
            ],
            url,
        );
        let full_size: Vec<String> = imgs.iter().filter(|u| FULL_SIZE.is_match(u)).cloned().collect();
        out.images = if full_size.is_empty() { imgs } else { full_size };

        out.body = self.body(doc);

        let entries = self.variant_prices(doc);
        if !entries.is_empty() {
            out.price_value = entries.join(", ");
        } else {
            let meta = first_attr(
                doc,
                r#"meta[property="og:price:amount"], meta[property="product:price:amount"]"#,
                "content",
            )
            .or_else(|_| {
                first_text(doc, ".Pdt_price, [data-product-price], .price, .Price-item--regular")
            });
            if let Ok(text) = meta {
                out.price_value = extract_num(&text);
            }
        }
        if !out.price_value.is_empty() {
            out.price_currency = "JPY".to_string();
        }

        if let Ok(window) = first_text(doc, "section.Pdt_shipping p, .Pdt_shipping p") {
            let dates = find_jp_full_dates(&window);
            if let Some(start) = dates.first() {
                out.preorder_start = start.clone();
            }
            if let Some(end) = dates.get(1) {
                out.preorder_end = end.clone();
            }
        }

        if let Some(section) = select_all(doc, "section.Pdt_shipping, .Pdt_shipping")
            .into_iter()
            .next()
        {
            let text = text_with_breaks(section);
            // Scan from the delivery label so the preorder window's dates
            // are not mistaken for the shipping date.
            let scope = match text.find("お届け予定日") {
                Some(idx) => &text[idx..],
                None => text.as_str(),
            };
            if let Some(date) = find_jp_full_dates(scope).first() {
                out.shipping_date = date.clone();
            } else if let Some(ym) = YEAR_MONTH.find(scope) {
                out.shipping_date =
                    crate::infrastructure::parsing::dates::normalize_jp_date(ym.as_str());
            }
        }

        let details = select_all(doc, "section details, .Pdt details");
        let bonus = details
            .iter()
            .find(|d| summary_text(**d).contains("特典"))
            .map(|d| text_with_breaks(inner_of(*d, &["div", ".content", ".Accordion__Body"])));
        out.bonus = match bonus {
            Some(text) => text,
            None if details.len() > 1 => text_with_breaks(details[1]),
            None => String::new(),
        };

        out.overview = field_or_empty(
            NAME,
            "overview",
            crate::infrastructure::parsing::first_text_with_breaks(
                doc,
                "#Pdt_note > div, #Pdt_note, .Pdt_note > div",
            ),
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_price_list_and_shipping_window() {
        let html = r#"<html><body>
            <section class="Pdt_heading"><h1 class="Pdt_title">活動6周年記念グッズ さくらみこ</h1></section>
            <div class="Pdt_variant">
              <div class="Option"><label class="ProductOption__label">
                <span class="Option_title">フルセット</span>
                <span class="Option_price"><span class="money">¥12,000 JPY</span></span>
              </label></div>
              <div class="Option"><label class="ProductOption__label">
                <span class="Option_title">ボイス 試聴はこちら</span>
                <span class="Option_price"><span class="money">¥2,500</span></span>
              </label></div>
            </div>
            <section class="Pdt_shipping">
              <p>2025年8月1日(金)12:00～2025年9月1日(月)18:00</p>
              <p>お届け予定日：2025年12月中旬</p>
            </section>
            <section class="Pdt">
              <details><summary>グッズ詳細</summary><div class="details_inner">サイズ：W100mm<br>素材：アクリル</div></details>
              <details><summary>購入特典</summary><div>限定ボイス付き</div></details>
            </section>
            <div id="Pdt_note"><div>お一人様3点まで</div></div>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let url = Url::parse("https://shop.hololivepro.com/products/sakuramiko_an6th").unwrap();
        let out = HololiveShopAdapter::new().extract(&url, &doc);
        assert_eq!(out.title, "活動6周年記念グッズ さくらみこ");
        assert_eq!(out.price_value, "フルセット：12000, ボイス：2500");
        assert_eq!(out.price_currency, "JPY");
        assert_eq!(out.preorder_start, "2025-08-01");
        assert_eq!(out.preorder_end, "2025-09-01");
        assert_eq!(out.shipping_date, "2025-12");
        assert_eq!(out.body, "サイズ：W100mm\n素材：アクリル");
        assert_eq!(out.bonus, "限定ボイス付き");
        assert_eq!(out.overview, "お一人様3点まで");
    }

    #[test]
    fn full_size_images_preferred() {
        let html = r#"<div class="swiper-wrapper">
            <div class="swiper-slide"><img src="//cdn.shopify.com/s/files/a_200x200.jpg"></div>
            <div class="swiper-slide"><img src="//cdn.shopify.com/s/files/a_1024x1024.jpg"></div>
          </div>"#;
        let doc = Html::parse_document(html);
        let url = Url::parse("https://shop.hololivepro.com/products/x").unwrap();
        let out = HololiveShopAdapter::new().extract(&url, &doc);
        assert_eq!(out.images, vec!["https://cdn.shopify.com/s/files/a_1024x1024.jpg"]);
    }
}
