//! Palverse figure-brand detail pages (palverse-figure.com).
//!
//! The product slider paints its images via inline `background-image`
//! styles, so the harvest goes through the style parser instead of
//! `src` attributes.

use scraper::Html;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::normalize_jp_date;
use crate::infrastructure::parsing::images::{
    absolutize, background_image_url, dedup_preserving_order, strip_query,
};
use crate::infrastructure::parsing::price::tax_flag;
use crate::infrastructure::parsing::text::digits_only;
use crate::infrastructure::parsing::{
    field_or_empty, first_text, first_text_with_breaks, select_all, SiteAdapter,
};

const NAME: &str = "palverse";

const DETAIL: &str = "#top > main > div > div.l-in__container > div.l-in__inner > div > div > div \
                      > div > div.p-product_detail";

pub struct PalverseAdapter;

impl PalverseAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for PalverseAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(
            NAME,
            "title",
            first_text(doc, &format!("{DETAIL} > div.p-product_detail__ttl")),
        );
        out.body = field_or_empty(
            NAME,
            "body",
            first_text_with_breaks(doc, &format!("{DETAIL} > div.p-product_detail__desc")),
        );

        let mut imgs = Vec::new();
        for el in select_all(
            doc,
            ".p-product__slide-inner .p-product_slide.js-pro-slide .p-product_slide__img-inner",
        ) {
            if let Some(style) = el.value().attr("style") {
                if let Some(u) = background_image_url(style) {
                    imgs.push(strip_query(&absolutize(url, &u)));
                }
            }
        }
        out.images = dedup_preserving_order(imgs);

        if let Ok(price_text) = first_text(doc, &format!("{DETAIL} > dl > dd:nth-child(2) > ul > li"))
        {
            out.price_value = digits_only(&price_text);
            out.price_currency = "JPY".to_string();
            // The tax marker sits in the sibling text of the price list.
            let scope = first_text(doc, &format!("{DETAIL} > dl > dd:nth-child(2)"))
                .unwrap_or_else(|_| price_text.clone());
            out.price_tax_included = tax_flag(&format!("{scope} {price_text}")).to_string();
        }

        out.materials = field_or_empty(
            NAME,
            "materials",
            first_text(doc, &format!("{DETAIL} > dl > dd:nth-child(4)")),
        );

        if let Ok(ship_text) = first_text(doc, &format!("{DETAIL} > dl > dd:nth-child(10)")) {
            out.shipping_date = normalize_jp_date(&ship_text);
        }

        out.copyright = field_or_empty(
            NAME,
            "copyright",
            first_text(doc, &format!("{DETAIL} > div.p-product_detail__copy > small")),
        );

        out
    }
}
