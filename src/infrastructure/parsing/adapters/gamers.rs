//! Anime-goods retailer detail pages (gamers.co.jp).
//!
//! The layout has no structured spec table; materials, modeler and
//! maker come from line scans over the body text, and the preorder
//! window is pulled out of free text that may spell the range with a
//! wave dash or give only a deadline.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

use super::{first_matching_line, jan_from_json_ld};
use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::normalize_jp_date;
use crate::infrastructure::parsing::images::{absolutize, dedup_preserving_order, has_image_ext, images_from_srcset_or_src};
use crate::infrastructure::parsing::price::tax_flag;
use crate::infrastructure::parsing::text::{
    collapse_ws, digits_only, document_text, element_text, find_labeled_jan, fold_fullwidth_digits,
    text_with_breaks,
};
use crate::infrastructure::parsing::{field_or_empty, first_text, select_all, select_first, SiteAdapter};

const NAME: &str = "gamers";

const DATE_PART: &str = r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日";

static SPEC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*仕様\s*[:：]").expect("static regex"));
static MATERIAL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(素材|材質)\s*[:：]").expect("static regex"));
static MODELER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^原型(制作|師)").expect("static regex"));
static PAINT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^彩色").expect("static regex"));
static MAKER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(発売元|メーカー|販売元|発売・販売)\s*[:：]").expect("static regex"));
static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*?[:：]\s*").expect("static regex"));
static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{DATE_PART}[\s\S]{{0,30}}[~〜～\-—–][\s\S]{{0,30}}{DATE_PART}"))
        .expect("static regex")
});
static END_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"[~〜～][^\n\r]{{0,10}}{DATE_PART}")).expect("static regex")
});
static SINGLE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(DATE_PART).expect("static regex"));
static PREORDER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(予約|受注|受付)[^\n\r]{0,80}").expect("static regex"));

fn format_date(caps: &regex::Captures<'_>, offset: usize) -> String {
    let month: u32 = caps[offset + 1].parse().unwrap_or(0);
    let day: u32 = caps[offset + 2].parse().unwrap_or(0);
    format!("{}-{:02}-{:02}", &caps[offset], month, day)
}

/// Preorder window from free text: explicit range first, then a
/// deadline-only form, then the first two dates near a 予約/受注 label.
fn preorder_window(text: &str) -> (String, String) {
    let folded = fold_fullwidth_digits(text);
    if let Some(caps) = DATE_RANGE.captures(&folded) {
        return (format_date(&caps, 1), format_date(&caps, 4));
    }
    let segment = PREORDER_LABEL
        .find(&folded)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| folded.clone());
    // Deadline-only form: the single date is the end, never the start.
    if let Some(caps) = END_ONLY.captures(&segment) {
        return (String::new(), format_date(&caps, 1));
    }
    let mut dates = SINGLE_DATE.captures_iter(&segment);
    let start = dates.next().map(|caps| format_date(&caps, 1)).unwrap_or_default();
    let end = dates.next().map(|caps| format_date(&caps, 1)).unwrap_or_default();
    (start, end)
}

pub struct GamersAdapter;

impl GamersAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for GamersAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(
            NAME,
            "title",
            first_text(doc, "h1.ttl_style01.txt_wrap, #item_detail > h1, h1"),
        );

        let mut imgs = images_from_srcset_or_src(
            doc,
            &[
                "#item_detail .item_detail_img img",
                "#item_detail .item_image_selected img",
                "#item_detail .itemThumbnails img",
                ".item_detail_img img, .item_image_selected img, .itemThumbnails img",
                ".item_images img, .detail_image img",
            ],
            url,
        );
        for anchor in select_all(
            doc,
            r##"#item_detail a[href$=".jpg"], #item_detail a[href$=".png"], #item_detail a[href$=".webp"], a[href$=".jpg"], a[href$=".png"], a[href$=".webp"]"##,
        ) {
            if let Some(href) = anchor.value().attr("href") {
                if has_image_ext(href) {
                    imgs.push(absolutize(url, href));
                }
            }
        }
        out.images = dedup_preserving_order(imgs);

        out.body = field_or_empty(
            NAME,
            "body",
            crate::infrastructure::parsing::first_text_with_breaks(
                doc,
                "#item_detail > div.item_detail_content > div.item_detail_content_inner.over, \
                 #item_detail .item_detail_content_inner, #item_detail .item_detail_content, \
                 .detail_info, #item_detail .note, #item_detail .item_overview, .item_overview",
            ),
        );
        out.overview = out.body.clone();

        // Structured fields from body lines.
        if let Some(spec) = first_matching_line(&out.body, &SPEC_LINE) {
            out.materials = collapse_ws(&SPEC_LINE.replace(&spec, ""));
        } else if let Some(mat) = first_matching_line(&out.body, &MATERIAL_LINE) {
            out.materials = collapse_ws(&LABEL_PREFIX.replace(&mat, ""));
        }
        let modeler_lines: Vec<String> = [&*MODELER_LINE, &*PAINT_LINE]
            .iter()
            .filter_map(|re| first_matching_line(&out.body, re))
            .collect();
        out.modeler = modeler_lines.join("\n");
        if let Some(maker) = first_matching_line(&out.body, &MAKER_LINE) {
            out.maker = collapse_ws(&MAKER_LINE.replace(&maker, ""));
        }

        if let Ok(price_text) = first_text(
            doc,
            ".item_detail_price p.price > span, .item_detail_price .price > span, \
             .item_detail_price .price, #item_detail .item_price .price, .item_price .price",
        ) {
            out.price_value = digits_only(&price_text);
            out.price_currency = "JPY".to_string();
            let scope = first_text(doc, ".item_detail_price, #item_detail .item_price, .item_price")
                .unwrap_or_else(|_| price_text.clone());
            out.price_tax_included = tax_flag(&scope).to_string();
        }

        out.release_date = first_text(
            doc,
            ".item_detail_release p.release, #item_detail .item_status p.release",
        )
        .map(|t| normalize_jp_date(&t))
        .unwrap_or_default();

        out.copyright = first_text(
            doc,
            "#item_detail p.copyright, #item_detail .copyright, p.copyright, .copyright",
        )
        .unwrap_or_else(|_| {
            document_text(doc)
                .lines()
                .map(collapse_ws)
                .find(|line| {
                    !line.is_empty()
                        && (line.contains('©') || line.contains("(C)") || line.contains("コピーライト"))
                })
                .unwrap_or_default()
        });

        let window_scope = select_first(doc, "#item_detail")
            .map(text_with_breaks)
            .unwrap_or_else(|_| document_text(doc));
        let (start, end) = preorder_window(&window_scope);
        out.preorder_start = start;
        out.preorder_end = end;

        let tags: Vec<String> = select_all(
            doc,
            "#item_detail section .items_label a, .items_label a, .items_label span",
        )
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
        out.tags = dedup_preserving_order(tags).join(", ");

        out.jan = jan_from_json_ld(doc)
            .or_else(|| find_labeled_jan(&document_text(doc)))
            .unwrap_or_default();

        out
    }
}
