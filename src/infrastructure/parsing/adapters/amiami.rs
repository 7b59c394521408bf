//! Figure-retailer detail pages (amiami.jp).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

use super::jan_from_json_ld;
use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::{is_iso_date_like, normalize_jp_date};
use crate::infrastructure::parsing::images::{
    absolutize, dedup_preserving_order, has_image_ext, images_from_srcset_or_src,
    looks_like_thumbnail, strip_query,
};
use crate::infrastructure::parsing::price::{normalize_price, tax_flag};
use crate::infrastructure::parsing::text::{digits_only, document_text, find_labeled_jan};
use crate::infrastructure::parsing::{
    field_or_empty, first_attr, first_text, first_text_with_breaks, select_all, select_first,
    SiteAdapter,
};

static PRODUCT_IMAGE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/images/product/(main|review)/").expect("static regex"));

const NAME: &str = "amiami";

pub struct AmiamiAdapter;

impl AmiamiAdapter {
    pub fn new() -> Self {
        Self
    }

    fn images(&self, url: &Url, doc: &Html) -> Vec<String> {
        let mut imgs = Vec::new();
        if let Ok(main) = first_attr(doc, "#detail_detail__main_image_area", "data-main-image") {
            imgs.push(absolutize(url, &main));
        }
        imgs.extend(images_from_srcset_or_src(
            doc,
            &["#detail_detail__main_image_area img"],
            url,
        ));
        for el in select_all(doc, "#gallery [data-item-image], .gallery_area [data-item-image]") {
            if let Some(item) = el.value().attr("data-item-image") {
                imgs.push(absolutize(url, item));
            }
        }
        let imgs = dedup_preserving_order(imgs.iter().map(|u| strip_query(u)).collect());

        // Keep main/review product shots only, like the storefront's own
        // gallery script; fall back to everything when that empties the set.
        let large: Vec<String> = imgs
            .iter()
            .filter(|u| PRODUCT_IMAGE_PATH.is_match(u))
            .filter(|u| !looks_like_thumbnail(u))
            .filter(|u| has_image_ext(u))
            .cloned()
            .collect();
        if large.is_empty() {
            imgs
        } else {
            large
        }
    }

    fn release_date(&self, doc: &Html) -> String {
        let direct = first_text(
            doc,
            "#maincontents > div.sales_overview > dl > dd.releasedate, \
             #detail_detail__releaseDate, .item_detail_release p.release, \
             .item_status p.release",
        )
        .map(|t| normalize_jp_date(&t));
        if let Ok(value) = direct {
            return value;
        }
        // Scan page text for a line naming a 発売 year.
        static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("static regex"));
        document_text(doc)
            .lines()
            .find(|line| line.contains("発売") && YEAR.is_match(line))
            .map(normalize_jp_date)
            .filter(|v| is_iso_date_like(v))
            .unwrap_or_default()
    }
}

impl SiteAdapter for AmiamiAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(
            NAME,
            "title",
            first_text(doc, "#maincontents > div.title_area > h2"),
        );
        out.images = self.images(url, doc);

        out.overview = field_or_empty(
            NAME,
            "overview",
            first_text_with_breaks(
                doc,
                "#maincontents > div.sales_overview > dl > dd.remarks, \
                 #detail__overview .note, #detail__overview > dl > dd.remarks, \
                 #maincontents .note",
            ),
        );

        let mut body_parts = Vec::new();
        for sel in ["#detail_detail__item_spec", "#detail_detail__item_detail"] {
            if let Ok(part) = first_text_with_breaks(doc, sel) {
                body_parts.push(part);
            }
        }
        out.body = body_parts.join("\n");
        if out.body.is_empty() {
            out.body = out.overview.clone();
        }

        match first_text(doc, "#detail_detail__item_price") {
            Ok(price_text) => {
                out.price_value = normalize_price(&price_text);
                out.price_currency = "JPY".to_string();
                let scope = format!("{} {}", price_text, out.body);
                out.price_tax_included = tax_flag(&scope).to_string();
            }
            Err(_) => {
                if let Ok(meta) = first_attr(
                    doc,
                    r#"meta[property="og:price:amount"], meta[property="product:price:amount"]"#,
                    "content",
                ) {
                    out.price_value = digits_only(&meta);
                    out.price_currency = "JPY".to_string();
                }
            }
        }

        out.release_date = self.release_date(doc);

        out.maker = field_or_empty(
            NAME,
            "maker",
            first_text(doc, "#maincontents > div.sales_overview > dl > dd.brand > div > a"),
        );
        out.series = field_or_empty(
            NAME,
            "series",
            first_text(
                doc,
                "#maincontents > div.sales_overview > dl > dd.seriestitle > div:nth-child(1) > a, \
                 #maincontents > div.sales_overview > dl > dd.originaltitle > div:nth-child(1) > a",
            ),
        );
        out.character = field_or_empty(
            NAME,
            "character",
            first_text(doc, "#maincontents > div.sales_overview > dl > dd.charactername > div > a"),
        );
        out.modeler = field_or_empty(
            NAME,
            "modeler",
            first_text(doc, "#maincontents > div.sales_overview > dl > dd.modeler"),
        );
        out.copyright = field_or_empty(
            NAME,
            "copyright",
            first_text(doc, "#maincontents > div.image_area > p.copyright, p.copyright"),
        );

        let tags: Vec<String> = select_all(doc, "#explain > div > a:nth-child(1)")
            .into_iter()
            .map(crate::infrastructure::parsing::text::element_text)
            .filter(|t| !t.is_empty())
            .collect();
        out.tags = dedup_preserving_order(tags).join(", ");

        out.jan = jan_from_json_ld(doc).unwrap_or_default();
        if out.jan.is_empty() {
            let scope = select_first(doc, "#detail_detail__item_spec, #detail__overview, #maincontents")
                .map(crate::infrastructure::parsing::text::text_with_breaks)
                .unwrap_or_else(|_| document_text(doc));
            out.jan = find_labeled_jan(&scope).unwrap_or_default();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    fn base() -> Url {
        Url::parse("https://www.amiami.jp/top/detail/detail?gcode=FIGURE-1").unwrap()
    }

    #[test]
    fn extracts_core_fields() {
        let doc = page(
            r#"
            <div id="maincontents">
              <div class="title_area"><h2>ねんどろいど 白上フブキ</h2></div>
              <div class="sales_overview"><dl>
                <dd class="releasedate">2026年03月発売予定</dd>
                <dd class="brand"><div><a>グッドスマイルカンパニー</a></div></dd>
                <dd class="charactername"><div><a>白上フブキ</a></div></dd>
                <dd class="remarks">再販分です</dd>
              </dl></div>
            </div>
            <div id="detail_detail__item_price">12%OFF! 6,980円（税込）</div>
            <div id="detail_detail__item_spec">サイズ：約100mm<br>JANコード：4580590126978</div>
            "#,
        );
        let out = AmiamiAdapter::new().extract(&base(), &doc);
        assert_eq!(out.title, "ねんどろいど 白上フブキ");
        assert_eq!(out.price_value, "6980");
        assert_eq!(out.price_tax_included, "TRUE");
        assert_eq!(out.price_currency, "JPY");
        assert_eq!(out.release_date, "2026-03");
        assert_eq!(out.maker, "グッドスマイルカンパニー");
        assert_eq!(out.character, "白上フブキ");
        assert_eq!(out.overview, "再販分です");
        assert_eq!(out.jan, "4580590126978");
        assert!(out.body.contains("サイズ：約100mm"));
    }

    #[test]
    fn image_filter_keeps_main_and_review_shots() {
        let doc = page(
            r#"
            <div id="detail_detail__main_image_area" data-main-image="/images/product/main/261/1.jpg">
              <img src="/images/product/thumbnail/261/1_s.jpg">
            </div>
            <div id="gallery">
              <div data-item-image="/images/product/review/261/2.jpg?v=3"></div>
            </div>
            "#,
        );
        let out = AmiamiAdapter::new().extract(&base(), &doc);
        assert_eq!(
            out.images,
            vec![
                "https://www.amiami.jp/images/product/main/261/1.jpg",
                "https://www.amiami.jp/images/product/review/261/2.jpg",
            ]
        );
    }

    #[test]
    fn meta_price_fallback() {
        let doc = page(r#"<meta property="og:price:amount" content="5,500">"#);
        let out = AmiamiAdapter::new().extract(&base(), &doc);
        assert_eq!(out.price_value, "5500");
        assert_eq!(out.price_currency, "JPY");
        assert_eq!(out.price_tax_included, "");
    }
}
