//! Anime-retail chain detail pages (animate-onlineshop.jp).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::normalize_jp_date;
use crate::infrastructure::parsing::images::{
    absolutize, best_from_srcset, dedup_preserving_order,
};
use crate::infrastructure::parsing::price::tax_flag;
use crate::infrastructure::parsing::text::{collapse_ws, digits_only, element_text, text_with_breaks};
use crate::infrastructure::parsing::{
    field_or_empty, first_text, first_text_with_breaks, select_all, select_first, SiteAdapter,
};

static MAKER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(発売元|メーカー|販売元|発売・販売元)\s*").expect("static regex"));
static LEADING_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[：:；]\s*").expect("static regex"));

const NAME: &str = "animate";

pub struct AnimateAdapter;

impl AnimateAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for AnimateAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(
            NAME,
            "title",
            first_text(doc, "#container .item_overview_detail > h1"),
        );

        let mut imgs = Vec::new();
        for el in select_all(
            doc,
            r##"#container .item_images .item_image_selected img, #container .item_images a[href$=".jpg"], #container .item_images a[href$=".png"], #container .item_images a[href$=".webp"]"##,
        ) {
            let src = if el.value().name() == "img" {
                el.value().attr("data-src").or_else(|| el.value().attr("src"))
            } else {
                el.value().attr("href")
            };
            if let Some(srcset) = el.value().attr("srcset") {
                if let Some(best) = best_from_srcset(srcset) {
                    imgs.push(absolutize(url, &best));
                }
            }
            if let Some(src) = src {
                imgs.push(absolutize(url, src));
            }
        }
        out.images = dedup_preserving_order(imgs);

        out.body = field_or_empty(
            NAME,
            "body",
            first_text_with_breaks(doc, "#item_productinfo > div"),
        );

        let info_text = select_first(doc, "#item_productinfo")
            .map(text_with_breaks)
            .unwrap_or_default();
        if let Some(line) = info_text.lines().map(collapse_ws).find(|l| MAKER_LINE.is_match(l)) {
            let value = MAKER_LINE.replace(&line, "");
            out.maker = LEADING_COLON.replace(value.trim(), "").to_string();
        }

        if let Ok(price_text) = first_text(
            doc,
            "#container .item_overview_detail .item_price p.price.new_price, \
             #container .item_overview_detail .item_price p.price",
        ) {
            out.price_value = digits_only(&price_text);
            out.price_currency = "JPY".to_string();
            let scope = first_text(doc, "#container .item_overview_detail .item_price")
                .unwrap_or_else(|_| price_text.clone());
            out.price_tax_included = tax_flag(&scope).to_string();
        }

        out.release_date = first_text(
            doc,
            "#container .item_overview_detail .item_status p.release, \
             #container .item_overview_detail .item_status p span",
        )
        .map(|t| normalize_jp_date(&t))
        .unwrap_or_default();

        let tags: Vec<String> = select_all(doc, "#container .items_label a, #container .items_label span")
            .into_iter()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        out.tags = dedup_preserving_order(tags).join(", ");

        // Caution lines (※ prefixed) become the overview.
        let notes: Vec<String> = info_text
            .lines()
            .map(collapse_ws)
            .filter(|line| line.starts_with('※'))
            .collect();
        out.overview = notes.join("\n");

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maker_strips_label_and_colon_remnant() {
        let html = r#"<html><body><div id="container">
            <div class="item_overview_detail">
              <h1>ホロライブ トレーディング缶バッジ</h1>
              <div class="item_price"><p class="price new_price">460円</p>（税込）</div>
              <div class="item_status"><p class="release">2025年12月下旬</p></div>
            </div>
            <div id="item_productinfo"><div>
              全8種<br>発売元：カバー<br>※ブラインド仕様です<br>※画像は見本です
            </div></div>
            <div class="items_label"><a>ホロライブ</a><span>缶バッジ</span></div>
          </div></body></html>"#;
        let doc = Html::parse_document(html);
        let url = Url::parse("https://www.animate-onlineshop.jp/pn/pd/2650000/").unwrap();
        let out = AnimateAdapter::new().extract(&url, &doc);
        assert_eq!(out.title, "ホロライブ トレーディング缶バッジ");
        assert_eq!(out.maker, "カバー");
        assert_eq!(out.price_value, "460");
        assert_eq!(out.price_tax_included, "TRUE");
        assert_eq!(out.release_date, "2025-12");
        assert_eq!(out.tags, "ホロライブ, 缶バッジ");
        assert_eq!(out.overview, "※ブラインド仕様です\n※画像は見本です");
    }
}
