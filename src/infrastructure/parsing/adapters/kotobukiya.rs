//! Hobby-maker storefront detail pages (kotobukiya.co.jp).

use scraper::Html;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::{is_iso_date_like, normalize_jp_date};
use crate::infrastructure::parsing::images::{absolutize, dedup_preserving_order, strip_query};
use crate::infrastructure::parsing::price::tax_flag;
use crate::infrastructure::parsing::text::{digits_only, document_text, find_jan, text_with_breaks};
use crate::infrastructure::parsing::{field_or_empty, first_text, select_all, SiteAdapter};

const NAME: &str = "kotobukiya";

pub struct KotobukiyaAdapter;

impl KotobukiyaAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for KotobukiyaAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(NAME, "title", first_text(doc, "#gallery > div.goodsspec_ > h1"));

        let mut imgs = Vec::new();
        for img in select_all(doc, "#img_gallery li img") {
            let src = img
                .value()
                .attr("src")
                .or_else(|| img.value().attr("data-original"))
                .or_else(|| img.value().attr("data-src"));
            if let Some(src) = src {
                imgs.push(strip_query(&absolutize(url, src)));
            }
        }
        out.images = dedup_preserving_order(imgs);

        // Body only; this layout's note blocks duplicate the body, so
        // overview stays empty.
        let parts: Vec<String> = select_all(doc, "#disp_fixed > div")
            .into_iter()
            .map(text_with_breaks)
            .filter(|p| !p.is_empty())
            .collect();
        out.body = parts.join("\n");

        out.price_value = first_text(
            doc,
            "#spec_price > div.normal_price_ > p > span.price_num_",
        )
        .map(|t| digits_only(&t))
        .unwrap_or_default();
        out.price_currency = "JPY".to_string();
        if let Ok(tax_text) = first_text(doc, "#spec_price > div.normal_price_ > p > span.tax_") {
            out.price_tax_included = tax_flag(&tax_text).to_string();
        }

        out.release_date = first_text(
            doc,
            "#gallery > div.goodsspec_ > div.goods_about > dl.goods_release_ > dd",
        )
        .map(|t| normalize_jp_date(&t))
        .unwrap_or_default();

        out.maker = field_or_empty(
            NAME,
            "maker",
            first_text(
                doc,
                "body > div.wrapper_ > div.container > div > div.goodsproductdetail_ > \
                 div.goods_info.cont1 > div > dl:nth-child(2) > dd > a",
            ),
        );
        out.materials = field_or_empty(
            NAME,
            "materials",
            first_text(
                doc,
                "body > div.wrapper_ > div.container > div > div.goodsproductdetail_ > \
                 div.goods_info.cont1 > div > dl:nth-child(6) > dd",
            ),
        );
        out.copyright = field_or_empty(
            NAME,
            "copyright",
            first_text(
                doc,
                "body > div.wrapper_ > div.container > div > div.goodsproductdetail_ > dl > dd, \
                 p.copyright, .copyright",
            ),
        );

        // Preorder deadline from the reservation banner, accepted only
        // when it normalizes to an ISO-shaped date.
        if let Ok(banner) = first_text(doc, "#spec_goods_comment") {
            let value = normalize_jp_date(&banner);
            if is_iso_date_like(&value) {
                out.preorder_end = value;
            }
        }

        out.jan = find_jan(&document_text(doc)).unwrap_or_default();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.kotobukiya.co.jp/product/product-0001234/").unwrap()
    }

    #[test]
    fn extracts_price_release_and_deadline() {
        let doc = Html::parse_document(
            r#"<html><body>
            <div id="gallery"><div class="goodsspec_">
              <h1>ARTFX J 天音かなた</h1>
              <div class="goods_about"><dl class="goods_release_"><dt>発売月</dt><dd>2026年5月</dd></dl></div>
            </div></div>
            <div id="spec_price"><div class="normal_price_"><p>
              <span class="price_num_">19,800</span><span class="price_unit_">円</span><span class="tax_">（税込）</span>
            </p></div></div>
            <div id="spec_goods_comment">ご予約締切：2025年11月30日</div>
            <div id="img_gallery"><ul>
              <li><img src="/img/goods/L/main.jpg?cache=1"></li>
              <li><img data-original="/img/goods/L/sub1.jpg"></li>
            </ul></div>
            <div id="disp_fixed"><div>全高：約240mm<br>素材：PVC</div></div>
            </body></html>"#,
        );
        let out = KotobukiyaAdapter::new().extract(&base(), &doc);
        assert_eq!(out.title, "ARTFX J 天音かなた");
        assert_eq!(out.price_value, "19800");
        assert_eq!(out.price_tax_included, "TRUE");
        assert_eq!(out.release_date, "2026-05");
        assert_eq!(out.preorder_end, "2025-11-30");
        assert_eq!(
            out.images,
            vec![
                "https://www.kotobukiya.co.jp/img/goods/L/main.jpg",
                "https://www.kotobukiya.co.jp/img/goods/L/sub1.jpg",
            ]
        );
        assert_eq!(out.body, "全高：約240mm\n素材：PVC");
        assert!(out.overview.is_empty());
    }
}
