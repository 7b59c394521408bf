//! Candy-toy publisher detail pages (bandai.co.jp/candy/).

use scraper::Html;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::dates::normalize_jp_date;
use crate::infrastructure::parsing::images::{
    absolutize, background_image_url, best_from_srcset, dedup_preserving_order, has_image_ext,
    strip_query,
};
use crate::infrastructure::parsing::price::{first_price_group, tax_flag};
use crate::infrastructure::parsing::text::{document_text, find_labeled_jan};
use crate::infrastructure::parsing::{
    field_or_empty, first_text, first_text_with_breaks, select_all, select_first, SiteAdapter,
};

const NAME: &str = "bandai_candy";

const ARTICLE: &str = "#top > main > article.widthWrapper.marginTop2";
const DETAIL: &str = "#top > main > article.widthWrapper.marginTop2 > div.flexBlock.flexBetween \
                      > div.itemDetailWrapper.flexBlock.flexColumn.flexBetween";

pub struct BandaiCandyAdapter;

impl BandaiCandyAdapter {
    pub fn new() -> Self {
        Self
    }

    fn slider_images(&self, url: &Url, doc: &Html) -> Vec<String> {
        let slider = format!("{ARTICLE} > div.flexBlock.flexBetween > div.itemSliderWrapper");
        let mut imgs = Vec::new();
        if select_first(doc, &slider).is_err() {
            return imgs;
        }
        for img in select_all(doc, &format!("{slider} img, {slider} source")) {
            if let Some(srcset) = img.value().attr("srcset") {
                if let Some(best) = best_from_srcset(srcset) {
                    imgs.push(absolutize(url, &best));
                }
            }
            if let Some(src) = img
                .value()
                .attr("data-src")
                .or_else(|| img.value().attr("src"))
            {
                imgs.push(absolutize(url, src));
            }
        }
        for styled in select_all(doc, &format!("{slider} [style]")) {
            if let Some(style) = styled.value().attr("style") {
                if let Some(u) = background_image_url(style) {
                    imgs.push(absolutize(url, &u));
                }
            }
        }
        for anchor in select_all(doc, &format!("{slider} a[href]")) {
            if let Some(href) = anchor.value().attr("href") {
                if has_image_ext(href) {
                    imgs.push(absolutize(url, href));
                }
            }
        }
        dedup_preserving_order(imgs.iter().map(|u| strip_query(u)).collect())
    }
}

impl SiteAdapter for BandaiCandyAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(NAME, "title", first_text(doc, &format!("{DETAIL} > h2")));

        let body_sel = format!(
            "{ARTICLE} > div.bgWhite.boxRadius.paddingVertical2.paddingHorizontal3.marginTop3 > div"
        );
        out.body = field_or_empty(NAME, "body", first_text_with_breaks(doc, &body_sel));

        out.images = self.slider_images(url, doc);

        // Price rows quote the list price first, then the tax-included
        // figure in parens; the leading number is the value.
        if let Ok(price_text) =
            first_text(doc, &format!("{DETAIL} > table > tbody > tr:nth-child(1) > td"))
        {
            out.price_value = first_price_group(&price_text);
            out.price_currency = "JPY".to_string();
            out.price_tax_included = tax_flag(&price_text).to_string();
        }

        out.release_date = first_text(doc, &format!("{DETAIL} > table > tbody > tr:nth-child(2) > td"))
            .map(|t| normalize_jp_date(&t))
            .unwrap_or_default();

        out.age_rating = field_or_empty(
            NAME,
            "age_rating",
            first_text(doc, &format!("{DETAIL} > table > tbody > tr:nth-child(4)")),
        );

        out.copyright = field_or_empty(NAME, "copyright", first_text(doc, &format!("{body_sel} > p")));

        out.jan = find_labeled_jan(&document_text(doc)).unwrap_or_default();
        out
    }
}
