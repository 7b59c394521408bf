//! Fallback adapter for hosts without a dedicated layout.

use scraper::Html;
use url::Url;

use crate::domain::RawFields;
use crate::infrastructure::parsing::images::images_from_srcset_or_src;
use crate::infrastructure::parsing::{
    field_or_empty, first_text, first_text_with_breaks, SiteAdapter,
};

const NAME: &str = "generic";

pub struct GenericAdapter;

impl GenericAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for GenericAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(&self, url: &Url, doc: &Html) -> RawFields {
        let mut out = RawFields::default();
        out.title = field_or_empty(NAME, "title", first_text(doc, "title, h1, h2"));
        out.body = field_or_empty(
            NAME,
            "body",
            first_text_with_breaks(doc, "main, article, body"),
        );
        out.images = images_from_srcset_or_src(doc, &["img"], url);
        out
    }
}
