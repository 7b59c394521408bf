//! Canonical payload assembly from one adapter's raw fields.
//!
//! Besides copying fields across, this step owns the derived values:
//! the prompt snapshot (`BodySource`), the grouping key (`TitleKey`)
//! and the content signature (`SourceHash`). The signature covers the
//! normalized content fields only, never the timestamps, so re-scraping
//! an unchanged page yields the same hash.

use chrono::{FixedOffset, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::application::publish::MirrorCache;
use crate::domain::{CanonicalPayload, RawFields};
use crate::infrastructure::parsing::text::collapse_ws;
use crate::infrastructure::parsing::title_key::build_title_key;

/// Field subset snapshotted into `BodySource` for downstream text
/// generation, in snapshot order.
const PROMPT_FIELDS: [&str; 8] = [
    "Title",
    "Body",
    "PriceValue",
    "PriceCurrency",
    "PreorderStart",
    "PreorderEnd",
    "ReleaseDate",
    "ShippingDate",
];

/// Body contribution to the signature is capped so trailing boilerplate
/// edits far down the page do not churn the hash.
const BODY_SIGNATURE_CHARS: usize = 2000;

static JST: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(9 * 3600).expect("static offset"));

fn prompt_field<'a>(fields: &'a RawFields, key: &str) -> &'a str {
    match key {
        "Title" => &fields.title,
        "Body" => &fields.body,
        "PriceValue" => &fields.price_value,
        "PriceCurrency" => &fields.price_currency,
        "PreorderStart" => &fields.preorder_start,
        "PreorderEnd" => &fields.preorder_end,
        "ReleaseDate" => &fields.release_date,
        "ShippingDate" => &fields.shipping_date,
        _ => "",
    }
}

/// JSON snapshot of the non-empty prompt fields. `Title` and `Body`
/// are always present, even when empty, so the downstream prompt has
/// stable anchors.
fn body_source(fields: &RawFields, title: &str) -> String {
    let mut map = Map::new();
    for key in PROMPT_FIELDS {
        let value = prompt_field(fields, key).trim();
        if !value.is_empty() {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    if !map.contains_key("Title") {
        map.insert("Title".to_string(), Value::String(title.to_string()));
    }
    map.insert("Body".to_string(), Value::String(fields.body.clone()));
    Value::Object(map).to_string()
}

/// Content signature: the pipe-joined normalized field list, hashed.
fn source_hash(fields: &RawFields, title: &str, images: &[String]) -> String {
    let body_norm: String = collapse_ws(&fields.body)
        .chars()
        .take(BODY_SIGNATURE_CHARS)
        .collect();
    let parts = [
        collapse_ws(title),
        body_norm,
        collapse_ws(&fields.overview),
        collapse_ws(&fields.bonus),
        collapse_ws(&fields.price_value),
        collapse_ws(&fields.price_tax_included),
        collapse_ws(&fields.price_currency),
        collapse_ws(&fields.preorder_start),
        collapse_ws(&fields.preorder_end),
        collapse_ws(&fields.release_date),
        collapse_ws(&fields.shipping_date),
        collapse_ws(&fields.maker),
        collapse_ws(&fields.materials),
        collapse_ws(&fields.modeler),
        collapse_ws(&fields.character),
        collapse_ws(&fields.series),
        collapse_ws(&fields.tags),
        collapse_ws(&fields.copyright),
        images.join("|"),
    ];
    blake3::hash(parts.join("|").as_bytes()).to_hex().to_string()
}

/// A single image stays a bare URL; multiple images join into a
/// multi-line cell.
fn image_field(images: &[String]) -> String {
    if images.len() > 1 {
        images.join(",\n")
    } else {
        images.first().cloned().unwrap_or_default()
    }
}

fn assemble(url: &str, fields: &RawFields, images: &[String], date: String, updated_at: String) -> CanonicalPayload {
    // A character-only page still gets a usable title.
    let title = if fields.title.is_empty() {
        fields.character.clone()
    } else {
        fields.title.clone()
    };
    CanonicalPayload {
        date,
        source_title: title.clone(),
        slug: String::new(),
        body_source: body_source(fields, &title),
        body: fields.body.clone(),
        tags: fields.tags.clone(),
        category: fields.category.clone(),
        keyword: String::new(),
        affiliate_link: String::new(),
        image_url: image_field(images),
        price_value: fields.price_value.clone(),
        price_tax_included: fields.price_tax_included.clone(),
        price_currency: fields.price_currency.clone(),
        jan: fields.jan.clone(),
        title_key: build_title_key(&title),
        preorder_start: fields.preorder_start.clone(),
        preorder_end: fields.preorder_end.clone(),
        release_date: fields.release_date.clone(),
        shipping_date: fields.shipping_date.clone(),
        maker: fields.maker.clone(),
        materials: fields.materials.clone(),
        age_rating: fields.age_rating.clone(),
        copyright: fields.copyright.clone(),
        series: fields.series.clone(),
        modeler: fields.modeler.clone(),
        character: fields.character.clone(),
        source_url: url.to_string(),
        bonus: fields.bonus.clone(),
        overview: fields.overview.clone(),
        updated_at,
        wp_post_id: String::new(),
        wp_post_url: String::new(),
        source_hash: source_hash(fields, &title, images),
        needs_review: "FALSE".to_string(),
        status: String::new(),
        title,
    }
}

/// Build the canonical payload for one product page. Images go through
/// the run-scoped mirror first; mirrored URLs replace the originals in
/// both the image cell and the signature.
pub async fn build_payload(
    url: &str,
    fields: &RawFields,
    mirror: &mut MirrorCache<'_>,
) -> CanonicalPayload {
    let mut images = Vec::with_capacity(fields.images.len());
    for image in &fields.images {
        let trimmed = image.trim();
        if trimmed.is_empty() {
            continue;
        }
        images.push(mirror.resolve(trimmed, url).await);
    }
    let date = Utc::now().with_timezone(&*JST).format("%Y/%m/%d %H:%M:%S").to_string();
    let updated_at = Utc::now().to_rfc3339();
    assemble(url, fields, &images, date, updated_at)
}
