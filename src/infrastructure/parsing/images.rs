//! Image URL harvesting helpers.
//!
//! Every harvested URL goes through the same pipeline: resolve against
//! the page URL, strip query/fragment, deduplicate preserving first-seen
//! order. Thumbnail filtering is opt-in per site layout.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static SRCSET_DESCRIPTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(\d+)(w|x)$").expect("static regex"));
static IMAGE_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(?:jpe?g|png|webp)$").expect("static regex"));
static THUMBNAIL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rthumb|thumbnail|thumb|blank\.gif|_s\.|_m\.|_small\.|_150|_200|_240")
        .expect("static regex")
});
static BACKGROUND_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)background-image\s*:\s*url\(([^)]+)\)").expect("static regex"));
static TRAILING_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9]{1,4})_\.(?:jpe?g|png|webp)$").expect("static regex"));

/// Largest candidate of a `srcset` value, by `Nw`/`Nx` descriptor.
/// Descriptor-less candidates count as width 0, so the first one wins
/// only when nothing carries a descriptor.
pub fn best_from_srcset(srcset: &str) -> Option<String> {
    let mut best: Option<String> = None;
    let mut best_w: i64 = -1;
    for part in srcset.split(',') {
        let part = part.trim();
        let Some(candidate) = part.split_whitespace().next() else {
            continue;
        };
        let width = SRCSET_DESCRIPTOR
            .captures(part)
            .and_then(|c| c[1].parse::<i64>().ok())
            .unwrap_or(0);
        if width > best_w {
            best_w = width;
            best = Some(candidate.to_string());
        }
    }
    best
}

/// Resolve a possibly-relative URL against the page URL. Unresolvable
/// input is returned as-is.
pub fn absolutize(base: &Url, candidate: &str) -> String {
    match base.join(candidate) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => candidate.to_string(),
    }
}

/// Drop query string and fragment.
pub fn strip_query(u: &str) -> String {
    match Url::parse(u) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => u.to_string(),
    }
}

/// Remove duplicates and empty entries, keeping first-seen order.
pub fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter()
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .collect()
}

/// Harvest image URLs from every `<img>` matched by the selectors,
/// preferring the best `srcset` candidate and also taking
/// `data-src`/`src`. Output is absolutized, query-stripped, deduped.
pub fn images_from_srcset_or_src(doc: &Html, selectors: &[&str], base: &Url) -> Vec<String> {
    let mut out = Vec::new();
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for img in doc.select(&selector) {
            if let Some(srcset) = img.value().attr("srcset") {
                if let Some(best) = best_from_srcset(srcset) {
                    out.push(absolutize(base, &best));
                }
            }
            if let Some(src) = img
                .value()
                .attr("data-src")
                .or_else(|| img.value().attr("src"))
            {
                out.push(absolutize(base, src));
            }
        }
    }
    dedup_preserving_order(out.into_iter().map(|u| strip_query(&u)).collect())
}

/// True for a `.jpg`/`.jpeg`/`.png`/`.webp` URL.
pub fn has_image_ext(u: &str) -> bool {
    IMAGE_EXT.is_match(u)
}

/// True for URLs matching the shared thumbnail denylist.
pub fn looks_like_thumbnail(u: &str) -> bool {
    THUMBNAIL_MARKER.is_match(u)
}

/// True for URLs ending in a `NN_.ext` size suffix of 100 or less
/// (the retailer's small-thumbnail naming scheme).
pub fn has_small_size_suffix(u: &str) -> bool {
    TRAILING_SIZE
        .captures(u)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|n| n <= 100)
        .unwrap_or(false)
}

/// Truncate everything after the image extension (`...jpg?x=1` -> `...jpg`).
pub fn truncate_after_ext(u: &str) -> String {
    static AFTER_EXT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)(\.(?:jpe?g|png|webp)).*$").expect("static regex"));
    AFTER_EXT.replace(u, "$1").to_string()
}

/// Extract the URL of an inline `background-image` style, unquoted.
pub fn background_image_url(style: &str) -> Option<String> {
    BACKGROUND_URL.captures(style).map(|c| {
        c[1].trim()
            .trim_matches(|ch| ch == '"' || ch == '\'')
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srcset_picks_largest_descriptor() {
        let ss = "a.jpg 320w, b.jpg 1280w, c.jpg 640w";
        assert_eq!(best_from_srcset(ss), Some("b.jpg".into()));
        // No descriptors: first candidate wins.
        assert_eq!(best_from_srcset("x.jpg, y.jpg"), Some("x.jpg".into()));
        assert_eq!(best_from_srcset(""), None);
    }

    #[test]
    fn srcset_density_descriptor_counts() {
        assert_eq!(
            best_from_srcset("a.jpg 1x, b.jpg 2x"),
            Some("b.jpg".into())
        );
    }

    #[test]
    fn absolutize_and_strip_query() {
        let base = Url::parse("https://shop.example.com/item/123.html").unwrap();
        assert_eq!(
            absolutize(&base, "/images/main/a.jpg"),
            "https://shop.example.com/images/main/a.jpg"
        );
        assert_eq!(
            strip_query("https://shop.example.com/a.jpg?v=2#top"),
            "https://shop.example.com/a.jpg"
        );
        assert_eq!(strip_query("not a url"), "not a url");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let urls = vec![
            "a.jpg".to_string(),
            "".to_string(),
            "b.jpg".to_string(),
            "a.jpg".to_string(),
        ];
        assert_eq!(dedup_preserving_order(urls), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn harvests_srcset_then_src() {
        let html = Html::parse_document(
            r#"<div class="main">
                 <img srcset="/s.jpg 320w, /l.jpg 1200w" src="/s.jpg?q=1">
                 <img data-src="/lazy.jpg">
               </div>"#,
        );
        let base = Url::parse("https://shop.example.com/item.html").unwrap();
        let imgs = images_from_srcset_or_src(&html, &[".main img"], &base);
        assert_eq!(
            imgs,
            vec![
                "https://shop.example.com/l.jpg",
                "https://shop.example.com/s.jpg",
                "https://shop.example.com/lazy.jpg",
            ]
        );
    }

    #[test]
    fn thumbnail_and_size_filters() {
        assert!(looks_like_thumbnail("https://x/img_thumb/a.jpg"));
        assert!(looks_like_thumbnail("https://x/a_150.jpg"));
        assert!(!looks_like_thumbnail("https://x/main/a.jpg"));
        assert!(has_small_size_suffix("https://x/a.US40_.jpg"));
        assert!(!has_small_size_suffix("https://x/a.SL500_.jpg"));
        assert!(!has_small_size_suffix("https://x/a.jpg"));
    }

    #[test]
    fn extension_helpers() {
        assert!(has_image_ext("https://x/a.webp"));
        assert!(!has_image_ext("https://x/a.svg"));
        assert_eq!(truncate_after_ext("https://x/a.jpg?w=100"), "https://x/a.jpg");
    }

    #[test]
    fn background_style_parsing() {
        assert_eq!(
            background_image_url("background-image: url('/img/a.jpg')"),
            Some("/img/a.jpg".into())
        );
        assert_eq!(background_image_url("color: red"), None);
    }
}
