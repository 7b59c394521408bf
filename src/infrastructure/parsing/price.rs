//! Price-text normalization.
//!
//! Storefronts render prices with discount annotations, original/sale
//! pairs and mixed currency markers. The normalizer strips discounts
//! first, then prefers a yen-adjacent group, then the maximum numeric
//! group, then all digits of the raw text.

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{collapse_ws, digits_only};

static DISCOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*[%％]\s*OFF!?").expect("static regex"));
static YEN_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9][0-9,]*)円").expect("static regex"));
static NUM_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9][0-9,]*").expect("static regex"));

pub const TAX_INCLUDED_MARKER: &str = "税込";
pub const TAX_EXCLUDED_MARKER: &str = "税抜";
/// Alternate exclusive-marker spelling used by the big-retailer layout.
pub const TAX_EXCLUDED_ALT_MARKER: &str = "税別";

/// Extract a digit-only price value from free-form price text.
pub fn normalize_price(text: &str) -> String {
    let cleaned = collapse_ws(&DISCOUNT.replace_all(text, ""));

    if let Some(caps) = YEN_GROUP.captures(&cleaned) {
        let digits = digits_only(&caps[1]);
        if !digits.is_empty() {
            return digits;
        }
    }

    let max = NUM_GROUP
        .find_iter(&cleaned)
        .filter_map(|m| digits_only(m.as_str()).parse::<u64>().ok())
        .max();
    if let Some(value) = max {
        return value.to_string();
    }

    digits_only(text)
}

/// First numeric group of the text (list-price convention: a line like
/// `希望小売価格：350円（税込385円）` keeps the leading figure).
pub fn first_price_group(text: &str) -> String {
    NUM_GROUP
        .find(text)
        .map(|m| digits_only(m.as_str()))
        .unwrap_or_else(|| digits_only(text))
}

/// Tri-state tax-inclusion flag.
///
/// Presence of the inclusive marker wins, then the exclusive marker;
/// neither marker yields the empty (unknown) state, never a guess.
pub fn tax_flag(scope: &str) -> &'static str {
    if scope.contains(TAX_INCLUDED_MARKER) {
        "TRUE"
    } else if scope.contains(TAX_EXCLUDED_MARKER) {
        "FALSE"
    } else {
        ""
    }
}

/// Tax flag for layouts that spell the exclusive marker `税別`.
pub fn tax_flag_alt(scope: &str) -> &'static str {
    if scope.contains(TAX_INCLUDED_MARKER) {
        "TRUE"
    } else if scope.contains(TAX_EXCLUDED_ALT_MARKER) {
        "FALSE"
    } else {
        ""
    }
}

/// Normalize a decimal feed price (`"4800.00"` -> `"4800"`).
pub fn normalize_feed_price(value: &str) -> String {
    let stripped: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '\u{FF0C}' | '\u{3001}'))
        .collect();
    let whole = match stripped.split_once('.') {
        Some((whole, frac)) if frac.trim_matches('0').is_empty() => whole,
        _ => stripped.as_str(),
    };
    let digits = digits_only(whole);
    if digits.is_empty() {
        stripped
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("¥12,800（税込）", "12800")]
    #[case("12,800円（税込）", "12800")]
    #[case("20%OFF! 10,240円 12,800円", "12800")]
    // No yen marker: the larger of an original/sale pair wins.
    #[case("10,240 12,800", "12800")]
    #[case("price: none", "")]
    fn normalizes_price_text(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_price(input), expected);
    }

    #[test]
    fn discount_annotation_does_not_leak_into_value() {
        // Without stripping, "20" would be a numeric group candidate.
        assert_eq!(normalize_price("２０％OFF 500円"), "500");
    }

    #[test]
    fn first_group_keeps_list_price() {
        assert_eq!(first_price_group("メーカー希望小売価格：350円（税込385円）"), "350");
        assert_eq!(first_price_group("no digits"), "");
    }

    #[rstest]
    #[case("12,800円（税込）", "TRUE")]
    #[case("12,800円（税抜）", "FALSE")]
    #[case("12,800円", "")]
    fn tax_tri_state(#[case] scope: &str, #[case] expected: &str) {
        assert_eq!(tax_flag(scope), expected);
    }

    #[test]
    fn alt_exclusive_marker() {
        assert_eq!(tax_flag_alt("1,200円 (税別)"), "FALSE");
        assert_eq!(tax_flag_alt("1,200円 税込"), "TRUE");
        assert_eq!(tax_flag_alt("1,200円"), "");
    }

    #[rstest]
    #[case("4800.00", "4800")]
    #[case("4,800.50", "480050")]
    #[case("4800", "4800")]
    fn feed_prices(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_feed_price(input), expected);
    }
}
