//! Japanese release-date normalization.
//!
//! Three prioritized patterns, first match wins: full year/month/day,
//! year/month, then a century-pivoted two-digit year + month. Input that
//! matches nothing is returned whitespace-collapsed, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use super::text::{collapse_ws, fold_fullwidth_digits};

static FULL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\s*(?:[/\-.]|年)\s*(\d{1,2})\s*(?:[/\-.]|月)\s*(\d{1,2})\s*日?")
        .expect("static regex")
});
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*(?:[/\-.]|年)\s*(\d{1,2})\s*月").expect("static regex"));
static SHORT_YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})\s*年\s*(\d{1,2})\s*月").expect("static regex"));
static ISO_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}(-\d{2})?$").expect("static regex"));

/// Normalize Japanese date text to `YYYY-MM-DD` or `YYYY-MM`.
///
/// Two-digit years pivot on 70: `70..99` map to the 1900s, the rest to
/// the 2000s. Unparsable text comes back cleaned but otherwise unchanged.
pub fn normalize_jp_date(text: &str) -> String {
    let folded = fold_fullwidth_digits(text);
    let s = collapse_ws(&folded);

    if let Some(caps) = FULL_DATE.captures(&s) {
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        return format!("{}-{:02}-{:02}", &caps[1], month, day);
    }
    if let Some(caps) = YEAR_MONTH.captures(&s) {
        let month: u32 = caps[2].parse().unwrap_or(0);
        return format!("{}-{:02}", &caps[1], month);
    }
    if let Some(caps) = SHORT_YEAR_MONTH.captures(&s) {
        let yy: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let year = if yy >= 70 { 1900 + yy } else { 2000 + yy };
        return format!("{}-{:02}", year, month);
    }
    s
}

/// Every `YYYY年M月D日` occurrence in the text, normalized to
/// `YYYY-MM-DD`, in document order.
pub fn find_jp_full_dates(text: &str) -> Vec<String> {
    static JP_DATE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日").expect("static regex")
    });
    let folded = fold_fullwidth_digits(text);
    JP_DATE
        .captures_iter(&folded)
        .map(|caps| {
            let month: u32 = caps[2].parse().unwrap_or(0);
            let day: u32 = caps[3].parse().unwrap_or(0);
            format!("{}-{:02}-{:02}", &caps[1], month, day)
        })
        .collect()
}

/// True for `YYYY-MM` / `YYYY-MM-DD` output of [`normalize_jp_date`].
///
/// Gates full-page-text fallbacks: a scanned line is only accepted as a
/// date when normalization actually produced an ISO-shaped value.
pub fn is_iso_date_like(s: &str) -> bool {
    ISO_SHAPE.is_match(s)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2025年3月6日", "2025-03-06")]
    #[case("2026年3月6日(金)発売予定", "2026-03-06")]
    #[case("2025/3/6", "2025-03-06")]
    #[case("2025-12-31", "2025-12-31")]
    #[case("2025年3月", "2025-03")]
    #[case("２０２５年３月", "2025-03")]
    #[case("25年3月", "2025-03")]
    #[case("08年3月", "2008-03")]
    #[case("70年1月", "1970-01")]
    fn normalizes_date_text(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_jp_date(input), expected);
    }

    #[test]
    fn unparsable_text_is_returned_cleaned() {
        assert_eq!(normalize_jp_date("  発売日  未定 "), "発売日 未定");
        assert_eq!(normalize_jp_date(""), "");
    }

    #[test]
    fn finds_all_full_dates_in_order() {
        let text = "予約期間：2025年8月1日(金)12:00～2025年9月15日(月)23:59";
        assert_eq!(
            find_jp_full_dates(text),
            vec!["2025-08-01".to_string(), "2025-09-15".to_string()]
        );
        assert!(find_jp_full_dates("2025年9月").is_empty());
    }

    #[test]
    fn iso_shape_gate() {
        assert!(is_iso_date_like("2025-03"));
        assert!(is_iso_date_like("2025-03-06"));
        assert!(!is_iso_date_like("発売日 未定"));
        assert!(!is_iso_date_like("2025-3"));
    }
}
