//! Text cleanup shared by every adapter and normalizer.
//!
//! `collapse_ws` is the universal normalization applied before comparing
//! or hashing any extracted value: cosmetically different markup must
//! produce identical strings.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[\s\S]*?</script>").expect("static regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[\s\S]*?</style>").expect("static regex"));
static IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img[^>]*>").expect("static regex"));
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("static regex"));
static BLOCK_CLOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(p|div|li|h[1-6]|section|ul|ol|table|tr|thead|tbody|tfoot)>")
        .expect("static regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));

/// Trim and collapse every whitespace run (including ideographic space)
/// into a single ASCII space.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert full-width digits (U+FF10..U+FF19) to ASCII.
pub fn fold_fullwidth_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{FF10}'..='\u{FF19}' => {
                char::from_u32(c as u32 - 0xFF10 + 0x30).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Serialize an element to multi-line text.
///
/// `<br>` and closing block tags become line breaks, script/style/img
/// content is dropped, remaining tags are stripped, and each line is
/// whitespace-collapsed. Empty lines are removed.
pub fn text_with_breaks(el: ElementRef<'_>) -> String {
    let html = el.html();
    let html = SCRIPT_RE.replace_all(&html, "");
    let html = STYLE_RE.replace_all(&html, "");
    let html = IMG_RE.replace_all(&html, "");
    let html = BR_RE.replace_all(&html, "\n");
    let html = BLOCK_CLOSE_RE.replace_all(&html, "</$1>\n");
    let text = TAG_RE.replace_all(&html, "");
    let text = unescape_entities(&text);

    text.split('\n')
        .map(collapse_ws)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

/// Whole-document text with one line per text node, used by the
/// line-scanning fallbacks. Blank lines are dropped.
pub fn document_text(doc: &scraper::Html) -> String {
    doc.root_element()
        .text()
        .map(collapse_ws)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep only ASCII digits.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// First maximal digit run of exactly 13 digits (a JAN/EAN-13 code),
/// after full-width digit folding.
pub fn find_jan(text: &str) -> Option<String> {
    static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("static regex"));
    let folded = fold_fullwidth_digits(text);
    DIGIT_RUN
        .find_iter(&folded)
        .find(|m| m.as_str().len() == 13)
        .map(|m| m.as_str().to_string())
}

/// Like [`find_jan`] but scoped to the text right after a `JAN` label,
/// falling back to the whole text when no labeled candidate exists.
pub fn find_labeled_jan(text: &str) -> Option<String> {
    static LABEL_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)JAN[^\n\r]{0,50}").expect("static regex"));
    let folded = fold_fullwidth_digits(text);
    if let Some(m) = LABEL_RE.find(&folded) {
        if let Some(jan) = find_jan(m.as_str()) {
            return Some(jan);
        }
    }
    find_jan(&folded)
}

/// True when the string contains any hiragana, katakana or CJK ideograph.
pub fn has_cjk(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}')
    })
}

fn unescape_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
