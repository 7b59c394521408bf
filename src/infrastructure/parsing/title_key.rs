//! Title grouping key: `series|character|variant`.
//!
//! The key groups re-listings of the same product across sites, so it
//! must be stable under width variants, bracket noise and marketing
//! prefixes. NFKC folds full-width punctuation first; every later step
//! works on the folded form. The vocabularies live in
//! [`TitleKeyConfig`], so a locale tweak is a data change.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::text::{collapse_ws, has_cjk};

static BRACKET_BLOCKS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"【[^】]*】").expect("static regex"),
        Regex::new(r"《[^》]*》").expect("static regex"),
        Regex::new(r"\[[^\]]*\]").expect("static regex"),
    ]
});
static PAREN_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]{1,30})\)").expect("static regex"));
static PAREN_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("static regex"));

/// Vocabularies driving title decomposition.
#[derive(Debug, Clone)]
pub struct TitleKeyConfig {
    /// Known product lines. Order is irrelevant; matching is longest-first.
    pub series: Vec<String>,
    /// Marketing words removed from the title before tokenizing.
    pub noise_words: Vec<String>,
    /// Parenthesized phrases that are noise, not a variant.
    pub paren_noise: Vec<String>,
    /// Words that mark a parenthesized phrase (or a trailing token) as a
    /// product variant.
    pub variant_markers: Vec<String>,
    /// Brand names dropped from character candidates.
    pub brand_drop: Vec<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for TitleKeyConfig {
    fn default() -> Self {
        Self {
            series: strings(&[
                "POP UP PARADE XLサイズ",
                "POP UP PARADE XL",
                "POP UP PARADE L",
                "POP UP PARADE",
                "ねんどろいど",
                "figma",
                "ARTFX J",
                "ARTFX",
                "BISHOUJO",
                "BISHOJO",
                "KDcolle",
            ]),
            noise_words: strings(&[
                "再販",
                "予約",
                "送料無料",
                "限定販売",
                "限定",
                "特典",
                "アクションフィギュア",
                "ノンスケール",
                "塗装済み可動フィギュア",
                "プラスチック製",
                "フィギュア",
            ]),
            paren_noise: strings(&["再販", "予約", "送料無料", "限定", "特典"]),
            variant_markers: strings(&[
                "ver",
                "version",
                "dx",
                "v2",
                "2.0",
                "衣装",
                "カラー",
                "色",
                "コスチューム",
                "アウトフィット",
            ]),
            brand_drop: strings(&["ホロライブプロダクション"]),
        }
    }
}

fn alternation(words: &[String]) -> String {
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

/// Compiled form of one [`TitleKeyConfig`].
pub struct TitleKeyBuilder {
    /// Longest spelling first so `POP UP PARADE XL` is not claimed by
    /// the plain `POP UP PARADE` entry.
    series: Vec<String>,
    noise: Regex,
    paren_noise: Regex,
    variant_marker: Regex,
    variant_tail: Regex,
    brand_drop: Vec<String>,
}

impl TitleKeyBuilder {
    pub fn new(config: &TitleKeyConfig) -> Result<Self, regex::Error> {
        let mut series = config.series.clone();
        series.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));

        // ASCII markers only count at a token's end; CJK markers can sit
        // anywhere inside a compound word.
        let tail = config
            .variant_markers
            .iter()
            .map(|w| {
                let escaped = regex::escape(w);
                if w.is_ascii() {
                    format!("{escaped}$")
                } else {
                    escaped
                }
            })
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            series,
            noise: Regex::new(&alternation(&config.noise_words))?,
            paren_noise: Regex::new(&alternation(&config.paren_noise))?,
            variant_marker: Regex::new(&format!("(?i)(?:{})", alternation(&config.variant_markers)))?,
            variant_tail: Regex::new(&format!("(?i)(?:{tail})"))?,
            brand_drop: config.brand_drop.clone(),
        })
    }

    /// Build the grouping key from a raw product title.
    ///
    /// Empty input yields an empty key; a partial key keeps its `|`
    /// separators trimmed (`figma|みこ` rather than `figma|みこ|`).
    pub fn key_for(&self, title: &str) -> String {
        let folded: String = collapse_ws(title).nfkc().collect();
        if folded.is_empty() {
            return String::new();
        }

        let mut t = folded;
        for re in BRACKET_BLOCKS.iter() {
            t = re.replace_all(&t, " ").to_string();
        }

        // NFKC already folded full-width parens to ASCII, so one scan covers both.
        let mut variant = String::new();
        for caps in PAREN_CONTENT.captures_iter(&t) {
            let content = collapse_ws(&caps[1]);
            if content.is_empty() {
                continue;
            }
            // Marker check precedes the noise filter: "限定カラー" is a variant.
            if self.variant_marker.is_match(&content) {
                variant = content;
                break;
            }
            if self.paren_noise.is_match(&content) {
                continue;
            }
        }

        let t = PAREN_BLOCK.replace_all(&t, " ");
        let t = self.noise.replace_all(&t, " ");
        let t = collapse_ws(&t);

        let series = self
            .series
            .iter()
            .find(|s| t.contains(s.as_str()))
            .cloned();
        let tokens: Vec<&str> = t.split(' ').filter(|tok| !tok.is_empty()).collect();
        let series = series.unwrap_or_else(|| tokens.first().copied().unwrap_or("").to_string());

        let remaining: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|tok| *tok != series && !self.brand_drop.iter().any(|b| b == tok))
            .collect();
        let character = remaining
            .iter()
            .copied()
            .find(|tok| has_cjk(tok))
            .or_else(|| remaining.first().copied())
            .unwrap_or("");

        if variant.is_empty() {
            let tail_start = tokens.len().saturating_sub(4);
            if let Some(tok) = tokens[tail_start..]
                .iter()
                .rev()
                .find(|tok| self.variant_tail.is_match(tok))
            {
                variant = (*tok).to_string();
            }
        }

        format!("{series}|{character}|{variant}")
            .trim_matches('|')
            .to_string()
    }
}

/// Key derivation with the stock vocabularies.
pub fn build_title_key(title: &str) -> String {
    static DEFAULT: Lazy<TitleKeyBuilder> = Lazy::new(|| {
        TitleKeyBuilder::new(&TitleKeyConfig::default()).expect("static regex")
    });
    DEFAULT.key_for(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_character_variant() {
        let key = build_title_key("【限定販売】ねんどろいど さくらみこ（私服Ver.）");
        assert_eq!(key, "ねんどろいど|さくらみこ|私服Ver.");
    }

    #[test]
    fn fullwidth_parens_fold_to_ascii_before_variant_scan() {
        let wide = build_title_key("figma 白上フブキ（DX版）");
        let narrow = build_title_key("figma 白上フブキ(DX版)");
        assert_eq!(wide, narrow);
        assert_eq!(wide, "figma|白上フブキ|DX版");
    }

    #[test]
    fn longest_series_spelling_wins() {
        let key = build_title_key("POP UP PARADE XL 宝鐘マリン");
        assert!(key.starts_with("POP UP PARADE XL|"));
    }

    #[test]
    fn noise_words_and_brand_are_dropped() {
        let key = build_title_key("【再販】ねんどろいど ホロライブプロダクション 兎田ぺこら フィギュア");
        assert_eq!(key, "ねんどろいど|兎田ぺこら");
    }

    #[test]
    fn noise_parens_do_not_become_variant() {
        let key = build_title_key("figma 大神ミオ（特典付き）");
        assert_eq!(key, "figma|大神ミオ");
    }

    #[test]
    fn tail_token_variant_rescue() {
        let key = build_title_key("ねんどろいど 星街すいせい 水着カラー");
        assert_eq!(key, "ねんどろいど|星街すいせい|水着カラー");
    }

    #[test]
    fn unknown_series_falls_back_to_first_token() {
        let key = build_title_key("SPM 雪花ラミィ");
        assert_eq!(key, "SPM|雪花ラミィ");
    }

    #[test]
    fn empty_title_yields_empty_key() {
        assert_eq!(build_title_key(""), "");
        assert_eq!(build_title_key("   "), "");
    }

    #[test]
    fn custom_vocabulary_changes_decomposition() {
        let config = TitleKeyConfig {
            series: vec!["SPM".to_string()],
            ..TitleKeyConfig::default()
        };
        let builder = TitleKeyBuilder::new(&config).unwrap();
        assert_eq!(builder.key_for("SPM 雪花ラミィ"), "SPM|雪花ラミィ");
    }
}
