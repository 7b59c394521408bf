//! Per-site monitoring pass and the whole-roster loop.
//!
//! One pass over a site is fetch, parse, trim, filter, diff against the
//! persisted state, then per-item detail scraping and publishing. Item
//! failures are isolated: one broken detail page costs that item, never
//! the site, and one broken site never stops the roster.

use anyhow::{Context, Result};
use tracing::{info, warn};
use url::Url;

use crate::application::change_detection::detect_new;
use crate::application::payload_builder::build_payload;
use crate::application::publish::{DiscordNotifier, ImageMirror, MirrorCache, Notifier, PayloadSink};
use crate::domain::{CanonicalPayload, ListingItem};
use crate::infrastructure::config::{SiteConfig, SitesConfig};
use crate::infrastructure::http_client::Fetcher;
use crate::infrastructure::parsing::listing::{
    extract_amiami, extract_bandai_candy, extract_generic, extract_shopify, ParserKind,
};
use crate::infrastructure::parsing::text::collapse_ws;
use crate::infrastructure::parsing::AdapterRegistry;
use crate::infrastructure::state_store;

/// Outcome of one site pass.
#[derive(Debug, Default)]
pub struct SiteSummary {
    pub site_id: String,
    pub listed: usize,
    pub new_items: usize,
    pub payloads_written: usize,
    pub errors: Vec<String>,
}

/// Case-insensitive whitespace-folded substring match against any of
/// the configured keywords.
pub fn title_match(title: &str, keywords: &[String]) -> bool {
    let folded = collapse_ws(title).to_lowercase();
    keywords
        .iter()
        .filter(|kw| !kw.is_empty())
        .any(|kw| folded.contains(&kw.to_lowercase()))
}

fn parse_listing(site: &SiteConfig, html: &str, base: &Url) -> Vec<ListingItem> {
    match site.parser {
        ParserKind::Amiami => extract_amiami(html, base),
        ParserKind::BandaiCandy => extract_bandai_candy(html, base),
        ParserKind::Generic => match &site.selectors {
            Some(selectors) => extract_generic(html, base, selectors),
            None => {
                warn!(site = %site.id, "generic parser without a selectors block");
                Vec::new()
            }
        },
        ParserKind::Shopify => match extract_shopify(html, base, &site.parser_options) {
            Ok(items) => items,
            Err(err) => {
                warn!(site = %site.id, %err, "product feed unparseable");
                Vec::new()
            }
        },
    }
}

pub struct Runner<'a> {
    pub fetcher: &'a Fetcher,
    pub registry: &'a AdapterRegistry,
    pub sink: &'a dyn PayloadSink,
    pub mirror: &'a dyn ImageMirror,
    /// Roster-wide webhook; per-site config overrides it.
    pub env_webhook: Option<String>,
}

impl<'a> Runner<'a> {
    fn webhook_for(&self, site: &SiteConfig) -> Option<DiscordNotifier> {
        site.discord_webhook
            .as_deref()
            .or(self.env_webhook.as_deref())
            .filter(|url| !url.is_empty())
            .map(DiscordNotifier::new)
    }

    /// Scrape one detail page into a payload.
    async fn build_item_payload(
        &self,
        url: &str,
        mirror_cache: &mut MirrorCache<'_>,
    ) -> Result<CanonicalPayload> {
        let parsed = Url::parse(url).with_context(|| format!("invalid item url {url}"))?;
        let html = self
            .fetcher
            .fetch_text(&parsed)
            .await
            .with_context(|| format!("fetching {url}"))?;
        let fields = self.registry.extract(&parsed, &html);
        Ok(build_payload(url, &fields, mirror_cache).await)
    }

    /// One full pass over a site.
    pub async fn run_site(&self, site: &SiteConfig) -> Result<SiteSummary> {
        let mut summary = SiteSummary {
            site_id: site.id.clone(),
            ..Default::default()
        };
        let base = Url::parse(&site.monitor_url)
            .with_context(|| format!("invalid monitor_url for site {}", site.id))?;

        info!(site = %site.id, url = %base, "fetching monitor page");
        let html = self
            .fetcher
            .fetch_text(&base)
            .await
            .with_context(|| format!("fetching monitor page for site {}", site.id))?;

        let mut items = parse_listing(site, &html, &base);
        items.truncate(site.top_n);
        if !site.keywords.is_empty() {
            items.retain(|item| title_match(&item.title, &site.keywords));
        }
        summary.listed = items.len();

        let state_path = std::path::PathBuf::from(site.state_file());
        let prev = state_store::load(&state_path).await;
        let change = detect_new(&items, &prev);
        summary.new_items = change.new_items.len();
        info!(
            site = %site.id,
            listed = summary.listed,
            new = summary.new_items,
            "change detection finished"
        );

        let notifier = self.webhook_for(site);
        if let Some(notifier) = &notifier {
            if let Err(err) = notifier.notify_new_items(&site.id, &change.new_items).await {
                warn!(site = %site.id, %err, "discord summary failed");
            }
        }

        if !change.new_items.is_empty() {
            let mut mirror_cache = MirrorCache::new(self.mirror);
            let mut payloads = Vec::new();
            for item in &change.new_items {
                match self.build_item_payload(&item.url, &mut mirror_cache).await {
                    Ok(payload) => payloads.push(payload),
                    Err(err) => {
                        warn!(site = %site.id, url = %item.url, %err, "payload build failed");
                        summary.errors.push(format!("{}: {err:#}", item.url));
                    }
                }
            }
            match self.sink.append(&payloads).await {
                Ok(wrote) => summary.payloads_written = wrote,
                Err(err) => {
                    warn!(site = %site.id, %err, "sink append failed");
                    summary.errors.push(format!("sink: {err:#}"));
                }
            }
            if !summary.errors.is_empty() {
                if let Some(notifier) = &notifier {
                    if let Err(err) = notifier.notify_errors(&site.id, &summary.errors).await {
                        warn!(site = %site.id, %err, "discord error report failed");
                    }
                }
            }
        }

        // Persist last: a crash before this point re-reports at worst.
        state_store::save(&state_path, &change.next_state)
            .await
            .with_context(|| format!("saving state for site {}", site.id))?;
        Ok(summary)
    }

    /// Process every configured site in order. Site failures are logged
    /// and folded into that site's summary.
    pub async fn run_all(&self, config: &SitesConfig) -> Vec<SiteSummary> {
        let total = config.sites.len();
        let mut summaries = Vec::with_capacity(total);
        for (index, site) in config.sites.iter().enumerate() {
            info!(site = %site.id, "processing site {}/{total}", index + 1);
            match self.run_site(site).await {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    warn!(site = %site.id, %err, "site pass failed");
                    summaries.push(SiteSummary {
                        site_id: site.id.clone(),
                        errors: vec![format!("{err:#}")],
                        ..Default::default()
                    });
                }
            }
        }
        summaries
    }

    /// Single-URL mode: scrape one detail page and append its payload,
    /// bypassing listings and state.
    pub async fn run_manual(&self, url: &str) -> Result<CanonicalPayload> {
        info!(url, "processing manual URL");
        let mut mirror_cache = MirrorCache::new(self.mirror);
        let payload = self.build_item_payload(url, &mut mirror_cache).await?;
        self.sink
            .append(std::slice::from_ref(&payload))
            .await
            .context("appending manual payload")?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn title_match_is_case_insensitive_and_folds_whitespace() {
        assert!(title_match("ねんどろいど  Hololive さくらみこ", &kw(&["hololive"])));
        assert!(title_match("POP UP PARADE 白上フブキ", &kw(&["白上フブキ"])));
        assert!(!title_match("スケールフィギュア", &kw(&["hololive"])));
        // Empty keywords never match; the caller skips filtering instead.
        assert!(!title_match("anything", &kw(&[""])));
        assert!(!title_match("anything", &[]));
    }

    #[test]
    fn generic_parser_without_selectors_yields_nothing() {
        let site: SiteConfig = serde_json::from_str(
            r#"{"id": "x", "monitor_url": "https://example.jp/", "parser": "generic"}"#,
        )
        .unwrap();
        let base = Url::parse("https://example.jp/").unwrap();
        assert!(parse_listing(&site, "<html></html>", &base).is_empty());
    }

    #[test]
    fn shopify_parse_failure_degrades_to_empty() {
        let site: SiteConfig = serde_json::from_str(
            r#"{"id": "x", "monitor_url": "https://shop.example.jp/products.json", "parser": "shopify"}"#,
        )
        .unwrap();
        let base = Url::parse("https://shop.example.jp/products.json").unwrap();
        assert!(parse_listing(&site, "<html>maintenance</html>", &base).is_empty());
    }
}
