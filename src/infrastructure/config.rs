//! Site roster configuration.
//!
//! One JSON file lists every monitored site. Unknown sites are a config
//! change, not a code change: the generic parser plus a selector block
//! covers layouts without a dedicated listing extractor.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::infrastructure::parsing::listing::{GenericSelectors, ParserKind, ShopifyOptions};

fn default_top_n() -> usize {
    40
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitesConfig {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// One monitored listing page.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub id: String,
    pub monitor_url: String,
    #[serde(default)]
    pub parser: ParserKind,
    /// How many leading listing rows participate in change detection.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Title substrings (case-insensitive); empty list keeps everything.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    state_file: Option<String>,
    /// Selector block for `parser = "generic"`.
    #[serde(default)]
    pub selectors: Option<GenericSelectors>,
    #[serde(default)]
    pub parser_options: ShopifyOptions,
    /// Per-site webhook override; falls back to the environment-wide one.
    #[serde(default)]
    pub discord_webhook: Option<String>,
}

impl SiteConfig {
    /// Path of the persisted cursor state for this site.
    pub fn state_file(&self) -> String {
        self.state_file
            .clone()
            .unwrap_or_else(|| format!("state/{}.json", self.id))
    }
}

impl SitesConfig {
    /// Load and parse the roster; a missing file is an empty roster.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Self::default());
        }
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading sites config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing sites config {}", path.display()))
    }
}
