//! Publishing collaborators: payload sink, image mirror, notifier.
//!
//! The runner only talks to the traits here, so the concrete sink can
//! be swapped (append-only JSONL locally, a spreadsheet bridge in the
//! hosted setup) without touching detection or payload building.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::{CanonicalPayload, ListingItem};

/// Destination for finished payload rows.
#[async_trait]
pub trait PayloadSink: Send + Sync {
    /// Append the rows; returns how many were written.
    async fn append(&self, payloads: &[CanonicalPayload]) -> Result<usize>;
}

/// Re-hosts an image, returning the new URL, or `None` when the mirror
/// declines (unconfigured target, upload failure).
#[async_trait]
pub trait ImageMirror: Send + Sync {
    async fn mirror(&self, image_url: &str, referer: &str) -> Result<Option<String>>;
}

/// Out-of-band run notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_items(&self, site_id: &str, items: &[ListingItem]) -> Result<()>;
    async fn notify_errors(&self, site_id: &str, errors: &[String]) -> Result<()>;
}

/// Run-scoped mirror cache: each source URL is uploaded at most once
/// per run, however many items share it.
pub struct MirrorCache<'a> {
    mirror: &'a dyn ImageMirror,
    resolved: HashMap<String, String>,
}

impl<'a> MirrorCache<'a> {
    pub fn new(mirror: &'a dyn ImageMirror) -> Self {
        Self {
            mirror,
            resolved: HashMap::new(),
        }
    }

    /// Mirrored URL for `image_url`, or the original on any failure.
    pub async fn resolve(&mut self, image_url: &str, referer: &str) -> String {
        if let Some(hit) = self.resolved.get(image_url) {
            return hit.clone();
        }
        let resolved = match self.mirror.mirror(image_url, referer).await {
            Ok(Some(mirrored)) => mirrored,
            Ok(None) => image_url.to_string(),
            Err(err) => {
                warn!(image_url, %err, "image mirror failed, keeping source URL");
                image_url.to_string()
            }
        };
        self.resolved.insert(image_url.to_string(), resolved.clone());
        resolved
    }
}

/// Mirror that declines everything; payloads keep source image URLs.
pub struct NoopMirror;

#[async_trait]
impl ImageMirror for NoopMirror {
    async fn mirror(&self, _image_url: &str, _referer: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Append-only JSONL sink, one payload object per line.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PayloadSink for JsonlSink {
    async fn append(&self, payloads: &[CanonicalPayload]) -> Result<usize> {
        if payloads.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating sink dir {}", parent.display()))?;
            }
        }
        let mut lines = String::new();
        for payload in payloads {
            lines.push_str(&serde_json::to_string(payload).context("serializing payload")?);
            lines.push('\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening sink {}", self.path.display()))?;
        file.write_all(lines.as_bytes())
            .await
            .with_context(|| format!("appending to sink {}", self.path.display()))?;
        file.flush().await.context("flushing sink")?;
        Ok(payloads.len())
    }
}

const MAX_ITEM_LINES: usize = 5;

/// Discord webhook notifier; summary messages list at most
/// [`MAX_ITEM_LINES`] items.
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn summary_content(site_id: &str, items: &[ListingItem]) -> String {
        let mut lines = vec![
            format!("**{site_id} updates**"),
            format!("New: {} / Updated: 0", items.len()),
        ];
        if items.len() > MAX_ITEM_LINES {
            lines.push(format!("(showing {MAX_ITEM_LINES} of {})", items.len()));
        }
        for item in items.iter().take(MAX_ITEM_LINES) {
            let line = match (item.title.is_empty(), item.url.is_empty()) {
                (false, false) => format!("- {} | {}", item.title, item.url),
                (false, true) => format!("- {}", item.title),
                (true, false) => format!("- {}", item.url),
                (true, true) => continue,
            };
            lines.push(line);
        }
        lines.join("\n")
    }

    async fn post(&self, content: String) -> Result<()> {
        self.client
            .post(&self.webhook_url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .context("posting discord webhook")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_new_items(&self, site_id: &str, items: &[ListingItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        debug!(site_id, count = items.len(), "sending discord summary");
        self.post(Self::summary_content(site_id, items)).await
    }

    async fn notify_errors(&self, site_id: &str, errors: &[String]) -> Result<()> {
        if errors.is_empty() {
            return Ok(());
        }
        let mut lines = vec![format!("**{site_id} errors**")];
        lines.extend(errors.iter().take(10).map(|e| e.trim().to_string()));
        self.post(lines.join("\n")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseMirror;

    #[async_trait]
    impl ImageMirror for UppercaseMirror {
        async fn mirror(&self, image_url: &str, _referer: &str) -> Result<Option<String>> {
            Ok(Some(image_url.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn mirror_cache_resolves_each_url_once() {
        let mirror = UppercaseMirror;
        let mut cache = MirrorCache::new(&mirror);
        assert_eq!(cache.resolve("https://x/a.jpg", "https://x").await, "HTTPS://X/A.JPG");
        assert_eq!(cache.resolve("https://x/a.jpg", "https://x").await, "HTTPS://X/A.JPG");
        assert_eq!(cache.resolved.len(), 1);
    }

    #[tokio::test]
    async fn jsonl_sink_appends_one_line_per_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("payloads.jsonl");
        let sink = JsonlSink::new(&path);

        let payload = CanonicalPayload {
            title: "figure".to_string(),
            ..Default::default()
        };
        assert_eq!(sink.append(&[payload.clone()]).await.unwrap(), 1);
        assert_eq!(sink.append(&[payload.clone(), payload]).await.unwrap(), 2);

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: CanonicalPayload = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.title, "figure");
    }

    #[test]
    fn discord_summary_caps_item_lines() {
        let items: Vec<ListingItem> = (0..7)
            .map(|i| ListingItem::new(format!("{i}"), format!("item {i}"), format!("https://x/{i}")))
            .collect();
        let content = DiscordNotifier::summary_content("amiami", &items);
        assert!(content.starts_with("**amiami updates**\nNew: 7 / Updated: 0"));
        assert!(content.contains("(showing 5 of 7)"));
        assert_eq!(content.matches("- item").count(), 5);
    }
}
