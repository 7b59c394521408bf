//! Monitor entry point.
//!
//! Two modes: the roster loop over every configured site, and a manual
//! single-URL mode (`--url`/`-u`, a bare URL argument, or the
//! `MANUAL_ITEM_URL` environment variable) that scrapes one detail page
//! into the sink without touching listings or state.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use goods_monitor::application::{JsonlSink, NoopMirror, Runner};
use goods_monitor::infrastructure::config::SitesConfig;
use goods_monitor::infrastructure::http_client::Fetcher;
use goods_monitor::infrastructure::logging;
use goods_monitor::infrastructure::parsing::AdapterRegistry;

fn cli_manual_url(args: &[String]) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--url" || arg == "-u") && i + 1 < args.len() {
            let url = args[i + 1].trim();
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }
    args.first()
        .map(|a| a.trim())
        .filter(|a| a.starts_with("http://") || a.starts_with("https://"))
        .map(str::to_string)
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let fetcher = Fetcher::new()?;
    let registry = AdapterRegistry::standard();
    let sink = JsonlSink::new(
        env_nonempty("PAYLOAD_SINK").unwrap_or_else(|| "out/payloads.jsonl".to_string()),
    );
    let mirror = NoopMirror;
    let runner = Runner {
        fetcher: &fetcher,
        registry: &registry,
        sink: &sink,
        mirror: &mirror,
        env_webhook: env_nonempty("DISCORD_WEBHOOK_URL"),
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let manual_url = cli_manual_url(&args).or_else(|| env_nonempty("MANUAL_ITEM_URL"));
    if let Some(url) = manual_url {
        info!("manual URL set; running single-item mode");
        runner.run_manual(&url).await?;
        return Ok(());
    }

    let config_path =
        PathBuf::from(env_nonempty("SITES_JSON").unwrap_or_else(|| "sites.json".to_string()));
    let config = SitesConfig::load(&config_path).await?;
    info!(sites = config.sites.len(), config = %config_path.display(), "loaded roster");
    if config.sites.is_empty() {
        info!("no sites configured; nothing to do");
        return Ok(());
    }

    let summaries = runner.run_all(&config).await;
    let new_total: usize = summaries.iter().map(|s| s.new_items).sum();
    let error_total: usize = summaries.iter().map(|s| s.errors.len()).sum();
    info!(sites = summaries.len(), new = new_total, errors = error_total, "all sites processed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn manual_url_from_flag_or_bare_argument() {
        assert_eq!(
            cli_manual_url(&args(&["--url", "https://x.jp/item/1"])),
            Some("https://x.jp/item/1".to_string())
        );
        assert_eq!(
            cli_manual_url(&args(&["-u", "https://x.jp/item/2"])),
            Some("https://x.jp/item/2".to_string())
        );
        assert_eq!(
            cli_manual_url(&args(&["https://x.jp/item/3"])),
            Some("https://x.jp/item/3".to_string())
        );
        assert_eq!(cli_manual_url(&args(&["not-a-url"])), None);
        assert_eq!(cli_manual_url(&[]), None);
    }
}
