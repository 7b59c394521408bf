//! Browser-profiled HTTP fetcher.
//!
//! The figure retailer fronts its detail pages with a bot screen that
//! rejects cookieless or referer-less requests, so the fetcher keeps a
//! cookie jar, warms it up against the storefront top, and escalates
//! through a referer dance, a header-tweaked retry and an alternate
//! search-domain fallback before giving up.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER, USER_AGENT};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/122.0 Safari/537.36";
const RETRY_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                        (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANG: &str = "ja-JP,ja;q=0.9,en-US,en;q=0.8";

const AMIAMI_TOP: &str = "https://www.amiami.jp/";
const AMIAMI_SLIST: &str = "https://slist.amiami.jp/top/search/list?s_sortkey=regtimed&pagemax=60";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
}

pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    fn base_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANG));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        headers
    }

    fn is_amiami_detail(url: &Url) -> bool {
        url.host_str()
            .map(|h| h.to_ascii_lowercase().ends_with("amiami.jp"))
            .unwrap_or(false)
            && url.path().contains("/top/detail/detail")
    }

    async fn warm_up(&self, url: &str) {
        // Cookie seeding only; failures here never matter.
        if let Err(err) = self.client.get(url).headers(self.base_headers()).send().await {
            debug!(url, %err, "warm-up request failed");
        }
    }

    async fn get(&self, url: &str, headers: HeaderMap) -> Result<reqwest::Response, FetchError> {
        self.client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// Fetch a page as text, with the storefront-specific evasions.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.warm_up(AMIAMI_TOP).await;

        let mut headers = self.base_headers();
        let amiami_detail = Self::is_amiami_detail(url);
        if amiami_detail {
            // Simulate navigation from the search listing on the sibling
            // domain, with the client hints a real browser would send.
            self.warm_up(AMIAMI_SLIST).await;
            headers.insert(REFERER, HeaderValue::from_static(AMIAMI_SLIST));
            headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
            headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
            headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-site"));
            headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
            headers.insert(
                "sec-ch-ua",
                HeaderValue::from_static(
                    r#""Chromium";v="124", "Google Chrome";v="124", ";Not=A?Brand";v="99""#,
                ),
            );
            headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
            headers.insert("sec-ch-ua-platform", HeaderValue::from_static(r#""Windows""#));
            headers.insert("DNT", HeaderValue::from_static("1"));
        } else {
            headers.insert(REFERER, HeaderValue::from_static(AMIAMI_TOP));
        }

        let mut response = self.get(url.as_str(), headers.clone()).await?;

        if matches!(
            response.status(),
            StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE
        ) {
            warn!(url = %url, status = %response.status(), "blocked, retrying with tweaked headers");
            headers.insert(USER_AGENT, HeaderValue::from_static(RETRY_UA));
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            if let Ok(retried) = self.get(url.as_str(), headers.clone()).await {
                response = retried;
            }
        }

        // Detail pages often stay reachable on the search domain after
        // the www host starts refusing.
        if response.status() == StatusCode::FORBIDDEN && amiami_detail {
            let alt_url = url.as_str().replace("://www.amiami.jp", "://slist.amiami.jp");
            let mut alt_headers = headers.clone();
            alt_headers.insert(REFERER, HeaderValue::from_static("https://slist.amiami.jp/"));
            if let Ok(alt) = self.get(&alt_url, alt_headers).await {
                if alt.status().is_success() {
                    debug!(url = %url, "alternate domain fallback succeeded");
                    response = alt;
                }
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amiami_detail_detection() {
        let detail = Url::parse("https://www.amiami.jp/top/detail/detail?gcode=FIGURE-1").unwrap();
        let listing = Url::parse("https://slist.amiami.jp/top/search/list?s_keywords=x").unwrap();
        let other = Url::parse("https://shop.hololivepro.com/products/x").unwrap();
        assert!(Fetcher::is_amiami_detail(&detail));
        assert!(!Fetcher::is_amiami_detail(&listing));
        assert!(!Fetcher::is_amiami_detail(&other));
    }
}
