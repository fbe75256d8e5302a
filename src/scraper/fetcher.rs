//! Static HTTP fetching with browser fallback
//!
//! Every page fetch starts with a plain HTTP GET through a shared reqwest
//! client. If the static parse yields fewer candidate elements for the
//! requested data type than the configured threshold (the signature of a
//! script-rendered page), or if the static fetch itself fails, the fetch
//! escalates to a full browser rendering. A failure on the browser path is
//! the run's failure: there is no further fallback.

use crate::config::ScraperConfig;
use crate::scraper::{browser, candidate_count, DataType, RenderedContent};
use crate::ScrapeError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches pages, deciding between static and browser-rendered retrieval
pub struct Fetcher {
    client: Client,
    browser_timeout: Duration,
    fallback_threshold: usize,
}

impl Fetcher {
    /// Builds a fetcher and its HTTP client from the scraper configuration
    pub fn new(config: &ScraperConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            browser_timeout: Duration::from_secs(config.browser_timeout_secs),
            fallback_threshold: config.fallback_threshold.max(1),
        })
    }

    /// Fetches a page, escalating to the browser when the static result
    /// looks script-rendered
    ///
    /// # Errors
    ///
    /// Returns a fetch error when the static path fails AND the browser
    /// path fails, or when the browser path fails after a thin static
    /// parse. The executor records this as a failed run.
    pub async fn fetch(&self, url: &Url, data_type: DataType) -> crate::Result<RenderedContent> {
        match self.static_fetch(url).await {
            Ok(content) => {
                let candidates = candidate_count(&content.html, data_type);
                if candidates >= self.fallback_threshold {
                    tracing::debug!(
                        "Static fetch of {} found {} {} candidates",
                        url,
                        candidates,
                        data_type
                    );
                    return Ok(content);
                }

                tracing::info!(
                    "Static fetch of {} found {} {} candidates (threshold {}), \
                     falling back to browser rendering",
                    url,
                    candidates,
                    data_type,
                    self.fallback_threshold
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Static fetch of {} failed ({}), falling back to browser rendering",
                    url,
                    e
                );
            }
        }

        let html = browser::render(url, self.browser_timeout).await?;
        Ok(RenderedContent {
            url: url.clone(),
            html,
            via_browser: true,
        })
    }

    /// Performs the static GET and returns the body on a 2xx HTML response
    async fn static_fetch(&self, url: &Url) -> crate::Result<RenderedContent> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        Ok(RenderedContent {
            url: final_url,
            html,
            via_browser: false,
        })
    }

    /// The underlying HTTP client, shared with the media downloader
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Maps a reqwest error to the timeout/fetch error split used in stats
fn classify_reqwest_error(url: &Url, e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::Timeout {
            url: url.to_string(),
        }
    } else {
        ScrapeError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
