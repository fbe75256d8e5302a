//! Browser-rendered fetching via headless Chrome
//!
//! The browser is a heavy, external dependency, so the session is a
//! scoped resource: launched for a single fetch attempt and torn down on
//! every exit path, whether the render succeeds, fails, or times out.
//! Concurrency across jobs is capped by the scheduler's worker pool, so
//! the number of simultaneous Chrome processes is bounded.

use crate::ScrapeError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use url::Url;

/// Renders a page in a headless browser and returns the final HTML
///
/// The entire navigate-and-capture sequence runs under `timeout`; on
/// expiry the session is closed and the error surfaces as a browser
/// failure for the run.
pub async fn render(url: &Url, timeout: Duration) -> crate::Result<String> {
    let mut session = Session::launch(url).await?;

    let result = tokio::time::timeout(timeout, session.capture(url)).await;
    session.shutdown().await;

    match result {
        Ok(Ok(html)) => Ok(html),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ScrapeError::Browser {
            url: url.to_string(),
            message: format!("render timed out after {:?}", timeout),
        }),
    }
}

/// One launched browser with its CDP event loop
struct Session {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl Session {
    async fn launch(url: &Url) -> crate::Result<Self> {
        let config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(1920, 1080)
            .build()
            .map_err(|message| ScrapeError::Browser {
                url: url.to_string(),
                message,
            })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Browser {
                url: url.to_string(),
                message: format!("failed to launch browser: {e}"),
            })?;

        // The handler stream must be polled for the session to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    async fn capture(&self, url: &Url) -> crate::Result<String> {
        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| ScrapeError::Browser {
                url: url.to_string(),
                message: format!("navigation failed: {e}"),
            })?;

        if let Err(e) = page.wait_for_navigation().await {
            tracing::debug!("wait_for_navigation for {} returned: {}", url, e);
        }

        let html = page.content().await.map_err(|e| ScrapeError::Browser {
            url: url.to_string(),
            message: format!("failed to capture content: {e}"),
        })?;

        let _ = page.close().await;
        Ok(html)
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close returned: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}
