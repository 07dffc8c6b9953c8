// src/crawl/renderer.rs
// =============================================================================
// Rise courses are single-page apps: the lesson list and lesson content only
// exist after client-side JavaScript runs. A plain HTTP GET returns an empty
// shell, so we let a real browser render each page and hand us the markup.
//
// The browser is driven over the WebDriver protocol (chromedriver) using the
// `thirtyfour` crate. The traversal code only sees the `PageRenderer` trait,
// so tests can swap in an in-memory renderer.
// =============================================================================

use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

// Errors raised while rendering a page
#[derive(Debug, Error)]
pub enum RenderError {
    /// Could not start a browser session at the WebDriver endpoint
    #[error("failed to start browser session at {endpoint}: {reason}")]
    Session { endpoint: String, reason: String },

    /// Navigation to the page failed (network error, bad URL, browser crash)
    #[error("failed to load {url}: {reason}")]
    Navigate { url: String, reason: String },

    /// The page loaded but its markup could not be read back
    #[error("failed to read page source of {url}: {reason}")]
    PageSource { url: String, reason: String },
}

// Anything that can turn a URL into fully rendered markup
//
// `settle` is how long to wait after navigation so client-side rendering
// can finish before the markup is read.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, settle: Duration) -> Result<String, RenderError>;
}

// Page renderer backed by a Chrome session over WebDriver
//
// One session is reused for every navigation, so renders never overlap.
// Call `close()` when done; it quits the browser process.
pub struct WebDriverRenderer {
    driver: WebDriver,
}

impl WebDriverRenderer {
    /// Starts a Chrome session at the given WebDriver endpoint
    pub async fn connect(endpoint: &str, headless: bool) -> Result<Self, RenderError> {
        let session_error = |e: WebDriverError| RenderError::Session {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        };

        let mut caps = DesiredCapabilities::chrome();
        if headless {
            caps.set_headless().map_err(session_error)?;
        }
        caps.set_disable_gpu().map_err(session_error)?;
        caps.set_no_sandbox().map_err(session_error)?;

        let driver = WebDriver::new(endpoint, caps).await.map_err(session_error)?;
        debug!(endpoint, headless, "browser session started");

        Ok(Self { driver })
    }

    /// Quits the browser. Failures are logged, never propagated.
    pub async fn close(self) {
        if let Err(e) = self.driver.quit().await {
            warn!("Failed to quit browser: {}", e);
        }
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &str, settle: Duration) -> Result<String, RenderError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| RenderError::Navigate {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        // Give the SPA time to build the DOM
        tokio::time::sleep(settle).await;

        self.driver
            .source()
            .await
            .map_err(|e| RenderError::PageSource {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}
