//! Search page renderers
//!
//! The catalog populates its search listings with client-side script, so the
//! default renderer drives headless Chrome. A plain-HTTP renderer covers static
//! mirrors and tests.

use crate::config::{Config, RendererKind};
use crate::crawler::fetcher::{build_http_client, fetch_html};
use crate::{HarvestError, Result};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

/// Produces the markup of a search page as a browser would see it
pub trait PageRenderer: Send + Sync {
    /// Returns the rendered markup of `url` once the page has settled
    fn render(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Renders by fetching the raw markup with a GET
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        fetch_html(&self.client, url, self.timeout).await
    }
}

#[cfg(feature = "browser")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "browser")]
mod chrome {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    /// Renders pages in a single Chrome session, one page at a time
    pub struct ChromeRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
        settle: Duration,
        timeout: Duration,
    }

    impl ChromeRenderer {
        /// Launches Chrome with the given user agent
        ///
        /// `settle` is how long to wait after load for listings to populate;
        /// `timeout` bounds one whole render including the settle time.
        pub async fn launch(
            headless: bool,
            user_agent: &str,
            settle: Duration,
            timeout: Duration,
        ) -> Result<Self> {
            let mut builder = BrowserConfig::builder()
                .request_timeout(timeout)
                .window_size(1920, 1080)
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg(format!("--user-agent={}", user_agent));

            if !headless {
                builder = builder.with_head();
            }

            let browser_config = builder.build().map_err(|message| HarvestError::Render {
                url: "about:blank".to_string(),
                message,
            })?;

            let (browser, mut handler) =
                Browser::launch(browser_config)
                    .await
                    .map_err(|e| HarvestError::Render {
                        url: "about:blank".to_string(),
                        message: format!("failed to launch browser: {}", e),
                    })?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::trace!("Browser handler event error: {}", e);
                    }
                }
                tracing::debug!("Browser handler task completed");
            });

            tracing::info!("Launched Chrome (headless: {})", headless);

            Ok(Self {
                browser,
                handler,
                settle,
                timeout,
            })
        }

        /// Closes the browser session
        pub async fn close(mut self) {
            if let Err(e) = self.browser.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
            self.handler.abort();
        }
    }

    impl PageRenderer for ChromeRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            let render = async {
                let page = self.browser.new_page(url).await?;
                tokio::time::sleep(self.settle).await;
                let html = page.content().await;
                if let Err(e) = page.close().await {
                    tracing::debug!("Failed to close page {}: {}", url, e);
                }
                html
            };

            match tokio::time::timeout(self.timeout, render).await {
                Ok(Ok(html)) => Ok(html),
                Ok(Err(e)) => Err(HarvestError::Render {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
                Err(_) => Err(HarvestError::Timeout {
                    url: url.to_string(),
                }),
            }
        }
    }
}

/// The renderer selected by configuration
pub enum SearchRenderer {
    #[cfg(feature = "browser")]
    Chrome(ChromeRenderer),
    Http(HttpRenderer),
}

impl SearchRenderer {
    /// Builds the renderer named by `config.crawler.renderer`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.crawler.render_timeout_secs);

        match config.crawler.renderer {
            #[cfg(feature = "browser")]
            RendererKind::Chrome => {
                let renderer = ChromeRenderer::launch(
                    config.crawler.headless,
                    &config.http.user_agent,
                    Duration::from_millis(config.crawler.page_wait_ms),
                    timeout,
                )
                .await?;
                Ok(Self::Chrome(renderer))
            }
            #[cfg(not(feature = "browser"))]
            RendererKind::Chrome => Err(HarvestError::Render {
                url: config.crawler.search_url.clone(),
                message: "built without the `browser` feature; use --renderer http".to_string(),
            }),
            RendererKind::Http => {
                let client = build_http_client(&config.http)?;
                Ok(Self::Http(HttpRenderer::new(client, timeout)))
            }
        }
    }

    /// Releases any browser session
    pub async fn close(self) {
        match self {
            #[cfg(feature = "browser")]
            Self::Chrome(renderer) => renderer.close().await,
            Self::Http(_) => {}
        }
    }
}

impl PageRenderer for SearchRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        match self {
            #[cfg(feature = "browser")]
            Self::Chrome(renderer) => renderer.render(url).await,
            Self::Http(renderer) => renderer.render(url).await,
        }
    }
}
