use crate::error::CrawlError;
use crate::fetcher::{FetcherFactory, PageFetcher};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

/// Upper bound on a single navigation
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// How often `wait_for_selector` re-queries the DOM
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches headless Chrome sessions
#[derive(Debug, Clone)]
pub struct HeadlessFactory {
    /// Hide the browser window
    headless: bool,
    /// User agent presented to the site
    user_agent: String,
}

impl HeadlessFactory {
    pub fn new(headless: bool, user_agent: impl Into<String>) -> Self {
        Self {
            headless,
            user_agent: user_agent.into(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, CrawlError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .args(vec![
                "--disable-blink-features=AutomationControlled", // Hide navigator.webdriver
                "--disable-gpu",
                "--disable-dev-shm-usage", // Avoid crashes in constrained environments
                "--disable-extensions",
                "--no-first-run",
            ])
            .arg(format!("--user-agent={}", self.user_agent));

        if !self.headless {
            builder = builder.with_head();
        }

        builder
            .build()
            .map_err(|e| CrawlError::Fetcher(format!("failed to build browser config: {}", e)))
    }
}

#[async_trait]
impl FetcherFactory for HeadlessFactory {
    type Fetcher = HeadlessFetcher;

    async fn open(&self) -> Result<HeadlessFetcher, CrawlError> {
        info!("Starting Chrome browser (headless: {})", self.headless);
        let config = self.browser_config()?;

        // Try to launch the browser with retries
        let mut retries = 3;
        let mut last_error = None;

        while retries > 0 {
            match Browser::launch(config.clone()).await {
                Ok((mut browser, mut handler)) => {
                    // Drive CDP events until the browser goes away
                    let handler_task = tokio::spawn(async move {
                        while let Some(event) = handler.next().await {
                            if let Err(e) = event {
                                debug!("Browser handler error: {}", e);
                            }
                        }
                    });

                    let page = match browser.new_page("about:blank").await {
                        Ok(page) => page,
                        Err(e) => {
                            error!("Failed to open a tab: {}", e);
                            if let Err(close_err) = shutdown(&mut browser, &handler_task).await {
                                warn!("{}", close_err);
                            }
                            return Err(CrawlError::fetcher(e));
                        }
                    };

                    info!("Chrome browser started");
                    return Ok(HeadlessFetcher {
                        browser,
                        page,
                        handler_task,
                        closed: false,
                    });
                }
                Err(e) => {
                    error!("Failed to launch browser (attempt {}): {}", 4 - retries, e);
                    last_error = Some(e);
                    retries -= 1;

                    if retries > 0 {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        Err(CrawlError::Fetcher(format!(
            "failed to start Chrome after multiple attempts: {:?}",
            last_error
        )))
    }
}

/// One Chrome session with a single reused tab
pub struct HeadlessFetcher {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    closed: bool,
}

#[async_trait]
impl PageFetcher for HeadlessFetcher {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        debug!("Navigating to {}", url);
        match timeout(NAVIGATION_TIMEOUT, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CrawlError::Fetcher(format!("navigation to {} failed: {}", url, e))),
            Err(_) => Err(CrawlError::Fetcher(format!("navigation to {} timed out", url))),
        }
    }

    async fn wait_for_selector(&self, selector: &str, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now()))).await;
        }
    }

    async fn find_all(&self, selector: &str) -> Vec<Element> {
        match self.page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!("No elements for '{}': {}", selector, e);
                Vec::new()
            }
        }
    }

    async fn get_text(&self, element: &Element) -> Option<String> {
        element.inner_text().await.ok().flatten()
    }

    async fn get_attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.attribute(name).await.ok().flatten()
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        if self.closed {
            return Ok(());
        }
        info!("Stopping Chrome browser");
        self.closed = true;

        shutdown(&mut self.browser, &self.handler_task).await
    }
}

/// Close the browser, reap the process and stop the CDP handler
async fn shutdown(browser: &mut Browser, handler_task: &JoinHandle<()>) -> Result<(), CrawlError> {
    let result = browser.close().await.map_err(CrawlError::fetcher);
    if let Err(e) = browser.wait().await {
        warn!("Error waiting for browser exit: {}", e);
    }
    handler_task.abort();
    result.map(|_| ())
}

impl Drop for HeadlessFetcher {
    fn drop(&mut self) {
        if !self.closed {
            // No async in Drop; chromiumoxide kills the child process itself
            warn!("HeadlessFetcher dropped without close()");
            self.handler_task.abort();
        }
    }
}
