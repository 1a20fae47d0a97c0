use crate::error::CrawlError;
use crate::fetcher::{FetcherFactory, PageFetcher};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;

/// Snapshot of an element in a static document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticElement {
    pub text: String,
    pub attributes: HashMap<String, String>,
}

/// Opens plain HTTP sessions for server-rendered directories
#[derive(Debug, Clone)]
pub struct HttpFactory {
    user_agent: String,
}

impl HttpFactory {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl FetcherFactory for HttpFactory {
    type Fetcher = HttpFetcher;

    async fn open(&self) -> Result<HttpFetcher, CrawlError> {
        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .gzip(true)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CrawlError::fetcher)?;

        Ok(HttpFetcher { client, body: None })
    }
}

/// Fetches documents over HTTP and queries them without running scripts
pub struct HttpFetcher {
    client: Client,
    /// Body of the current page
    body: Option<String>,
}

impl HttpFetcher {
    /// Fetcher over an already loaded document
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            body: Some(html.into()),
        }
    }

    fn select(&self, selector: &str) -> Vec<StaticElement> {
        let Some(body) = &self.body else {
            return Vec::new();
        };
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Invalid selector '{}': {:?}", selector, e);
                return Vec::new();
            }
        };

        let document = Html::parse_document(body);
        document
            .select(&selector)
            .map(|el| StaticElement {
                text: el.text().collect::<String>(),
                attributes: el
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    type Element = StaticElement;

    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        self.body = None;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::Fetcher(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        debug!("GET {} -> {}", url, status);
        if !status.is_success() {
            return Err(CrawlError::Fetcher(format!("GET {} returned {}", url, status)));
        }

        let body = response.text().await.map_err(CrawlError::fetcher)?;
        self.body = Some(body);
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> bool {
        // A static document never changes after load
        !self.select(selector).is_empty()
    }

    async fn find_all(&self, selector: &str) -> Vec<StaticElement> {
        self.select(selector)
    }

    async fn get_text(&self, element: &StaticElement) -> Option<String> {
        Some(element.text.clone())
    }

    async fn get_attribute(&self, element: &StaticElement, name: &str) -> Option<String> {
        element.attributes.get(name).cloned()
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.body = None;
        Ok(())
    }
}
