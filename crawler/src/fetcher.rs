use crate::error::CrawlError;
use async_trait::async_trait;
use std::time::Duration;

/// Rendering capability the crawl controller drives.
///
/// One fetcher is one browser session: it is opened at the start of a work
/// unit and closed at its teardown. Query methods never fail; an element or
/// attribute that cannot be read comes back as `None` or an empty list.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Handle to an element on the current page
    type Element: Send + Sync;

    /// Load `url` as the current page
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError>;

    /// Wait up to `timeout` for at least one element matching `selector`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool;

    /// All elements matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Rendered text of an element
    async fn get_text(&self, element: &Self::Element) -> Option<String>;

    /// Attribute value of an element, `None` if absent
    async fn get_attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Release the session
    async fn close(&mut self) -> Result<(), CrawlError>;
}

/// Opens a fresh fetcher for each work unit
#[async_trait]
pub trait FetcherFactory: Send + Sync {
    type Fetcher: PageFetcher;

    async fn open(&self) -> Result<Self::Fetcher, CrawlError>;
}
