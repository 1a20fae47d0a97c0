use crate::config::{FieldSelector, ProfileSelectors};
use crate::error::CrawlError;
use crate::fetcher::PageFetcher;
use crate::models::Record;
use log::debug;
use std::time::Duration;

/// Maps a rendered profile page to a [`Record`]
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    selectors: ProfileSelectors,
    /// Pause after navigation before the first lookup
    settle: Duration,
    /// Bound on each field lookup
    field_timeout: Duration,
}

impl RecordExtractor {
    pub fn new(selectors: ProfileSelectors, settle: Duration, field_timeout: Duration) -> Self {
        Self {
            selectors,
            settle,
            field_timeout,
        }
    }

    /// Navigate to `profile_url` and read every field.
    ///
    /// Only the navigation can fail. A field whose element is missing or does
    /// not appear in time is left empty.
    pub async fn extract<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        profile_url: &str,
    ) -> Result<Record, CrawlError> {
        fetcher.navigate(profile_url).await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let fetcher = &*fetcher;
        let email_href = self.lookup(fetcher, &self.selectors.email).await;

        Ok(Record {
            name: self.field(fetcher, &self.selectors.name).await,
            phone: self.field(fetcher, &self.selectors.phone).await,
            website: self.field(fetcher, &self.selectors.website).await,
            address: self.field(fetcher, &self.selectors.address).await,
            email: email_href.as_deref().and_then(parse_mailto).unwrap_or_default(),
            profile_link: profile_url.to_string(),
        })
    }

    async fn field<F: PageFetcher>(&self, fetcher: &F, selector: &FieldSelector) -> String {
        self.lookup(fetcher, selector).await.unwrap_or_default()
    }

    /// Trimmed text or attribute of the first element matching `selector`
    async fn lookup<F: PageFetcher>(&self, fetcher: &F, selector: &FieldSelector) -> Option<String> {
        if !fetcher.wait_for_selector(&selector.css, self.field_timeout).await {
            debug!("Field '{}' not found", selector.css);
            return None;
        }

        let element = fetcher.find_all(&selector.css).await.into_iter().next()?;
        let value = match &selector.attribute {
            Some(name) => fetcher.get_attribute(&element, name).await,
            None => fetcher.get_text(&element).await,
        };
        value.map(|v| v.trim().to_string())
    }
}

/// Address part of a `mailto:` link, without any `?subject=` style query
pub fn parse_mailto(href: &str) -> Option<String> {
    let address = href.trim().strip_prefix("mailto:")?;
    let address = address.split('?').next().unwrap_or_default().trim();
    if address.is_empty() {
        None
    } else {
        Some(address.to_string())
    }
}
