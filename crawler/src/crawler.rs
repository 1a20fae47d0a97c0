use crate::checkpoint::CheckpointStore;
use crate::config::{CrawlConfig, RetryPolicy};
use crate::connectivity::{ConnectivityGate, Probe, TcpProbe};
use crate::error::CrawlError;
use crate::extractor::RecordExtractor;
use crate::fetcher::{FetcherFactory, PageFetcher};
use crate::ledger::DedupLedger;
use crate::models::{PageCursor, Record, UnitOutcome, UnitReport, WorkUnit};
use log::{debug, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of waiting for a listing page to render
enum ListingWait {
    Ready,
    Missing,
    Cancelled,
}

/// Mutable state of one unit's crawl
struct UnitSession {
    records: Vec<Record>,
    ledger: DedupLedger,
    records_resumed: usize,
    pages_visited: u32,
    links_skipped: usize,
    profiles_failed: usize,
}

impl UnitSession {
    fn resume(records: Vec<Record>) -> Self {
        Self {
            ledger: DedupLedger::seeded(&records),
            records_resumed: records.len(),
            records,
            pages_visited: 0,
            links_skipped: 0,
            profiles_failed: 0,
        }
    }

    fn append(&mut self, record: Record) {
        self.ledger.insert(record.profile_link.clone());
        self.records.push(record);
    }

    fn into_report(self, unit: &WorkUnit, outcome: UnitOutcome) -> UnitReport {
        UnitReport {
            unit: unit.clone(),
            outcome,
            pages_visited: self.pages_visited,
            records_resumed: self.records_resumed,
            records_new: self.records.len() - self.records_resumed,
            links_skipped: self.links_skipped,
            profiles_failed: self.profiles_failed,
        }
    }
}

/// Drives pagination, extraction, deduplication and checkpointing for one work unit at a time
pub struct CrawlController<F, P = TcpProbe> {
    factory: F,
    gate: ConnectivityGate<P>,
    store: CheckpointStore,
    extractor: RecordExtractor,
    /// Site root, always ending in `/`
    base_url: Url,
    listing_selector: String,
    max_pages: u32,
    retry: RetryPolicy,
    record_delay: Duration,
}

impl<F: FetcherFactory> CrawlController<F, TcpProbe> {
    /// Controller probing connectivity over TCP as configured
    pub fn from_config(factory: F, config: &CrawlConfig) -> Result<Self, CrawlError> {
        Self::with_gate(factory, ConnectivityGate::from_config(&config.connectivity), config)
    }
}

impl<F: FetcherFactory, P: Probe> CrawlController<F, P> {
    pub fn with_gate(
        factory: F,
        gate: ConnectivityGate<P>,
        config: &CrawlConfig,
    ) -> Result<Self, CrawlError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| CrawlError::Config(format!("invalid base_url '{}': {}", config.base_url, e)))?;

        Ok(Self {
            factory,
            gate,
            store: CheckpointStore::new(&config.output_dir),
            extractor: RecordExtractor::new(
                config.profile.clone(),
                config.pacing.profile_settle,
                config.pacing.field_timeout,
            ),
            base_url,
            listing_selector: config.listing_selector.clone(),
            max_pages: config.max_pages,
            retry: config.retry.clone(),
            record_delay: config.pacing.record_delay,
        })
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// URL of listing page `page`; pages after the first carry a `page` query parameter
    pub fn page_url(&self, unit: &WorkUnit, page: u32) -> Result<Url, CrawlError> {
        let mut url = self
            .base_url
            .join(unit.listing_path.trim_start_matches('/'))
            .map_err(|e| {
                CrawlError::Config(format!("invalid listing path '{}': {}", unit.listing_path, e))
            })?;
        if page > 1 {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    /// Crawl one work unit to completion, early termination or interruption.
    ///
    /// The fetcher is closed and the checkpoint rewritten on every path out of
    /// the crawl. A checkpoint failure is returned as an error; every other
    /// way the crawl can end is reported in the [`UnitReport`].
    pub async fn run_unit(
        &self,
        unit: &WorkUnit,
        cancel: &CancellationToken,
    ) -> Result<UnitReport, CrawlError> {
        info!("Starting {}", unit);
        let mut session = UnitSession::resume(self.store.load(unit)?);
        let mut fetcher = self.factory.open().await?;

        let crawled = self.crawl(unit, &mut fetcher, &mut session, cancel).await;

        if let Err(e) = fetcher.close().await {
            warn!("Failed to close fetcher for {}: {}", unit.city_name, e);
        }
        let saved = self.store.save(unit, &session.records);

        let outcome = crawled?;
        saved?;

        if outcome == UnitOutcome::Interrupted {
            warn!("Interrupted! Saved collected data for {}", unit.city_name);
        }
        info!(
            "Saved {} entries to {:?} ({})",
            session.records.len(),
            self.store.path_for(unit),
            outcome
        );
        Ok(session.into_report(unit, outcome))
    }

    async fn crawl(
        &self,
        unit: &WorkUnit,
        fetcher: &mut F::Fetcher,
        session: &mut UnitSession,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome, CrawlError> {
        let mut cursor = PageCursor::new(self.max_pages);

        while cursor.in_bounds() {
            let page = cursor.page();
            if cancel.is_cancelled() {
                return Ok(UnitOutcome::Interrupted);
            }

            let url = self.page_url(unit, page)?;
            info!("{} - processing page {}", unit.city_name, page);

            if !self.wait_online(cancel).await? {
                return Ok(UnitOutcome::Interrupted);
            }
            // A failed navigation leaves the listing absent; the wait below decides
            if let Err(e) = fetcher.navigate(url.as_str()).await {
                warn!("{}", e);
            }
            session.pages_visited += 1;

            match self.await_listing(fetcher, cancel).await {
                ListingWait::Ready => {}
                ListingWait::Missing => {
                    warn!(
                        "Could not load listing links for {} page {}. Skipping the rest of this city.",
                        unit.city_name, page
                    );
                    return Ok(UnitOutcome::ListingUnavailable { page });
                }
                ListingWait::Cancelled => return Ok(UnitOutcome::Interrupted),
            }

            let links = self.listing_links(fetcher, &url).await;
            if links.is_empty() {
                warn!("No usable profile links on page {} for {}", page, unit.city_name);
            } else {
                debug!("Found {} profile links on page {}", links.len(), page);
            }

            for link in links {
                if cancel.is_cancelled() {
                    return Ok(UnitOutcome::Interrupted);
                }
                if session.ledger.contains(&link) {
                    info!("Skipping already scraped: {}", link);
                    session.links_skipped += 1;
                    continue;
                }
                if !self.wait_online(cancel).await? {
                    return Ok(UnitOutcome::Interrupted);
                }

                info!("Scraping: {}", link);
                let record = match self.extractor.extract(fetcher, &link).await {
                    Ok(record) => record,
                    Err(e) => {
                        // Not in the ledger, so the next run retries it
                        warn!("Failed to load profile {}: {}", link, e);
                        session.profiles_failed += 1;
                        continue;
                    }
                };

                session.append(record);
                self.store.save(unit, &session.records)?;
                self.pause(self.record_delay, cancel).await;
            }

            cursor.advance();
        }

        Ok(UnitOutcome::MaxPagesReached)
    }

    /// Wait for the listing selector, retrying the wait but never the navigation
    async fn await_listing(&self, fetcher: &F::Fetcher, cancel: &CancellationToken) -> ListingWait {
        let attempts = self.retry.listing_attempts;
        for attempt in 1..=attempts {
            if fetcher
                .wait_for_selector(&self.listing_selector, self.retry.listing_wait)
                .await
            {
                return ListingWait::Ready;
            }
            warn!("Retry {}/{} - waiting for listing links...", attempt, attempts);
            if attempt < attempts && !self.pause(self.retry.listing_retry_delay, cancel).await {
                return ListingWait::Cancelled;
            }
        }
        ListingWait::Missing
    }

    /// Absolute profile links on the current listing page, in page order
    async fn listing_links(&self, fetcher: &F::Fetcher, page_url: &Url) -> Vec<String> {
        let mut links = Vec::new();
        for element in fetcher.find_all(&self.listing_selector).await {
            let Some(href) = fetcher.get_attribute(&element, "href").await else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() {
                continue;
            }
            match page_url.join(href) {
                Ok(url) => links.push(url.to_string()),
                Err(e) => debug!("Ignoring unparsable link '{}': {}", href, e),
            }
        }
        links
    }

    /// Block on the connectivity gate; false if cancelled while waiting
    async fn wait_online(&self, cancel: &CancellationToken) -> Result<bool, CrawlError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(false),
            connected = self.gate.ensure_connected() => connected.map(|_| true),
        }
    }

    /// Sleep for `delay`; false if cancelled first
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
