#![allow(dead_code)]

use async_trait::async_trait;
use dircrawl::connectivity::ConnectivityGate;
use dircrawl::{CrawlConfig, CrawlController, CrawlError, FetcherFactory, PageFetcher, Probe};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://dir.example/";
pub const LISTING: &str = "a.business-name";

/// Element on a scripted page
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
}

impl FakeElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn attr(name: &str, value: &str) -> Self {
        Self {
            attrs: HashMap::from([(name.to_string(), value.to_string())]),
            ..Self::default()
        }
    }
}

/// Elements of one page keyed by selector
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub fn listing(hrefs: &[&str]) -> Self {
        let links = hrefs.iter().map(|href| FakeElement::attr("href", href)).collect();
        Self {
            elements: HashMap::from([(LISTING.to_string(), links)]),
        }
    }

    /// A page where the listing never renders
    pub fn blank() -> Self {
        Self::default()
    }

    /// A profile page matching the default selectors
    pub fn profile(name: &str) -> Self {
        let slug = name.to_lowercase().replace(' ', "-");
        Self::default()
            .with("h1.dockable.business-name", FakeElement::text(&format!("  {}  ", name)))
            .with("a.phone.dockable span.full", FakeElement::text("(555) 010-0100"))
            .with(
                "a.website-link.dockable",
                FakeElement::attr("href", &format!("https://{}.example", slug)),
            )
            .with("span.address", FakeElement::text("1 Main St"))
            .with(
                "a.email-business",
                FakeElement::attr("href", &format!("mailto:info@{}.example", slug)),
            )
    }

    pub fn with(mut self, selector: &str, element: FakeElement) -> Self {
        self.elements.entry(selector.to_string()).or_default().push(element);
        self
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.elements.remove(selector);
        self
    }
}

type Hook = Arc<dyn Fn() + Send + Sync>;

/// A scripted directory site. Unknown URLs fail to navigate.
#[derive(Clone, Default)]
pub struct Site {
    pages: HashMap<String, FakePage>,
    hooks: HashMap<String, Hook>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Run `hook` whenever `url` is navigated to
    pub fn on_navigate(mut self, url: &str, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.insert(url.to_string(), Arc::new(hook));
        self
    }
}

/// Everything the fetchers were asked to do
#[derive(Debug, Default)]
pub struct FetchLog {
    pub opened: usize,
    pub closed: usize,
    pub navigations: Vec<String>,
    /// (url, selector) of every wait_for_selector call
    pub waits: Vec<(String, String)>,
}

impl FetchLog {
    pub fn navigations_to(&self, prefix: &str) -> Vec<String> {
        self.navigations
            .iter()
            .filter(|url| url.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn listing_waits(&self) -> usize {
        self.waits.iter().filter(|(_, selector)| selector == LISTING).count()
    }
}

pub struct ScriptedFactory {
    site: Arc<Site>,
    pub log: Arc<Mutex<FetchLog>>,
}

impl ScriptedFactory {
    pub fn new(site: Site) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(Mutex::new(FetchLog::default())),
        }
    }
}

#[async_trait]
impl FetcherFactory for ScriptedFactory {
    type Fetcher = ScriptedFetcher;

    async fn open(&self) -> Result<ScriptedFetcher, CrawlError> {
        self.log.lock().unwrap().opened += 1;
        Ok(ScriptedFetcher {
            site: self.site.clone(),
            log: self.log.clone(),
            current: None,
        })
    }
}

pub struct ScriptedFetcher {
    site: Arc<Site>,
    log: Arc<Mutex<FetchLog>>,
    current: Option<String>,
}

impl ScriptedFetcher {
    fn elements(&self, selector: &str) -> Vec<FakeElement> {
        self.current
            .as_ref()
            .and_then(|url| self.site.pages.get(url))
            .and_then(|page| page.elements.get(selector))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    type Element = FakeElement;

    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        if let Some(hook) = self.site.hooks.get(url) {
            hook();
        }
        if self.site.pages.contains_key(url) {
            self.current = Some(url.to_string());
            Ok(())
        } else {
            self.current = None;
            Err(CrawlError::Fetcher(format!("no such page {}", url)))
        }
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> bool {
        let url = self.current.clone().unwrap_or_default();
        self.log.lock().unwrap().waits.push((url, selector.to_string()));
        !self.elements(selector).is_empty()
    }

    async fn find_all(&self, selector: &str) -> Vec<FakeElement> {
        self.elements(selector)
    }

    async fn get_text(&self, element: &FakeElement) -> Option<String> {
        Some(element.text.clone())
    }

    async fn get_attribute(&self, element: &FakeElement, name: &str) -> Option<String> {
        element.attrs.get(name).cloned()
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.log.lock().unwrap().closed += 1;
        self.current = None;
        Ok(())
    }
}

/// Probe that always reports connectivity
pub struct Online;

#[async_trait]
impl Probe for Online {
    async fn probe(&self) -> io::Result<()> {
        Ok(())
    }
}

pub fn config(output_dir: &Path, max_pages: u32) -> CrawlConfig {
    CrawlConfig {
        base_url: BASE_URL.to_string(),
        output_dir: output_dir.to_path_buf(),
        max_pages,
        ..CrawlConfig::default()
    }
    .without_delays()
}

pub fn controller(
    factory: ScriptedFactory,
    output_dir: &Path,
    max_pages: u32,
) -> CrawlController<ScriptedFactory, Online> {
    let gate = ConnectivityGate::new(Online, Duration::ZERO, None);
    CrawlController::with_gate(factory, gate, &config(output_dir, max_pages)).unwrap()
}

pub fn listing_url(path: &str, page: u32) -> String {
    if page == 1 {
        format!("{}{}", BASE_URL, path)
    } else {
        format!("{}{}?page={}", BASE_URL, path, page)
    }
}

pub fn profile_url(id: &str) -> String {
    format!("{}profile/{}", BASE_URL, id)
}
