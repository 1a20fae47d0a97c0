use crate::error::CrawlError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which page fetcher backs the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Headless Chrome via the DevTools protocol
    Headless,
    /// Plain HTTP GET with static HTML parsing
    Http,
}

/// CSS selector for one profile field, optionally reading an attribute instead of text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSelector {
    pub css: String,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldSelector {
    pub fn text(css: &str) -> Self {
        Self {
            css: css.to_string(),
            attribute: None,
        }
    }

    pub fn attr(css: &str, attribute: &str) -> Self {
        Self {
            css: css.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

/// Where each record field lives on a profile page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileSelectors {
    pub name: FieldSelector,
    pub phone: FieldSelector,
    pub website: FieldSelector,
    pub address: FieldSelector,
    /// Must point at a `mailto:` link
    pub email: FieldSelector,
}

impl Default for ProfileSelectors {
    fn default() -> Self {
        Self {
            name: FieldSelector::text("h1.dockable.business-name"),
            phone: FieldSelector::text("a.phone.dockable span.full"),
            website: FieldSelector::attr("a.website-link.dockable", "href"),
            address: FieldSelector::text("span.address"),
            email: FieldSelector::attr("a.email-business", "href"),
        }
    }
}

/// Bounded retry of the listing wait
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// How many times to wait for the listing before giving up on the unit
    pub listing_attempts: u32,

    /// Timeout of a single listing wait
    #[serde(with = "millis")]
    pub listing_wait: Duration,

    /// Pause between listing wait attempts
    #[serde(with = "millis")]
    pub listing_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            listing_attempts: 3,
            listing_wait: Duration::from_secs(10),
            listing_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Fixed delays that keep the request rate down
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after navigating to a profile, before field lookups
    #[serde(with = "millis")]
    pub profile_settle: Duration,

    /// Upper bound on each field lookup
    #[serde(with = "millis")]
    pub field_timeout: Duration,

    /// Pause after each stored record
    #[serde(with = "millis")]
    pub record_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            profile_settle: Duration::from_secs(2),
            field_timeout: Duration::from_secs(10),
            record_delay: Duration::from_secs(1),
        }
    }
}

/// Reachability probe settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Well-known host:port that is always up
    pub probe_addr: String,

    #[serde(with = "millis")]
    pub probe_timeout: Duration,

    /// Sleep between failed probes
    #[serde(with = "millis")]
    pub retry_interval: Duration,

    /// Give up after this many failed probes. `None` waits forever.
    pub max_attempts: Option<u32>,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_addr: "8.8.8.8:53".to_string(),
            probe_timeout: Duration::from_secs(3),
            retry_interval: Duration::from_secs(120),
            max_attempts: None,
        }
    }
}

/// Complete crawler configuration, loadable from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Site root that listing paths are joined onto
    pub base_url: String,

    /// Upper bound on listing pages per unit
    pub max_pages: u32,

    /// Directory holding checkpoint files
    pub output_dir: PathBuf,

    /// Selector of profile links on a listing page
    pub listing_selector: String,

    pub profile: ProfileSelectors,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
    pub connectivity: ConnectivityConfig,

    /// End the whole batch after an interrupted unit instead of moving on
    pub stop_on_interrupt: bool,

    pub engine: Engine,

    /// Run Chrome without a visible window
    pub headless: bool,

    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.your_website.com/".to_string(),
            max_pages: 100,
            output_dir: PathBuf::from("."),
            listing_selector: "a.business-name".to_string(),
            profile: ProfileSelectors::default(),
            retry: RetryPolicy::default(),
            pacing: Pacing::default(),
            connectivity: ConnectivityConfig::default(),
            stop_on_interrupt: false,
            engine: Engine::Headless,
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl CrawlConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Config(format!("failed to read {:?}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CrawlError> {
        toml::from_str(content).map_err(|e| CrawlError::Config(e.to_string()))
    }

    /// Configuration with every delay and timeout collapsed, for tests and dry runs
    pub fn without_delays(mut self) -> Self {
        let tick = Duration::from_millis(1);
        self.retry.listing_wait = tick;
        self.retry.listing_retry_delay = Duration::ZERO;
        self.pacing = Pacing {
            profile_settle: Duration::ZERO,
            field_timeout: tick,
            record_delay: Duration::ZERO,
        };
        self.connectivity.retry_interval = tick;
        self
    }
}

/// Durations are written as integer milliseconds in config files
mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_crawl_policy() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.retry.listing_attempts, 3);
        assert_eq!(config.retry.listing_retry_delay, Duration::from_secs(2));
        assert_eq!(config.connectivity.max_attempts, None);
        assert_eq!(config.profile.email.attribute.as_deref(), Some("href"));
        assert!(!config.stop_on_interrupt);
    }

    #[test]
    fn toml_overrides_keep_other_defaults() {
        let config = CrawlConfig::from_toml(
            r#"
            base_url = "https://directory.example/"
            max_pages = 5
            engine = "http"

            [retry]
            listing_wait = 2500

            [profile.phone]
            css = "span.tel"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://directory.example/");
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.engine, Engine::Http);
        assert_eq!(config.retry.listing_wait, Duration::from_millis(2500));
        assert_eq!(config.retry.listing_attempts, 3);
        assert_eq!(config.profile.phone, FieldSelector::text("span.tel"));
        assert_eq!(config.profile.name, FieldSelector::text("h1.dockable.business-name"));
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = CrawlConfig::from_toml("max_pages = \"lots\"").unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));
    }
}
