use serde::{Deserialize, Serialize};
use std::fmt;

/// One city's crawl task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Human readable city name, also used to name the checkpoint file
    pub city_name: String,

    /// Site-relative path of the city's listing
    pub listing_path: String,
}

impl WorkUnit {
    /// Create a new work unit
    pub fn new(city_name: impl Into<String>, listing_path: impl Into<String>) -> Self {
        Self {
            city_name: city_name.into(),
            listing_path: listing_path.into(),
        }
    }

    /// File name of the checkpoint for this unit, e.g. `Little_Rock.csv`
    pub fn checkpoint_file_name(&self) -> String {
        format!("{}.csv", self.city_name.replace(' ', "_"))
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.city_name, self.listing_path)
    }
}

/// A single business listing extracted from a profile page.
///
/// `profile_link` is the natural key; every other field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Phone", default)]
    pub phone: String,

    #[serde(rename = "Website", default)]
    pub website: String,

    #[serde(rename = "Address", default)]
    pub address: String,

    #[serde(rename = "Email", default)]
    pub email: String,

    #[serde(rename = "Profile Link", default)]
    pub profile_link: String,
}

impl Record {
    /// Column order of the checkpoint file
    pub const HEADERS: [&'static str; 6] =
        ["Name", "Phone", "Website", "Address", "Email", "Profile Link"];

    /// A record with only its key populated
    pub fn with_link(profile_link: impl Into<String>) -> Self {
        Self {
            profile_link: profile_link.into(),
            ..Self::default()
        }
    }
}

/// Position within a unit's pagination sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    max_pages: u32,
}

impl PageCursor {
    /// Start at page 1
    pub fn new(max_pages: u32) -> Self {
        Self { page: 1, max_pages }
    }

    /// Current page number (1-based)
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Whether the cursor still points at a page that may be fetched
    pub fn in_bounds(&self) -> bool {
        self.page <= self.max_pages
    }

    /// Move to the next page
    pub fn advance(&mut self) {
        self.page += 1;
    }
}

/// How a unit's crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Every page up to the configured maximum was processed
    MaxPagesReached,

    /// The listing never appeared on this page after all wait attempts
    ListingUnavailable { page: u32 },

    /// The cancellation signal was observed
    Interrupted,
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOutcome::MaxPagesReached => write!(f, "reached max page count"),
            UnitOutcome::ListingUnavailable { page } => {
                write!(f, "listing failed to load at page {}", page)
            }
            UnitOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Summary of one unit's run, reported after teardown
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub unit: WorkUnit,
    pub outcome: UnitOutcome,

    /// Listing pages navigated to
    pub pages_visited: u32,

    /// Records carried over from an existing checkpoint
    pub records_resumed: usize,

    /// Records fetched during this run
    pub records_new: usize,

    /// Links skipped because they were already collected
    pub links_skipped: usize,

    /// Profile pages that could not be navigated to
    pub profiles_failed: usize,
}

impl UnitReport {
    /// Total records in the checkpoint after teardown
    pub fn records_total(&self) -> usize {
        self.records_resumed + self.records_new
    }

    pub fn is_interrupted(&self) -> bool {
        self.outcome == UnitOutcome::Interrupted
    }
}

/// Result of a whole batch
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Units that reached teardown, in run order
    pub reports: Vec<UnitReport>,

    /// Units aborted by a fatal error, with the error message
    pub failed: Vec<(WorkUnit, String)>,

    /// An interrupt stopped the batch before every unit ran
    pub stopped_early: bool,
}

impl BatchSummary {
    /// Whether any unit was interrupted or the batch was cut short
    pub fn interrupted(&self) -> bool {
        self.stopped_early || self.reports.iter().any(UnitReport::is_interrupted)
    }

    /// Records collected across all units
    pub fn records_total(&self) -> usize {
        self.reports.iter().map(UnitReport::records_total).sum()
    }
}
