pub mod checkpoint;
pub mod config;
pub mod connectivity;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod headless;
pub mod http;
pub mod input;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod runner;


// Re-export important types
pub use checkpoint::CheckpointStore;
pub use config::{CrawlConfig, Engine};
pub use connectivity::{ConnectivityGate, Probe, TcpProbe};
pub use crawler::CrawlController;
pub use error::CrawlError;
pub use extractor::RecordExtractor;
pub use fetcher::{FetcherFactory, PageFetcher};
pub use headless::{HeadlessFactory, HeadlessFetcher};
pub use http::{HttpFactory, HttpFetcher};
pub use ledger::DedupLedger;
pub use models::{BatchSummary, PageCursor, Record, UnitOutcome, UnitReport, WorkUnit};
pub use runner::{BatchRunner, InterruptHandle};
