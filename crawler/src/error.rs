use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the crawl pipeline.
///
/// Connectivity loss, missing listing content and missing profile fields are
/// recovered inside the controller and never show up here.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Reading or writing a checkpoint failed. Fatal for the current unit.
    #[error("checkpoint {path:?}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The page fetcher could not be started, navigated or closed
    #[error("fetcher: {0}")]
    Fetcher(String),

    /// Gave up waiting for network connectivity
    #[error("no connectivity after {0} probe attempts")]
    Offline(u32),

    /// The work unit list could not be read
    #[error("input: {0}")]
    Input(String),

    /// Invalid configuration, including unbuildable page URLs
    #[error("config: {0}")]
    Config(String),
}

impl CrawlError {
    pub(crate) fn checkpoint(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        CrawlError::Checkpoint {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn fetcher(err: impl std::fmt::Display) -> Self {
        CrawlError::Fetcher(err.to_string())
    }
}
