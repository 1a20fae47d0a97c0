use crate::config::ConnectivityConfig;
use crate::error::CrawlError;
use async_trait::async_trait;
use chrono::Local;
use log::{debug, info, warn};
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

#[cfg(test)]
use mockall::automock;

/// Low-level reachability check
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> io::Result<()>;
}

/// Opens a TCP connection to a well-known, always-up host
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self) -> io::Result<()> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "probe timed out")),
        }
    }
}

/// Blocks until outbound network reachability is confirmed.
///
/// Connectivity loss is treated as transient: by default the gate never gives
/// up and simply sleeps `retry_interval` between probes. `max_attempts`
/// bounds the wait for tests and supervised runs.
pub struct ConnectivityGate<P = TcpProbe> {
    probe: P,
    retry_interval: Duration,
    max_attempts: Option<u32>,
}

impl ConnectivityGate<TcpProbe> {
    /// Gate backed by a TCP probe built from configuration
    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(
            TcpProbe::new(config.probe_addr.clone(), config.probe_timeout),
            config.retry_interval,
            config.max_attempts,
        )
    }
}

impl<P: Probe> ConnectivityGate<P> {
    pub fn new(probe: P, retry_interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            probe,
            retry_interval,
            max_attempts,
        }
    }

    /// Return once the probe succeeds
    pub async fn ensure_connected(&self) -> Result<(), CrawlError> {
        let mut failures = 0u32;
        loop {
            match self.probe.probe().await {
                Ok(()) => {
                    if failures > 0 {
                        info!("Internet is back at {}", now());
                    } else {
                        debug!("Connectivity confirmed");
                    }
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    if let Some(max) = self.max_attempts {
                        if failures >= max {
                            warn!("Internet still down at {} after {} probes: {}", now(), failures, e);
                            return Err(CrawlError::Offline(failures));
                        }
                    }
                    warn!(
                        "Internet down at {} ({}). Retrying in {:?}...",
                        now(),
                        e,
                        self.retry_interval
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
