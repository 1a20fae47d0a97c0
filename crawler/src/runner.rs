use crate::connectivity::{Probe, TcpProbe};
use crate::crawler::CrawlController;
use crate::fetcher::FetcherFactory;
use crate::models::{BatchSummary, WorkUnit};
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Routes an external interrupt to whichever work unit is currently running.
///
/// Each unit gets a fresh token, so interrupting one unit does not cancel the
/// next. Interrupting a unit that is already winding down, or interrupting
/// while no unit is running, stops the batch.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    state: Arc<Mutex<InterruptState>>,
}

#[derive(Default)]
struct InterruptState {
    /// Token of the running unit, `None` between units
    current: Option<CancellationToken>,
    abort_batch: bool,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InterruptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hand out the token for the next unit, or `None` once the batch is aborted
    pub fn arm(&self) -> Option<CancellationToken> {
        let mut state = self.state();
        if state.abort_batch {
            return None;
        }
        let token = CancellationToken::new();
        state.current = Some(token.clone());
        Some(token)
    }

    /// Mark the running unit as finished
    pub fn disarm(&self) {
        self.state().current = None;
    }

    /// Cancel the running unit, or the whole batch on a repeated or idle interrupt
    pub fn trigger(&self) {
        let mut state = self.state();
        match &state.current {
            Some(token) if !token.is_cancelled() => {
                warn!("Interrupted by user! Saving collected data for this city...");
                token.cancel();
            }
            Some(_) => {
                warn!("Interrupted again, stopping after this city");
                state.abort_batch = true;
            }
            None => {
                warn!("Interrupted between cities, stopping batch");
                state.abort_batch = true;
            }
        }
    }

    pub fn batch_aborted(&self) -> bool {
        self.state().abort_batch
    }
}

/// Runs work units strictly one after another
pub struct BatchRunner<F, P = TcpProbe> {
    controller: CrawlController<F, P>,
    interrupts: InterruptHandle,
    stop_on_interrupt: bool,
}

impl<F: FetcherFactory, P: Probe> BatchRunner<F, P> {
    pub fn new(controller: CrawlController<F, P>, interrupts: InterruptHandle, stop_on_interrupt: bool) -> Self {
        Self {
            controller,
            interrupts,
            stop_on_interrupt,
        }
    }

    pub fn controller(&self) -> &CrawlController<F, P> {
        &self.controller
    }

    /// Crawl every unit in order.
    ///
    /// A unit whose checkpoint cannot be read or written is aborted and
    /// recorded in [`BatchSummary::failed`]; the batch moves on to the next unit.
    pub async fn run(&self, units: &[WorkUnit]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (i, unit) in units.iter().enumerate() {
            info!("City {}/{}: {}", i + 1, units.len(), unit);
            let Some(cancel) = self.interrupts.arm() else {
                warn!("Batch aborted before {}", unit.city_name);
                summary.stopped_early = true;
                break;
            };

            let result = self.controller.run_unit(unit, &cancel).await;
            self.interrupts.disarm();

            match result {
                Ok(report) => {
                    info!(
                        "{}: {} records ({} new, {} skipped, {} failed) over {} pages",
                        unit.city_name,
                        report.records_total(),
                        report.records_new,
                        report.links_skipped,
                        report.profiles_failed,
                        report.pages_visited
                    );
                    let interrupted = report.is_interrupted();
                    summary.reports.push(report);

                    if interrupted && self.stop_on_interrupt {
                        warn!("Stopping batch after interrupted city {}", unit.city_name);
                        summary.stopped_early = i + 1 < units.len();
                        break;
                    }
                }
                Err(e) => {
                    error!("Aborting {}: {}", unit.city_name, e);
                    summary.failed.push((unit.clone(), e.to_string()));
                }
            }

            if self.interrupts.batch_aborted() {
                warn!("Batch aborted after {}", unit.city_name);
                summary.stopped_early = i + 1 < units.len();
                break;
            }
        }

        info!(
            "Batch finished: {} cities crawled, {} failed, {} records total",
            summary.reports.len(),
            summary.failed.len(),
            summary.records_total()
        );
        summary
    }
}
