//! Run orchestration: the aggregator state machine that drives every enabled
//! probe through N sequential iterations and derives the summary.

pub mod summary;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::probes::{Probe, ProbeOutcome, ProbeRecord};
use summary::RunSummary;

/// Aggregator lifecycle. Probes only execute in `Running`; the summary is
/// derived exactly once, in `Summarizing`, after the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { iteration: u32, total: u32 },
    Summarizing,
    Done,
}

/// Everything the loop produced: the append-only record sequence, the
/// derived summary, and how far the run actually got.
pub struct AggregatedRun {
    pub records: Vec<ProbeRecord>,
    pub summary: RunSummary,
    pub iterations_completed: u32,
    pub interrupted: bool,
}

/// Sequential probe driver. Probes run strictly one at a time -- overlapping
/// network tests would corrupt each other's measurements -- and individual
/// failures are recorded as data, never as control flow.
pub struct Aggregator {
    probes: Vec<Box<dyn Probe>>,
    iterations: u32,
    pause: Duration,
    cancel: Arc<AtomicBool>,
    state: RunState,
}

impl Aggregator {
    pub fn new(
        probes: Vec<Box<dyn Probe>>,
        iterations: u32,
        pause: Duration,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            probes,
            iterations,
            pause,
            cancel,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Drive the full lifecycle. An external interrupt stops the loop before
    /// the next probe starts but still proceeds to `Summarizing` so partial
    /// results are preserved rather than discarded.
    pub async fn run(mut self) -> AggregatedRun {
        let mut records: Vec<ProbeRecord> = Vec::new();
        let mut iterations_completed = 0;
        let mut interrupted = false;

        'iterations: for iteration in 0..self.iterations {
            self.state = RunState::Running {
                iteration,
                total: self.iterations,
            };
            info!(iteration = iteration + 1, total = self.iterations, "starting iteration");

            for probe in &self.probes {
                if self.cancelled() {
                    warn!(iteration, "interrupted, stopping before next probe");
                    interrupted = true;
                    break 'iterations;
                }

                let kind = probe.kind();
                let outcome = probe.run().await;
                match &outcome {
                    ProbeOutcome::Success { .. } => info!(%kind, iteration, "probe succeeded"),
                    ProbeOutcome::Failure { diagnostic } => {
                        warn!(%kind, iteration, %diagnostic, "probe failed")
                    }
                    ProbeOutcome::Skipped { reason } => {
                        info!(%kind, iteration, %reason, "probe skipped")
                    }
                }

                records.push(ProbeRecord {
                    kind,
                    iteration,
                    timestamp: Utc::now(),
                    outcome,
                });
            }

            iterations_completed = iteration + 1;

            let last = iteration + 1 == self.iterations;
            if !last && !self.cancelled() && !self.pause.is_zero() {
                info!(pause_secs = self.pause.as_secs(), "pausing before next iteration");
                tokio::time::sleep(self.pause).await;
            }
        }

        self.state = RunState::Summarizing;
        let summary = RunSummary::compute(&records);
        self.state = RunState::Done;

        AggregatedRun {
            records,
            summary,
            iterations_completed,
            interrupted,
        }
    }
}
