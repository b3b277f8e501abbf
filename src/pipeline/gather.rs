//! # Gather Barrier
//!
//! Blocks the coordinator until every worker has reported, the deadline
//! passes, or every sender is gone.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{info, warn};

use crate::report::WorkerReport;

use super::events::WorkerEvent;

#[derive(Debug, Default)]
pub struct GatherOutcome {
    pub reports: Vec<WorkerReport>,
    pub failed: Vec<(usize, String)>,
    pub timed_out: bool,
}

impl GatherOutcome {
    pub fn reported(&self) -> Vec<usize> {
        self.reports.iter().map(|r| r.worker_index).collect()
    }
}

pub fn gather(
    rx: &Receiver<WorkerEvent>,
    expected: usize,
    timeout: Option<Duration>,
) -> GatherOutcome {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut outcome = GatherOutcome::default();
    let mut received = 0usize;

    while received < expected {
        let event = match deadline {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "gather timed out with {}/{} workers reported",
                        received, expected
                    );
                    outcome.timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(
                        "all workers exited with {}/{} reported",
                        received, expected
                    );
                    break;
                }
            },
            None => match rx.recv() {
                Ok(event) => event,
                Err(_) => {
                    warn!(
                        "all workers exited with {}/{} reported",
                        received, expected
                    );
                    break;
                }
            },
        };
        received += 1;

        match event {
            WorkerEvent::Report(report) => {
                info!(
                    "gathered worker={} entries={} failures={}",
                    report.worker_index,
                    report.partition.len(),
                    report.failures.len()
                );
                outcome.reports.push(*report);
            }
            WorkerEvent::Failed {
                worker_index,
                error,
            } => {
                warn!("worker {worker_index} failed: {error}");
                outcome.failed.push((worker_index, error));
            }
        }
    }

    outcome
}
