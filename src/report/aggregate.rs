use std::ops::Range;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::AnalysisKind;
use crate::partition::partition;

use super::{PER_ENTRY_ANALYSES, WorkerReport};

/// Worker reports disagree with the partitioning they were produced under.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("worker {worker_index} is outside the configured {workers} workers")]
    UnknownWorker { worker_index: usize, workers: usize },
    #[error("worker {worker_index} reported more than once")]
    DuplicateWorker { worker_index: usize },
    #[error("worker {worker_index} reported partition {reported:?}, expected {expected:?}")]
    PartitionMismatch {
        worker_index: usize,
        reported: Range<usize>,
        expected: Range<usize>,
    },
    #[error("log {log_id} reported by both worker {first} and worker {second}")]
    OverlappingEntry {
        log_id: usize,
        first: usize,
        second: usize,
    },
    #[error("{analysis} result for log {log_id} appears twice in worker {worker_index}")]
    DuplicateEntry {
        log_id: usize,
        worker_index: usize,
        analysis: AnalysisKind,
    },
    #[error("log {log_id} is outside the partition of worker {worker_index}")]
    ForeignEntry { log_id: usize, worker_index: usize },
    #[error("{analysis} result for log {log_id} missing from worker {worker_index}")]
    MissingEntry {
        log_id: usize,
        worker_index: usize,
        analysis: AnalysisKind,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    /// Ordered by worker index.
    pub worker_reports: Vec<WorkerReport>,
    /// Workers that never reported (timed out or failed).
    pub missing_workers: Vec<usize>,
    pub total_duration_secs: f64,
}

impl AggregateReport {
    pub fn is_partial(&self) -> bool {
        !self.missing_workers.is_empty()
    }

    pub fn keyword_total(&self) -> u64 {
        self.worker_reports
            .iter()
            .map(|r| r.keyword_tally.count)
            .sum()
    }
}

/// Merges gathered worker reports, checking them against the partitioning
/// of `total_entries` over `workers`.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    total_entries: usize,
    workers: usize,
}

impl Aggregator {
    pub fn new(total_entries: usize, workers: usize) -> Self {
        Self {
            total_entries,
            workers: workers.max(1),
        }
    }

    /// Workers absent from `reports` are listed as missing; only the entries
    /// of reporting workers are checked for coverage.
    pub fn aggregate(
        &self,
        mut reports: Vec<WorkerReport>,
        elapsed: Duration,
    ) -> Result<AggregateReport, IntegrityError> {
        reports.sort_by_key(|r| r.worker_index);

        for report in &reports {
            if report.worker_index >= self.workers {
                return Err(IntegrityError::UnknownWorker {
                    worker_index: report.worker_index,
                    workers: self.workers,
                });
            }
        }
        for pair in reports.windows(2) {
            if pair[0].worker_index == pair[1].worker_index {
                return Err(IntegrityError::DuplicateWorker {
                    worker_index: pair[0].worker_index,
                });
            }
        }

        self.check_overlap(&reports)?;
        for report in &reports {
            self.check_coverage(report)?;
        }

        let missing_workers = (0..self.workers)
            .filter(|idx| reports.binary_search_by_key(idx, |r| r.worker_index).is_err())
            .collect();

        Ok(AggregateReport {
            worker_reports: reports,
            missing_workers,
            total_duration_secs: elapsed.as_secs_f64(),
        })
    }

    fn check_overlap(&self, reports: &[WorkerReport]) -> Result<(), IntegrityError> {
        let mut owner: Vec<Option<usize>> = vec![None; self.total_entries];
        for report in reports {
            for kind in PER_ENTRY_ANALYSES {
                let ids = report.entry_ids(kind);
                if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
                    return Err(IntegrityError::DuplicateEntry {
                        log_id: pair[0],
                        worker_index: report.worker_index,
                        analysis: kind,
                    });
                }
                for id in ids {
                    let Some(slot) = owner.get_mut(id) else {
                        return Err(IntegrityError::ForeignEntry {
                            log_id: id,
                            worker_index: report.worker_index,
                        });
                    };
                    match *slot {
                        Some(first) if first != report.worker_index => {
                            return Err(IntegrityError::OverlappingEntry {
                                log_id: id,
                                first,
                                second: report.worker_index,
                            });
                        }
                        _ => *slot = Some(report.worker_index),
                    }
                }
            }
        }
        Ok(())
    }

    fn check_coverage(&self, report: &WorkerReport) -> Result<(), IntegrityError> {
        let expected = partition(self.total_entries, self.workers, report.worker_index);
        if report.partition != expected {
            return Err(IntegrityError::PartitionMismatch {
                worker_index: report.worker_index,
                reported: report.partition.range(),
                expected: expected.range(),
            });
        }
        for kind in PER_ENTRY_ANALYSES {
            let ids = report.entry_ids(kind);
            if let Some(&id) = ids.iter().find(|id| !expected.contains(**id)) {
                return Err(IntegrityError::ForeignEntry {
                    log_id: id,
                    worker_index: report.worker_index,
                });
            }
            // ids are unique and inside the partition, so a short list has a gap.
            if ids.len() != expected.len() {
                let log_id = expected
                    .range()
                    .zip(ids.iter().copied().chain(std::iter::repeat(usize::MAX)))
                    .find(|(want, got)| want != got)
                    .map(|(want, _)| want)
                    .unwrap_or(expected.end);
                return Err(IntegrityError::MissingEntry {
                    log_id,
                    worker_index: report.worker_index,
                    analysis: kind,
                });
            }
        }
        Ok(())
    }
}
