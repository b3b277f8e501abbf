//! # Report Module
//!
//! Per-worker reports, their assembly from raw executor output, and the
//! coordinator-side aggregate.

pub mod aggregate;
pub mod json;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    AnalysisKind, AnalysisResult, CategoryRecord, ChecksumRecord, EntryDump, EntryFailure,
    EntryOutcome, KeywordTally,
};
use crate::partition::Partition;

pub use aggregate::{AggregateReport, Aggregator, IntegrityError};

/// Analyses that produce one result per entry.
pub const PER_ENTRY_ANALYSES: [AnalysisKind; 3] = [
    AnalysisKind::Analyze,
    AnalysisKind::Categorize,
    AnalysisKind::Checksum,
];

/// Wall-clock seconds spent per analysis.
pub type Timings = BTreeMap<AnalysisKind, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_index: usize,
    pub partition: Partition,
    pub dumps: Vec<EntryDump>,
    pub categories: Vec<CategoryRecord>,
    pub keyword_tally: KeywordTally,
    pub checksums: Vec<ChecksumRecord>,
    pub failures: Vec<EntryFailure>,
    pub timings: Timings,
}

impl WorkerReport {
    /// Ids an analysis covered, successful or failed, in ascending order.
    pub fn entry_ids(&self, kind: AnalysisKind) -> Vec<usize> {
        let succeeded: Vec<usize> = match kind {
            AnalysisKind::Analyze => self.dumps.iter().map(|d| d.log_id).collect(),
            AnalysisKind::Categorize => self.categories.iter().map(|c| c.log_id).collect(),
            AnalysisKind::Checksum => self.checksums.iter().map(|c| c.log_id).collect(),
            AnalysisKind::KeywordCount => Vec::new(),
        };
        let mut ids: Vec<usize> = succeeded
            .into_iter()
            .chain(
                self.failures
                    .iter()
                    .filter(|f| f.analysis == kind)
                    .map(|f| f.log_id),
            )
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Raw executor output for one worker, in scheduling order.
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub results: Vec<EntryOutcome>,
    pub keyword_tally: KeywordTally,
}

pub fn record_timing(timings: &mut Timings, kind: AnalysisKind, elapsed: Duration) {
    timings.insert(kind, elapsed.as_secs_f64());
}

/// Assemble a worker report. Results are routed by variant and every
/// per-entry sequence is sorted by log id, so the report does not depend on
/// how the executor scheduled its threads.
pub fn build_worker_report(
    worker_index: usize,
    partition: Partition,
    outputs: AnalysisOutputs,
    timings: Timings,
) -> WorkerReport {
    let mut dumps = Vec::new();
    let mut categories = Vec::new();
    let mut checksums = Vec::new();
    let mut failures = Vec::new();
    let mut keyword_tally = outputs.keyword_tally;

    for outcome in outputs.results {
        match outcome {
            Ok(AnalysisResult::Dump(d)) => dumps.push(d),
            Ok(AnalysisResult::Category(c)) => categories.push(c),
            Ok(AnalysisResult::Checksum(c)) => checksums.push(c),
            Ok(AnalysisResult::KeywordTally(t)) => keyword_tally = t,
            Err(failure) => failures.push(failure),
        }
    }

    dumps.sort_by_key(|d| d.log_id);
    categories.sort_by_key(|c| c.log_id);
    checksums.sort_by_key(|c| c.log_id);
    failures.sort_by_key(|f| (f.log_id, f.analysis));

    WorkerReport {
        worker_index,
        partition,
        dumps,
        categories,
        keyword_tally,
        checksums,
        failures,
        timings,
    }
}
