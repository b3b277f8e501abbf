//! JSON document delivered to the sink.
//!
//! Every row repeats the worker's rank. `failures` and `missing_ranks` are
//! only emitted when non-empty.

use serde::Serialize;

use crate::analysis::{AnalysisKind, Category};

use super::{AggregateReport, WorkerReport};

#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    all_tasks: Vec<RankTasks<'a>>,
    total_time: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_ranks: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct RankTasks<'a> {
    rank: usize,
    tasks: Tasks<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureRow<'a>>,
}

#[derive(Debug, Serialize)]
struct Tasks<'a> {
    analyzed_logs: Vec<AnalyzedLogRow<'a>>,
    categories: Vec<CategoryRow>,
    keyword_count: KeywordCountRow<'a>,
    checksums: Vec<ChecksumRow>,
}

#[derive(Debug, Serialize)]
struct AnalyzedLogRow<'a> {
    log_id: usize,
    log: &'a str,
    rank: usize,
}

#[derive(Debug, Serialize)]
struct CategoryRow {
    log_id: usize,
    category: Category,
    rank: usize,
}

#[derive(Debug, Serialize)]
struct KeywordCountRow<'a> {
    keyword: &'a str,
    count: u64,
    rank: usize,
}

#[derive(Debug, Serialize)]
struct ChecksumRow {
    log_id: usize,
    checksum: u64,
    rank: usize,
}

#[derive(Debug, Serialize)]
struct FailureRow<'a> {
    log_id: usize,
    analysis: AnalysisKind,
    reason: &'a str,
    rank: usize,
}

impl<'a> RankTasks<'a> {
    pub fn new(report: &'a WorkerReport) -> Self {
        let rank = report.worker_index;
        Self {
            rank,
            tasks: Tasks {
                analyzed_logs: report
                    .dumps
                    .iter()
                    .map(|d| AnalyzedLogRow {
                        log_id: d.log_id,
                        log: &d.log,
                        rank,
                    })
                    .collect(),
                categories: report
                    .categories
                    .iter()
                    .map(|c| CategoryRow {
                        log_id: c.log_id,
                        category: c.category,
                        rank,
                    })
                    .collect(),
                keyword_count: KeywordCountRow {
                    keyword: &report.keyword_tally.keyword,
                    count: report.keyword_tally.count,
                    rank,
                },
                checksums: report
                    .checksums
                    .iter()
                    .map(|c| ChecksumRow {
                        log_id: c.log_id,
                        checksum: c.checksum,
                        rank,
                    })
                    .collect(),
            },
            failures: report
                .failures
                .iter()
                .map(|f| FailureRow {
                    log_id: f.log_id,
                    analysis: f.analysis,
                    reason: &f.reason,
                    rank,
                })
                .collect(),
        }
    }
}

impl<'a> ReportDocument<'a> {
    pub fn new(report: &'a AggregateReport) -> Self {
        Self {
            all_tasks: report.worker_reports.iter().map(RankTasks::new).collect(),
            total_time: report.total_duration_secs,
            missing_ranks: report.missing_workers.clone(),
        }
    }
}

pub fn to_json(report: &AggregateReport) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&ReportDocument::new(report))
}

pub fn to_json_pretty(report: &AggregateReport) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(&ReportDocument::new(report))
}

/// One rank's entry of `all_tasks`. Timings are not part of the document, so
/// the output is identical across runs over the same partition.
pub fn worker_to_json(report: &WorkerReport) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&RankTasks::new(report))
}
