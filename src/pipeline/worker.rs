//! # Worker Run
//!
//! One outer-domain worker: take the partition for `worker_index`, run the
//! four analyses over it on a thread pool, and build the report.

use std::time::Instant;

use tracing::{debug, info, info_span};

use crate::analysis::{AnalysisKind, AnalyzerSet};
use crate::corpus::Corpus;
use crate::partition::partition;
use crate::report::{AnalysisOutputs, Timings, WorkerReport, build_worker_report, record_timing};

use super::PipelineSettings;
use super::executor::{ExecutorError, ParallelExecutor};

pub fn run_worker(
    corpus: &Corpus,
    settings: &PipelineSettings,
    worker_index: usize,
) -> Result<WorkerReport, ExecutorError> {
    let span = info_span!("worker", index = worker_index);
    let _entered = span.enter();

    let part = partition(corpus.len(), settings.workers, worker_index);
    let entries = corpus.slice(&part);
    info!(
        "worker={} partition={}..{} entries={} threads={}",
        worker_index,
        part.start,
        part.end,
        entries.len(),
        settings.threads_per_worker
    );

    let analyzers = AnalyzerSet::new(&settings.keyword, settings.workload_delay);
    let executor = ParallelExecutor::new(settings.threads_per_worker);
    let mut timings = Timings::new();
    let mut results = Vec::with_capacity(entries.len() * 3);

    let started = Instant::now();
    results.extend(executor.execute(entries, &analyzers.dump)?);
    record_timing(&mut timings, AnalysisKind::Analyze, started.elapsed());

    let started = Instant::now();
    results.extend(executor.execute(entries, &analyzers.categorize)?);
    record_timing(&mut timings, AnalysisKind::Categorize, started.elapsed());

    let started = Instant::now();
    let keyword_tally = executor.execute_count(entries, &analyzers.keyword)?;
    record_timing(&mut timings, AnalysisKind::KeywordCount, started.elapsed());
    info!(
        "worker={} keyword '{}' found {} times",
        worker_index, keyword_tally.keyword, keyword_tally.count
    );

    let started = Instant::now();
    results.extend(executor.execute(entries, &analyzers.checksum)?);
    record_timing(&mut timings, AnalysisKind::Checksum, started.elapsed());

    for (kind, secs) in &timings {
        debug!("worker={} analysis={} elapsed={:.6}s", worker_index, kind, secs);
    }

    Ok(build_worker_report(
        worker_index,
        part,
        AnalysisOutputs {
            results,
            keyword_tally,
        },
        timings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Category;
    use crate::report::json::worker_to_json;

    #[test]
    fn second_of_two_workers_on_sample() {
        let settings = PipelineSettings::new(2);
        let report = run_worker(&Corpus::builtin(), &settings, 1).expect("worker");
        assert_eq!(report.partition.range(), 2..5);
        let ids: Vec<_> = report.dumps.iter().map(|d| d.log_id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        let labels: Vec<_> = report.categories.iter().map(|c| c.category).collect();
        assert_eq!(labels, vec![Category::Info, Category::Info, Category::Critical]);
        assert_eq!(report.keyword_tally.count, 1);
        assert_eq!(report.checksums[1].checksum, 1502);
        assert_eq!(report.timings.len(), 4);
    }

    #[test]
    fn worker_json_is_reproducible() {
        let corpus = Corpus::from_lines((0..500).map(|i| format!("Warning {i} Critical")));
        let settings = PipelineSettings {
            threads_per_worker: 8,
            ..PipelineSettings::new(3)
        };
        let first = run_worker(&corpus, &settings, 2).expect("worker");
        let first = worker_to_json(&first).unwrap();
        for _ in 0..5 {
            let again = run_worker(&corpus, &settings, 2).expect("worker");
            assert_eq!(worker_to_json(&again).unwrap(), first);
        }
    }

    #[test]
    fn idle_worker_reports_empty_partition() {
        let settings = PipelineSettings::new(8);
        let report = run_worker(&Corpus::builtin(), &settings, 0).expect("worker");
        assert!(report.partition.is_empty());
        assert!(report.dumps.is_empty());
        assert_eq!(report.keyword_tally.count, 0);
    }
}
