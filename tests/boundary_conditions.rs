mod common;

use shardlog::analysis::{AnalysisKind, Category};
use shardlog::corpus::{Corpus, LogEntry};
use shardlog::pipeline::worker::run_worker;
use shardlog::report::json;

#[test]
fn more_workers_than_entries() {
    let corpus = Corpus::from_lines(["one", "two", "three"]);
    let report = common::run_threads(&corpus, &common::settings(5, 2));

    assert!(!report.is_partial());
    assert_eq!(report.worker_reports.len(), 5);
    // chunk is 0, so the last worker takes everything.
    for worker in &report.worker_reports[..4] {
        assert!(worker.partition.is_empty());
        assert!(worker.dumps.is_empty());
        assert_eq!(worker.keyword_tally.count, 0);
        assert_eq!(worker.keyword_tally.keyword, "Critical");
    }
    assert_eq!(report.worker_reports[4].partition.range(), 0..3);
    assert_eq!(common::checksum_ids(&report), vec![0, 1, 2]);
}

#[test]
fn empty_corpus() {
    let corpus = Corpus::from_lines(Vec::<String>::new());
    let report = common::run_threads(&corpus, &common::settings(3, 4));
    assert_eq!(report.worker_reports.len(), 3);
    assert!(common::checksum_ids(&report).is_empty());
    assert_eq!(report.keyword_total(), 0);
}

#[test]
fn single_worker_single_thread() {
    let corpus = Corpus::builtin();
    let report = common::run_threads(&corpus, &common::settings(1, 1));
    assert_eq!(report.worker_reports.len(), 1);
    assert_eq!(report.worker_reports[0].partition.range(), 0..5);
    assert_eq!(report.keyword_total(), 1);
}

#[test]
fn empty_entry_is_info_with_zero_checksum() {
    let corpus = Corpus::from_lines(["", "Critical Critical"]);
    let report = common::run_threads(&corpus, &common::settings(1, 2));
    let worker = &report.worker_reports[0];
    assert_eq!(worker.categories[0].category, Category::Info);
    assert_eq!(worker.checksums[0].checksum, 0);
    assert_eq!(worker.dumps[0].log, "");
    // Counted once per entry, not per occurrence.
    assert_eq!(worker.keyword_tally.count, 1);
}

#[test]
fn invalid_utf8_entry_is_isolated() {
    let corpus = Corpus::from_entries(vec![
        LogEntry::new(0, "Error at module X"),
        LogEntry::from_bytes(1, b"Critical \xff\xfe".to_vec()),
        LogEntry::new(2, "Success message"),
    ]);
    let settings = common::settings(1, 3);
    let worker = run_worker(&corpus, &settings, 0).expect("run");

    let dump_ids: Vec<usize> = worker.dumps.iter().map(|d| d.log_id).collect();
    assert_eq!(dump_ids, vec![0, 2]);
    let checksum_ids: Vec<usize> = worker.checksums.iter().map(|c| c.log_id).collect();
    assert_eq!(checksum_ids, vec![0, 2]);

    // Byte-level analyses still cover the bad entry.
    assert_eq!(worker.categories.len(), 3);
    assert_eq!(worker.categories[1].category, Category::Critical);
    assert_eq!(worker.keyword_tally.count, 1);

    let failed: Vec<(usize, AnalysisKind)> =
        worker.failures.iter().map(|f| (f.log_id, f.analysis)).collect();
    assert_eq!(
        failed,
        vec![(1, AnalysisKind::Analyze), (1, AnalysisKind::Checksum)]
    );
    assert_eq!(worker.entry_ids(AnalysisKind::Checksum), vec![0, 1, 2]);

    let doc: serde_json::Value =
        serde_json::from_slice(&json::worker_to_json(&worker).expect("json")).expect("parse");
    assert_eq!(doc["failures"].as_array().expect("failures").len(), 2);
}

#[test]
fn invalid_utf8_does_not_break_aggregation() {
    let corpus = Corpus::from_entries(vec![
        LogEntry::new(0, "Warning in service Y"),
        LogEntry::from_bytes(1, vec![0xc3, 0x28]),
        LogEntry::new(2, "Timeout in Z"),
        LogEntry::new(3, "Critical issue in A"),
    ]);
    let report = common::run_threads(&corpus, &common::settings(2, 2));
    assert!(!report.is_partial());
    assert_eq!(common::checksum_ids(&report), vec![0, 2, 3]);
    assert_eq!(report.keyword_total(), 1);
}

#[test]
fn gather_timeout_marks_slow_workers_missing() {
    let corpus = common::synthetic_corpus(8);
    let mut settings = common::settings(2, 1);
    settings.workload_delay = std::time::Duration::from_millis(400);
    settings.gather_timeout = Some(std::time::Duration::from_millis(50));
    let report = common::run_threads(&corpus, &settings);
    assert!(report.is_partial());
    assert_eq!(report.missing_workers, vec![0, 1]);
    assert!(report.worker_reports.is_empty());
}
