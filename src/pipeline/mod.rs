//! # Pipeline Module
//!
//! Coordinator side of a run: launch the workers, wait at the gather
//! barrier, and aggregate what arrived. Delivery of the result is left to
//! [`crate::dispatch`] so the report exists before any network call.

pub mod events;
pub mod executor;
pub mod gather;
pub mod worker;
pub mod workers;

use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::unbounded;
use tracing::{info, warn};

use crate::analysis::DEFAULT_KEYWORD;
use crate::config::Config;
use crate::corpus::Corpus;
use crate::report::{AggregateReport, Aggregator};

use events::WorkerEvent;
use executor::DEFAULT_THREADS;
use workers::{ProcessWorkers, WorkerCommand};

/// Run-wide knobs shared by the coordinator and every worker.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workers: usize,
    pub threads_per_worker: usize,
    pub keyword: String,
    pub workload_delay: Duration,
    pub gather_timeout: Option<Duration>,
}

impl PipelineSettings {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            threads_per_worker: DEFAULT_THREADS,
            keyword: DEFAULT_KEYWORD.to_string(),
            workload_delay: Duration::ZERO,
            gather_timeout: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            workers: cfg.workers.max(1),
            threads_per_worker: cfg.threads_per_worker.max(1),
            keyword: cfg.keyword.clone(),
            workload_delay: Duration::from_millis(cfg.workload_delay_ms),
            gather_timeout: cfg.gather_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Where outer-domain workers run.
#[derive(Debug, Clone)]
pub enum Isolation {
    Threads,
    Processes(WorkerCommand),
}

enum Launched {
    Threads(Vec<std::thread::JoinHandle<()>>),
    Processes(ProcessWorkers),
}

/// Run every worker over its partition and aggregate the reports.
///
/// Fails only when the gathered reports violate the partitioning (see
/// [`crate::report::IntegrityError`]) or workers cannot be started. Workers
/// that fail or miss the gather deadline are listed in
/// [`AggregateReport::missing_workers`].
pub fn run_pipeline(
    corpus: &Corpus,
    settings: &PipelineSettings,
    isolation: &Isolation,
) -> Result<AggregateReport> {
    let start_time = Instant::now();
    info!(
        "starting pipeline entries={} workers={} threads_per_worker={} keyword={:?} isolation={}",
        corpus.len(),
        settings.workers,
        settings.threads_per_worker,
        settings.keyword,
        match isolation {
            Isolation::Threads => "thread",
            Isolation::Processes(_) => "process",
        }
    );

    let (tx, rx) = unbounded::<WorkerEvent>();
    let launched = match isolation {
        Isolation::Threads => {
            Launched::Threads(workers::spawn_thread_workers(corpus, settings, &tx))
        }
        Isolation::Processes(command) => {
            Launched::Processes(workers::spawn_process_workers(command, settings, &tx)?)
        }
    };
    drop(tx);

    let outcome = gather::gather(&rx, settings.workers, settings.gather_timeout);
    let elapsed = start_time.elapsed();

    match launched {
        Launched::Threads(handles) => {
            if outcome.timed_out {
                // Threads cannot be cancelled; leave stragglers detached.
                warn!("detaching worker threads still running after gather timeout");
            } else {
                join_workers(handles);
            }
        }
        Launched::Processes(processes) => processes.shutdown(&outcome.reported()),
    }

    let report = Aggregator::new(corpus.len(), settings.workers).aggregate(outcome.reports, elapsed)?;
    if report.is_partial() {
        warn!(
            "aggregate is partial; missing workers {:?}",
            report.missing_workers
        );
    }
    info!(
        "run_summary workers_reported={} keyword_total={} total_time={:.6}s",
        report.worker_reports.len(),
        report.keyword_total(),
        report.total_duration_secs
    );
    Ok(report)
}

/// Join worker threads, indexed by position. Returns the workers whose thread
/// panicked.
fn join_workers(handles: Vec<std::thread::JoinHandle<()>>) -> Vec<usize> {
    let mut panicked = Vec::new();
    for (worker_index, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            warn!("worker {worker_index} thread panicked");
            panicked.push(worker_index);
        }
    }
    panicked
}
