//! # Parallel Executor
//!
//! Bounded thread pool that runs one analysis over one partition. Entries are
//! handed out over a bounded channel; every thread folds what it receives into
//! its own output slot, and the slots are merged after all threads join. No
//! two threads ever write to the same slot, so publication needs no lock.

use std::thread;

use crossbeam_channel::bounded;
use thiserror::Error;
use tracing::{Span, warn};

use crate::analysis::{
    AnalysisKind, EntryAnalyzer, EntryFailure, EntryOutcome, KeywordCounter, KeywordTally,
};
use crate::corpus::LogEntry;

/// Default number of executor threads per worker.
pub const DEFAULT_THREADS: usize = 4;

const CHANNEL_CAPACITY_MULTIPLIER: usize = 4;
const MIN_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{analysis} executor thread panicked")]
    ThreadPanicked { analysis: AnalysisKind },
}

#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutor {
    threads: usize,
}

impl ParallelExecutor {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Run a per-entry analyzer over `entries`.
    ///
    /// Returns one outcome per entry in no particular order. An entry the
    /// analyzer rejects becomes an [`EntryFailure`] and the rest of the
    /// partition is still processed.
    pub fn execute(
        &self,
        entries: &[LogEntry],
        analyzer: &dyn EntryAnalyzer,
    ) -> Result<Vec<EntryOutcome>, ExecutorError> {
        let kind = analyzer.kind();
        let slots = self.run(entries, kind, Vec::new, |slot: &mut Vec<EntryOutcome>, entry| {
            let outcome = analyzer.analyze(entry).map_err(|err| {
                warn!("{kind} failed for log {}: {err}", entry.id);
                EntryFailure::new(entry.id, kind, &err)
            });
            slot.push(outcome);
        })?;
        Ok(slots.into_iter().flatten().collect())
    }

    /// Count matching entries. Each thread keeps a private partial count;
    /// the partials are summed after the join.
    pub fn execute_count(
        &self,
        entries: &[LogEntry],
        counter: &KeywordCounter,
    ) -> Result<KeywordTally, ExecutorError> {
        let partials = self.run(
            entries,
            AnalysisKind::KeywordCount,
            || 0u64,
            |count: &mut u64, entry| {
                if counter.matches(entry) {
                    *count += 1;
                }
            },
        )?;
        Ok(counter.tally(partials.into_iter().sum()))
    }

    fn run<'e, S, I, F>(
        &self,
        entries: &'e [LogEntry],
        kind: AnalysisKind,
        init: I,
        fold: F,
    ) -> Result<Vec<S>, ExecutorError>
    where
        S: Send,
        I: Fn() -> S + Sync,
        F: Fn(&mut S, &'e LogEntry) + Sync,
    {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let worker_count = self.threads.min(entries.len());
        let channel_cap = worker_count
            .saturating_mul(CHANNEL_CAPACITY_MULTIPLIER)
            .max(MIN_CHANNEL_CAPACITY);
        let (tx, rx) = bounded::<&'e LogEntry>(channel_cap);
        // Executor threads log under the calling worker's span.
        let span = Span::current();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(worker_count);
            for _ in 0..worker_count {
                let rx = rx.clone();
                let init = &init;
                let fold = &fold;
                let span = &span;
                handles.push(scope.spawn(move || {
                    let _entered = span.enter();
                    let mut slot = init();
                    for entry in rx {
                        fold(&mut slot, entry);
                    }
                    slot
                }));
            }
            drop(rx);

            for entry in entries {
                // Every receiver is gone only if all threads panicked.
                if tx.send(entry).is_err() {
                    break;
                }
            }
            drop(tx);

            let mut slots = Vec::with_capacity(handles.len());
            let mut panicked = false;
            for handle in handles {
                match handle.join() {
                    Ok(slot) => slots.push(slot),
                    Err(_) => panicked = true,
                }
            }
            if panicked {
                Err(ExecutorError::ThreadPanicked { analysis: kind })
            } else {
                Ok(slots)
            }
        })
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_THREADS)
    }
}
