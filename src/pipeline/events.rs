//! # Pipeline Events
//!
//! Messages sent from workers to the coordinator's gather barrier.

use crate::report::WorkerReport;

#[derive(Debug)]
pub enum WorkerEvent {
    /// A worker finished all analyses over its partition
    Report(Box<WorkerReport>),
    /// A worker terminated without producing a report
    Failed { worker_index: usize, error: String },
}
