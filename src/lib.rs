//! Two-level parallel log analysis.
//!
//! A corpus is split into contiguous partitions, one per worker. Each worker
//! runs four analyses over its partition on a bounded thread pool and builds
//! a report; the coordinator gathers the reports, checks and merges them,
//! and hands the aggregate to a best-effort dispatcher.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod dispatch;
pub mod logging;
pub mod partition;
pub mod pipeline;
pub mod report;
pub mod util;
