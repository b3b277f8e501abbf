use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Config;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DeliveryMode {
    Webhook,
    Socket,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum IsolationKind {
    Thread,
    Process,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Log file to analyze, one entry per line (built-in sample when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Number of workers (partitions)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Executor threads per worker
    #[arg(long)]
    pub threads: Option<usize>,

    /// Keyword to count (case-sensitive)
    #[arg(long, allow_hyphen_values = true)]
    pub keyword: Option<String>,

    /// Run workers as threads or as child processes
    #[arg(long, value_enum)]
    pub isolation: Option<IsolationKind>,

    /// Delivery endpoint; enables dispatch
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Delivery mode
    #[arg(long, value_enum)]
    pub mode: Option<DeliveryMode>,

    /// Delivery timeout, in seconds
    #[arg(long)]
    pub dispatch_timeout_secs: Option<u64>,

    /// Gather barrier timeout, in seconds
    #[arg(long)]
    pub gather_timeout_secs: Option<u64>,

    /// Per-entry delay in the analyze step, in milliseconds
    #[arg(long)]
    pub workload_delay_ms: Option<u64>,

    /// Also write the aggregate report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pub pretty: bool,

    /// Run a single worker and print its report (used by process isolation)
    #[arg(long, hide = true)]
    pub worker_rank: Option<usize>,
}

impl CliOptions {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(threads) = self.threads {
            cfg.threads_per_worker = threads;
        }
        if let Some(keyword) = &self.keyword {
            cfg.keyword = keyword.clone();
        }
        if let Some(isolation) = self.isolation {
            cfg.isolation = crate::util::isolation_from_cli(isolation);
        }
        if let Some(endpoint) = &self.endpoint {
            cfg.dispatch.endpoint = endpoint.clone();
            cfg.dispatch.enabled = true;
        }
        if let Some(mode) = self.mode {
            cfg.dispatch.mode = crate::util::mode_from_cli(mode);
        }
        if let Some(secs) = self.dispatch_timeout_secs {
            cfg.dispatch.timeout_secs = secs;
        }
        if let Some(secs) = self.gather_timeout_secs {
            cfg.gather_timeout_secs = Some(secs);
        }
        if let Some(ms) = self.workload_delay_ms {
            cfg.workload_delay_ms = ms;
        }
    }
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
