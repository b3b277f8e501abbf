//! # Pipeline Workers
//!
//! Launching the outer-domain workers, either as threads of this process or
//! as child processes. Both report over the same gather channel.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::corpus::Corpus;
use crate::report::WorkerReport;

use super::PipelineSettings;
use super::events::WorkerEvent;
use super::worker::run_worker;

/// Spawn one thread per worker. Each thread owns its executor pool and shares
/// only the read-only corpus.
pub fn spawn_thread_workers(
    corpus: &Corpus,
    settings: &PipelineSettings,
    tx: &Sender<WorkerEvent>,
) -> Vec<thread::JoinHandle<()>> {
    let mut handles = Vec::with_capacity(settings.workers);

    for worker_index in 0..settings.workers {
        let corpus = corpus.clone();
        let settings = settings.clone();
        let tx = tx.clone();

        handles.push(thread::spawn(move || {
            let event = match run_worker(&corpus, &settings, worker_index) {
                Ok(report) => WorkerEvent::Report(Box::new(report)),
                Err(err) => WorkerEvent::Failed {
                    worker_index,
                    error: err.to_string(),
                },
            };
            if let Err(err) = tx.send(event) {
                warn!("gather channel closed before worker {worker_index} reported: {err}");
            }
        }));
    }

    handles
}

/// How to start a worker process: the program and the arguments every
/// worker shares (config path, input). Per-worker arguments are appended.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self, settings: &PipelineSettings, worker_index: usize) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--worker-rank")
            .arg(worker_index.to_string())
            .arg("--workers")
            .arg(settings.workers.to_string())
            .arg("--threads")
            .arg(settings.threads_per_worker.to_string())
            // One token, so a keyword starting with '-' is not read as a flag.
            .arg(format!("--keyword={}", settings.keyword))
            .arg("--workload-delay-ms")
            .arg(settings.workload_delay.as_millis().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

/// Running worker processes and the threads reading their reports.
pub struct ProcessWorkers {
    children: Vec<(usize, Child)>,
    readers: Vec<thread::JoinHandle<()>>,
}

pub fn spawn_process_workers(
    command: &WorkerCommand,
    settings: &PipelineSettings,
    tx: &Sender<WorkerEvent>,
) -> Result<ProcessWorkers> {
    let mut workers = ProcessWorkers {
        children: Vec::with_capacity(settings.workers),
        readers: Vec::with_capacity(settings.workers),
    };

    for worker_index in 0..settings.workers {
        let mut child = match command.command(settings, worker_index).spawn() {
            Ok(child) => child,
            Err(err) => {
                workers.shutdown(&[]);
                return Err(err).with_context(|| {
                    format!(
                        "failed to spawn worker {worker_index} ({})",
                        command.program.display()
                    )
                });
            }
        };
        debug!("spawned worker={} pid={}", worker_index, child.id());
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("worker {worker_index} has no stdout pipe"))?;
        workers.children.push((worker_index, child));

        let tx = tx.clone();
        workers.readers.push(thread::spawn(move || {
            let event = match read_report(stdout) {
                Ok(report) => WorkerEvent::Report(Box::new(report)),
                Err(err) => WorkerEvent::Failed {
                    worker_index,
                    error: format!("{err:#}"),
                },
            };
            if let Err(err) = tx.send(event) {
                debug!("gather channel closed before worker {worker_index} reported: {err}");
            }
        }));
    }

    Ok(workers)
}

fn read_report(mut stdout: impl Read) -> Result<WorkerReport> {
    let mut buf = Vec::new();
    stdout
        .read_to_end(&mut buf)
        .context("reading worker output")?;
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Err(anyhow!("worker exited without a report"));
    }
    serde_json::from_slice(&buf).context("decoding worker report")
}

impl ProcessWorkers {
    /// Reap workers. Those that already reported are waited for; the rest
    /// are killed first.
    pub fn shutdown(self, reported: &[usize]) {
        for (worker_index, mut child) in self.children {
            if !reported.contains(&worker_index) {
                match child.try_wait() {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        warn!("killing worker {worker_index}: no report before gather ended");
                        if let Err(err) = child.kill() {
                            warn!("failed to kill worker {worker_index}: {err}");
                        }
                    }
                    Err(err) => warn!("failed to poll worker {worker_index}: {err}"),
                }
            }
            match child.wait() {
                Ok(status) if !status.success() => {
                    warn!("worker {worker_index} exited with {status}");
                }
                Ok(_) => {}
                Err(err) => warn!("failed to wait for worker {worker_index}: {err}"),
            }
        }
        for reader in self.readers {
            let _ = reader.join();
        }
    }
}
