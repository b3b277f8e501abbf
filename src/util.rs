//! # Utility Module
//!
//! Glue between the command line and the library: enum mapping, the worker
//! process command, and writing the report file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::cli::{CliOptions, DeliveryMode, IsolationKind};
use crate::config::IsolationMode;
use crate::dispatch::DispatchMode;
use crate::pipeline::workers::WorkerCommand;

/// Convert CLI delivery mode to internal enum
pub fn mode_from_cli(mode: DeliveryMode) -> DispatchMode {
    match mode {
        DeliveryMode::Webhook => DispatchMode::Webhook,
        DeliveryMode::Socket => DispatchMode::Socket,
    }
}

/// Convert CLI isolation kind to internal enum
pub fn isolation_from_cli(kind: IsolationKind) -> IsolationMode {
    match kind {
        IsolationKind::Thread => IsolationMode::Thread,
        IsolationKind::Process => IsolationMode::Process,
    }
}

/// Command that re-runs this binary as a single worker. Children get the
/// same config file and input so they see the same corpus.
pub fn worker_command(opts: &CliOptions) -> Result<WorkerCommand> {
    let exe = std::env::current_exe().context("locating worker executable")?;
    let mut command = WorkerCommand::new(exe);
    if let Some(path) = &opts.config_path {
        command = command.arg("--config-path").arg(path);
    }
    if let Some(path) = &opts.input {
        command = command.arg("--input").arg(path);
    }
    Ok(command)
}

/// Ensure the directory that will hold the report exists and is writable.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_dir() {
            return Err(anyhow!(
                "output path is not a directory: {}",
                path.display()
            ));
        }
        if metadata.permissions().readonly() {
            return Err(anyhow!(
                "output directory is not writable: {}",
                path.display()
            ));
        }
    } else {
        std::fs::create_dir_all(path)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        if mode & 0o002 != 0 {
            warn!("output directory is world-writable: {}", path.display());
        }
    }

    Ok(())
}

/// Write the serialized report to `path`, creating parent directories.
pub fn write_report(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_output_dir(parent)?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("opening report file {}", path.display()))?;
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.flush()?;
    info!("report written to {}", path.display());
    Ok(())
}
