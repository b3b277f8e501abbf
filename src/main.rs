use std::io::Write;

use anyhow::{Result, bail};
use tracing::info;

use shardlog::config::IsolationMode;
use shardlog::pipeline::{self, Isolation, PipelineSettings};
use shardlog::report::json;
use shardlog::{cli, config, corpus, dispatch, logging, util};

fn main() -> Result<()> {
    logging::init_logging();

    let cli_opts = cli::parse();
    let loaded = config::load_config(cli_opts.config_path.as_deref())?;
    let mut cfg = loaded.config;
    cli_opts.apply(&mut cfg);
    cfg.validate()?;

    let corpus = corpus::load_corpus(cli_opts.input.as_deref())?;
    let settings = PipelineSettings::from_config(&cfg);

    if let Some(rank) = cli_opts.worker_rank {
        return run_single_worker(&corpus, &settings, rank);
    }

    info!(
        "starting run_id={} config_sha256={} input={} entries={}",
        cfg.run_id,
        loaded.config_hash,
        cli_opts
            .input
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<builtin>".to_string()),
        corpus.len()
    );

    let isolation = match cfg.isolation {
        IsolationMode::Thread => Isolation::Threads,
        IsolationMode::Process => Isolation::Processes(util::worker_command(&cli_opts)?),
    };

    let report = pipeline::run_pipeline(&corpus, &settings, &isolation)?;

    let bytes = if cli_opts.pretty {
        json::to_json_pretty(&report)?
    } else {
        json::to_json(&report)?
    };
    {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }
    if let Some(path) = &cli_opts.output {
        util::write_report(path, &bytes)?;
    }

    let status = dispatch::deliver_report(&report, &cfg.dispatch);
    info!(
        "run {} finished total_time={:.6}s dispatch={}",
        cfg.run_id, report.total_duration_secs, status
    );
    Ok(())
}

/// Worker-process entry point: analyze one partition and write its report
/// to stdout for the coordinator.
fn run_single_worker(
    corpus: &corpus::Corpus,
    settings: &PipelineSettings,
    rank: usize,
) -> Result<()> {
    if rank >= settings.workers {
        bail!("worker rank {rank} is outside {} workers", settings.workers);
    }
    let report = pipeline::worker::run_worker(corpus, settings, rank)?;
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &report)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
