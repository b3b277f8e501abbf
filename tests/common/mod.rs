//! Shared test infrastructure for pipeline tests.
//!
//! Settings builders, thread-isolation runs, and local sinks that stand in
//! for a webhook receiver or a socket listener.

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use tokio::runtime::Runtime;

use shardlog::corpus::Corpus;
use shardlog::pipeline::{self, Isolation, PipelineSettings};
use shardlog::report::AggregateReport;

// ============================================================================
// Pipeline Helpers
// ============================================================================

pub fn settings(workers: usize, threads: usize) -> PipelineSettings {
    let mut settings = PipelineSettings::new(workers);
    settings.threads_per_worker = threads;
    settings.gather_timeout = Some(Duration::from_secs(30));
    settings
}

pub fn run_threads(corpus: &Corpus, settings: &PipelineSettings) -> AggregateReport {
    pipeline::run_pipeline(corpus, settings, &Isolation::Threads).expect("pipeline run")
}

/// Ids of one analysis across all reports, in report order.
pub fn checksum_ids(report: &AggregateReport) -> Vec<usize> {
    report
        .worker_reports
        .iter()
        .flat_map(|r| r.checksums.iter().map(|c| c.log_id))
        .collect()
}

pub fn synthetic_corpus(n: usize) -> Corpus {
    let templates = [
        "Success message",
        "Error at module X",
        "Warning in service Y",
        "Timeout in Z",
        "Critical issue in A",
    ];
    Corpus::from_lines((0..n).map(|i| format!("{} #{i}", templates[i % templates.len()])))
}

// ============================================================================
// Local Sinks
// ============================================================================

/// An address nothing listens on: bind, read the port, drop the listener.
pub fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr")
}

/// Fake webhook receiver: an `axum` router on a random port that records
/// every POSTed body and answers with a fixed status.
pub struct HttpSink {
    addr: SocketAddr,
    bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    // Owns the server task; dropping the sink stops it.
    _runtime: Runtime,
}

#[derive(Clone)]
struct SinkState {
    status: StatusCode,
    bodies: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl HttpSink {
    pub fn start(status: u16) -> Self {
        let runtime = Runtime::new().expect("tokio runtime");
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let state = SinkState {
            status: StatusCode::from_u16(status).expect("status code"),
            bodies: bodies.clone(),
        };

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind");
        let addr = listener.local_addr().expect("addr");

        let app = Router::new()
            .route("/reports", post(record_report))
            .with_state(state);
        runtime.spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            addr,
            bodies,
            _runtime: runtime,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/reports", self.addr)
    }

    /// Bodies received so far, in arrival order.
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().expect("sink lock").clone()
    }
}

async fn record_report(State(state): State<SinkState>, body: Bytes) -> StatusCode {
    state.bodies.lock().expect("sink lock").push(body.to_vec());
    state.status
}

/// Accept one connection and return the first newline-terminated frame.
pub fn socket_sink() -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).expect("frame");
        line
    });
    (addr, handle)
}
