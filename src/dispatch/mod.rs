//! # Dispatch Module
//!
//! Single-attempt, best-effort delivery of the aggregate report. A failed
//! delivery is logged and returned as a status; it never fails the run and
//! never touches the report.

pub mod socket;
pub mod webhook;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::report::AggregateReport;
use crate::report::json;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One HTTP POST per report
    #[default]
    Webhook,
    /// One TCP connection per report
    Socket,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("delivery timed out")]
    Timeout,
    #[error("sink rejected report with status {status}")]
    Rejected { status: u16 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Acknowledgement of a delivered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub bytes_sent: usize,
    /// HTTP status for webhooks; `None` for sockets.
    pub status: Option<u16>,
}

/// A channel that can carry one serialized report.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, payload: &[u8]) -> Result<Ack, DispatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    Disabled,
    Delivered(Ack),
    Failed(String),
}

impl DispatchStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchStatus::Delivered(_))
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStatus::Disabled => f.write_str("disabled"),
            DispatchStatus::Delivered(ack) => write!(f, "delivered ({} bytes)", ack.bytes_sent),
            DispatchStatus::Failed(err) => write!(f, "failed ({err})"),
        }
    }
}

pub struct Dispatcher {
    transport: Box<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_config(cfg: &DispatchConfig) -> Result<Self, DispatchError> {
        Ok(Self::new(build_transport(cfg)?))
    }

    pub fn send(&self, report: &AggregateReport) -> Result<Ack, DispatchError> {
        let payload = json::to_json(report)?;
        self.transport.send(&payload)
    }

    /// Send and fold the result into a status.
    pub fn deliver(&self, report: &AggregateReport) -> DispatchStatus {
        match self.send(report) {
            Ok(ack) => {
                info!(
                    "report delivered via {} bytes={} status={:?}",
                    self.transport.name(),
                    ack.bytes_sent,
                    ack.status
                );
                DispatchStatus::Delivered(ack)
            }
            Err(err) => {
                warn!("report delivery via {} failed: {err}", self.transport.name());
                DispatchStatus::Failed(err.to_string())
            }
        }
    }
}

pub fn build_transport(cfg: &DispatchConfig) -> Result<Box<dyn Transport>, DispatchError> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    match cfg.mode {
        DispatchMode::Webhook => Ok(Box::new(webhook::WebhookTransport::new(
            &cfg.endpoint,
            timeout,
        )?)),
        DispatchMode::Socket => Ok(Box::new(socket::SocketTransport::new(
            &cfg.endpoint,
            timeout,
        )?)),
    }
}

/// Deliver `report` as configured. Setup errors (a bad endpoint) are
/// reported the same way as delivery errors.
pub fn deliver_report(report: &AggregateReport, cfg: &DispatchConfig) -> DispatchStatus {
    if !cfg.enabled {
        return DispatchStatus::Disabled;
    }
    match Dispatcher::from_config(cfg) {
        Ok(dispatcher) => dispatcher.deliver(report),
        Err(err) => {
            warn!("report delivery not attempted: {err}");
            DispatchStatus::Failed(err.to_string())
        }
    }
}
