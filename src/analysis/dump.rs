use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::corpus::LogEntry;

use super::{AnalysisError, AnalysisKind, AnalysisResult, EntryAnalyzer, EntryDump};

/// Projects each entry to its id and text, recording that it was visited.
///
/// An optional per-entry delay simulates heavier analysis work when
/// measuring throughput; it is zero unless configured.
#[derive(Debug, Default)]
pub struct Dumper {
    delay: Duration,
}

impl Dumper {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl EntryAnalyzer for Dumper {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Analyze
    }

    fn analyze(&self, entry: &LogEntry) -> Result<AnalysisResult, AnalysisError> {
        let text = entry
            .text()
            .map_err(|source| AnalysisError::InvalidUtf8 {
                log_id: entry.id,
                source,
            })?;
        debug!(
            "thread {:?} analyzing log {}: {}",
            thread::current().id(),
            entry.id,
            text
        );
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(AnalysisResult::Dump(EntryDump {
            log_id: entry.id,
            log: text.to_string(),
        }))
    }
}
