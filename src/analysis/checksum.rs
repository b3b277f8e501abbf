use std::thread;

use tracing::debug;

use crate::corpus::LogEntry;

use super::{AnalysisError, AnalysisKind, AnalysisResult, ChecksumRecord, EntryAnalyzer};

/// Sum of the code points of `text`, wrapping modulo 2^64.
pub fn checksum(text: &str) -> u64 {
    text.chars()
        .fold(0u64, |acc, ch| acc.wrapping_add(u64::from(u32::from(ch))))
}

pub struct ChecksumAnalyzer;

impl EntryAnalyzer for ChecksumAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Checksum
    }

    fn analyze(&self, entry: &LogEntry) -> Result<AnalysisResult, AnalysisError> {
        let text = entry
            .text()
            .map_err(|source| AnalysisError::InvalidUtf8 {
                log_id: entry.id,
                source,
            })?;
        let sum = checksum(text);
        debug!(
            "thread {:?} checksum of log {}: {}",
            thread::current().id(),
            entry.id,
            sum
        );
        Ok(AnalysisResult::Checksum(ChecksumRecord {
            log_id: entry.id,
            checksum: sum,
        }))
    }
}
