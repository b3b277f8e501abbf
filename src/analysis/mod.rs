//! # Analysis Module
//!
//! The four per-worker analyses. Dump, categorize and checksum are per-entry
//! functions behind [`EntryAnalyzer`]; keyword counting is a reduction over a
//! whole partition and lives in [`keyword`].

pub mod categorize;
pub mod checksum;
pub mod dump;
pub mod keyword;

use std::fmt;
use std::str::Utf8Error;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corpus::LogEntry;

pub use categorize::{CategoryRule, Categorizer, DEFAULT_RULES};
pub use checksum::ChecksumAnalyzer;
pub use dump::Dumper;
pub use keyword::KeywordCounter;

/// Keyword counted when none is configured.
pub const DEFAULT_KEYWORD: &str = "Critical";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Analyze,
    Categorize,
    KeywordCount,
    Checksum,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Analyze => "analyze",
            AnalysisKind::Categorize => "categorize",
            AnalysisKind::KeywordCount => "keyword_count",
            AnalysisKind::Checksum => "checksum",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Error,
    Warning,
    Critical,
    Info,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Error => "ERROR",
            Category::Warning => "WARNING",
            Category::Critical => "CRITICAL",
            Category::Info => "INFO",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDump {
    pub log_id: usize,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub log_id: usize,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    pub log_id: usize,
    pub checksum: u64,
}

/// Number of partition entries containing `keyword`, one per worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTally {
    pub keyword: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Dump(EntryDump),
    Category(CategoryRecord),
    Checksum(ChecksumRecord),
    KeywordTally(KeywordTally),
}

impl AnalysisResult {
    pub fn log_id(&self) -> Option<usize> {
        match self {
            AnalysisResult::Dump(d) => Some(d.log_id),
            AnalysisResult::Category(c) => Some(c.log_id),
            AnalysisResult::Checksum(c) => Some(c.log_id),
            AnalysisResult::KeywordTally(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("log {log_id} is not valid utf-8: {source}")]
    InvalidUtf8 {
        log_id: usize,
        #[source]
        source: Utf8Error,
    },
}

/// A single entry that one analysis could not process. Recorded in the
/// worker report in place of the missing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub log_id: usize,
    pub analysis: AnalysisKind,
    pub reason: String,
}

impl EntryFailure {
    pub fn new(log_id: usize, analysis: AnalysisKind, err: &AnalysisError) -> Self {
        Self {
            log_id,
            analysis,
            reason: err.to_string(),
        }
    }
}

pub type EntryOutcome = Result<AnalysisResult, EntryFailure>;

/// Stateless per-entry analysis, shared by every executor thread.
pub trait EntryAnalyzer: Send + Sync {
    fn kind(&self) -> AnalysisKind;
    fn analyze(&self, entry: &LogEntry) -> Result<AnalysisResult, AnalysisError>;
}

/// The analyzers one worker runs over its partition.
pub struct AnalyzerSet {
    pub dump: Dumper,
    pub categorize: Categorizer,
    pub keyword: KeywordCounter,
    pub checksum: ChecksumAnalyzer,
}

impl AnalyzerSet {
    pub fn new(keyword: &str, workload_delay: Duration) -> Self {
        Self {
            dump: Dumper::with_delay(workload_delay),
            categorize: Categorizer::default(),
            keyword: KeywordCounter::new(keyword),
            checksum: ChecksumAnalyzer,
        }
    }
}
