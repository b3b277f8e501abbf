use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::Utf8Error;
use std::sync::Arc;

use thiserror::Error;

use crate::partition::Partition;

/// Entries analyzed when no input file is given.
pub const SAMPLE_LOGS: [&str; 5] = [
    "Error at module X",
    "Warning in service Y",
    "Timeout in Z",
    "Success message",
    "Critical issue in A",
];

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One log line. The raw bytes are kept as read so that a line that is not
/// valid UTF-8 still reaches the analyzers and fails there, per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: usize,
    raw: Box<[u8]>,
}

impl LogEntry {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            raw: text.into().into_bytes().into_boxed_slice(),
        }
    }

    pub fn from_bytes(id: usize, raw: Vec<u8>) -> Self {
        Self {
            id,
            raw: raw.into_boxed_slice(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.raw)
    }
}

/// Immutable, indexed sequence of log entries. Cloning shares the backing
/// storage, so every worker thread can hold the whole corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    entries: Arc<[LogEntry]>,
}

impl Corpus {
    pub fn builtin() -> Self {
        Self::from_lines(SAMPLE_LOGS)
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<LogEntry> = lines
            .into_iter()
            .enumerate()
            .map(|(id, line)| LogEntry::new(id, line))
            .collect();
        Self {
            entries: entries.into(),
        }
    }

    /// Entries are renumbered by position.
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        let entries: Vec<LogEntry> = entries
            .into_iter()
            .enumerate()
            .map(|(id, mut entry)| {
                entry.id = id;
                entry
            })
            .collect();
        Self {
            entries: entries.into(),
        }
    }

    /// Reads one entry per line. `\r\n` endings are trimmed; a trailing
    /// newline does not produce an empty final entry.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CorpusError> {
        let mut reader = BufReader::new(reader);
        let mut entries = Vec::new();
        loop {
            let mut line = Vec::new();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }
            entries.push(LogEntry::from_bytes(entries.len(), line));
        }
        Ok(Self {
            entries: entries.into(),
        })
    }

    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&LogEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries covered by `partition`, clamped to the corpus length.
    pub fn slice(&self, partition: &Partition) -> &[LogEntry] {
        let end = partition.end.min(self.entries.len());
        let start = partition.start.min(end);
        &self.entries[start..end]
    }
}

/// Load the corpus from a line file, or the built-in sample when no path is given.
pub fn load_corpus(path: Option<&Path>) -> Result<Corpus, CorpusError> {
    match path {
        Some(p) => Corpus::open(p),
        None => Ok(Corpus::builtin()),
    }
}
