use memchr::memmem::Finder;

use crate::corpus::LogEntry;

use super::KeywordTally;

/// Counts entries containing a keyword (case-sensitive substring).
///
/// Counting is a reduction: each executor thread folds its share into a
/// private partial count with [`KeywordCounter::matches`], and the partials are
/// summed once the threads finish.
pub struct KeywordCounter {
    keyword: String,
    finder: Finder<'static>,
}

impl KeywordCounter {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            finder: Finder::new(keyword).into_owned(),
        }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.finder.find(entry.bytes()).is_some()
    }

    /// Sequential count, used as the reference for the parallel reduction.
    pub fn count(&self, entries: &[LogEntry]) -> u64 {
        entries.iter().filter(|e| self.matches(e)).count() as u64
    }

    pub fn tally(&self, count: u64) -> KeywordTally {
        KeywordTally {
            keyword: self.keyword.clone(),
            count,
        }
    }
}
