use std::thread;

use memchr::memmem::Finder;
use tracing::debug;

use crate::corpus::LogEntry;

use super::{AnalysisError, AnalysisKind, AnalysisResult, Category, CategoryRecord, EntryAnalyzer};

/// A label and the case-sensitive substring that selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub label: Category,
    pub needle: &'static str,
}

/// Rules in priority order; the first match wins. Entries matching none are INFO.
pub const DEFAULT_RULES: &[CategoryRule] = &[
    CategoryRule {
        label: Category::Error,
        needle: "Error",
    },
    CategoryRule {
        label: Category::Warning,
        needle: "Warning",
    },
    CategoryRule {
        label: Category::Critical,
        needle: "Critical",
    },
];

pub struct Categorizer {
    rules: Vec<(Category, Finder<'static>)>,
    fallback: Category,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule], fallback: Category) -> Self {
        let rules = rules
            .iter()
            .map(|rule| (rule.label, Finder::new(rule.needle).into_owned()))
            .collect();
        Self { rules, fallback }
    }

    /// Matches on raw bytes, so this never fails on malformed text.
    pub fn classify(&self, bytes: &[u8]) -> Category {
        self.rules
            .iter()
            .find(|(_, finder)| finder.find(bytes).is_some())
            .map(|(label, _)| *label)
            .unwrap_or(self.fallback)
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(DEFAULT_RULES, Category::Info)
    }
}

impl EntryAnalyzer for Categorizer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Categorize
    }

    fn analyze(&self, entry: &LogEntry) -> Result<AnalysisResult, AnalysisError> {
        let category = self.classify(entry.bytes());
        debug!(
            "thread {:?} categorized log {} as {}",
            thread::current().id(),
            entry.id,
            category
        );
        Ok(AnalysisResult::Category(CategoryRecord {
            log_id: entry.id,
            category,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let c = Categorizer::default();
        assert_eq!(c.classify(b"Error and Warning"), Category::Error);
        assert_eq!(c.classify(b"Warning then Critical"), Category::Warning);
        assert_eq!(c.classify(b"Critical issue in A"), Category::Critical);
        assert_eq!(c.classify(b"Timeout in Z"), Category::Info);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let c = Categorizer::default();
        assert_eq!(c.classify(b"error at module X"), Category::Info);
        assert_eq!(c.classify(b"CRITICAL"), Category::Info);
    }

    #[test]
    fn custom_rule_table() {
        let rules = [CategoryRule {
            label: Category::Critical,
            needle: "panic",
        }];
        let c = Categorizer::new(&rules, Category::Warning);
        assert_eq!(c.classify(b"thread panicked"), Category::Critical);
        assert_eq!(c.classify(b"Error"), Category::Warning);
    }

    #[test]
    fn invalid_utf8_is_still_categorized() {
        let entry = LogEntry::from_bytes(3, b"Error \xff\xfe".to_vec());
        let result = Categorizer::default().analyze(&entry).expect("categorize");
        assert_eq!(
            result,
            AnalysisResult::Category(CategoryRecord {
                log_id: 3,
                category: Category::Error,
            })
        );
    }
}
