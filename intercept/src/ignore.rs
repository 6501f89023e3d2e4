//! Surface paths excluded from hooking and logging.

use std::sync::Arc;

/// Dotted surface-path substrings, fixed at construction.
///
/// An API path such as `path.normalize` is ignored when any entry is a
/// substring of it. Empty entries are dropped, since they would match
/// every path.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Arc<[String]>,
}

impl IgnoreList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            patterns: patterns.into(),
        }
    }

    pub fn matches(&self, api_path: &str) -> bool {
        self.patterns.iter().any(|p| api_path.contains(p.as_str()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
