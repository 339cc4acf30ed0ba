use crate::artifacts::core::slash_path;
use std::path::Path;

/// Narrows a checkout to the paths a caller asked for.
///
/// With matching enabled a path is in scope when it equals a pattern, lies
/// beneath a pattern ending in `/`, or matches the pattern (or anything below
/// it) as a glob. Literal mode only accepts exact equality.
#[derive(Debug, Clone, Default)]
pub struct Pathspec {
    patterns: Vec<String>,
    literal: bool,
}

impl Pathspec {
    pub fn new(patterns: &[String], literal: bool) -> Self {
        let patterns = patterns
            .iter()
            .map(|pattern| pattern.trim_start_matches("./").to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect();

        Pathspec { patterns, literal }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let path = slash_path(path);
        self.patterns
            .iter()
            .any(|pattern| self.pattern_matches(pattern, &path))
    }

    fn pattern_matches(&self, pattern: &str, path: &str) -> bool {
        if pattern == path {
            return true;
        }
        if self.literal {
            return false;
        }

        if pattern.ends_with('/') {
            return path.starts_with(pattern) || glob_match::glob_match(&format!("{pattern}**"), path);
        }

        glob_match::glob_match(pattern, path)
            || glob_match::glob_match(&format!("{pattern}/**"), path)
    }
}
