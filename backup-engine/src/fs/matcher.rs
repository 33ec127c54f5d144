//! Exclusion pattern matching.
//!
//! A relative path is excluded when any pattern matches it. Paths and
//! patterns are normalised to `/` separators first. Each pattern matches in
//! two ways:
//!
//! - as a glob over the whole relative path, where `*` matches any run of
//!   characters except `/` and `**` matches zero or more path segments.
//!   No other character is special: `?`, `[` and `]` match only themselves;
//! - as a plain substring of the path.
//!
//! The substring rule keeps older configurations working but is broad: the
//! pattern `log` excludes `access.log`, `logs/` and `catalog/file.txt` alike.
//! Pick patterns that are not accidental substrings of paths you want kept.

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct ExcludeRule {
    literal: String,
    glob: Option<Pattern>,
}

/// Compiled set of exclusion patterns
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    rules: Vec<ExcludeRule>,
}

impl PathMatcher {
    /// Compile patterns. Empty patterns are dropped; patterns that are not
    /// valid globs keep only the substring rule.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let rules = patterns
            .iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .map(|literal| {
                let glob = Pattern::new(&star_only_glob(&literal)).ok();
                if glob.is_none() {
                    tracing::debug!(pattern = %literal, "Not a valid glob, using substring match only");
                }
                ExcludeRule { literal, glob }
            })
            .collect();

        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `relative_path` is excluded
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let path = normalize(relative_path);
        self.rules.iter().any(|rule| {
            path.contains(&rule.literal)
                || rule
                    .glob
                    .as_ref()
                    .is_some_and(|g| g.matches_with(&path, MATCH_OPTIONS))
        })
    }
}

/// One-shot form of [`PathMatcher::is_excluded`]
pub fn matches<S: AsRef<str>>(relative_path: &str, patterns: &[S]) -> bool {
    PathMatcher::new(patterns).is_excluded(relative_path)
}

/// Escape everything except `*` so `?` and `[..]` stay literal
fn star_only_glob(pattern: &str) -> String {
    pattern.split('*').map(Pattern::escape).collect::<Vec<_>>().join("*")
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patterns_never_exclude() {
        let none: [&str; 0] = [];
        assert!(!matches("anything/at/all.txt", &none));
        assert!(!matches("anything", &[""]));
    }

    #[test]
    fn test_single_star_stays_within_segment() {
        assert!(matches("access.log", &["*.log"]));
        assert!(!matches("logs/access.txt", &["*.txt"]));
        assert!(matches("src/main.rs", &["src/*.rs"]));
        assert!(!matches("src/bin/main.rs", &["src/*.rs"]));
    }

    #[test]
    fn test_double_star_spans_segments() {
        assert!(matches("a/b/c/trace.tmp", &["**/*.tmp"]));
        assert!(matches("trace.tmp", &["**/*.tmp"]));
        assert!(matches("build/out/x.o", &["build/**/*.o"]));
        assert!(matches("build/x.o", &["build/**/*.o"]));
    }

    #[test]
    fn test_substring_fallback_is_broad() {
        let patterns = ["log"];
        assert!(matches("access.log", &patterns));
        assert!(matches("logs", &patterns));
        assert!(matches("catalog/file.txt", &patterns));
        assert!(!matches("src/main.rs", &patterns));
    }

    #[test]
    fn test_separators_are_normalized() {
        assert!(matches("node_modules\\pkg\\index.js", &["node_modules/pkg"]));
        assert!(matches("target/debug", &["target\\debug"]));
        assert!(matches("a\\b.tmp", &["a/*.tmp"]));
    }

    #[test]
    fn test_any_pattern_excludes() {
        let patterns = ["dist", "*.bak", ".git"];
        assert!(matches("dist", &patterns));
        assert!(matches("notes.bak", &patterns));
        assert!(matches(".git", &patterns));
        assert!(!matches("README.md", &patterns));
    }

    #[test]
    fn test_invalid_glob_keeps_substring_rule() {
        let matcher = PathMatcher::new(&["**a"]);
        assert!(!matcher.is_empty());
        assert!(matcher.is_excluded("x/**a/y"));
        assert!(!matcher.is_excluded("xa"));
    }

    #[test]
    fn test_only_star_is_a_wildcard() {
        assert!(!matches("ab.txt", &["a?.txt"]));
        assert!(matches("a?.txt", &["a?.txt"]));
        assert!(!matches("v1.txt", &["v[12].txt"]));
        assert!(matches("v[12].txt", &["v[12].txt"]));
        assert!(matches("dir/v[1]-x.log", &["dir/v[1]-*.log"]));
        assert!(!matches("dir/v1-x.log", &["dir/v[1]-*.log"]));
    }

    #[test]
    fn test_matching_is_repeatable() {
        let matcher = PathMatcher::new(&["*.tmp", "cache"]);
        for _ in 0..3 {
            assert!(matcher.is_excluded("x.tmp"));
            assert!(!matcher.is_excluded("x.txt"));
        }
    }
}
