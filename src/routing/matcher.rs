//! Route matching logic.
//!
//! # Responsibilities
//! - Split inbound paths into segments
//! - Match a route's segments against the inbound segments (exact or prefix)
//! - Rank matches so the most specific route wins
//!
//! # Design Decisions
//! - Segment comparison is case-sensitive
//! - Empty segments are dropped, so `a//b/` and `a/b` are the same path
//! - Percent-encoding is left as received
//! - Dot segments are detected here so the router can refuse them; URL
//!   parsing would otherwise collapse them after the route decision
//! - No regex to guarantee O(n) matching

use crate::config::MatchKind;

/// Split a path into its non-empty segments.
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// True for `.`/`..` in any percent-encoded spelling, and for segments
/// carrying `\`, which URL parsing treats as a separator.
pub fn is_dot_segment(segment: &str) -> bool {
    if segment.contains('\\') {
        return true;
    }
    matches!(
        segment.to_ascii_lowercase().as_str(),
        "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e."
    )
}

/// Matches inbound path segments against a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatcher {
    segments: Vec<String>,
    kind: MatchKind,
}

impl PathMatcher {
    pub fn new(path: &str, kind: MatchKind) -> Self {
        Self {
            segments: split_segments(path),
            kind,
        }
    }

    /// Returns true if the inbound segments match this route path.
    pub fn matches(&self, segments: &[String]) -> bool {
        match self.kind {
            MatchKind::Exact => segments == self.segments.as_slice(),
            MatchKind::Prefix => segments.starts_with(&self.segments),
        }
    }

    /// Specificity used to pick between matching routes; larger wins.
    pub fn rank(&self) -> (usize, bool) {
        (self.segments.len(), self.kind == MatchKind::Exact)
    }

    /// Segments left over after the route path.
    pub fn remainder<'a>(&self, segments: &'a [String]) -> &'a [String] {
        segments.get(self.segments.len()..).unwrap_or(&[])
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        split_segments(path)
    }

    #[test]
    fn test_split_segments() {
        assert_eq!(segs("scripts/123/lines"), vec!["scripts", "123", "lines"]);
        assert_eq!(segs("/projects/"), vec!["projects"]);
        assert_eq!(segs("a//b"), vec!["a", "b"]);
        assert!(segs("").is_empty());
        assert!(segs("/").is_empty());
        assert_eq!(segs("files/my%20take.wav"), vec!["files", "my%20take.wav"]);
    }

    #[test]
    fn test_dot_segments() {
        for segment in [".", "..", "%2e", "%2E", "%2e%2e", "%2E%2e", ".%2e", "%2e.", "x\\..", "\\"] {
            assert!(is_dot_segment(segment), "{segment}");
        }
        for segment in ["...", "a.b", ".hidden", "v1.2", "%2e%2e%2e", "%252e"] {
            assert!(!is_dot_segment(segment), "{segment}");
        }
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = PathMatcher::new("projects", MatchKind::Exact);
        assert!(matcher.matches(&segs("projects")));
        assert!(!matcher.matches(&segs("projects/1")));
        assert!(!matcher.matches(&segs("Projects")));
        assert!(!matcher.matches(&segs("")));
    }

    #[test]
    fn test_prefix_matcher() {
        let matcher = PathMatcher::new("projects", MatchKind::Prefix);
        assert!(matcher.matches(&segs("projects")));
        assert!(matcher.matches(&segs("projects/1/artists")));
        assert!(!matcher.matches(&segs("projectsx")));

        let inbound = segs("projects/1/artists");
        assert_eq!(matcher.remainder(&inbound), &inbound[1..]);
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let matcher = PathMatcher::new("", MatchKind::Prefix);
        assert!(matcher.matches(&segs("")));
        assert!(matcher.matches(&segs("scripts/1")));
        assert_eq!(matcher.rank(), (0, false));
    }
}
