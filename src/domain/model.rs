use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A link scraped from a listing page: an archive's series or a series' matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub href: String,
    pub raw_label: String,
}

pub type SeriesCandidate = Candidate;
pub type MatchCandidate = Candidate;

impl Candidate {
    pub fn new(href: impl Into<String>, raw_label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            raw_label: raw_label.into(),
        }
    }

    /// Label with non-breaking spaces and whitespace runs collapsed.
    pub fn label(&self) -> String {
        normalize_whitespace(&self.raw_label)
    }
}

/// One extracted commentary row. `text` is always normalized and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentaryLine {
    pub match_label: String,
    pub text: String,
}

impl CommentaryLine {
    pub fn new(match_label: impl Into<String>, raw_text: &str) -> Option<Self> {
        let text = normalize_whitespace(raw_text);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            match_label: match_label.into(),
            text,
        })
    }
}

/// Collapses every whitespace run (including NBSP) into one space and trims.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    Blocked(String),
    AlwaysInclude(String),
    Picked(String),
    NoTeamMatch,
    Accepted,
    NoRuleMatched,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Blocked(term) => write!(f, "blocked term '{}'", term),
            DecisionReason::AlwaysInclude(term) => write!(f, "always-include term '{}'", term),
            DecisionReason::Picked(term) => write!(f, "pick term '{}'", term),
            DecisionReason::NoTeamMatch => write!(f, "no tracked team"),
            DecisionReason::Accepted => write!(f, "accepted"),
            DecisionReason::NoRuleMatched => write!(f, "no rule matched"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub include: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn include(reason: DecisionReason) -> Self {
        Self {
            include: true,
            reason,
        }
    }

    pub fn exclude(reason: DecisionReason) -> Self {
        Self {
            include: false,
            reason,
        }
    }
}

/// Counters for one crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub years_visited: u32,
    pub years_skipped: u32,
    pub series_seen: u32,
    pub series_selected: u32,
    pub series_skipped: u32,
    pub matches_seen: u32,
    pub matches_selected: u32,
    pub matches_scraped: u32,
    pub matches_skipped: u32,
    pub lines_written: u64,
    pub lines_lost: u64,
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            years_visited: 0,
            years_skipped: 0,
            series_seen: 0,
            series_selected: 0,
            series_skipped: 0,
            matches_seen: 0,
            matches_selected: 0,
            matches_scraped: 0,
            matches_skipped: 0,
            lines_written: 0,
            lines_lost: 0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

impl Default for CrawlSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\tb   c "), "a b c");
        assert_eq!(normalize_whitespace("India\u{a0}tour of\u{a0}\u{a0}England"), "India tour of England");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_commentary_line_rejects_blank_text() {
        assert!(CommentaryLine::new("1st Test", "   \n").is_none());

        let line = CommentaryLine::new("1st Test", " Starc to Root,\n  FOUR ").unwrap();
        assert_eq!(line.text, "Starc to Root, FOUR");
        assert_eq!(line.match_label, "1st Test");
    }
}
