//! Series and match selection rules.
//!
//! Terms match case-insensitively and only on word boundaries, so `XI` fires
//! for "Prime Minister's XI" but not for "Mexico".

use crate::domain::model::{normalize_whitespace, Decision, DecisionReason};
use crate::utils::error::{CrawlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Term lists driving [`SelectionPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionRules {
    /// Series labels containing any of these are dropped. Checked first.
    pub series_block: Vec<String>,
    pub series_always_include: Vec<String>,
    pub series_picks: Vec<String>,
    pub match_block: Vec<String>,
    pub teams: Vec<String>,
    /// When set, a match label must mention one of `teams`.
    pub require_team_match: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            series_block: strings(&[
                "Qualifier",
                "U19",
                "Under 19",
                "Women",
                "Womens",
                "India A",
                "England Lions",
                "Pakistan A",
                "South Africa A",
                "Asian",
                "New Zealand A",
                "Australia A",
                "Sri Lanka A",
                "Domestic",
                "Postponed",
                "Cancelled",
                "XI",
                "Unofficial",
                "warm-up",
                "practice",
            ]),
            series_always_include: strings(&[
                "world test championship",
                "t20 world cup",
                "champions trophy",
                "ashes",
                "cricket world cup",
                "indian premier league",
            ]),
            series_picks: strings(&[
                "tour",
                "tri-series",
                "Indian Premier League",
                "ICC Champions Trophy",
                "Big Bash League",
                "ICC Cricket World Cup",
                "Asia Cup",
                "Ashes",
                "ICC World Test Championship Final",
                "ICC Mens T20 World Cup",
            ]),
            match_block: strings(&[
                "practice",
                "warm-up",
                "unofficial",
                "invitational",
                "invitation",
                "XI",
            ]),
            teams: strings(&[
                "India",
                "Australia",
                "England",
                "South Africa",
                "Pakistan",
                "West Indies",
                "New Zealand",
                "Royal Challengers Bengaluru",
                "Kolkata Knight Riders",
                "Sunrisers Hyderabad",
                "Rajasthan Royals",
                "Chennai Super Kings",
                "Delhi Capitals",
                "Lucknow Super Giants",
                "Gujarat Titans",
                "Mumbai Indians",
                "Punjab Kings",
            ]),
            require_team_match: false,
        }
    }
}

#[derive(Debug, Clone)]
struct TermList {
    terms: Vec<(String, Regex)>,
}

impl TermList {
    fn compile(field: &str, terms: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(terms.len());
        for term in terms {
            let term = normalize_whitespace(term);
            if term.is_empty() {
                continue;
            }
            let regex = Regex::new(&term_pattern(&term)).map_err(|e| {
                CrawlError::ConfigValidationError {
                    field: field.to_string(),
                    message: format!("term '{}' does not compile: {}", term, e),
                }
            })?;
            compiled.push((term, regex));
        }
        Ok(Self { terms: compiled })
    }

    /// First term, in list order, found in `label`.
    fn find(&self, label: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|(_, regex)| regex.is_match(label))
            .map(|(term, _)| term.as_str())
    }
}

fn term_pattern(term: &str) -> String {
    let edge = |c: Option<char>| match c {
        Some(c) if c.is_alphanumeric() || c == '_' => r"\b",
        _ => "",
    };
    format!(
        "(?i){}{}{}",
        edge(term.chars().next()),
        regex::escape(term),
        edge(term.chars().last())
    )
}

/// Pure include/exclude decisions over series and match labels.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    series_block: TermList,
    series_always_include: TermList,
    series_picks: TermList,
    match_block: TermList,
    teams: TermList,
    require_team_match: bool,
}

impl SelectionPolicy {
    pub fn new(rules: &SelectionRules) -> Result<Self> {
        Ok(Self {
            series_block: TermList::compile("selection.series_block", &rules.series_block)?,
            series_always_include: TermList::compile(
                "selection.series_always_include",
                &rules.series_always_include,
            )?,
            series_picks: TermList::compile("selection.series_picks", &rules.series_picks)?,
            match_block: TermList::compile("selection.match_block", &rules.match_block)?,
            teams: TermList::compile("selection.teams", &rules.teams)?,
            require_team_match: rules.require_team_match,
        })
    }

    pub fn decide_series(&self, label: &str) -> Decision {
        let label = normalize_whitespace(label);

        if let Some(term) = self.series_block.find(&label) {
            return Decision::exclude(DecisionReason::Blocked(term.to_string()));
        }
        if let Some(term) = self.series_always_include.find(&label) {
            return Decision::include(DecisionReason::AlwaysInclude(term.to_string()));
        }
        if let Some(term) = self.series_picks.find(&label) {
            return Decision::include(DecisionReason::Picked(term.to_string()));
        }
        Decision::exclude(DecisionReason::NoRuleMatched)
    }

    pub fn decide_match(&self, label: &str) -> Decision {
        let label = normalize_whitespace(label);

        if let Some(term) = self.match_block.find(&label) {
            return Decision::exclude(DecisionReason::Blocked(term.to_string()));
        }
        if self.require_team_match && self.teams.find(&label).is_none() {
            return Decision::exclude(DecisionReason::NoTeamMatch);
        }
        Decision::include(DecisionReason::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SelectionPolicy {
        SelectionPolicy::new(&SelectionRules::default()).unwrap()
    }

    #[test]
    fn test_block_terms_always_exclude_series() {
        let policy = policy();
        for term in SelectionRules::default().series_block {
            let label = format!("ICC Cricket World Cup {} Tour", term);
            let decision = policy.decide_series(&label);
            assert!(!decision.include, "'{}' should be excluded", label);
            assert!(matches!(decision.reason, DecisionReason::Blocked(_)));
        }
    }

    #[test]
    fn test_block_list_wins_over_always_include() {
        let decision = policy().decide_series("ICC Cricket World Cup Qualifier 2023");
        assert_eq!(
            decision,
            Decision::exclude(DecisionReason::Blocked("Qualifier".to_string()))
        );
    }

    #[test]
    fn test_always_include_series() {
        let policy = policy();
        for label in [
            "ICC World Test Championship Final 2023",
            "ICC Men's T20 World Cup 2022",
            "The Ashes, 2023",
            "Indian Premier League 2024",
            "ICC Champions Trophy 2017",
        ] {
            let decision = policy.decide_series(label);
            assert!(decision.include, "'{}' should be included", label);
            assert!(matches!(decision.reason, DecisionReason::AlwaysInclude(_)));
        }
    }

    #[test]
    fn test_generic_picks_and_fallthrough() {
        let policy = policy();
        assert_eq!(
            policy.decide_series("Australia tour of India, 2023"),
            Decision::include(DecisionReason::Picked("tour".to_string()))
        );
        assert!(policy.decide_series("Zimbabwe Tri-Series 2018").include);
        assert_eq!(
            policy.decide_series("Sheffield Shield 2019-20"),
            Decision::exclude(DecisionReason::NoRuleMatched)
        );
    }

    #[test]
    fn test_series_label_normalization() {
        let decision = policy().decide_series("  england\u{a0}TOUR of\n Pakistan ");
        assert!(decision.include);
    }

    #[test]
    fn test_terms_respect_word_boundaries() {
        let policy = policy();
        assert!(policy.decide_match("Mexico vs Canada, 1st T20I").include);
        assert!(!policy.decide_match("Prime Minister's XI vs England").include);
        // "India A" must not fire inside "India and ..."
        assert!(policy.decide_series("Sri Lanka, India and Bangladesh Tri-Series").include);
    }

    #[test]
    fn test_pick_terms_do_not_match_inside_words() {
        assert_eq!(
            policy().decide_series("Quadrangular T20 Tournament 2018"),
            Decision::exclude(DecisionReason::NoRuleMatched)
        );
    }

    #[test]
    fn test_every_match_block_term_excludes() {
        let rules = SelectionRules {
            require_team_match: true,
            ..SelectionRules::default()
        };
        let policy = SelectionPolicy::new(&rules).unwrap();

        for term in &rules.match_block {
            let label = format!("India vs England, {} match", term);
            assert_eq!(
                policy.decide_match(&label),
                Decision::exclude(DecisionReason::Blocked(term.clone())),
                "'{}' should be blocked by '{}'",
                label,
                term
            );
        }
    }

    #[test]
    fn test_match_block_terms() {
        let policy = policy();
        for label in [
            "Tour Match: Practice Match",
            "England vs Sussex, Warm-up",
            "Unofficial Test",
            "Invitational XI vs India",
        ] {
            assert!(!policy.decide_match(label).include, "'{}' should be excluded", label);
        }
        assert!(policy.decide_match("India vs Australia, 2nd Test").include);
    }

    #[test]
    fn test_team_relevance_when_required() {
        let rules = SelectionRules {
            require_team_match: true,
            ..SelectionRules::default()
        };
        let policy = SelectionPolicy::new(&rules).unwrap();

        assert_eq!(
            policy.decide_match("Netherlands vs Ireland, 1st ODI"),
            Decision::exclude(DecisionReason::NoTeamMatch)
        );
        assert!(policy.decide_match("Mumbai Indians vs Punjab Kings, 12th Match").include);
    }
}
