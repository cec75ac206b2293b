//! Pattern 1: explicit `fixes/closes/resolves #N` and bare `#N` references
//! guarded by a weaker action verb.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplicitMatch {
    pub number: u64,
    pub strong: bool,
}

fn strong_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:fix|fixes|fixed|close|closes|closed|resolve|resolves|resolved)\s*:?\s*#(\d+)").unwrap()
    })
}

fn weak_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:ref|refs|references|related|regarding|addresses|towards|see)\s*:?\s*#(\d+)").unwrap()
    })
}

/// Extracts every explicit issue/PR reference in `text`. A number matched
/// by both the strong and weak regex (two different mentions) keeps its
/// strongest classification.
pub fn extract(text: &str) -> Vec<ExplicitMatch> {
    let mut found: std::collections::HashMap<u64, bool> = std::collections::HashMap::new();

    for caps in strong_re().captures_iter(text) {
        if let Ok(n) = caps[1].parse::<u64>() {
            found.insert(n, true);
        }
    }
    for caps in weak_re().captures_iter(text) {
        if let Ok(n) = caps[1].parse::<u64>() {
            found.entry(n).or_insert(false);
        }
    }

    let mut matches: Vec<ExplicitMatch> = found
        .into_iter()
        .map(|(number, strong)| ExplicitMatch { number, strong })
        .collect();
    matches.sort_by_key(|m| m.number);
    matches
}

/// Base confidence for an explicit match: strong closing verbs land in
/// the 0.85-0.90 band, weak ones at 0.75.
pub fn confidence(strong: bool) -> f64 {
    if strong {
        0.88
    } else {
        0.75
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_verb_wins_over_weak_for_the_same_number() {
        let matches = extract("See #12 for background. Fixes #12.");
        assert_eq!(matches, vec![ExplicitMatch { number: 12, strong: true }]);
    }

    #[test]
    fn bare_number_without_a_verb_is_not_matched() {
        let matches = extract("This touches #42 somehow.");
        assert!(matches.is_empty());
    }

    #[test]
    fn weak_verb_matched_when_no_strong_mention_exists() {
        let matches = extract("Related to #7.");
        assert_eq!(matches, vec![ExplicitMatch { number: 7, strong: false }]);
    }

    #[test]
    fn multiple_distinct_numbers_are_all_extracted() {
        let mut matches = extract("Closes #1, fixes #2, and refs #3.");
        matches.sort_by_key(|m| m.number);
        assert_eq!(
            matches,
            vec![
                ExplicitMatch { number: 1, strong: true },
                ExplicitMatch { number: 2, strong: true },
                ExplicitMatch { number: 3, strong: false },
            ]
        );
    }
}
