//! Pattern 4: Jaccard similarity between issue/PR keyword sets and a
//! commit message or PR title+body. Purely lexical — no embeddings — since the only two uses
//! are a reject threshold and a boost threshold, not a ranking.

use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "with", "this", "that", "from", "have", "has",
    "had", "was", "were", "will", "would", "should", "could", "can", "a", "an", "of", "to", "in",
    "on", "is", "it", "as", "at", "by", "be", "or", "we", "you", "your", "our",
];

pub fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|tok| tok.to_lowercase())
        .filter(|tok| tok.len() >= 3 && !STOPWORDS.contains(&tok.as_str()))
        .collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Below this, a candidate whose only supporting evidence is [`crate::temporal`]
/// is dropped outright.
pub const REJECT_THRESHOLD: f64 = 0.30;

/// At or above this, the candidate's confidence gets a flat `+0.10` boost.
pub const BOOST_THRESHOLD: f64 = 0.70;
pub const BOOST_AMOUNT: f64 = 0.10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_jaccard_one() {
        let a = keywords("null pointer exception in parser module");
        let b = keywords("null pointer exception in parser module");
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn disjoint_text_has_jaccard_zero() {
        let a = keywords("database connection timeout");
        let b = keywords("rename widget layout");
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn stopwords_do_not_inflate_similarity() {
        let a = keywords("the parser for the widget");
        let b = keywords("a totally unrelated thing");
        assert_eq!(jaccard(&a, &b), 0.0);
    }
}
