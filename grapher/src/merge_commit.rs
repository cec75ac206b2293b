//! Pattern 6: merge-commit message parsing. Reuses the explicit-reference regex since GitHub's default
//! merge message (`"Merge pull request #N from ..."`) and most manual
//! merge messages follow the same `#N` shape.

use regex::Regex;
use std::sync::OnceLock;

fn merge_pr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)merge pull request #(\d+)").unwrap())
}

pub const CONFIDENCE: f64 = 0.70;

/// Extracts the PR number a merge commit's message names, if any, plus any
/// issue references its message separately closes.
pub fn extract(message: &str) -> (Option<u64>, Vec<crate::explicit::ExplicitMatch>) {
    let pr_number = merge_pr_re()
        .captures(message)
        .and_then(|c| c[1].parse::<u64>().ok());
    (pr_number, crate::explicit::extract(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_github_default_merge_message_pr_number() {
        let (pr, _) = extract("Merge pull request #42 from acme/fix-thing");
        assert_eq!(pr, Some(42));
    }

    #[test]
    fn extracts_issue_reference_inside_merge_message() {
        let (_, issues) = extract("Merge pull request #42 from acme/fix-thing\n\nFixes #7");
        assert_eq!(issues, vec![crate::explicit::ExplicitMatch { number: 7, strong: true }]);
    }

    #[test]
    fn non_merge_message_yields_no_pr_number() {
        let (pr, _) = extract("just a regular commit message");
        assert_eq!(pr, None);
    }
}
