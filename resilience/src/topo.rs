//! Strict ordering guard for the Atomizer.

use coderisk_types::Commit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfOrderCommit {
    pub index: usize,
    pub topological_index: i64,
    pub previous_topological_index: i64,
}

/// Confirms a batch of commits is strictly increasing in
/// `topological_index`, as `commits_pending_atomize` is supposed to
/// guarantee. Returns the first violation found, if any.
pub fn assert_strictly_increasing(commits: &[Commit]) -> Result<(), OutOfOrderCommit> {
    for (i, pair) in commits.windows(2).enumerate() {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.topological_index <= prev.topological_index {
            return Err(OutOfOrderCommit {
                index: i + 1,
                topological_index: cur.topological_index,
                previous_topological_index: prev.topological_index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn commit(topological_index: i64) -> Commit {
        Commit {
            repo_id: Uuid::nil(),
            sha: topological_index.to_string(),
            author: coderisk_types::Identity { name: String::new(), email: String::new(), when: Utc::now() },
            committer: coderisk_types::Identity { name: String::new(), email: String::new(), when: Utc::now() },
            parent_shas: vec![],
            topological_index,
            patches: vec![],
            message: String::new(),
            processed_at: Default::default(),
        }
    }

    #[test]
    fn increasing_sequence_passes() {
        let commits = vec![commit(0), commit(1), commit(2)];
        assert!(assert_strictly_increasing(&commits).is_ok());
    }

    #[test]
    fn repeated_index_is_rejected() {
        let commits = vec![commit(0), commit(0)];
        assert!(assert_strictly_increasing(&commits).is_err());
    }

    #[test]
    fn out_of_order_is_rejected() {
        let commits = vec![commit(2), commit(1)];
        let err = assert_strictly_increasing(&commits).unwrap_err();
        assert_eq!(err.index, 1);
    }

    proptest::proptest! {
        /// ∀ commit c: c.topological_index > max(parent.topological_index)
        /// implies a batch sorted by that index is always
        /// accepted, for any sequence of distinct indices.
        #[test]
        fn any_sorted_distinct_sequence_is_accepted(mut indices in proptest::collection::hash_set(0i64..10_000, 1..50)) {
            let mut sorted: Vec<i64> = indices.drain().collect();
            sorted.sort_unstable();
            let commits: Vec<Commit> = sorted.into_iter().map(commit).collect();
            proptest::prop_assert!(assert_strictly_increasing(&commits).is_ok());
        }

        /// Reversing any sorted sequence of two or more distinct indices
        /// always produces a rejected, out-of-order batch.
        #[test]
        fn any_reversed_distinct_sequence_is_rejected(mut indices in proptest::collection::hash_set(0i64..10_000, 2..50)) {
            let mut sorted: Vec<i64> = indices.drain().collect();
            sorted.sort_unstable();
            sorted.reverse();
            let commits: Vec<Commit> = sorted.into_iter().map(commit).collect();
            proptest::prop_assert!(assert_strictly_increasing(&commits).is_err());
        }
    }
}
