use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A code block's co-change partner and how often they change together
/// within the coupling window. Only partners with `co_change_rate >= 0.5`
/// and `co_change_count >= 3` are retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingPartner {
    pub block_id: Uuid,
    pub co_change_count: u32,
    pub co_change_rate: f64,
}

/// The Risk Indexer's per-block output: incident history, staleness,
/// per-developer familiarity, and coupling, folded into one composite
/// score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskIndex {
    pub block_id: Uuid,
    /// Sum of `link.confidence` over every distinct closed-as-completed
    /// issue linked to a commit containing a `BlockChange` on this block —
    /// a weighted count, not a row count.
    pub incident_count: f64,
    pub staleness_days: f64,
    /// Normalised-email -> edit count, restricted to non-refactor changes.
    pub familiarity_map: HashMap<String, u32>,
    /// Number of distinct developers contributing >=10% of this block's
    /// edits. `bus_factor == 1` means one person owns the block.
    pub bus_factor: u32,
    pub coupling: Vec<CouplingPartner>,
    pub risk_score: f64,
    pub computed_at: DateTime<Utc>,
}

/// Fraction of a block's edits a developer must hold to count toward
/// `bus_factor`.
const BUS_FACTOR_THRESHOLD: f64 = 0.10;

impl RiskIndex {
    /// `bus_factor` = number of distinct developers whose share of this
    /// block's (non-refactor) edits is >= 10%.
    pub fn compute_bus_factor(familiarity_map: &HashMap<String, u32>) -> u32 {
        let total: u32 = familiarity_map.values().sum();
        if total == 0 {
            return 0;
        }
        familiarity_map
            .values()
            .filter(|&&count| (count as f64 / total as f64) >= BUS_FACTOR_THRESHOLD)
            .count() as u32
    }

    /// `risk_score = 10*incident_count + 2*avg_coupling_rate +
    ///               min(staleness_days/30, 3) + (bus_factor == 1 ? 2 : 0)`
    ///
    /// A transparent, unbounded weighted sum, not a normalised `[0, 1]`
    /// score. The weights are a starting point for calibration, not a
    /// learned model.
    pub fn compute_score(
        incident_count: f64,
        staleness_days: f64,
        coupling: &[CouplingPartner],
        bus_factor: u32,
    ) -> f64 {
        let avg_coupling_rate = if coupling.is_empty() {
            0.0
        } else {
            coupling.iter().map(|p| p.co_change_rate).sum::<f64>() / coupling.len() as f64
        };
        let staleness_term = (staleness_days / 30.0).min(3.0);
        let bus_factor_term = if bus_factor == 1 { 2.0 } else { 0.0 };

        10.0 * incident_count + 2.0 * avg_coupling_rate + staleness_term + bus_factor_term
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_published_formula() {
        let coupling = vec![
            CouplingPartner { block_id: Uuid::new_v4(), co_change_count: 5, co_change_rate: 0.8 },
            CouplingPartner { block_id: Uuid::new_v4(), co_change_count: 4, co_change_rate: 0.6 },
        ];
        let score = RiskIndex::compute_score(2.5, 45.0, &coupling, 1);
        // 10*2.5 + 2*0.7 + min(1.5, 3) + 2
        assert_eq!(score, 25.0 + 1.4 + 1.5 + 2.0);
    }

    #[test]
    fn untouched_block_with_no_history_scores_zero() {
        let score = RiskIndex::compute_score(0.0, 0.0, &[], 0);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn staleness_term_saturates_at_three() {
        let score = RiskIndex::compute_score(0.0, 10_000.0, &[], 0);
        assert_eq!(score, 3.0);
    }

    #[test]
    fn bus_factor_of_one_adds_fixed_penalty() {
        let mut solo = HashMap::new();
        solo.insert("a@example.com".to_string(), 10);
        assert_eq!(RiskIndex::compute_bus_factor(&solo), 1);

        let mut shared = HashMap::new();
        shared.insert("a@example.com".to_string(), 5);
        shared.insert("b@example.com".to_string(), 5);
        assert_eq!(RiskIndex::compute_bus_factor(&shared), 2);
    }

    #[test]
    fn minority_contributor_does_not_count_toward_bus_factor() {
        let mut familiarity = HashMap::new();
        familiarity.insert("a@example.com".to_string(), 95);
        familiarity.insert("b@example.com".to_string(), 5);
        assert_eq!(RiskIndex::compute_bus_factor(&familiarity), 1);
    }
}
