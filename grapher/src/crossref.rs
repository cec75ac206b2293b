//! Pattern 5: cross-reference timeline events. GitHub's `cross-referenced` timeline event fires when
//! one issue/PR mentions another without using a closing keyword; such a
//! mention only becomes a link when at least one of explicit, semantic
//! ≥0.50, or temporal ≤5min evidence also backs it, otherwise it is
//! dropped to avoid linking on an incidental mention.

use coderisk_types::TimelineEvent;

pub const CONFIDENCE: f64 = 0.60;

/// Whether the accumulated evidence for a candidate clears the gate a
/// cross-reference-sourced link must pass.
pub fn gate_passes(has_explicit: bool, semantic_score: Option<f64>, has_temporal_5min: bool) -> bool {
    has_explicit || semantic_score.map(|s| s >= 0.50).unwrap_or(false) || has_temporal_5min
}

/// Best-effort extraction of the number a `cross-referenced` event's
/// payload names. GitHub nests it under `source.issue.number` for both
/// issue and PR sources.
pub fn referenced_number(event: &TimelineEvent) -> Option<u64> {
    if !event.is_cross_referenced() {
        return None;
    }
    event
        .payload
        .get("source")
        .and_then(|source| source.get("issue"))
        .and_then(|issue| issue.get("number"))
        .and_then(|n| n.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn gate_passes_on_explicit_alone() {
        assert!(gate_passes(true, None, false));
    }

    #[test]
    fn gate_passes_on_strong_semantic_alone() {
        assert!(gate_passes(false, Some(0.55), false));
    }

    #[test]
    fn gate_rejects_weak_semantic_with_no_other_evidence() {
        assert!(!gate_passes(false, Some(0.40), false));
    }

    #[test]
    fn referenced_number_reads_nested_source_issue_number() {
        let event = TimelineEvent {
            repo_id: Uuid::new_v4(),
            issue_number: 1,
            event_type: "cross-referenced".to_string(),
            actor_email: None,
            created_at: Utc::now(),
            payload: serde_json::json!({ "source": { "issue": { "number": 99 } } }),
        };
        assert_eq!(referenced_number(&event), Some(99));
    }

    #[test]
    fn non_cross_referenced_event_never_yields_a_number() {
        let event = TimelineEvent {
            repo_id: Uuid::new_v4(),
            issue_number: 1,
            event_type: "labeled".to_string(),
            actor_email: None,
            created_at: Utc::now(),
            payload: serde_json::json!({ "source": { "issue": { "number": 99 } } }),
        };
        assert_eq!(referenced_number(&event), None);
    }
}
