//! Generic backoff helpers for the resilience substrate.
//!
//! Two distinct schedules live in this codebase on purpose: `scm-client`'s
//! `retry::with_backoff` retries a single HTTP call within one stage pass
//! (seconds, capped at 5 attempts); this module's [`DLQ_SCHEDULE`] is the
//! much coarser schedule for re-attempting a unit of work that already
//! landed in the DLQ, across separate pipeline runs (minutes to hours).

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Minutes until each DLQ retry attempt, in order. A unit of
/// work that fails a sixth time (`retry_count >= DEAD_AFTER_ATTEMPTS`) is
/// marked dead instead of rescheduled.
pub const DLQ_SCHEDULE_MINUTES: [i64; 5] = [1, 5, 15, 60, 360];
pub const DEAD_AFTER_ATTEMPTS: u32 = 5;

/// Computes the next retry time for a DLQ entry that has already failed
/// `retry_count` times, or `None` once the schedule is exhausted and the
/// entry should be marked dead instead.
pub fn next_attempt_at(retry_count: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let minutes = *DLQ_SCHEDULE_MINUTES.get(retry_count as usize)?;
    Some(now + ChronoDuration::minutes(minutes))
}

pub fn is_dead(retry_count: u32) -> bool {
    retry_count >= DEAD_AFTER_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_follows_the_published_minute_sequence() {
        let now = Utc::now();
        let first = next_attempt_at(0, now).unwrap();
        assert_eq!((first - now).num_minutes(), 1);
        let last = next_attempt_at(4, now).unwrap();
        assert_eq!((last - now).num_minutes(), 360);
    }

    #[test]
    fn sixth_failure_is_dead_not_rescheduled() {
        assert!(next_attempt_at(5, Utc::now()).is_none());
        assert!(is_dead(5));
        assert!(!is_dead(4));
    }
}
