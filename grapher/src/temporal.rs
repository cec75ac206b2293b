//! Pattern 2: proximity between an issue's `completed` close and a
//! commit/PR landing nearby in time. Issues closed `not_planned`/`wontfix` never reach this
//! pattern — callers filter on [`coderisk_types::CloseReason::eligible_for_temporal_pattern`]
//! before calling in.

use chrono::{DateTime, Utc};

pub const TAG_5MIN: &str = "temporal_5min";
pub const TAG_1HR: &str = "temporal_1hr";
pub const TAG_24HR: &str = "temporal_24hr";

/// Classifies how close `event_at` landed to `closed_at`, returning the
/// tag and base confidence for that window, or `None` if it falls outside
/// all three.
pub fn classify(closed_at: DateTime<Utc>, event_at: DateTime<Utc>) -> Option<(&'static str, f64)> {
    let delta = (closed_at - event_at).num_seconds().abs();
    if delta <= 5 * 60 {
        Some((TAG_5MIN, 0.75))
    } else if delta <= 60 * 60 {
        Some((TAG_1HR, 0.65))
    } else if delta <= 24 * 60 * 60 {
        Some((TAG_24HR, 0.55))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn within_five_minutes_is_the_strongest_bucket() {
        let closed = Utc::now();
        let event = closed - Duration::minutes(3);
        assert_eq!(classify(closed, event), Some((TAG_5MIN, 0.75)));
    }

    #[test]
    fn within_one_hour_but_past_five_minutes() {
        let closed = Utc::now();
        let event = closed - Duration::minutes(40);
        assert_eq!(classify(closed, event), Some((TAG_1HR, 0.65)));
    }

    #[test]
    fn within_one_day_but_past_one_hour() {
        let closed = Utc::now();
        let event = closed - Duration::hours(10);
        assert_eq!(classify(closed, event), Some((TAG_24HR, 0.55)));
    }

    #[test]
    fn beyond_one_day_is_rejected() {
        let closed = Utc::now();
        let event = closed - Duration::days(3);
        assert_eq!(classify(closed, event), None);
    }

    #[test]
    fn direction_does_not_matter() {
        let closed = Utc::now();
        let event = closed + Duration::minutes(2);
        assert_eq!(classify(closed, event), Some((TAG_5MIN, 0.75)));
    }
}
