//! DLQ-depth-driven concurrency throttle.
//!
//! The pipeline's default configuration already runs a single worker per
//! repo, so this
//! throttle only matters once a deployment raises a component's pool size
//! above one for cross-repo parallelism. It is a pure function rather
//! than something that reaches into a running pool, so whatever owns the
//! pool (currently nothing in this workspace — see `pipeline`) can call
//! it before spawning the next repo's worker.

/// Depth at which a component's worker pool is throttled down to one,
/// regardless of its configured size.
pub const DLQ_DEPTH_THROTTLE_THRESHOLD: i64 = 50;

/// Returns the pool size a component should actually use this tick, given
/// its configured size and the current DLQ depth for that component.
/// Never returns zero — a throttled component still makes progress, one
/// unit of work at a time, rather than stalling outright.
pub fn throttled_pool_size(configured_pool_size: usize, dlq_depth: i64) -> usize {
    if dlq_depth > DLQ_DEPTH_THROTTLE_THRESHOLD {
        1
    } else {
        configured_pool_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_within_threshold_keeps_configured_size() {
        assert_eq!(throttled_pool_size(8, DLQ_DEPTH_THROTTLE_THRESHOLD), 8);
    }

    #[test]
    fn depth_over_threshold_throttles_to_one() {
        assert_eq!(throttled_pool_size(8, DLQ_DEPTH_THROTTLE_THRESHOLD + 1), 1);
    }

    #[test]
    fn zero_configured_size_still_makes_progress() {
        assert_eq!(throttled_pool_size(0, 0), 1);
    }
}
