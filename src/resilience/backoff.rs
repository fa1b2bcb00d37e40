//! Linear backoff between retry attempts.

use std::time::Duration;

/// Delay to wait after the given (1-based) attempt failed.
///
/// Grows by `step_ms` per attempt and is capped at `max_ms`.
pub fn calculate_backoff(attempt: u32, step_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let delay_ms = step_ms.saturating_mul(attempt as u64);
    Duration::from_millis(delay_ms.min(max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 2000, 8000), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 2000, 8000), Duration::from_millis(2000));
        assert_eq!(calculate_backoff(2, 2000, 8000), Duration::from_millis(4000));
        assert_eq!(calculate_backoff(3, 2000, 8000), Duration::from_millis(6000));
        assert_eq!(calculate_backoff(4, 2000, 8000), Duration::from_millis(8000));
        assert_eq!(calculate_backoff(10, 2000, 8000), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_saturates() {
        assert_eq!(calculate_backoff(u32::MAX, u64::MAX, 8000), Duration::from_millis(8000));
    }
}
