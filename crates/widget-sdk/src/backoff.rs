//! Retry backoff — pure exponential delay computation with a ceiling.

use offerpulse_core::config::QueueConfig;
use std::time::Duration;

/// Delay before the next delivery attempt for a batch that has failed
/// `retry_count` times: `initial * 2^retry_count`, saturating at the
/// configured maximum rather than overflowing.
pub fn retry_delay(retry_count: u32, config: &QueueConfig) -> Duration {
    let multiplier = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
    let delay_ms = config
        .initial_retry_delay_ms
        .saturating_mul(multiplier)
        .min(config.max_retry_delay_ms);
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial_ms: u64, max_ms: u64) -> QueueConfig {
        QueueConfig {
            initial_retry_delay_ms: initial_ms,
            max_retry_delay_ms: max_ms,
            ..QueueConfig::default()
        }
    }

    #[test]
    fn test_exponential_until_capped() {
        let cfg = config(1_000, 30_000);
        assert_eq!(retry_delay(0, &cfg), Duration::from_millis(1_000));
        assert_eq!(retry_delay(1, &cfg), Duration::from_millis(2_000));
        assert_eq!(retry_delay(2, &cfg), Duration::from_millis(4_000));
        assert_eq!(retry_delay(4, &cfg), Duration::from_millis(16_000));
        // 1000 * 2^5 = 32000 exceeds the 30000 ceiling
        assert_eq!(retry_delay(5, &cfg), Duration::from_millis(30_000));
    }

    #[test]
    fn test_monotone_nondecreasing() {
        let cfg = config(500, 20_000);
        let mut previous = Duration::ZERO;
        for retry_count in 0..20 {
            let delay = retry_delay(retry_count, &cfg);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(20_000));
            previous = delay;
        }
    }

    #[test]
    fn test_huge_retry_count_saturates() {
        let cfg = config(1_000, 30_000);
        assert_eq!(retry_delay(63, &cfg), Duration::from_millis(30_000));
        assert_eq!(retry_delay(64, &cfg), Duration::from_millis(30_000));
        assert_eq!(retry_delay(u32::MAX, &cfg), Duration::from_millis(30_000));
    }
}
