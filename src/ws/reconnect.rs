//! Delay policy applied before reconnecting after a connection loss.

use std::time::Duration;

/// Default flat reconnect delay.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default upper bound for exponential backoff.
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// How long to wait before the next connection attempt.
///
/// Attempts never stop on their own; only an explicit disconnect ends the
/// reconnect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Always wait the same delay.
    Fixed(Duration),
    /// Double the delay after each consecutive failure, up to `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound on the delay.
        max: Duration,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Returns the delay before retry number `failures` (0-based count of
    /// consecutive failures since the last successful connection).
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let factor = 2u32.checked_pow(failures.min(31)).unwrap_or(u32::MAX);
                initial.checked_mul(factor).map_or(max, |d| d.min(max))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_never_changes() {
        let policy = ReconnectPolicy::Fixed(Duration::from_millis(250));
        assert_eq!(policy.delay(0), Duration::from_millis(250));
        assert_eq!(policy.delay(40), Duration::from_millis(250));
    }

    #[test]
    fn exponential_doubles_until_capped() {
        let policy = ReconnectPolicy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
        };
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn default_is_flat_five_seconds() {
        assert_eq!(ReconnectPolicy::default().delay(7), DEFAULT_RECONNECT_DELAY);
    }
}
