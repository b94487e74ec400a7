//! Bounded exponential backoff with jitter, used by the transport worker's
//! reconnect loop and anywhere else a peer connection needs retrying.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub start: Duration,
    pub cap: Duration,
    /// Jitter as a fraction of the computed delay, e.g. `0.2` for ±20%.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(500),
            cap: Duration::from_secs(5),
            jitter: 0.2,
        }
    }
}

/// Tracks the current delay across repeated failures; doubles on each call
/// to `next_delay` up to `cap`, resets on `reset`.
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current: config.start,
            config,
        }
    }

    /// Returns the jittered delay to wait before the next attempt, then
    /// doubles the underlying delay (capped) for the attempt after that.
    pub fn next_delay(&mut self) -> Duration {
        let jittered = Self::apply_jitter(self.current, self.config.jitter);
        self.current = (self.current * 2).min(self.config.cap);
        jittered
    }

    pub fn reset(&mut self) {
        self.current = self.config.start;
    }

    fn apply_jitter(base: Duration, jitter: f64) -> Duration {
        let mut rng = rand::thread_rng();
        let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
        Duration::from_secs_f64((base.as_secs_f64() * factor).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_cap_even_after_many_failures() {
        let mut backoff = Backoff::new(BackoffConfig {
            start: Duration::from_millis(500),
            cap: Duration::from_secs(5),
            jitter: 0.2,
        });
        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay <= Duration::from_secs_f64(5.0 * 1.2));
        }
    }

    #[test]
    fn reset_returns_to_the_start_delay() {
        let mut backoff = Backoff::new(BackoffConfig {
            start: Duration::from_millis(500),
            cap: Duration::from_secs(5),
            jitter: 0.0,
        });
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn first_delay_is_close_to_start() {
        let mut backoff = Backoff::new(BackoffConfig {
            start: Duration::from_millis(500),
            cap: Duration::from_secs(5),
            jitter: 0.2,
        });
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_millis(400) && delay <= Duration::from_millis(600));
    }
}
