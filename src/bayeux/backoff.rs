//! Exponential backoff for protocol retries
//!
//! Matches the policy the streaming client uses between failed
//! attempts: 1s initial delay doubling up to a 60s cap, with the delay
//! resetting to the initial value once 100s have passed without a
//! failure. No jitter, no retry limit; the client retries until it is
//! shut down.

use std::time::Duration;
use tokio::time::Instant;

pub(crate) const INITIAL_DELAY: Duration = Duration::from_secs(1);
pub(crate) const MAX_DELAY: Duration = Duration::from_secs(60);
pub(crate) const RESET_WINDOW: Duration = Duration::from_secs(100);

/// Exponential backoff with a quiet-period reset
#[derive(Debug)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    reset_window: Duration,
    current: Duration,
    last_failure: Option<Instant>,
}

impl Backoff {
    pub fn new() -> Self {
        Self::with_policy(INITIAL_DELAY, MAX_DELAY, RESET_WINDOW)
    }

    pub fn with_policy(initial: Duration, max: Duration, reset_window: Duration) -> Self {
        Self {
            initial,
            max,
            reset_window,
            current: initial,
            last_failure: None,
        }
    }

    /// Delay to apply for this failure. Doubles on each call, capped at
    /// the maximum; a quiet period longer than the reset window starts
    /// the progression over.
    pub fn next_delay(&mut self) -> Duration {
        let now = Instant::now();

        if let Some(last) = self.last_failure {
            if now.duration_since(last) > self.reset_window {
                self.current = self.initial;
            }
        }
        self.last_failure = Some(now);

        let delay = self.current;
        self.current = std::cmp::min(self.current * 2, self.max);
        delay
    }
}

#[cfg(test)]
mod backoff_tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff =
            Backoff::with_policy(Duration::from_secs(1), Duration::from_secs(60), RESET_WINDOW);

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
        assert_eq!(backoff.next_delay(), Duration::from_secs(16));
        assert_eq!(backoff.next_delay(), Duration::from_secs(32));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_resets_after_quiet_period() {
        let mut backoff = Backoff::with_policy(
            Duration::from_secs(1),
            Duration::from_secs(60),
            Duration::from_secs(100),
        );

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(101)).await;
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_keeps_progression_inside_window() {
        let mut backoff = Backoff::with_policy(
            Duration::from_secs(1),
            Duration::from_secs(60),
            Duration::from_secs(100),
        );

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }
}
