use std::time::Duration;

use tokio::time::Instant;

/// Countdown owned by exactly one effect slot.
///
/// The timer is a plain deadline rather than a spawned task: it can only fire
/// when its owner polls it, and dropping the owner (or replacing the timer)
/// cancels it. A torn-down session therefore cannot leave a callback behind
/// that later mutates a newer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedTimer {
    started_at: Instant,
    deadline: Instant,
}

impl ScopedTimer {
    /// Start a countdown of `duration` from `now`.
    pub fn start(now: Instant, duration: Duration) -> Self {
        Self {
            started_at: now,
            deadline: now + duration,
        }
    }

    /// Instant at which the timer expires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the countdown has elapsed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Time left before expiry, saturating at zero.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// Full length of the countdown.
    pub fn duration(&self) -> Duration {
        self.deadline - self.started_at
    }
}

/// Sleep until `deadline`, or forever when no timer is armed.
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_is_due_exactly_at_deadline() {
        let now = Instant::now();
        let timer = ScopedTimer::start(now, Duration::from_millis(2_000));

        assert!(!timer.is_due(now + Duration::from_millis(1_999)));
        assert!(timer.is_due(now + Duration::from_millis(2_000)));
        assert_eq!(timer.duration(), Duration::from_millis(2_000));
    }

    #[test]
    fn remaining_saturates_after_expiry() {
        let now = Instant::now();
        let timer = ScopedTimer::start(now, Duration::from_millis(500));

        assert_eq!(
            timer.remaining(now + Duration::from_millis(200)),
            Duration::from_millis(300)
        );
        assert_eq!(timer.remaining(now + Duration::from_secs(5)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_sleeps_to_deadline() {
        let start = Instant::now();
        wait_until(Some(start + Duration::from_millis(750))).await;
        assert_eq!(start.elapsed(), Duration::from_millis(750));
    }
}
