//! Retry policies and the retrying channel wrapper.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use super::channel::{Channel, ChannelError};

/// Backoff schedule for a retrying channel.
///
/// `next_delay` returns the wait before attempt `attempt` (1-based, counting
/// re-attempts only). Returning a zero duration ends the schedule.
pub trait RetryPolicy: Send + Sync {
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Constant delay between attempts. Defaults to 500ms.
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        FixedBackoff { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        FixedBackoff::new(Duration::from_millis(500))
    }
}

impl RetryPolicy for FixedBackoff {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubling delay starting at 200ms, capped at 5s.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    cap: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        ExponentialBackoff { initial, cap }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        ExponentialBackoff::new(Duration::from_millis(200), Duration::from_secs(5))
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(63);
        let delay = self
            .initial
            .checked_mul(1u32 << shift.min(31))
            .unwrap_or(self.cap);
        delay.min(self.cap)
    }
}

/// Consulted before every re-attempt. Returning false drops the rest of the
/// schedule for that message.
pub trait RetryGuard<T>: Send + Sync {
    fn should_retry(&self, message: &T) -> bool;
}

/// Re-sends through the wrapped channel until it succeeds or the attempt
/// budget is spent. `max_retries <= 0` retries until the policy's schedule
/// ends, or until the guard withdraws the message.
pub struct RetryChannel<T> {
    inner: Arc<dyn Channel<T>>,
    policy: Arc<dyn RetryPolicy>,
    max_retries: i32,
    guard: Option<Arc<dyn RetryGuard<T>>>,
}

impl<T: Clone + Send + Sync> RetryChannel<T> {
    pub fn new(inner: Arc<dyn Channel<T>>, policy: Arc<dyn RetryPolicy>, max_retries: i32) -> Self {
        RetryChannel {
            inner,
            policy,
            max_retries,
            guard: None,
        }
    }

    /// Install a guard that can abandon the schedule mid-flight, e.g. when
    /// the requester behind a correlated message has given up.
    pub fn with_guard(mut self, guard: Arc<dyn RetryGuard<T>>) -> Self {
        self.guard = Some(guard);
        self
    }
}

impl<T: Clone + Send + Sync> Channel<T> for RetryChannel<T> {
    fn send(&self, message: T) -> Result<(), ChannelError> {
        let mut attempt: u32 = 0;
        loop {
            match self.inner.send(message.clone()) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    // maxRetries=N allows the original send plus N re-sends
                    if self.max_retries > 0 && attempt > self.max_retries as u32 {
                        return Err(err);
                    }
                    let delay = self.policy.next_delay(attempt);
                    if delay.is_zero() {
                        return Err(err);
                    }
                    warn!(attempt, error = %err, "send failed, retrying");
                    thread::sleep(delay);
                    if let Some(guard) = &self.guard {
                        if !guard.should_retry(&message) {
                            warn!(attempt, "retry schedule abandoned");
                            return Err(err);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    struct FailNTimes {
        failures: AtomicU32,
        calls: AtomicU32,
    }

    impl FailNTimes {
        fn new(failures: u32) -> Self {
            FailNTimes {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Channel<u8> for FailNTimes {
        fn send(&self, _message: u8) -> Result<(), ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                Err(ChannelError::SendFailed("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn retries_until_success() {
        let inner = Arc::new(FailNTimes::new(2));
        let chan = RetryChannel::new(
            inner.clone(),
            Arc::new(FixedBackoff::new(Duration::from_millis(10))),
            3,
        );
        chan.send(1).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_budget() {
        let inner = Arc::new(FailNTimes::new(10));
        let chan = RetryChannel::new(
            inner.clone(),
            Arc::new(FixedBackoff::new(Duration::from_millis(1))),
            2,
        );
        assert!(chan.send(1).is_err());
        // original attempt plus two retries
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn waits_between_attempts() {
        let inner = Arc::new(FailNTimes::new(2));
        let chan = RetryChannel::new(
            inner,
            Arc::new(FixedBackoff::new(Duration::from_millis(10))),
            2,
        );
        let start = Instant::now();
        chan.send(1).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn guard_withdrawal_ends_the_schedule() {
        struct AllowN(AtomicU32);

        impl RetryGuard<u8> for AllowN {
            fn should_retry(&self, _message: &u8) -> bool {
                self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            }
        }

        let inner = Arc::new(FailNTimes::new(50));
        let chan = RetryChannel::new(
            inner.clone(),
            Arc::new(FixedBackoff::new(Duration::from_millis(1))),
            10,
        )
        .with_guard(Arc::new(AllowN(AtomicU32::new(1))));
        assert!(chan.send(1).is_err());
        // original attempt, one guarded retry, then the guard withdraws
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exponential_schedule_doubles_and_caps() {
        let p = ExponentialBackoff::default();
        assert_eq!(p.next_delay(1), Duration::from_millis(200));
        assert_eq!(p.next_delay(2), Duration::from_millis(400));
        assert_eq!(p.next_delay(3), Duration::from_millis(800));
        assert_eq!(p.next_delay(10), Duration::from_secs(5));
    }

    #[test]
    fn fixed_default_is_half_a_second() {
        assert_eq!(
            FixedBackoff::default().next_delay(7),
            Duration::from_millis(500)
        );
    }
}
