//! Circuit breaker with a closed / open / half-open lifecycle.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::channel::{Channel, ChannelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Consecutive-failure circuit breaker.
///
/// Closed until `threshold` consecutive failures, then open for `delay`.
/// After the delay one probe is admitted; its outcome either closes the
/// circuit or re-opens it for another full delay.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    delay: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, delay: Duration) -> Self {
        CircuitBreaker {
            threshold: threshold.max(1),
            delay,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Inner> {
        // a poisoned breaker still holds consistent counters
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.locked().state
    }

    /// Whether a send may proceed right now. Transitions open → half-open
    /// when the delay has elapsed, admitting exactly one probe.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.locked();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => false,
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.delay)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = BreakerState::HalfOpen;
                    info!("circuit breaker admitting probe");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.locked();
        if inner.state != BreakerState::Closed {
            info!("circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.locked();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                warn!("probe failed, circuit breaker re-opened");
            }
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        failures = inner.consecutive_failures,
                        "failure threshold reached, circuit breaker opened"
                    );
                }
            }
            BreakerState::Open => {}
        }
    }
}

/// Channel wrapper guarding its inner layer with a [`CircuitBreaker`].
pub struct BreakerChannel<T> {
    inner: Arc<dyn Channel<T>>,
    breaker: CircuitBreaker,
}

impl<T: Send + Sync> BreakerChannel<T> {
    pub fn new(inner: Arc<dyn Channel<T>>, threshold: u32, delay: Duration) -> Self {
        BreakerChannel {
            inner,
            breaker: CircuitBreaker::new(threshold, delay),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.breaker.state()
    }
}

impl<T: Send + Sync> Channel<T> for BreakerChannel<T> {
    fn send(&self, message: T) -> Result<(), ChannelError> {
        if !self.breaker.try_acquire() {
            return Err(ChannelError::CircuitOpen);
        }
        match self.inner.send(message) {
            Ok(()) => {
                self.breaker.record_success();
                Ok(())
            }
            Err(err) => {
                self.breaker.record_failure();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    struct Switchable {
        healthy: AtomicBool,
    }

    impl Switchable {
        fn down() -> Self {
            Switchable {
                healthy: AtomicBool::new(false),
            }
        }
    }

    impl Channel<u8> for Switchable {
        fn send(&self, _message: u8) -> Result<(), ChannelError> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(ChannelError::SendFailed("down".to_string()))
            }
        }
    }

    #[test]
    fn opens_after_threshold_and_fails_fast() {
        let inner = Arc::new(Switchable::down());
        let chan = BreakerChannel::new(inner, 3, Duration::from_secs(60));
        for _ in 0..3 {
            assert_eq!(
                chan.send(1),
                Err(ChannelError::SendFailed("down".to_string()))
            );
        }
        assert_eq!(chan.state(), BreakerState::Open);
        // message is not attempted while open
        assert_eq!(chan.send(1), Err(ChannelError::CircuitOpen));
    }

    #[test]
    fn probe_after_delay_closes_on_success() {
        let inner = Arc::new(Switchable::down());
        let chan = BreakerChannel::new(inner.clone(), 3, Duration::from_millis(50));
        for _ in 0..3 {
            let _ = chan.send(1);
        }
        assert_eq!(chan.send(1), Err(ChannelError::CircuitOpen));

        thread::sleep(Duration::from_millis(60));
        inner.healthy.store(true, Ordering::SeqCst);
        chan.send(1).unwrap();
        assert_eq!(chan.state(), BreakerState::Closed);
        chan.send(1).unwrap();
    }

    #[test]
    fn failed_probe_reopens_for_a_fresh_delay() {
        let inner = Arc::new(Switchable::down());
        let chan = BreakerChannel::new(inner, 1, Duration::from_millis(40));
        let _ = chan.send(1);
        assert_eq!(chan.state(), BreakerState::Open);

        thread::sleep(Duration::from_millis(50));
        // probe admitted, still failing
        assert_eq!(
            chan.send(1),
            Err(ChannelError::SendFailed("down".to_string()))
        );
        assert_eq!(chan.state(), BreakerState::Open);
        assert_eq!(chan.send(1), Err(ChannelError::CircuitOpen));
    }

    #[test]
    fn success_resets_the_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(1));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
