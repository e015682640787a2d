//! Size- and interval-driven message batching.

use std::mem;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::channel::{Channel, ChannelError};

struct Buffer<T> {
    items: Vec<T>,
    /// Bumped on every flush so a stale timer cannot flush a newer batch
    generation: u64,
}

/// Accumulates messages and flushes them downstream as one `Vec<T>`.
///
/// A batch flushes when it reaches `size` messages, or `interval` after its
/// first message, whichever comes first. Messages keep caller order within
/// and across batches. Every flush runs on a dedicated flusher thread, so
/// `send` returns as soon as the message is enqueued and never waits on the
/// wrapped stack.
pub struct BatchChannel<T> {
    buffer: Arc<Mutex<Buffer<T>>>,
    size: usize,
    interval: Option<Duration>,
    flusher: Sender<Vec<T>>,
}

impl<T: Send + 'static> BatchChannel<T> {
    pub fn new(downstream: Arc<dyn Channel<Vec<T>>>, size: u32, interval: Option<Duration>) -> Self {
        let (flusher, queue) = mpsc::channel::<Vec<T>>();
        // one flusher drains batches in order; exits when the channel drops
        thread::spawn(move || {
            for batch in queue {
                debug!(len = batch.len(), "flushing batch");
                if let Err(err) = downstream.send(batch) {
                    warn!(error = %err, "batch flush failed downstream");
                }
            }
        });
        BatchChannel {
            buffer: Arc::new(Mutex::new(Buffer {
                items: Vec::new(),
                generation: 0,
            })),
            size: size.max(1) as usize,
            interval,
            flusher,
        }
    }

    fn arm_timer(&self, generation: u64) {
        let Some(interval) = self.interval else {
            return;
        };
        let buffer = Arc::clone(&self.buffer);
        let flusher = self.flusher.clone();
        thread::spawn(move || {
            thread::sleep(interval);
            let batch = {
                let Ok(mut buf) = buffer.lock() else {
                    return;
                };
                if buf.generation != generation || buf.items.is_empty() {
                    return;
                }
                buf.generation += 1;
                mem::take(&mut buf.items)
            };
            debug!(len = batch.len(), "interval flush");
            let _ = flusher.send(batch);
        });
    }
}

impl<T: Send + 'static> Channel<T> for BatchChannel<T> {
    fn send(&self, message: T) -> Result<(), ChannelError> {
        let (full_batch, armed_generation) = {
            let mut buf = self.buffer.lock().map_err(|_| ChannelError::Closed)?;
            let first_of_batch = buf.items.is_empty();
            buf.items.push(message);
            if buf.items.len() >= self.size {
                buf.generation += 1;
                (Some(mem::take(&mut buf.items)), None)
            } else if first_of_batch {
                (None, Some(buf.generation))
            } else {
                (None, None)
            }
        };
        if let Some(batch) = full_batch {
            debug!(len = batch.len(), "size flush");
            if self.flusher.send(batch).is_err() {
                return Err(ChannelError::Closed);
            }
        }
        if let Some(generation) = armed_generation {
            self.arm_timer(generation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::runtime::QueueChannel;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    #[test]
    fn flushes_when_full() {
        let (queue, rx) = QueueChannel::new();
        let chan = BatchChannel::new(Arc::new(queue), 3, Some(Duration::from_secs(60)));
        chan.send(1).unwrap();
        chan.send(2).unwrap();
        assert!(rx.try_recv().is_err());
        chan.send(3).unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(500)).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn size_flush_returns_before_the_downstream_send() {
        struct Slow {
            delay: Duration,
            delivered: mpsc::Sender<Vec<u8>>,
        }

        impl Channel<Vec<u8>> for Slow {
            fn send(&self, batch: Vec<u8>) -> Result<(), ChannelError> {
                thread::sleep(self.delay);
                self.delivered.send(batch).map_err(|_| ChannelError::Closed)
            }
        }

        let (delivered, rx) = mpsc::channel();
        let chan = BatchChannel::new(
            Arc::new(Slow {
                delay: Duration::from_millis(300),
                delivered,
            }),
            2,
            None,
        );
        chan.send(1).unwrap();
        let start = Instant::now();
        chan.send(2).unwrap();
        assert!(
            start.elapsed() < Duration::from_millis(100),
            "batch-completing send waited on the downstream stack"
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn a_failed_flush_does_not_wedge_later_batches() {
        struct FailFirst {
            failed: AtomicBool,
            delivered: mpsc::Sender<Vec<u8>>,
        }

        impl Channel<Vec<u8>> for FailFirst {
            fn send(&self, batch: Vec<u8>) -> Result<(), ChannelError> {
                if !self.failed.swap(true, Ordering::SeqCst) {
                    return Err(ChannelError::SendFailed("down".to_string()));
                }
                self.delivered.send(batch).map_err(|_| ChannelError::Closed)
            }
        }

        let (delivered, rx) = mpsc::channel();
        let chan = BatchChannel::new(
            Arc::new(FailFirst {
                failed: AtomicBool::new(false),
                delivered,
            }),
            1,
            None,
        );
        chan.send(1).unwrap();
        chan.send(2).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), vec![2]);
    }

    #[test]
    fn flushes_a_partial_batch_after_the_interval() {
        let (queue, rx) = QueueChannel::new();
        let chan = BatchChannel::new(Arc::new(queue), 3, Some(Duration::from_millis(50)));
        chan.send(1).unwrap();
        chan.send(2).unwrap();
        let batch = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(batch, vec![1, 2]);
    }

    #[test]
    fn stale_timer_does_not_reflush() {
        let (queue, rx) = QueueChannel::new();
        let chan = BatchChannel::new(Arc::new(queue), 2, Some(Duration::from_millis(50)));
        // fills and flushes by size before the timer fires
        chan.send(1).unwrap();
        chan.send(2).unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(500)).unwrap(),
            vec![1, 2]
        );
        // next batch starts a new generation; the stale timer must not touch it
        chan.send(3).unwrap();
        std::thread::sleep(Duration::from_millis(70));
        let batch = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(batch, vec![3]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn batches_preserve_caller_order() {
        let (queue, rx) = QueueChannel::new();
        let chan = BatchChannel::new(Arc::new(queue), 2, None);
        for i in 0..6 {
            chan.send(i).unwrap();
        }
        let wait = Duration::from_millis(500);
        assert_eq!(rx.recv_timeout(wait).unwrap(), vec![0, 1]);
        assert_eq!(rx.recv_timeout(wait).unwrap(), vec![2, 3]);
        assert_eq!(rx.recv_timeout(wait).unwrap(), vec![4, 5]);
    }
}
