//! Request/reply correlation over fire-and-forget channels.

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::channel::{Channel, ChannelError, RequestChannel};
use super::retry::RetryGuard;

/// Lexicographically sortable correlation id (ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(ulid::Ulid);

impl CorrelationId {
    pub fn new() -> Self {
        CorrelationId(ulid::Ulid::new())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        CorrelationId::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CorrelationId(ulid::Ulid::from_str(s)?))
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CorrelationId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A message tagged with its correlation id for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub correlation_id: CorrelationId,
    pub payload: T,
}

/// Ids whose requesters have given up, shared between the correlator and
/// any retry layer carrying envelopes.
///
/// A retry layer installed with this as its guard drops the rest of its
/// schedule for a cancelled envelope. Observing a cancellation consumes the
/// mark; marks for ids no retry loop ever sees stay until the set drops.
#[derive(Clone, Default)]
pub struct Cancellations(Arc<DashMap<CorrelationId, ()>>);

impl Cancellations {
    pub fn new() -> Self {
        Cancellations::default()
    }

    pub fn cancel(&self, id: CorrelationId) {
        self.0.insert(id, ());
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.0.contains_key(id)
    }

    /// Consume the mark for `id`. Returns false when it was never cancelled.
    pub fn take(&self, id: &CorrelationId) -> bool {
        self.0.remove(id).is_some()
    }
}

impl<T: Send + Sync> RetryGuard<Envelope<T>> for Cancellations {
    fn should_retry(&self, message: &Envelope<T>) -> bool {
        !self.take(&message.correlation_id)
    }
}

/// Pairs outgoing messages with their replies.
///
/// `request` tags the message, sends it through the outbound channel and
/// blocks until [`Correlator::complete`] is called with the same id or the
/// wait budget runs out. Replies for unknown or expired ids are dropped.
/// Cancelling a request also marks its id in the shared [`Cancellations`]
/// set so in-flight retry schedules stop re-sending it.
pub struct Correlator<T, R> {
    outbound: Arc<dyn Channel<Envelope<T>>>,
    pending: DashMap<CorrelationId, Sender<R>>,
    cancellations: Cancellations,
    timeout: Duration,
}

impl<T: Send + Sync, R: Send + Sync> Correlator<T, R> {
    pub fn new(outbound: Arc<dyn Channel<Envelope<T>>>, timeout: Duration) -> Self {
        Correlator::with_cancellations(outbound, timeout, Cancellations::new())
    }

    /// Build over an existing cancellation set so it can also be installed
    /// as the retry layer's guard.
    pub fn with_cancellations(
        outbound: Arc<dyn Channel<Envelope<T>>>,
        timeout: Duration,
        cancellations: Cancellations,
    ) -> Self {
        Correlator {
            outbound,
            pending: DashMap::new(),
            cancellations,
            timeout,
        }
    }

    pub fn cancellations(&self) -> Cancellations {
        self.cancellations.clone()
    }

    /// Number of requests currently awaiting a reply.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Deliver the reply for `id`. Returns false when no request is waiting.
    pub fn complete(&self, id: CorrelationId, reply: R) -> bool {
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                // the requester may have timed out between remove and send
                let delivered = tx.send(reply).is_ok();
                if !delivered {
                    debug!(%id, "reply arrived after the requester gave up");
                }
                delivered
            }
            None => {
                warn!(%id, "dropping reply with no pending request");
                false
            }
        }
    }

    /// Forget a pending request and flag its id for in-flight retry layers.
    pub fn cancel(&self, id: CorrelationId) {
        self.pending.remove(&id);
        self.cancellations.cancel(id);
    }
}

impl<T: Send + Sync, R: Send + Sync> Channel<T> for Correlator<T, R> {
    fn send(&self, message: T) -> Result<(), ChannelError> {
        self.outbound.send(Envelope {
            correlation_id: CorrelationId::new(),
            payload: message,
        })
    }
}

impl<T: Send + Sync, R: Send + Sync> RequestChannel<T, R> for Correlator<T, R> {
    fn request(&self, message: T) -> Result<R, ChannelError> {
        let id = CorrelationId::new();
        let (tx, rx) = mpsc::channel();
        self.pending.insert(id, tx);

        if let Err(err) = self.outbound.send(Envelope {
            correlation_id: id,
            payload: message,
        }) {
            self.cancel(id);
            return Err(err);
        }

        match rx.recv_timeout(self.timeout) {
            Ok(reply) => Ok(reply),
            Err(_) => {
                self.cancel(id);
                Err(ChannelError::ReplyTimeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::runtime::QueueChannel;
    use std::thread;

    #[test]
    fn correlation_ids_round_trip_as_strings() {
        let id = CorrelationId::new();
        let parsed: CorrelationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn request_completes_with_the_matching_reply() {
        let (queue, rx) = QueueChannel::new();
        let correlator: Arc<Correlator<String, String>> =
            Arc::new(Correlator::new(Arc::new(queue), Duration::from_secs(5)));

        let responder = Arc::clone(&correlator);
        let pump = thread::spawn(move || {
            let envelope: Envelope<String> = rx.recv().unwrap();
            assert!(responder.complete(
                envelope.correlation_id,
                format!("got {}", envelope.payload)
            ));
        });

        let reply = correlator.request("ping".to_string()).unwrap();
        assert_eq!(reply, "got ping");
        pump.join().unwrap();
        assert_eq!(correlator.pending(), 0);
    }

    #[test]
    fn request_times_out_without_a_reply() {
        let (queue, _rx) = QueueChannel::new();
        let correlator: Correlator<u8, u8> =
            Correlator::new(Arc::new(queue), Duration::from_millis(30));
        assert_eq!(correlator.request(1), Err(ChannelError::ReplyTimeout));
        assert_eq!(correlator.pending(), 0);
    }

    #[test]
    fn unknown_replies_are_dropped() {
        let (queue, _rx) = QueueChannel::new();
        let correlator: Correlator<u8, u8> =
            Correlator::new(Arc::new(queue), Duration::from_secs(1));
        assert!(!correlator.complete(CorrelationId::new(), 9));
    }

    #[test]
    fn cancelling_a_request_stops_its_retry_schedule() {
        use crate::runtime::{FixedBackoff, RetryChannel};
        use std::sync::atomic::{AtomicU32, Ordering};

        struct FailingTap {
            seen: mpsc::Sender<CorrelationId>,
            calls: AtomicU32,
        }

        impl Channel<Envelope<u8>> for FailingTap {
            fn send(&self, message: Envelope<u8>) -> Result<(), ChannelError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let _ = self.seen.send(message.correlation_id);
                Err(ChannelError::SendFailed("down".to_string()))
            }
        }

        let (seen_tx, seen_rx) = mpsc::channel();
        let tap = Arc::new(FailingTap {
            seen: seen_tx,
            calls: AtomicU32::new(0),
        });
        let cancellations = Cancellations::new();
        let retry = RetryChannel::new(
            tap.clone(),
            Arc::new(FixedBackoff::new(Duration::from_millis(30))),
            50,
        )
        .with_guard(Arc::new(cancellations.clone()));
        let correlator: Arc<Correlator<u8, u8>> = Arc::new(Correlator::with_cancellations(
            Arc::new(retry),
            Duration::from_secs(5),
            cancellations,
        ));

        let requester = Arc::clone(&correlator);
        let worker = thread::spawn(move || requester.request(7));

        let id = seen_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("first attempt");
        correlator.cancel(id);

        assert!(worker.join().expect("worker").is_err());
        // the guard sees the cancellation on the next re-attempt check,
        // not fifty attempts later
        assert!(tap.calls.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn fire_and_forget_still_tags_the_envelope() {
        let (queue, rx) = QueueChannel::new();
        let correlator: Correlator<u8, u8> =
            Correlator::new(Arc::new(queue), Duration::from_secs(1));
        correlator.send(42).unwrap();
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.payload, 42);
        assert_eq!(correlator.pending(), 0);
    }
}
