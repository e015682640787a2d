//! Dead-letter diversion wrapper.

use std::sync::Arc;

use tracing::warn;

use super::channel::{Channel, ChannelError};

/// Forwards failed messages to a dead-letter channel instead of surfacing
/// the failure.
///
/// Wraps the whole recovery chain: only messages the inner stack could not
/// deliver after its own retries reach the dead-letter channel. The caller
/// observes success once the message lands on either channel.
pub struct DeadLetterChannel<T> {
    inner: Arc<dyn Channel<T>>,
    dead: Arc<dyn Channel<T>>,
    dlq_name: String,
}

impl<T: Clone + Send + Sync> DeadLetterChannel<T> {
    pub fn new(inner: Arc<dyn Channel<T>>, dead: Arc<dyn Channel<T>>, dlq_name: &str) -> Self {
        DeadLetterChannel {
            inner,
            dead,
            dlq_name: dlq_name.to_string(),
        }
    }
}

impl<T: Clone + Send + Sync> Channel<T> for DeadLetterChannel<T> {
    fn send(&self, message: T) -> Result<(), ChannelError> {
        match self.inner.send(message.clone()) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(dlq = %self.dlq_name, error = %err, "delivery exhausted, diverting to dead-letter channel");
                self.dead.send(message)
            }
        }
    }
}
