//! Core channel abstractions shared by generated wrapper stacks.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

/// Failure surfaced by a channel send or request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Circuit breaker is open; the message was not attempted
    CircuitOpen,
    /// No reply arrived within the correlator's wait budget
    ReplyTimeout,
    /// The receiving side is gone
    Closed,
    /// Transport-level failure
    SendFailed(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::CircuitOpen => write!(f, "circuit breaker is open"),
            ChannelError::ReplyTimeout => write!(f, "timed out waiting for a reply"),
            ChannelError::Closed => write!(f, "channel is closed"),
            ChannelError::SendFailed(msg) => write!(f, "send failed: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// A one-way, fire-and-forget message channel.
pub trait Channel<T>: Send + Sync {
    fn send(&self, message: T) -> Result<(), ChannelError>;
}

/// A channel that can also wait for a correlated reply.
pub trait RequestChannel<T, R>: Channel<T> {
    fn request(&self, message: T) -> Result<R, ChannelError>;
}

/// HTTP-shaped outcome returned by generated bridges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 200 with a body.
    pub fn ok(body: T) -> Self {
        ApiResponse {
            status: 200,
            body: Some(body),
        }
    }

    /// 202, message handed to the channel.
    pub fn accepted() -> Self {
        ApiResponse {
            status: 202,
            body: None,
        }
    }

    /// Map a channel failure to its status: 503 while the breaker is open,
    /// 504 on reply timeout, 502 otherwise.
    pub fn failed(err: ChannelError) -> Self {
        let status = match err {
            ChannelError::CircuitOpen => 503,
            ChannelError::ReplyTimeout => 504,
            ChannelError::Closed | ChannelError::SendFailed(_) => 502,
        };
        ApiResponse { status, body: None }
    }
}

/// In-process queue-backed channel, the stand-in transport behind generated
/// base channels.
pub struct QueueChannel<T> {
    tx: Mutex<Sender<T>>,
}

impl<T: Send> QueueChannel<T> {
    /// Create the channel and hand back the inbound end.
    pub fn new() -> (Self, Receiver<T>) {
        let (tx, rx) = mpsc::channel();
        (QueueChannel { tx: Mutex::new(tx) }, rx)
    }
}

impl<T: Send> Channel<T> for QueueChannel<T> {
    fn send(&self, message: T) -> Result<(), ChannelError> {
        let tx = self.tx.lock().map_err(|_| ChannelError::Closed)?;
        tx.send(message).map_err(|_| ChannelError::Closed)
    }
}
