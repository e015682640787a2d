//! Runtime support the generated sources link against.
//!
//! Generated wrapper stacks are thin structs over these combinators, so the
//! resiliency semantics live here once instead of being re-rendered into
//! every project.

pub mod batch;
pub mod breaker;
pub mod channel;
pub mod correlator;
pub mod dlq;
pub mod retry;

pub use batch::BatchChannel;
pub use breaker::{BreakerChannel, BreakerState, CircuitBreaker};
pub use channel::{ApiResponse, Channel, ChannelError, QueueChannel, RequestChannel};
pub use correlator::{Cancellations, CorrelationId, Correlator, Envelope};
pub use dlq::DeadLetterChannel;
pub use retry::{ExponentialBackoff, FixedBackoff, RetryChannel, RetryGuard, RetryPolicy};
