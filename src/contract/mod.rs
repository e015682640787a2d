//! Annotation surface and contract normalization.
//!
//! [`RawContract`] is the marker exactly as written on the declaration;
//! [`normalize`] resolves placeholders, derives packaging and the reply
//! channel, and validates the contract invariants.

mod normalize;
mod types;

pub use normalize::normalize;
pub use types::{parse_duration, ChannelSpec, Contract, Mode, Packages, RawContract, Resiliency};
