#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Generic retry/backoff and stream-transformation scaffolding consumed by
//! the execution crate's `RetryingClient` and available to any future
//! broker transport built on top of it.
//!
//! - [`backoff::BackoffPolicy`] — exponential backoff with jitter, capped at
//!   a maximum attempt count and delay.
//! - [`stream::Transformer`]/[`stream::TransformedStream`] — wraps a raw
//!   item stream and turns each item into zero, one, or many domain events.

pub mod backoff;
pub mod stream;

pub use backoff::BackoffPolicy;
pub use stream::{TransformedStream, Transformer};
