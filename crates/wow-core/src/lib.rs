//! Server-side capability set: PoW service, CPU sampler, complexer, rate
//! limiter, connection manager, and quote source.
//!
//! Each component is a small, independently testable unit; `wow-server`
//! composes them into the per-connection session state machine.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod complexer;
pub mod error;
pub mod limiter;
pub mod manager;
pub mod pow;
pub mod quote;
pub mod sampler;

pub use error::CoreError;
pub use limiter::Limiter;
pub use manager::{ConnectionManager, Stopper};
pub use pow::Challenge;
pub use quote::QuoteSource;
pub use sampler::Sampler;
