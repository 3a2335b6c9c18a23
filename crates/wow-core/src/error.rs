//! Error taxonomy for the PoW service, sampler, complexer, limiter, manager,
//! and quote source.

use thiserror::Error;

/// Errors raised by `wow-core`'s capability set.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Raised by [`crate::pow::verify`] when the supplied nonce does not
    /// satisfy the challenge's complexity.
    #[error(transparent)]
    Hashcash(#[from] wow_hashcash::HashcashError),

    /// A session tried to register with the connection manager after
    /// shutdown had already begun.
    #[error("connection manager is closed")]
    ManagerClosed,
}
