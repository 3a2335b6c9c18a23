//! Hashcash error taxonomy.

use thiserror::Error;

/// Errors raised by the validator and the minters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashcashError {
    /// `complexity >= hash_output_bits`; no hash could ever satisfy it.
    #[error("complexity {complexity} meets or exceeds the {hash_output_bits}-bit hash output")]
    ComplexityTooHigh {
        /// The rejected complexity value.
        complexity: u32,
        /// The hash function's output width in bits.
        hash_output_bits: u32,
    },

    /// A nonce was supplied but its hash does not meet the required
    /// leading-zero-bit count.
    #[error("nonce does not satisfy the required complexity")]
    NonceNotValidated,

    /// A minter exhausted its entire search space without finding a nonce.
    #[error("exhausted the nonce space without finding a valid nonce")]
    CollisionNotFound,

    /// The mint was cancelled before it completed.
    #[error("mint cancelled: {0}")]
    Cancelled(String),
}
