//! Hashcash proof-of-work primitives: the leading-zero-bit validator, the
//! sharded nonce iterator, and the sequential/parallel minters built on it.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod error;
mod minter;
mod nonce_iter;
mod validator;

pub use error::HashcashError;
pub use minter::{mint, mint_single};
pub use nonce_iter::{FastIter, ShardClaimer};
pub use validator::{count_leading_zero_bits, hash, validate, HASH_OUTPUT_BITS};
