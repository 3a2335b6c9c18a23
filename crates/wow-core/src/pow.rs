//! Challenge generation and verification wrapper around the hashcash engine.

use rand::RngCore;

use crate::error::CoreError;

/// A server-issued opaque challenge: 16 random bytes followed by an 8-byte
/// little-endian unix-nanosecond timestamp. The timestamp is informational
/// only; freshness is bounded by the session's read deadline, not by
/// re-checking the timestamp on verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge([u8; 24]);

impl Challenge {
    /// Generates a fresh challenge using the OS CSPRNG for the random
    /// portion and the current wall-clock time for the timestamp.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes[..16]);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        bytes[16..24].copy_from_slice(&nanos.to_le_bytes());
        Self(bytes)
    }

    /// Borrows the challenge as the byte prefix fed into the hashcash hash.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

impl From<[u8; 24]> for Challenge {
    fn from(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }
}

/// Verifies that `nonce` solves `challenge` at `complexity`.
///
/// # Errors
///
/// Propagates [`wow_hashcash::HashcashError`] on rejection.
pub fn verify(challenge: &Challenge, nonce: &[u8; 8], complexity: u32) -> Result<(), CoreError> {
    wow_hashcash::validate(challenge.as_bytes(), nonce, complexity)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_challenges_are_distinct() {
        let a = Challenge::generate();
        let b = Challenge::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn verify_accepts_a_nonce_that_meets_zero_complexity() {
        let challenge = Challenge::generate();
        let nonce = 0u64.to_le_bytes();
        assert!(verify(&challenge, &nonce, 0).is_ok());
    }

    #[test]
    fn verify_rejects_a_nonce_below_the_target_complexity() {
        let challenge = Challenge::from([0u8; 24]);
        let nonce = 1u64.to_le_bytes();
        let digest = wow_hashcash::hash(challenge.as_bytes(), &nonce);
        let actual = wow_hashcash::count_leading_zero_bits(&digest);
        if actual < wow_hashcash::HASH_OUTPUT_BITS - 1 {
            assert!(verify(&challenge, &nonce, actual + 1).is_err());
        }
    }
}
