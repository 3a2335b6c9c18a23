//! Leading-zero-bit counting and the hashcash validator.

use crate::error::HashcashError;

/// `blake3`'s digest width, in bits.
pub const HASH_OUTPUT_BITS: u32 = 256;

/// `blake3(prefix ∥ nonce)`.
#[must_use]
pub fn hash(prefix: &[u8], nonce: &[u8; 8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(prefix);
    hasher.update(nonce);
    *hasher.finalize().as_bytes()
}

/// Counts leading zero bits byte-wise: each zero byte adds 8, the first
/// non-zero byte adds the zero bits in its most significant bits.
#[must_use]
pub fn count_leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0;
    for &byte in bytes {
        if byte == 0 {
            count += 8;
            continue;
        }
        count += byte.leading_zeros();
        break;
    }
    count
}

/// Validates that `hash(prefix ∥ nonce)` has at least `complexity` leading
/// zero bits. Rejects `complexity >= HASH_OUTPUT_BITS` outright, since no
/// hash could ever satisfy it.
pub fn validate(prefix: &[u8], nonce: &[u8; 8], complexity: u32) -> Result<(), HashcashError> {
    if complexity >= HASH_OUTPUT_BITS {
        return Err(HashcashError::ComplexityTooHigh { complexity, hash_output_bits: HASH_OUTPUT_BITS });
    }
    let digest = hash(prefix, nonce);
    if count_leading_zero_bits(&digest) >= complexity {
        Ok(())
    } else {
        Err(HashcashError::NonceNotValidated)
    }
}
