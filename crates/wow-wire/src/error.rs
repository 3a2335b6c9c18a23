//! Wire-level error taxonomy: malformed frame headers and malformed messages.

use thiserror::Error;

/// Errors raised while decoding or encoding the TLV frame header or a wire
/// message payload.
#[derive(Debug, Error)]
pub enum WireError {
    /// Reserved header bits were non-zero, an unknown op-code nibble was
    /// seen, or a flag/op-code combination violates the framing rules (a
    /// control frame carrying a payload flag, or a data frame missing one).
    #[error("malformed frame header")]
    MalformedHeader,

    /// A message field's wire-tag named an unsupported wire type.
    #[error("malformed message: unsupported wire type {0}")]
    UnsupportedWireType(u8),

    /// A length-delimited field or varint ran past the end of the buffer.
    #[error("malformed message: truncated field")]
    TruncatedMessage,

    /// A `WoWResponse.wow` field was not valid UTF-8.
    #[error("malformed message: invalid utf-8 in string field")]
    InvalidUtf8,

    /// A varint used more than 10 bytes (the most a 64-bit varint ever needs).
    #[error("malformed message: varint too long")]
    VarintTooLong,

    /// A data frame's `payload_type` did not name one of the four known
    /// message types.
    #[error("unknown message type-id {0}")]
    UnknownTypeId(u16),

    /// The stream ended or errored while reading or writing.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
