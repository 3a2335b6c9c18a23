//! TLV frame header: op-code, flags, and the optional size/type fields.
//!
//! Unlike a fixed-size binary record, this header is 2, 6, or 8 bytes on the
//! wire depending on its op-code and flags, so it is read and written
//! directly against an async stream rather than cast from a byte buffer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;

const FLAG_HAS_PAYLOAD: u8 = 0b1000_0000;
const FLAG_HAS_PAYLOAD_TYPE: u8 = 0b0100_0000;
const RESERVED_FLAG_BITS: u8 = !(FLAG_HAS_PAYLOAD | FLAG_HAS_PAYLOAD_TYPE);
const RESERVED_OPCODE_BITS: u8 = 0xF0;
const CONTROL_BIT: u8 = 0x08;

/// Frame op-code. Control op-codes (`Close`, `Ping`, `Pong`) have bit 3 set
/// and never carry a payload; `Data` is the only op-code that does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Carries a length-delimited, typed payload.
    Data,
    /// Initiates or acknowledges a half-close.
    Close,
    /// Liveness probe; the transport answers with `Pong` automatically.
    Ping,
    /// Liveness reply.
    Pong,
}

impl OpCode {
    const DATA: u8 = 0x1;
    const CLOSE: u8 = 0x8;
    const PING: u8 = 0x9;
    const PONG: u8 = 0xa;

    fn from_nibble(nibble: u8) -> Result<Self, WireError> {
        match nibble {
            Self::DATA => Ok(Self::Data),
            Self::CLOSE => Ok(Self::Close),
            Self::PING => Ok(Self::Ping),
            Self::PONG => Ok(Self::Pong),
            _ => Err(WireError::MalformedHeader),
        }
    }

    fn to_nibble(self) -> u8 {
        match self {
            Self::Data => Self::DATA,
            Self::Close => Self::CLOSE,
            Self::Ping => Self::PING,
            Self::Pong => Self::PONG,
        }
    }

    /// Control op-codes are handled internally by the transport and never
    /// carry a payload.
    #[must_use]
    pub fn is_control(self) -> bool {
        self.to_nibble() & CONTROL_BIT != 0
    }
}

/// A decoded frame header. `payload_type` reads as `0` ("absent") whenever
/// `HasPayloadType` was not set on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    opcode: OpCode,
    payload_size: u32,
    payload_type: u16,
    has_payload_type: bool,
}

impl FrameHeader {
    /// Builds a control-frame header (`Close`, `Ping`, or `Pong`).
    ///
    /// # Panics
    ///
    /// Panics if `opcode` is `Data`; control headers and data headers are
    /// constructed through distinct constructors so an invalid combination
    /// can never reach the wire.
    #[must_use]
    pub fn control(opcode: OpCode) -> Self {
        assert!(opcode.is_control(), "control header built with a data opcode");
        Self { opcode, payload_size: 0, payload_type: 0, has_payload_type: false }
    }

    /// Builds a `Data` header for a payload of `payload_size` bytes.
    /// `payload_type` of `0` means "absent" and is encoded without the
    /// `HasPayloadType` flag, per invariant 6.
    #[must_use]
    pub fn data(payload_size: u32, payload_type: u16) -> Self {
        Self { opcode: OpCode::Data, payload_size, payload_type, has_payload_type: payload_type != 0 }
    }

    /// The frame's op-code.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Whether this header carries a payload (true only for `Data`).
    #[must_use]
    pub fn has_payload(&self) -> bool {
        !self.opcode.is_control()
    }

    /// Declared payload length; `0` for control frames.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    /// Payload type-id; `0` if absent.
    #[must_use]
    pub fn payload_type(&self) -> u16 {
        self.payload_type
    }
}

/// Reads one frame header off `stream`: 2 bytes for control frames, 6 or 8
/// for data frames depending on whether `HasPayloadType` is set.
pub async fn read_frame_header<R>(stream: &mut R) -> Result<FrameHeader, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 2];
    stream.read_exact(&mut prefix).await?;
    let [byte0, byte1] = prefix;

    if byte0 & RESERVED_OPCODE_BITS != 0 || byte1 & RESERVED_FLAG_BITS != 0 {
        return Err(WireError::MalformedHeader);
    }

    let opcode = OpCode::from_nibble(byte0 & 0x0F)?;
    let has_payload = byte1 & FLAG_HAS_PAYLOAD != 0;
    let has_payload_type = byte1 & FLAG_HAS_PAYLOAD_TYPE != 0;

    if opcode.is_control() {
        if has_payload || has_payload_type {
            return Err(WireError::MalformedHeader);
        }
        return Ok(FrameHeader::control(opcode));
    }

    if !has_payload {
        return Err(WireError::MalformedHeader);
    }

    let mut size_bytes = [0u8; 4];
    stream.read_exact(&mut size_bytes).await?;
    let payload_size = u32::from_be_bytes(size_bytes);

    let payload_type = if has_payload_type {
        let mut type_bytes = [0u8; 2];
        stream.read_exact(&mut type_bytes).await?;
        u16::from_be_bytes(type_bytes)
    } else {
        0
    };

    Ok(FrameHeader { opcode, payload_size, payload_type, has_payload_type })
}

/// Writes `header` to `stream`: the mirror image of [`read_frame_header`].
pub async fn write_frame_header<W>(stream: &mut W, header: &FrameHeader) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let byte0 = header.opcode.to_nibble();

    if header.opcode.is_control() {
        stream.write_all(&[byte0, 0]).await?;
        return Ok(());
    }

    let mut byte1 = FLAG_HAS_PAYLOAD;
    if header.has_payload_type {
        byte1 |= FLAG_HAS_PAYLOAD_TYPE;
    }

    let mut out = Vec::with_capacity(8);
    out.push(byte0);
    out.push(byte1);
    out.extend_from_slice(&header.payload_size.to_be_bytes());
    if header.has_payload_type {
        out.extend_from_slice(&header.payload_type.to_be_bytes());
    }
    stream.write_all(&out).await?;
    Ok(())
}
