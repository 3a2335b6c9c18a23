//! Wire schema: the four message payloads, each encoded as a minimal
//! Protocol Buffers proto3-wire-format message (tag/varint/length-delimited).
//! Any proto3-wire-compatible decoder can read these bytes; we hand-roll the
//! encode/decode since the message set is four small, fixed shapes.

use crate::error::WireError;

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, WireError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*pos).ok_or(WireError::TruncatedMessage)?;
        *pos += 1;
        if shift >= 63 && byte > 1 {
            return Err(WireError::VarintTooLong);
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 70 {
            return Err(WireError::VarintTooLong);
        }
    }
    Ok(result)
}

fn write_tag(out: &mut Vec<u8>, field_number: u32, wire_type: u32) {
    write_varint(out, u64::from((field_number << 3) | wire_type));
}

/// proto3 omits fields holding their type's zero value.
fn write_bytes_field(out: &mut Vec<u8>, field_number: u32, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    write_tag(out, field_number, 2);
    write_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

fn write_varint_field(out: &mut Vec<u8>, field_number: u32, value: u64) {
    if value == 0 {
        return;
    }
    write_tag(out, field_number, 0);
    write_varint(out, value);
}

fn read_length_delimited<'b>(buf: &'b [u8], pos: &mut usize) -> Result<&'b [u8], WireError> {
    let len = read_varint(buf, pos)? as usize;
    let end = pos.checked_add(len).ok_or(WireError::TruncatedMessage)?;
    let slice = buf.get(*pos..end).ok_or(WireError::TruncatedMessage)?;
    *pos = end;
    Ok(slice)
}

fn skip_field(buf: &[u8], pos: &mut usize, wire_type: u32) -> Result<(), WireError> {
    match wire_type {
        0 => {
            read_varint(buf, pos)?;
        },
        2 => {
            read_length_delimited(buf, pos)?;
        },
        other => return Err(WireError::UnsupportedWireType(other as u8)),
    }
    Ok(())
}

/// Returns the next field's `(field_number, wire_type)`, or `None` at the
/// end of the buffer.
fn next_field(buf: &[u8], pos: &mut usize) -> Result<Option<(u32, u32)>, WireError> {
    if *pos >= buf.len() {
        return Ok(None);
    }
    let tag = read_varint(buf, pos)?;
    Ok(Some(((tag >> 3) as u32, (tag & 0x7) as u32)))
}

/// Data-frame type-ids from §6's wire message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeId {
    /// `ServerHandshake`.
    ServerHandshake,
    /// `ClientHandshake`.
    ClientHandshake,
    /// `WoWRequest`.
    WoWRequest,
    /// `WoWResponse`.
    WoWResponse,
}

impl TypeId {
    /// Encodes as the `u16` carried in the frame header's `PayloadType`.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::ServerHandshake => 1,
            Self::ClientHandshake => 2,
            Self::WoWRequest => 3,
            Self::WoWResponse => 4,
        }
    }

    /// Looks up a type-id by its wire value.
    pub fn from_u16(value: u16) -> Result<Self, WireError> {
        match value {
            1 => Ok(Self::ServerHandshake),
            2 => Ok(Self::ClientHandshake),
            3 => Ok(Self::WoWRequest),
            4 => Ok(Self::WoWResponse),
            other => Err(WireError::UnknownTypeId(other)),
        }
    }
}

/// `S→C`, first message of a session: the challenge and the difficulty the
/// client must meet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandshake {
    /// 24-byte opaque challenge (see §3).
    pub challenge: Vec<u8>,
    /// Required leading-zero-bit count.
    pub complexity: u32,
}

impl ServerHandshake {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_bytes_field(&mut out, 1, &self.challenge);
        write_varint_field(&mut out, 2, u64::from(self.complexity));
        out
    }

    fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut challenge = Vec::new();
        let mut complexity = 0u32;
        let mut pos = 0;
        while let Some((field, wire_type)) = next_field(buf, &mut pos)? {
            match (field, wire_type) {
                (1, 2) => challenge = read_length_delimited(buf, &mut pos)?.to_vec(),
                (2, 0) => complexity = read_varint(buf, &mut pos)? as u32,
                (_, wt) => skip_field(buf, &mut pos, wt)?,
            }
        }
        Ok(Self { challenge, complexity })
    }
}

/// `C→S`, the client's proof-of-work nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandshake {
    /// 8-byte little-endian nonce.
    pub nonce: Vec<u8>,
}

impl ClientHandshake {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_bytes_field(&mut out, 1, &self.nonce);
        out
    }

    fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut nonce = Vec::new();
        let mut pos = 0;
        while let Some((field, wire_type)) = next_field(buf, &mut pos)? {
            match (field, wire_type) {
                (1, 2) => nonce = read_length_delimited(buf, &mut pos)?.to_vec(),
                (_, wt) => skip_field(buf, &mut pos, wt)?,
            }
        }
        Ok(Self { nonce })
    }
}

/// `C→S`, requests the quote once verified. Carries no fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WoWRequest;

impl WoWRequest {
    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut pos = 0;
        while let Some((_, wire_type)) = next_field(buf, &mut pos)? {
            skip_field(buf, &mut pos, wire_type)?;
        }
        Ok(Self)
    }
}

/// `S→C`, the quote itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WoWResponse {
    /// The quotation text.
    pub wow: String,
}

impl WoWResponse {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_bytes_field(&mut out, 1, self.wow.as_bytes());
        out
    }

    fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut wow = String::new();
        let mut pos = 0;
        while let Some((field, wire_type)) = next_field(buf, &mut pos)? {
            match (field, wire_type) {
                (1, 2) => {
                    let bytes = read_length_delimited(buf, &mut pos)?;
                    wow = String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)?;
                },
                (_, wt) => skip_field(buf, &mut pos, wt)?,
            }
        }
        Ok(Self { wow })
    }
}

/// Any of the four protocol messages, paired with the type-id that must
/// accompany it in the frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// See [`ServerHandshake`].
    ServerHandshake(ServerHandshake),
    /// See [`ClientHandshake`].
    ClientHandshake(ClientHandshake),
    /// See [`WoWRequest`].
    WoWRequest(WoWRequest),
    /// See [`WoWResponse`].
    WoWResponse(WoWResponse),
}

impl Message {
    /// The type-id this message must be framed with.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::ServerHandshake(_) => TypeId::ServerHandshake,
            Self::ClientHandshake(_) => TypeId::ClientHandshake,
            Self::WoWRequest(_) => TypeId::WoWRequest,
            Self::WoWResponse(_) => TypeId::WoWResponse,
        }
    }

    /// Encodes the message body (without the frame header).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::ServerHandshake(m) => m.encode(),
            Self::ClientHandshake(m) => m.encode(),
            Self::WoWRequest(m) => m.encode(),
            Self::WoWResponse(m) => m.encode(),
        }
    }

    /// Decodes a message body given the type-id carried by its frame header.
    pub fn decode(type_id: TypeId, buf: &[u8]) -> Result<Self, WireError> {
        Ok(match type_id {
            TypeId::ServerHandshake => Self::ServerHandshake(ServerHandshake::decode(buf)?),
            TypeId::ClientHandshake => Self::ClientHandshake(ClientHandshake::decode(buf)?),
            TypeId::WoWRequest => Self::WoWRequest(WoWRequest::decode(buf)?),
            TypeId::WoWResponse => Self::WoWResponse(WoWResponse::decode(buf)?),
        })
    }
}
