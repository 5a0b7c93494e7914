//! Binary wire format for the greet protocol.
//!
//! Every message travels as a frame: a u32 little-endian payload length
//! followed by the payload. Request and response payloads both start with a
//! u64 little-endian request id, which is what lets many outstanding requests
//! share one connection.

use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum payload size accepted from a peer (64KB).
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Response status indicating success.
pub const STATUS_OK: u8 = 0;

/// Response status indicating the server rejected the request; the message
/// field carries the failure text.
pub const STATUS_ERROR: u8 = 1;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("insufficient data: needed {needed}, available {available}")]
    InsufficientData { needed: usize, available: usize },
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),
    #[error("string too long: {length} > {max}")]
    StringTooLong { length: usize, max: usize },
}

impl WireError {
    /// True when the error only means "read more bytes first".
    pub fn is_incomplete(&self) -> bool {
        matches!(self, WireError::InsufficientData { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetRequest {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetResponse {
    pub id: u64,
    pub status: u8,
    pub message: String,
}

pub trait Encode {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), WireError>;

    fn encoded_size(&self) -> usize;
}

pub trait Decode: Sized {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, WireError>;
}

fn encode_str(s: &str, buf: &mut BytesMut) -> Result<(), WireError> {
    if s.len() > MAX_FRAME_SIZE as usize {
        return Err(WireError::StringTooLong {
            length: s.len(),
            max: MAX_FRAME_SIZE as usize,
        });
    }
    buf.put_u32_le(s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn decode_str(buf: &mut Cursor<&[u8]>) -> Result<String, WireError> {
    if buf.remaining() < 4 {
        return Err(WireError::InsufficientData {
            needed: 4,
            available: buf.remaining(),
        });
    }
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(WireError::InsufficientData {
            needed: len,
            available: buf.remaining(),
        });
    }
    let start = buf.position() as usize;
    let bytes = &buf.get_ref()[start..start + len];
    let s = std::str::from_utf8(bytes)?.to_string();
    buf.advance(len);
    Ok(s)
}

fn decode_u64(buf: &mut Cursor<&[u8]>) -> Result<u64, WireError> {
    if buf.remaining() < 8 {
        return Err(WireError::InsufficientData {
            needed: 8,
            available: buf.remaining(),
        });
    }
    Ok(buf.get_u64_le())
}

impl Encode for GreetRequest {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), WireError> {
        buf.put_u64_le(self.id);
        encode_str(&self.name, buf)
    }

    fn encoded_size(&self) -> usize {
        8 + 4 + self.name.len()
    }
}

impl Decode for GreetRequest {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, WireError> {
        let id = decode_u64(buf)?;
        let name = decode_str(buf)?;
        Ok(GreetRequest { id, name })
    }
}

impl Encode for GreetResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), WireError> {
        buf.put_u64_le(self.id);
        buf.put_u8(self.status);
        encode_str(&self.message, buf)
    }

    fn encoded_size(&self) -> usize {
        8 + 1 + 4 + self.message.len()
    }
}

impl Decode for GreetResponse {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, WireError> {
        let id = decode_u64(buf)?;
        if buf.remaining() < 1 {
            return Err(WireError::InsufficientData {
                needed: 1,
                available: buf.remaining(),
            });
        }
        let status = buf.get_u8();
        let message = decode_str(buf)?;
        Ok(GreetResponse {
            id,
            status,
            message,
        })
    }
}

/// Encode a message as a complete length-prefixed frame.
pub fn encode_frame<T: Encode>(msg: &T) -> Result<Vec<u8>, WireError> {
    let msg_size = msg.encoded_size();
    let mut buf = BytesMut::with_capacity(4 + msg_size);

    buf.put_u32_le(msg_size as u32);
    msg.encode(&mut buf)?;

    Ok(buf.to_vec())
}

/// Locate the next complete frame at the start of `data`.
///
/// Returns the payload size and a slice of the payload. An
/// `InsufficientData` error means the frame has not fully arrived yet; the
/// caller should read more and retry.
pub fn decode_frame(data: &[u8]) -> Result<(u32, &[u8]), WireError> {
    if data.len() < 4 {
        return Err(WireError::InsufficientData {
            needed: 4,
            available: data.len(),
        });
    }

    let frame_size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);

    if frame_size > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge(frame_size));
    }

    if data.len() < 4 + frame_size as usize {
        return Err(WireError::InsufficientData {
            needed: 4 + frame_size as usize,
            available: data.len(),
        });
    }

    Ok((frame_size, &data[4..4 + frame_size as usize]))
}
