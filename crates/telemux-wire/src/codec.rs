use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Message header: magic (2) + part count (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Per-part header: length (4 bytes, little-endian).
pub const PART_HEADER_SIZE: usize = 4;

/// Magic bytes: "TX" (0x54 0x58).
pub const MAGIC: [u8; 2] = [0x54, 0x58];

/// Default maximum part size: 16 MiB.
pub const DEFAULT_MAX_PART_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum number of parts per message.
pub const DEFAULT_MAX_PARTS: usize = 16;

/// An ordered multipart message.
///
/// Part boundaries are preserved exactly as sent; the codec assigns no
/// meaning to part contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Bytes>,
}

impl Message {
    /// Create a message from owned parts.
    pub fn new(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }

    /// Create a single-part message.
    pub fn single(part: impl Into<Bytes>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// Create a message by copying borrowed slices.
    pub fn from_slices(parts: &[&[u8]]) -> Self {
        Self {
            parts: parts.iter().map(|p| Bytes::copy_from_slice(p)).collect(),
        }
    }

    /// The ordered parts of this message.
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Borrow one part by index.
    pub fn part(&self, index: usize) -> Option<&Bytes> {
        self.parts.get(index)
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the message carries no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The total wire size of this message (headers + parts).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE
            + self
                .parts
                .iter()
                .map(|p| PART_HEADER_SIZE + p.len())
                .sum::<usize>()
    }

    /// Consume the message and return its parts.
    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬──────────────────────────────────┐
/// │ Magic (2B) │ Parts      │ Per part:                        │
/// │ 0x54 0x58  │ (2B LE)    │   Length (4B LE) + Part bytes    │
/// │ "TX"       │            │                                  │
/// └────────────┴────────────┴──────────────────────────────────┘
/// ```
pub fn encode_message(message: &Message, dst: &mut BytesMut, config: &WireConfig) -> Result<()> {
    if message.parts.len() > config.max_parts || message.parts.len() > u16::MAX as usize {
        return Err(WireError::TooManyParts {
            count: message.parts.len(),
            max: config.max_parts.min(u16::MAX as usize),
        });
    }
    for part in &message.parts {
        if part.len() > config.max_part_size {
            return Err(WireError::PartTooLarge {
                size: part.len(),
                max: config.max_part_size,
            });
        }
    }

    dst.reserve(message.wire_size());
    dst.put_slice(&MAGIC);
    dst.put_u16_le(message.parts.len() as u16);
    for part in &message.parts {
        dst.put_u32_le(part.len() as u32);
        dst.put_slice(part);
    }
    Ok(())
}

/// Decode a message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer.
pub fn decode_message(src: &mut BytesMut, config: &WireConfig) -> Result<Option<Message>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    // Check magic
    if src[0..2] != MAGIC {
        return Err(WireError::InvalidMagic);
    }

    let part_count = u16::from_le_bytes([src[2], src[3]]) as usize;
    if part_count > config.max_parts {
        return Err(WireError::TooManyParts {
            count: part_count,
            max: config.max_parts,
        });
    }

    // Walk the part headers without consuming anything until the whole
    // message is buffered.
    let mut lengths = Vec::with_capacity(part_count);
    let mut offset = HEADER_SIZE;
    for _ in 0..part_count {
        if src.len() < offset + PART_HEADER_SIZE {
            return Ok(None); // Need more data
        }
        let len = u32::from_le_bytes([
            src[offset],
            src[offset + 1],
            src[offset + 2],
            src[offset + 3],
        ]) as usize;
        if len > config.max_part_size {
            return Err(WireError::PartTooLarge {
                size: len,
                max: config.max_part_size,
            });
        }
        lengths.push(len);
        offset += PART_HEADER_SIZE + len;
    }
    if src.len() < offset {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let mut parts = Vec::with_capacity(part_count);
    for len in lengths {
        src.advance(PART_HEADER_SIZE);
        parts.push(src.split_to(len).freeze());
    }

    Ok(Some(Message { parts }))
}

/// Configuration for the message codec.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Maximum part size in bytes. Default: 16 MiB.
    pub max_part_size: usize,
    /// Maximum number of parts per message. Default: 16.
    pub max_parts: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_part_size: DEFAULT_MAX_PART_SIZE,
            max_parts: DEFAULT_MAX_PARTS,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
