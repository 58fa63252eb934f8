use bytes::Bytes;
use telemux_wire::Message;

use crate::error::DecodeError;

/// Literal first-part tag selecting the capacity-update path.
///
/// The comparison happens on the raw bytes of part 0 before any JSON
/// parsing; a sample frame whose channel list merely *contains* this string
/// still decodes as samples.
pub const CAPACITY_TAG: &[u8] = b"max_plot_points";

const SAMPLE_PARTS: usize = 2;
const CAPACITY_PARTS: usize = 3;

/// One decoded request received over the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Buffer-size hint for every named channel. Carries no samples.
    CapacityUpdate {
        channels: Vec<String>,
        capacity: i64,
    },
    /// Round-robin-interleaved samples for the named channels. The payload
    /// length is an exact multiple of the channel count.
    Samples {
        channels: Vec<String>,
        payload: Vec<f32>,
    },
}

impl Frame {
    /// Decode raw message parts into a typed frame.
    ///
    /// Sample frames are two parts (`[channels-JSON, float32 payload]`);
    /// capacity frames are three (`[tag, channels-JSON, integer]`). The
    /// frame kind is decided by a raw byte comparison of part 0 against
    /// [`CAPACITY_TAG`] before anything else is touched.
    pub fn decode(parts: &[Bytes]) -> Result<Self, DecodeError> {
        match parts.first() {
            Some(first) if first.as_ref() == CAPACITY_TAG => Self::decode_capacity(parts),
            _ => Self::decode_samples(parts),
        }
    }

    fn decode_capacity(parts: &[Bytes]) -> Result<Self, DecodeError> {
        if parts.len() != CAPACITY_PARTS {
            return Err(DecodeError::WrongPartCount {
                kind: "capacity-update",
                expected: CAPACITY_PARTS,
                actual: parts.len(),
            });
        }
        let channels = parse_channels(&parts[1])?;
        let capacity = parse_capacity(&parts[2])?;
        Ok(Frame::CapacityUpdate { channels, capacity })
    }

    fn decode_samples(parts: &[Bytes]) -> Result<Self, DecodeError> {
        if parts.len() != SAMPLE_PARTS {
            return Err(DecodeError::WrongPartCount {
                kind: "sample",
                expected: SAMPLE_PARTS,
                actual: parts.len(),
            });
        }
        let channels = parse_channels(&parts[0])?;
        let payload = parse_samples(&parts[1])?;
        if payload.len() % channels.len() != 0 {
            return Err(DecodeError::PayloadNotDivisible {
                samples: payload.len(),
                channels: channels.len(),
            });
        }
        Ok(Frame::Samples { channels, payload })
    }

    /// The ordered channel names this frame references.
    pub fn channels(&self) -> &[String] {
        match self {
            Frame::CapacityUpdate { channels, .. } => channels,
            Frame::Samples { channels, .. } => channels,
        }
    }

    /// Samples per channel carried by a sample frame.
    pub fn samples_per_channel(&self) -> Option<usize> {
        match self {
            Frame::CapacityUpdate { .. } => None,
            Frame::Samples { channels, payload } => Some(payload.len() / channels.len()),
        }
    }

    /// Reconstruct channel `index`'s time series from the interleaved
    /// payload: offsets `index, index + n, index + 2n, …`.
    pub fn channel_samples(&self, index: usize) -> Vec<f32> {
        match self {
            Frame::CapacityUpdate { .. } => Vec::new(),
            Frame::Samples { channels, payload } => payload
                .iter()
                .skip(index)
                .step_by(channels.len())
                .copied()
                .collect(),
        }
    }

    /// Encode this frame back into wire parts.
    ///
    /// This is the producer side of the protocol; [`Frame::decode`] of the
    /// result yields the frame back.
    pub fn encode(&self) -> Message {
        match self {
            Frame::CapacityUpdate { channels, capacity } => Message::new(vec![
                Bytes::from_static(CAPACITY_TAG),
                encode_channels(channels),
                Bytes::copy_from_slice(&capacity.to_le_bytes()),
            ]),
            Frame::Samples { channels, payload } => {
                let mut raw = Vec::with_capacity(payload.len() * 4);
                for sample in payload {
                    raw.extend_from_slice(&sample.to_le_bytes());
                }
                Message::new(vec![encode_channels(channels), Bytes::from(raw)])
            }
        }
    }
}

fn parse_channels(part: &[u8]) -> Result<Vec<String>, DecodeError> {
    let channels: Vec<String> = serde_json::from_slice(part)?;
    if channels.is_empty() {
        return Err(DecodeError::EmptyChannelList);
    }
    Ok(channels)
}

fn parse_samples(part: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if part.len() % 4 != 0 {
        return Err(DecodeError::PayloadNotFloatAligned { len: part.len() });
    }
    Ok(part
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Parse a little-endian native-width signed integer.
///
/// The reference producer emits 8-byte words and the first element wins
/// when the buffer holds several; a lone 4-byte integer is also accepted.
fn parse_capacity(part: &[u8]) -> Result<i64, DecodeError> {
    match part.len() {
        4 => {
            let mut word = [0u8; 4];
            word.copy_from_slice(part);
            Ok(i64::from(i32::from_le_bytes(word)))
        }
        len if len >= 8 && len % 8 == 0 => {
            let mut word = [0u8; 8];
            word.copy_from_slice(&part[..8]);
            Ok(i64::from_le_bytes(word))
        }
        len => Err(DecodeError::BadCapacityValue { len }),
    }
}

fn encode_channels(channels: &[String]) -> Bytes {
    // A Vec<String> always serializes; fall back to the empty array rather
    // than panicking in the encode path.
    Bytes::from(serde_json::to_vec(channels).unwrap_or_else(|_| b"[]".to_vec()))
}
