//! Multipart message framing for the telemux telemetry protocol.
//!
//! Every request and reply on the wire is a multipart message framed as:
//! - A 2-byte magic number ("TX") for stream synchronization
//! - A 2-byte little-endian part count
//! - Per part: a 4-byte little-endian length followed by the part bytes
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_message, encode_message, Message, WireConfig, DEFAULT_MAX_PARTS, DEFAULT_MAX_PART_SIZE,
    HEADER_SIZE, MAGIC, PART_HEADER_SIZE,
};
pub use error::{Result, WireError};
pub use reader::MessageReader;
pub use writer::MessageWriter;
