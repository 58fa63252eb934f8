/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The message header contains an invalid magic number.
    #[error("invalid wire magic (expected 0x5458 \"TX\")")]
    InvalidMagic,

    /// A part exceeds the configured maximum size.
    #[error("part too large ({size} bytes, max {max})")]
    PartTooLarge { size: usize, max: usize },

    /// The message declares more parts than the configured maximum.
    #[error("too many parts ({count}, max {max})")]
    TooManyParts { count: usize, max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
