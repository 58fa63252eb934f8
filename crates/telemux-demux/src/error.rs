/// Errors that can occur while decoding a raw frame into a typed one.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The message has the wrong number of parts for its kind.
    #[error("{kind} frame requires {expected} parts, got {actual}")]
    WrongPartCount {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The channel-name part is not a JSON array of strings.
    #[error("invalid channel list: {0}")]
    InvalidChannelList(#[from] serde_json::Error),

    /// The channel list names no channels.
    #[error("empty channel list")]
    EmptyChannelList,

    /// The sample payload length is not a multiple of four bytes.
    #[error("sample payload of {len} bytes is not float32-aligned")]
    PayloadNotFloatAligned { len: usize },

    /// The sample count is not divisible by the channel count.
    #[error("{samples} samples cannot be de-interleaved across {channels} channels")]
    PayloadNotDivisible { samples: usize, channels: usize },

    /// The capacity part is not a little-endian native-width integer.
    #[error("capacity part of {len} bytes is not a little-endian integer")]
    BadCapacityValue { len: usize },
}

/// Errors that can occur while dispatching a decoded frame.
#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    /// Frame-level decode failure.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The frame references a channel that was never registered.
    #[error("unknown channel {0:?}")]
    UnknownChannel(String),
}

/// Errors that can occur while reading a device capability descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// Failed to read the descriptor file.
    #[error("failed to read descriptor {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// The descriptor is not valid JSON or is missing required fields.
    #[error("invalid descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    /// The descriptor declares no analog inputs at all.
    #[error("descriptor declares neither analog_inputs nor num_analog_inputs")]
    NoAnalogInputs,

    /// The declared input list is empty.
    #[error("descriptor declares an empty analog input list")]
    EmptyAnalogInputs,

    /// A channel name appears more than once.
    #[error("duplicate analog input channel {0:?}")]
    DuplicateChannel(String),

    /// The declared count disagrees with the declared name list.
    #[error("num_analog_inputs is {declared} but {named} channels are named")]
    CountMismatch { declared: usize, named: usize },
}

/// Errors produced by the composed demultiplexer server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] telemux_transport::TransportError),

    /// Descriptor-level error.
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}
