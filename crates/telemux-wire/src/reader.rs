use std::io::{ErrorKind, Read};
use std::net::TcpStream;

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_message, Message, WireConfig};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete multipart messages from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete messages.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` when EOF is reached.
    /// A read timeout on the underlying stream surfaces as
    /// `WireError::Io` with kind `WouldBlock`/`TimedOut`; buffered partial
    /// data is retained, so the call can simply be retried.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = decode_message(&mut self.buf, &self.config)? {
                trace!(parts = message.len(), "message received");
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(WireError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// True when no partial message bytes are buffered.
    ///
    /// EOF in this state is a clean disconnect rather than truncation.
    pub fn is_between_messages(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl MessageReader<TcpStream> {
    /// Create a message reader over a TCP stream and apply the read timeout
    /// from config.
    pub fn with_config_tcp(inner: TcpStream, config: WireConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
