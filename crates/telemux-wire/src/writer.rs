use std::io::{ErrorKind, Write};
use std::net::TcpStream;

use bytes::BytesMut;

use crate::codec::{encode_message, Message, WireConfig};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete multipart messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new message writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new message writer with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and write a complete message (blocking).
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.buf.clear();
        encode_message(message, &mut self.buf, &self.config)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        self.flush()
    }

    /// Encode and write a message built from borrowed slices.
    pub fn write_parts(&mut self, parts: &[&[u8]]) -> Result<()> {
        self.write_message(&Message::from_slices(parts))
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl MessageWriter<TcpStream> {
    /// Create a message writer over a TCP stream and apply the write timeout
    /// from config.
    pub fn with_config_tcp(inner: TcpStream, config: WireConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
