use std::net::{TcpStream, ToSocketAddrs};

use telemux_wire::{Message, MessageReader, MessageWriter, WireConfig};
use tracing::debug;

use crate::endpoint::ACK;
use crate::error::{Result, TransportError};

/// Client side of the request/reply contract.
///
/// Connects to an endpoint's advertised address and issues one request at a
/// time, reading the single fixed acknowledgement after each send. This is
/// the reference implementation of a producer; acquisition processes follow
/// the same send-then-await-ack discipline.
pub struct Producer {
    reader: MessageReader<TcpStream>,
    writer: MessageWriter<TcpStream>,
}

impl Producer {
    /// Connect to an endpoint with default wire configuration.
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        Self::connect_with_config(addr, WireConfig::default())
    }

    /// Connect with explicit wire configuration.
    pub fn connect_with_config(
        addr: impl ToSocketAddrs + std::fmt::Display,
        config: WireConfig,
    ) -> Result<Self> {
        let addr_str = addr.to_string();
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            addr: addr_str.clone(),
            source,
        })?;
        let reader_stream = stream.try_clone()?;

        debug!(addr = %addr_str, "producer connected to endpoint");

        Ok(Self {
            reader: MessageReader::with_config_tcp(reader_stream, config.clone())?,
            writer: MessageWriter::with_config_tcp(stream, config)?,
        })
    }

    /// Send one request and block for its acknowledgement.
    ///
    /// Returns the reply message; [`Producer::request`] is strict about the
    /// one-reply-per-request contract, so exactly one message is consumed.
    pub fn request(&mut self, message: &Message) -> Result<Message> {
        self.writer.write_message(message)?;
        let reply = self.reader.read_message()?;
        Ok(reply)
    }

    /// Send one request and verify the fixed `ok` acknowledgement.
    pub fn request_acked(&mut self, message: &Message) -> Result<()> {
        let reply = self.request(message)?;
        let acked = reply.len() == 1 && reply.part(0).map(|p| p.as_ref()) == Some(ACK);
        if !acked {
            return Err(TransportError::MissingAck);
        }
        Ok(())
    }
}
