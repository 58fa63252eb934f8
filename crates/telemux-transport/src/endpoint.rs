use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemux_wire::{Message, MessageReader, MessageWriter, WireConfig, WireError};
use tracing::{debug, info, warn};

use crate::error::{HandlerError, Result, TransportError};

/// The fixed acknowledgement sent for every inbound request.
pub const ACK: &[u8] = b"ok";

/// Configuration for a telemetry endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Wire codec limits applied to inbound messages.
    pub wire: WireConfig,
    /// How often blocked accepts/reads wake to observe the stop flag.
    /// This is an internal liveness interval, not a protocol timeout: an
    /// idle producer keeps the loop parked indefinitely.
    pub poll_interval: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            wire: WireConfig::default(),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Requests `serve` to return; cloneable and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request the serve loop to stop after its in-flight iteration.
    /// Idempotent.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A request/reply telemetry ingest endpoint on the loopback interface.
///
/// Producers connect to the advertised port and issue one multipart request
/// at a time; the endpoint replies `ok` to each request before handing the
/// message to the serve handler. The handler's outcome is never sent to the
/// producer; the acknowledgement is the only reply.
pub struct Endpoint {
    listener: TcpListener,
    addr: SocketAddr,
    config: EndpointConfig,
    stop: Arc<AtomicBool>,
}

impl Endpoint {
    /// Bind to an unused ephemeral port on the loopback interface.
    pub fn bind() -> Result<Self> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    }

    /// Bind to an explicit address.
    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_config(addr, EndpointConfig::default())
    }

    /// Bind with explicit configuration.
    pub fn bind_with_config(addr: SocketAddr, config: EndpointConfig) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let addr = listener.local_addr()?;
        // Non-blocking accept lets the serve loop observe the stop flag.
        listener.set_nonblocking(true)?;

        info!(%addr, "telemetry endpoint listening");

        Ok(Self {
            listener,
            addr,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The advertised port number, the only value published outward.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// A handle that stops `serve` from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Run the receive loop until stopped (blocking).
    ///
    /// Producer connections are served one at a time; the strict
    /// request/reply contract admits at most one unprocessed frame. Each
    /// request is acknowledged before `handler` runs, and a handler failure
    /// is reported without dropping the loop. Connection-level I/O failures
    /// close that connection only.
    pub fn serve<H>(&self, mut handler: H) -> Result<()>
    where
        H: FnMut(Message) -> std::result::Result<(), HandlerError>,
    {
        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!(addr = %self.addr, "telemetry endpoint stopped");
                return Ok(());
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "producer connected");
                    if let Err(err) = self.serve_connection(stream, &mut handler) {
                        warn!(%peer, error = %err, "producer connection failed");
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(self.config.poll_interval);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(TransportError::Accept(err)),
            }
        }
    }

    fn serve_connection<H>(&self, stream: TcpStream, handler: &mut H) -> Result<()>
    where
        H: FnMut(Message) -> std::result::Result<(), HandlerError>,
    {
        // The accepted stream inherits no timeouts; a bounded read timeout
        // keeps the loop responsive to the stop flag between requests.
        stream.set_nonblocking(false)?;
        let mut wire = self.config.wire.clone();
        wire.read_timeout = Some(self.config.poll_interval);

        let mut reader = MessageReader::with_config_tcp(stream.try_clone()?, wire.clone())?;
        let mut writer = MessageWriter::with_config_tcp(stream, wire)?;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(());
            }

            let message = match reader.read_message() {
                Ok(message) => message,
                Err(WireError::ConnectionClosed) if reader.is_between_messages() => {
                    debug!("producer disconnected");
                    return Ok(());
                }
                Err(WireError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            // Ack first: the producer must never block on decode/dispatch.
            writer.write_parts(&[ACK])?;

            if let Err(err) = handler(message) {
                warn!(error = %err, "handler failed; frame dropped");
            }
        }
    }
}
