use std::net::SocketAddr;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A wire-level framing error occurred.
    #[error("wire error: {0}")]
    Wire(#[from] telemux_wire::WireError),

    /// The producer sent no reply where one was required.
    #[error("no acknowledgement received")]
    MissingAck,
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Failure surface of a serve-loop handler.
///
/// Handler failures are reported and the loop continues; they never reach
/// the producer, which already has its acknowledgement.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
