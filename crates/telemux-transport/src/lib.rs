//! Loopback request/reply endpoint for telemetry frame ingest.
//!
//! An [`Endpoint`] binds an ephemeral TCP port on the loopback interface and
//! runs a strict request/reply receive loop: every inbound multipart message
//! is acknowledged with a fixed `ok` reply *before* the handler runs, so the
//! producer never observes decode latency as transport latency. The port
//! number is the only value published outward.
//!
//! This is the lowest layer of telemux. The demultiplexer builds on top of
//! the receive loop provided here.

pub mod endpoint;
pub mod error;
pub mod producer;

pub use endpoint::{Endpoint, EndpointConfig, StopHandle, ACK};
pub use error::{HandlerError, Result, TransportError};
pub use producer::Producer;
