//! Channel demultiplexer for interleaved telemetry sample streams.
//!
//! This is the core value-add layer of telemux. A producer pushes multipart
//! frames at a [`telemux_transport::Endpoint`]; the [`Demultiplexer`] decodes
//! each frame into per-channel sample buffers, forwards them to registered
//! sinks, and tracks the arrival rate. [`DemuxServer`] composes the two into
//! the unit an embedding process instantiates.

pub mod demux;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod rate;
pub mod report;
pub mod server;
pub mod sink;

pub use demux::Demultiplexer;
pub use descriptor::DeviceDescriptor;
pub use error::{DecodeError, DemuxError, DescriptorError, ServerError};
pub use frame::{Frame, CAPACITY_TAG};
pub use rate::RateTracker;
pub use report::{FaultReporter, LogReporter};
pub use server::DemuxServer;
pub use sink::{QueuedSink, SampleSink, SinkEvent};
