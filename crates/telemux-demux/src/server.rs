use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use telemux_transport::{Endpoint, EndpointConfig, StopHandle};

use crate::demux::Demultiplexer;
use crate::descriptor::DeviceDescriptor;
use crate::error::ServerError;
use crate::sink::SampleSink;

/// The composed ingest unit: a request/reply endpoint plus a demultiplexer.
///
/// The embedding process binds one per device, registers a sink per
/// descriptor-declared channel, publishes the advertised port to its
/// producer, and runs `serve` on a dedicated thread. Registration is also
/// allowed while serving and takes effect on the next frame.
pub struct DemuxServer {
    endpoint: Endpoint,
    demux: Arc<Mutex<Demultiplexer>>,
}

impl DemuxServer {
    /// Bind an ephemeral loopback port with a default demultiplexer.
    pub fn bind() -> Result<Self, ServerError> {
        Ok(Self::from_parts(Endpoint::bind()?, Demultiplexer::new()))
    }

    /// Bind an explicit address with endpoint configuration.
    pub fn bind_with_config(addr: SocketAddr, config: EndpointConfig) -> Result<Self, ServerError> {
        Ok(Self::from_parts(
            Endpoint::bind_with_config(addr, config)?,
            Demultiplexer::new(),
        ))
    }

    /// Compose from an already-bound endpoint and a prepared demultiplexer.
    pub fn from_parts(endpoint: Endpoint, demux: Demultiplexer) -> Self {
        Self {
            endpoint,
            demux: Arc::new(Mutex::new(demux)),
        }
    }

    /// Register one channel.
    pub fn register(&self, name: impl Into<String>, sink: Box<dyn SampleSink>) {
        self.demux_lock().register(name, sink);
    }

    /// Register every analog input the descriptor declares, building each
    /// channel's sink with `make_sink`.
    pub fn register_descriptor<F>(&self, descriptor: &DeviceDescriptor, mut make_sink: F)
    where
        F: FnMut(&str) -> Box<dyn SampleSink>,
    {
        let mut demux = self.demux_lock();
        for name in descriptor.analog_inputs() {
            demux.register(name.clone(), make_sink(name));
        }
    }

    /// The advertised port number.
    pub fn port(&self) -> u16 {
        self.endpoint.port()
    }

    /// The bound local address.
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// A handle that stops `serve` from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.endpoint.stop_handle()
    }

    /// Shared access to the demultiplexer, e.g. to observe the arrival rate
    /// or register channels while serving.
    pub fn demultiplexer(&self) -> Arc<Mutex<Demultiplexer>> {
        self.demux.clone()
    }

    /// Run the receive-ack-decode-dispatch loop until stopped (blocking).
    ///
    /// Frame-level failures are contained by the demultiplexer and its
    /// fault reporter; only transport-fatal conditions surface here.
    pub fn serve(&self) -> Result<(), ServerError> {
        let demux = self.demux.clone();
        self.endpoint.serve(move |message| {
            lock_demux(&demux).handle(message.parts());
            Ok(())
        })?;
        Ok(())
    }

    fn demux_lock(&self) -> MutexGuard<'_, Demultiplexer> {
        lock_demux(&self.demux)
    }
}

// A poisoned lock still holds a usable registry; recover the guard.
fn lock_demux(demux: &Arc<Mutex<Demultiplexer>>) -> MutexGuard<'_, Demultiplexer> {
    match demux.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
