use tracing::warn;

use crate::error::DemuxError;

/// Diagnostic-event capability injected into the demultiplexer.
///
/// Frame failures are invisible to the producer (its acknowledgement has
/// already gone out), so this is the only place they surface. The embedding
/// process supplies whatever observability sink it has; the default
/// forwards to `tracing`.
pub trait FaultReporter: Send {
    /// A frame was rejected and dropped; the serve loop continues.
    fn frame_rejected(&self, error: &DemuxError);
}

/// Default reporter: structured log records via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl FaultReporter for LogReporter {
    fn frame_rejected(&self, error: &DemuxError) {
        warn!(error = %error, "telemetry frame rejected");
    }
}
