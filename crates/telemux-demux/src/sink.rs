use std::sync::mpsc;
use std::time::SystemTime;

use tracing::debug;

/// An external consumer of decoded per-channel data.
///
/// This is the full surface the demultiplexer requires from a consumer:
/// delivery of one channel's reconstructed samples, and a buffer-capacity
/// hint. Delivery is push-only and fire-and-forget once handed off.
pub trait SampleSink: Send {
    /// One channel's de-interleaved samples, with the dispatch timestamp.
    fn deliver_samples(&mut self, samples: &[f32], timestamp: SystemTime);

    /// Suggested maximum buffer size the consumer should retain.
    fn set_capacity_hint(&mut self, capacity: i64);
}

/// One delivery, labelled with its channel name.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Samples {
        channel: String,
        samples: Vec<f32>,
        timestamp: SystemTime,
    },
    CapacityHint {
        channel: String,
        capacity: i64,
    },
}

impl SinkEvent {
    /// The channel this event belongs to.
    pub fn channel(&self) -> &str {
        match self {
            SinkEvent::Samples { channel, .. } => channel,
            SinkEvent::CapacityHint { channel, .. } => channel,
        }
    }
}

/// A [`SampleSink`] that enqueues events into an mpsc channel.
///
/// Consumers with thread-affinity constraints (a plot window, a UI event
/// loop) drain the receiver on their own thread; the demultiplexer never
/// runs consumer code on its receive thread. The channel send provides the
/// deliver-happens-before-observe ordering the consumer relies on.
pub struct QueuedSink {
    channel: String,
    events: mpsc::Sender<SinkEvent>,
}

impl QueuedSink {
    pub fn new(channel: impl Into<String>, events: mpsc::Sender<SinkEvent>) -> Self {
        Self {
            channel: channel.into(),
            events,
        }
    }

    fn push(&self, event: SinkEvent) {
        // Delivery is fire-and-forget: a consumer that has hung up just
        // stops receiving.
        if self.events.send(event).is_err() {
            debug!(channel = %self.channel, "sink consumer gone; event dropped");
        }
    }
}

impl SampleSink for QueuedSink {
    fn deliver_samples(&mut self, samples: &[f32], timestamp: SystemTime) {
        self.push(SinkEvent::Samples {
            channel: self.channel.clone(),
            samples: samples.to_vec(),
            timestamp,
        });
    }

    fn set_capacity_hint(&mut self, capacity: i64) {
        self.push(SinkEvent::CapacityHint {
            channel: self.channel.clone(),
            capacity,
        });
    }
}
