use std::collections::HashMap;
use std::time::{Instant, SystemTime};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::DemuxError;
use crate::frame::Frame;
use crate::rate::RateTracker;
use crate::report::{FaultReporter, LogReporter};
use crate::sink::SampleSink;

/// Per-channel state: the registered sink plus the most recent delivery.
struct ChannelEntry {
    sink: Box<dyn SampleSink>,
    last_buffer: Vec<f32>,
    last_update: Option<SystemTime>,
}

/// Decodes raw multipart frames, fans per-channel sample buffers out to
/// registered sinks, and tracks the arrival rate.
///
/// Single logical owner: exactly one thread calls [`Demultiplexer::dispatch`];
/// the registry needs no lock once registration is done. Cross-thread
/// visibility toward consumers is the sinks' concern (see
/// [`crate::sink::QueuedSink`]).
pub struct Demultiplexer {
    channels: HashMap<String, ChannelEntry>,
    rate: RateTracker,
    reporter: Box<dyn FaultReporter>,
    sample_frames: u64,
    rejected: u64,
}

impl Demultiplexer {
    /// Create a demultiplexer reporting faults through `tracing`.
    pub fn new() -> Self {
        Self::with_reporter(Box::new(LogReporter))
    }

    /// Create a demultiplexer with an explicit fault reporter.
    pub fn with_reporter(reporter: Box<dyn FaultReporter>) -> Self {
        Self {
            channels: HashMap::new(),
            rate: RateTracker::new(),
            reporter,
            sample_frames: 0,
            rejected: 0,
        }
    }

    /// Register a channel by name. One registration per physical input the
    /// device descriptor declares; registering an existing name replaces
    /// its sink and resets the channel state.
    pub fn register(&mut self, name: impl Into<String>, sink: Box<dyn SampleSink>) {
        let name = name.into();
        debug!(channel = %name, "channel registered");
        self.channels.insert(
            name,
            ChannelEntry {
                sink,
                last_buffer: Vec::new(),
                last_update: None,
            },
        );
    }

    /// True if `name` has been registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Registered channel names, sorted.
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The most recently delivered buffer for a channel.
    pub fn last_buffer(&self, name: &str) -> Option<&[f32]> {
        self.channels.get(name).map(|e| e.last_buffer.as_slice())
    }

    /// When a channel last received samples.
    pub fn last_update(&self, name: &str) -> Option<SystemTime> {
        self.channels.get(name).and_then(|e| e.last_update)
    }

    /// The smoothed arrival rate in samples-per-channel per second.
    /// Unset until two sample frames have arrived.
    pub fn rate(&self) -> Option<f64> {
        self.rate.rate()
    }

    /// How many sample frames have been dispatched since construction.
    pub fn sample_frames(&self) -> u64 {
        self.sample_frames
    }

    /// How many frames have been rejected since construction.
    pub fn rejected_frames(&self) -> u64 {
        self.rejected
    }

    /// Decode and route one raw frame.
    ///
    /// Every referenced channel is validated against the registry before
    /// anything is delivered, so a rejected frame leaves all channel state
    /// untouched. Capacity updates fan the hint out to each named channel
    /// and skip the rate tracker; sample frames de-interleave by stride,
    /// deliver each channel's series with the dispatch timestamp, update
    /// the per-channel state in place, and then record the arrival.
    pub fn dispatch(&mut self, parts: &[Bytes]) -> Result<(), DemuxError> {
        let frame = Frame::decode(parts)?;

        for name in frame.channels() {
            if !self.channels.contains_key(name) {
                return Err(DemuxError::UnknownChannel(name.clone()));
            }
        }

        match &frame {
            Frame::CapacityUpdate { channels, capacity } => {
                trace!(capacity, channels = channels.len(), "capacity update");
                for name in channels {
                    if let Some(entry) = self.channels.get_mut(name) {
                        entry.sink.set_capacity_hint(*capacity);
                    }
                }
            }
            Frame::Samples { channels, payload } => {
                let now = SystemTime::now();
                let per_channel = payload.len() / channels.len();
                trace!(
                    channels = channels.len(),
                    per_channel,
                    "sample frame dispatched"
                );
                for (index, name) in channels.iter().enumerate() {
                    let series = frame.channel_samples(index);
                    if let Some(entry) = self.channels.get_mut(name) {
                        entry.sink.deliver_samples(&series, now);
                        entry.last_buffer = series;
                        entry.last_update = Some(now);
                    }
                }
                self.rate.record(per_channel, Instant::now());
                self.sample_frames += 1;
            }
        }

        Ok(())
    }

    /// Dispatch one frame, containing any failure: the fault is counted,
    /// handed to the injected reporter, and the frame dropped. This is the
    /// serve-loop entry point; a malformed frame must never take the
    /// server down.
    pub fn handle(&mut self, parts: &[Bytes]) {
        if let Err(error) = self.dispatch(parts) {
            self.rejected += 1;
            self.reporter.frame_rejected(&error);
        }
    }
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::error::DecodeError;
    use crate::frame::CAPACITY_TAG;
    use crate::sink::{QueuedSink, SinkEvent};

    fn sample_parts(channels: &str, samples: &[f32]) -> Vec<Bytes> {
        let mut raw = Vec::new();
        for s in samples {
            raw.extend_from_slice(&s.to_le_bytes());
        }
        vec![Bytes::copy_from_slice(channels.as_bytes()), Bytes::from(raw)]
    }

    fn capacity_parts(channels: &str, capacity: i64) -> Vec<Bytes> {
        vec![
            Bytes::from_static(CAPACITY_TAG),
            Bytes::copy_from_slice(channels.as_bytes()),
            Bytes::copy_from_slice(&capacity.to_le_bytes()),
        ]
    }

    fn demux_with_channels(names: &[&str]) -> (Demultiplexer, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut demux = Demultiplexer::new();
        for name in names {
            demux.register(*name, Box::new(QueuedSink::new(*name, tx.clone())));
        }
        (demux, rx)
    }

    #[test]
    fn sample_frame_reaches_every_channel() {
        let (mut demux, rx) = demux_with_channels(&["ai0", "ai1"]);
        demux
            .dispatch(&sample_parts(r#"["ai0","ai1"]"#, &[0.0, 10.0, 1.0, 11.0]))
            .unwrap();

        let events: Vec<SinkEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            SinkEvent::Samples {
                channel, samples, ..
            } => {
                assert_eq!(channel, "ai0");
                assert_eq!(samples, &[0.0, 1.0]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(demux.last_buffer("ai1"), Some(&[10.0, 11.0][..]));
        assert!(demux.last_update("ai1").is_some());
    }

    #[test]
    fn capacity_frame_hints_each_channel_exactly_once() {
        let (mut demux, rx) = demux_with_channels(&["a", "b"]);
        demux
            .dispatch(&capacity_parts(r#"["a","b"]"#, 500))
            .unwrap();

        let events: Vec<SinkEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SinkEvent::CapacityHint {
                    channel: "a".into(),
                    capacity: 500
                },
                SinkEvent::CapacityHint {
                    channel: "b".into(),
                    capacity: 500
                },
            ]
        );
        // No sample delivery and no rate movement on the capacity path.
        assert_eq!(demux.last_buffer("a"), Some(&[][..]));
        assert_eq!(demux.rate(), None);
    }

    #[test]
    fn unknown_channel_rejects_the_frame_and_preserves_state() {
        let (mut demux, rx) = demux_with_channels(&["ai0"]);
        demux
            .dispatch(&sample_parts(r#"["ai0"]"#, &[7.0]))
            .unwrap();

        let err = demux
            .dispatch(&sample_parts(r#"["ai0","ghost"]"#, &[1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, DemuxError::UnknownChannel(name) if name == "ghost"));

        // ai0 still holds the buffer from the good frame; the bad frame
        // delivered nothing.
        assert_eq!(demux.last_buffer("ai0"), Some(&[7.0][..]));
        let events: Vec<SinkEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn malformed_then_wellformed_frames() {
        let (mut demux, rx) = demux_with_channels(&["a", "b", "c"]);

        let payload: Vec<f32> = (0..7).map(|i| i as f32).collect();
        let err = demux
            .dispatch(&sample_parts(r#"["a","b","c"]"#, &payload))
            .unwrap_err();
        assert!(matches!(
            err,
            DemuxError::Decode(DecodeError::PayloadNotDivisible { .. })
        ));

        demux
            .dispatch(&sample_parts(r#"["a","b","c"]"#, &[1.0, 2.0, 3.0]))
            .unwrap();
        let events: Vec<SinkEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn handle_counts_and_reports_rejections() {
        let (mut demux, _rx) = demux_with_channels(&["ai0"]);
        demux.handle(&sample_parts(r#"["nope"]"#, &[1.0]));
        demux.handle(&sample_parts(r#"["ai0"]"#, &[1.0]));
        assert_eq!(demux.rejected_frames(), 1);
    }

    #[test]
    fn reregistration_resets_channel_state() {
        let (mut demux, _rx) = demux_with_channels(&["ai0"]);
        demux
            .dispatch(&sample_parts(r#"["ai0"]"#, &[5.0]))
            .unwrap();
        assert_eq!(demux.last_buffer("ai0"), Some(&[5.0][..]));

        let (tx, _rx2) = mpsc::channel();
        demux.register("ai0", Box::new(QueuedSink::new("ai0", tx)));
        assert_eq!(demux.last_buffer("ai0"), Some(&[][..]));
        assert_eq!(demux.last_update("ai0"), None);
    }

    #[test]
    fn channel_names_are_sorted() {
        let (demux, _rx) = demux_with_channels(&["b", "a", "c"]);
        assert_eq!(demux.channel_names(), vec!["a", "b", "c"]);
    }
}
