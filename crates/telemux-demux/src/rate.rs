use std::time::Instant;

/// Weight of the newest instantaneous measurement in the smoothed rate.
pub const DEFAULT_SMOOTHING: f64 = 0.1;

/// Tracks the arrival rate of sample frames.
///
/// The rate is samples-per-channel per second, smoothed with an exponential
/// moving average seeded by the first instantaneous measurement, so the
/// second frame ever received reports exactly `k / Δt`. The very first
/// frame has no predecessor and leaves the rate unset.
#[derive(Debug, Clone)]
pub struct RateTracker {
    last_frame: Option<Instant>,
    rate: Option<f64>,
    smoothing: f64,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::with_smoothing(DEFAULT_SMOOTHING)
    }

    /// Override the smoothing weight (0 < weight <= 1; 1 disables smoothing).
    pub fn with_smoothing(smoothing: f64) -> Self {
        Self {
            last_frame: None,
            rate: None,
            smoothing,
        }
    }

    /// Record a sample frame carrying `samples_per_channel` samples per
    /// channel, observed at `now`.
    ///
    /// A zero elapsed interval leaves the previous rate in place rather
    /// than dividing by zero.
    pub fn record(&mut self, samples_per_channel: usize, now: Instant) {
        if let Some(previous) = self.last_frame.replace(now) {
            let elapsed = now.duration_since(previous).as_secs_f64();
            if elapsed > 0.0 {
                let instantaneous = samples_per_channel as f64 / elapsed;
                self.rate = Some(match self.rate {
                    None => instantaneous,
                    Some(previous_rate) => {
                        self.smoothing * instantaneous + (1.0 - self.smoothing) * previous_rate
                    }
                });
            }
        }
    }

    /// The current smoothed rate, unset until two frames have arrived.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// When the most recent sample frame arrived.
    pub fn last_frame(&self) -> Option<Instant> {
        self.last_frame
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn first_frame_leaves_rate_unset() {
        let mut tracker = RateTracker::new();
        tracker.record(100, Instant::now());
        assert_eq!(tracker.rate(), None);
        assert!(tracker.last_frame().is_some());
    }

    #[test]
    fn second_frame_reports_exactly_k_over_dt() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(100);

        tracker.record(50, t0);
        tracker.record(50, t1);

        let rate = tracker.rate().unwrap();
        assert!((rate - 500.0).abs() < 1e-6, "rate was {rate}");
    }

    #[test]
    fn third_frame_is_smoothed_toward_the_new_measurement() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let t2 = t1 + Duration::from_secs(1);

        tracker.record(100, t0);
        tracker.record(100, t1); // 100 samples/s
        tracker.record(200, t2); // instantaneous 200 samples/s

        let rate = tracker.rate().unwrap();
        let expected = DEFAULT_SMOOTHING * 200.0 + (1.0 - DEFAULT_SMOOTHING) * 100.0;
        assert!((rate - expected).abs() < 1e-6, "rate was {rate}");
    }

    #[test]
    fn zero_elapsed_time_keeps_previous_rate() {
        let mut tracker = RateTracker::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(10);

        tracker.record(10, t0);
        tracker.record(10, t1);
        let before = tracker.rate();

        tracker.record(10, t1); // same instant again
        assert_eq!(tracker.rate(), before);
    }
}
