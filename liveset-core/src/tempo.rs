//! Tempo estimation from an external 24 PPQN pulse train.

/// MIDI clock convention: pulses per quarter-note beat.
pub const PULSES_PER_BEAT: u32 = 24;

pub const DEFAULT_SMOOTHING_WINDOW: u32 = 4;
pub const MAX_SMOOTHING_WINDOW: u32 = 64;

/// Smoothed tempo follower.
///
/// The inter-pulse interval is an exponential moving average with weight
/// `1 / window`, so a single jittery pulse moves the estimate by at most a
/// `1 / window` share of its error.
#[derive(Debug, Clone)]
pub struct TempoEstimator {
    window: u32,
    last_pulse: Option<f64>,
    interval: Option<f64>,
}

impl TempoEstimator {
    pub fn new(window: u32) -> Self {
        Self {
            window: window.clamp(1, MAX_SMOOTHING_WINDOW),
            last_pulse: None,
            interval: None,
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Register one clock pulse at `timestamp` seconds.
    pub fn clock(&mut self, timestamp: f64) {
        if !timestamp.is_finite() {
            return;
        }

        if let Some(last) = self.last_pulse {
            let dt = timestamp - last;
            if dt < crate::MIN_TIME {
                // duplicate, out-of-order or sub-sample pulse
                return;
            }
            self.interval = Some(match self.interval {
                None => dt,
                Some(prev) => prev + (dt - prev) / self.window as f64,
            });
        }
        self.last_pulse = Some(timestamp);
    }

    /// Transport stopped: forget everything.
    pub fn stop(&mut self) {
        self.last_pulse = None;
        self.interval = None;
    }

    /// Smoothed inter-pulse interval in seconds.
    pub fn interval(&self) -> Option<f64> {
        self.interval
    }

    /// Beats per minute, or `None` until two pulses have been seen.
    pub fn tempo(&self) -> Option<f64> {
        self.interval
            .map(|interval| 60.0 / (interval * PULSES_PER_BEAT as f64))
    }

    /// Duration of one beat in seconds.
    pub fn beat_secs(&self) -> Option<f64> {
        self.interval.map(|interval| interval * PULSES_PER_BEAT as f64)
    }
}

impl Default for TempoEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(est: &mut TempoEstimator, start: f64, interval: f64, pulses: usize) -> f64 {
        let mut t = start;
        for _ in 0..pulses {
            est.clock(t);
            t += interval;
        }
        t
    }

    #[test]
    fn sub_sample_interval_is_ignored() {
        let mut est = TempoEstimator::default();
        est.clock(1.0);
        est.clock(1.0 + f64::MIN_POSITIVE);
        est.clock(1.0 + 1e-9);
        assert_eq!(est.tempo(), None);

        est.clock(1.020833);
        assert!(est.tempo().unwrap().is_finite());
    }

    #[test]
    fn undefined_until_two_pulses() {
        let mut est = TempoEstimator::default();
        assert_eq!(est.tempo(), None);
        est.clock(0.0);
        assert_eq!(est.tempo(), None);
        est.clock(0.020833);
        assert!(est.tempo().is_some());
    }

    #[test]
    fn converges_to_120_bpm() {
        let mut est = TempoEstimator::default();
        feed(&mut est, 0.0, 0.020833, 96);
        let bpm = est.tempo().unwrap();
        assert!((bpm - 120.0).abs() < 0.01, "bpm = {}", bpm);
    }

    #[test]
    fn follows_tempo_change() {
        let mut est = TempoEstimator::new(4);
        let t = feed(&mut est, 0.0, 60.0 / (120.0 * 24.0), 48);
        feed(&mut est, t, 60.0 / (90.0 * 24.0), 96);
        let bpm = est.tempo().unwrap();
        assert!((bpm - 90.0).abs() < 0.1, "bpm = {}", bpm);
    }

    #[test]
    fn single_jittery_pulse_is_damped() {
        let interval = 60.0 / (120.0 * 24.0);
        let mut est = TempoEstimator::new(8);
        let t = feed(&mut est, 0.0, interval, 48);
        // one pulse arrives 50% late
        est.clock(t - interval + interval * 1.5);
        let raw_bpm = 60.0 / (interval * 1.5 * 24.0);
        let bpm = est.tempo().unwrap();
        assert!(bpm > raw_bpm);
        assert!((bpm - 120.0).abs() < 120.0 - raw_bpm);
    }

    #[test]
    fn duplicate_timestamps_are_ignored() {
        let mut est = TempoEstimator::default();
        est.clock(1.0);
        est.clock(1.0);
        assert_eq!(est.tempo(), None);
        est.clock(0.5);
        assert_eq!(est.tempo(), None);
        est.clock(1.025);
        let bpm = est.tempo().unwrap();
        assert!(bpm.is_finite());
        assert!((bpm - 100.0).abs() < 1e-6);
    }

    #[test]
    fn stop_resets_and_is_idempotent() {
        let mut est = TempoEstimator::default();
        est.stop();
        feed(&mut est, 0.0, 0.02, 10);
        est.stop();
        est.stop();
        assert_eq!(est.tempo(), None);
        assert_eq!(est.interval(), None);
        est.clock(5.0);
        assert_eq!(est.tempo(), None);
    }

    #[test]
    fn window_is_clamped() {
        assert_eq!(TempoEstimator::new(0).window(), 1);
        assert_eq!(TempoEstimator::new(1000).window(), MAX_SMOOTHING_WINDOW);
    }

    #[test]
    fn beat_secs_matches_tempo() {
        let mut est = TempoEstimator::default();
        feed(&mut est, 0.0, 0.025, 10);
        assert!((est.beat_secs().unwrap() - 0.6).abs() < 1e-9);
    }
}
