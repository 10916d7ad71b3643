use liveset_types::{Param, ParamTarget, Ramp, UnitId};

use crate::curve::{apply_bindings, band, cube, midi_float, Band, ControlBinding, Mapping};
use crate::engine::{log_failure, AudioContext};
use crate::unit::PerformanceUnit;

const FILTER_SMOOTHING: f64 = 0.1;
const GAIN_SMOOTHING: f64 = 0.01;

pub const FILTER_MIN_HZ: f32 = 20.0;
pub const FILTER_MAX_HZ: f32 = 20_000.0;

pub const DUCK_ATTACK_SECS: f64 = 0.02;
pub const DUCK_RELEASE_SECS: f64 = 0.4;

const LOG_TARGET: &str = "liveset::mixer";

const BINDINGS: &[ControlBinding] = &[
    ControlBinding::new(1, Mapping::cube().input(1.5, 0.0), Param::Volume, GAIN_SMOOTHING),
    ControlBinding::new(2, Mapping::cube(), Param::ReverbSend, GAIN_SMOOTHING),
    ControlBinding::new(3, Mapping::cube(), Param::DelaySend, GAIN_SMOOTHING),
    ControlBinding::new(5, Mapping::linear().output(-15.0, 16.0), Param::BitDepth, FILTER_SMOOTHING),
    ControlBinding::new(6, Mapping::linear().input(-1.0, 1.0), Param::RateReduction, FILTER_SMOOTHING),
];

/// Initial state of a channel strip.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerSettings {
    /// How far the input dips on a note-on, `0.0..=1.0`
    pub duck_amount: f32,
    /// High-pass cutoff in Hz
    pub high_pass: f32,
    pub volume: f32,
    pub reverb: f32,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            duck_amount: 0.0,
            high_pass: 0.0,
            volume: 1.0,
            reverb: 0.0,
        }
    }
}

/// Channel strip: level, sends, dual filter, crusher and sidechain-style
/// ducking triggered by notes on the strip's MIDI channel.
pub struct MixerChannel {
    ctx: AudioContext,
    unit: UnitId,
    name: String,
    duck_amount: f32,
}

impl MixerChannel {
    pub fn new(ctx: &AudioContext, name: impl Into<String>, settings: &MixerSettings) -> Self {
        let channel = Self {
            ctx: ctx.clone(),
            unit: ctx.allocate_unit(),
            name: name.into(),
            duck_amount: settings.duck_amount.clamp(0.0, 1.0),
        };
        for (param, value) in [
            (Param::Volume, settings.volume),
            (Param::HighPass, settings.high_pass),
            (Param::ReverbSend, settings.reverb),
        ] {
            log_failure(LOG_TARGET, "init", channel.ctx.set_now(channel.target(param), value));
        }
        channel
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn duck_amount(&self) -> f32 {
        self.duck_amount
    }

    fn target(&self, param: Param) -> ParamTarget {
        ParamTarget::unit(self.unit, param)
    }

    /// Dip the input gain and let it recover.
    pub fn duck(&self) {
        if self.duck_amount <= 0.0 {
            return;
        }
        let now = self.ctx.now();
        let target = self.target(Param::InputGain);
        let engine = self.ctx.engine();
        let dip = (1.0 - self.duck_amount).max(0.0);
        log_failure(LOG_TARGET, "duck", engine.set_param(target, dip, now, Ramp::linear(DUCK_ATTACK_SECS)));
        log_failure(
            LOG_TARGET,
            "duck release",
            engine.set_param(target, 1.0, now + DUCK_ATTACK_SECS, Ramp::linear(DUCK_RELEASE_SECS)),
        );
    }

    /// Three-band dual filter: the upper half sweeps the high-pass up, the
    /// lower half sweeps the low-pass down, the centre opens both.
    fn dual_filter(&self, value: u8) {
        let (low_pass, high_pass) = match band(value) {
            Band::High { x, .. } => (FILTER_MAX_HZ, cube(x) * FILTER_MAX_HZ + FILTER_MIN_HZ),
            Band::Low { x, .. } => (cube(x) * FILTER_MAX_HZ + FILTER_MIN_HZ, FILTER_MIN_HZ),
            Band::Neutral => (FILTER_MAX_HZ, FILTER_MIN_HZ),
        };
        for (param, hz) in [(Param::LowPass, low_pass), (Param::HighPass, high_pass)] {
            log_failure(LOG_TARGET, "filter", self.ctx.smooth(self.target(param), hz, FILTER_SMOOTHING));
        }
    }
}

impl PerformanceUnit for MixerChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn note_on(&mut self, _pitch: u8, _velocity: u8) {
        self.duck();
    }

    fn cc(&mut self, number: u8, value: u8) {
        match number {
            4 => self.dual_filter(value),
            7 => {
                self.duck_amount = midi_float(value);
                log::debug!(target: LOG_TARGET, "{}: duck amount {:.2}", self.name, self.duck_amount);
            }
            _ => {
                if !apply_bindings(BINDINGS, &self.ctx, self.unit, number, value, LOG_TARGET) {
                    log::debug!(target: LOG_TARGET, "{}: unmapped cc {}", self.name, number);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{TestEngine, TestOp};
    use std::sync::Arc;

    fn setup(settings: MixerSettings) -> (Arc<TestEngine>, MixerChannel) {
        let engine = Arc::new(TestEngine::new());
        let ctx = AudioContext::new(engine.clone());
        let channel = MixerChannel::new(&ctx, "bass", &settings);
        engine.clear();
        (engine, channel)
    }

    #[test]
    fn initial_settings_are_applied() {
        let engine = Arc::new(TestEngine::new());
        let ctx = AudioContext::new(engine.clone());
        let settings = MixerSettings {
            duck_amount: 1.0,
            high_pass: 200.0,
            volume: 1.0,
            reverb: 0.1,
        };
        let ch = MixerChannel::new(&ctx, "delay", &settings);
        assert_eq!(engine.last_value(ch.target(Param::HighPass)), Some(200.0));
        assert_eq!(engine.last_value(ch.target(Param::ReverbSend)), Some(0.1));
    }

    #[test]
    fn dual_filter_bands() {
        let (engine, mut ch) = setup(MixerSettings::default());
        let lp = ch.target(Param::LowPass);
        let hp = ch.target(Param::HighPass);

        ch.cc(4, 127);
        assert_eq!(engine.last_value(lp), Some(20_000.0));
        assert_eq!(engine.last_value(hp), Some(20_020.0));

        ch.cc(4, 0);
        assert_eq!(engine.last_value(lp), Some(20.0));
        assert_eq!(engine.last_value(hp), Some(20.0));

        for neutral in [63, 64] {
            ch.cc(4, neutral);
            assert_eq!(engine.last_value(lp), Some(20_000.0));
            assert_eq!(engine.last_value(hp), Some(20.0));
        }
    }

    #[test]
    fn filter_moves_are_smoothed() {
        let (engine, mut ch) = setup(MixerSettings::default());
        ch.cc(4, 100);
        assert!(engine.operations().iter().all(|op| matches!(
            op,
            TestOp::SetParam { ramp: Ramp::Target { time_constant }, .. } if *time_constant == FILTER_SMOOTHING
        )));
    }

    #[test]
    fn level_and_crusher_curves() {
        let (engine, mut ch) = setup(MixerSettings::default());
        ch.cc(1, 127);
        assert!((engine.last_value(ch.target(Param::Volume)).unwrap() - 3.375).abs() < 1e-5);
        ch.cc(5, 127);
        assert_eq!(engine.last_value(ch.target(Param::BitDepth)), Some(1.0));
        ch.cc(6, 0);
        assert_eq!(engine.last_value(ch.target(Param::RateReduction)), Some(1.0));
    }

    #[test]
    fn note_on_ducks_and_recovers() {
        let (engine, mut ch) = setup(MixerSettings {
            duck_amount: 0.8,
            ..MixerSettings::default()
        });
        engine.set_time(3.0);
        ch.note_on(36, 100);

        let changes = engine.param_changes(Param::InputGain);
        assert_eq!(changes.len(), 2);
        assert!((changes[0].0 - 0.2).abs() < 1e-6);
        assert_eq!(changes[0].2, Ramp::Linear { duration: 0.02 });
        assert_eq!(changes[1], (1.0, 3.02, Ramp::Linear { duration: 0.4 }));
    }

    #[test]
    fn zero_duck_amount_is_noop() {
        let (engine, mut ch) = setup(MixerSettings::default());
        ch.note_on(36, 100);
        assert!(engine.operations().is_empty());

        ch.cc(7, 127);
        assert_eq!(ch.duck_amount(), 1.0);
        ch.note_on(36, 100);
        assert_eq!(engine.param_changes(Param::InputGain)[0].0, 0.0);
    }
}
