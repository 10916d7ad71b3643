use liveset_types::{EnvConfig, Param, ParamTarget, UnitId};

use crate::curve::{apply_bindings, ControlBinding, Mapping};
use crate::engine::{log_failure, AudioContext};
use crate::envelope::VoiceEnvelope;
use crate::unit::PerformanceUnit;

const FILTER_SMOOTHING: f64 = 0.05;
const AMP_SMOOTHING: f64 = 0.01;
const PITCH_SMOOTHING: f64 = 0.01;

pub const BEND_RANGE_CENTS: f32 = 1200.0;

const LOG_TARGET: &str = "liveset::synth";

/// Controllers that move a synthesis parameter.
const BINDINGS: &[ControlBinding] = &[
    ControlBinding::new(6, Mapping::square(), Param::FilterCutoff, FILTER_SMOOTHING),
    ControlBinding::new(7, Mapping::square().output(20.0, 0.0), Param::FilterResonance, FILTER_SMOOTHING),
    ControlBinding::new(8, Mapping::square().input(2.0, -1.0), Param::FilterEnvAmount, FILTER_SMOOTHING),
    // square <-> saw crossfade
    ControlBinding::new(9, Mapping::square().input(-1.0, 1.0), Param::SquareLevel, AMP_SMOOTHING),
    ControlBinding::new(9, Mapping::square(), Param::SawLevel, AMP_SMOOTHING),
    ControlBinding::new(10, Mapping::square().input(1.5, 0.0), Param::SubLevel, AMP_SMOOTHING),
    ControlBinding::new(11, Mapping::square(), Param::NoiseLevel, AMP_SMOOTHING),
    ControlBinding::new(13, Mapping::linear().input(2.0, -1.0).output(1200.0, 0.0), Param::OscDetune, PITCH_SMOOTHING),
    ControlBinding::new(14, Mapping::linear().output(200.0, 0.0), Param::Vibrato, PITCH_SMOOTHING),
];

/// Controllers that change envelope settings for the next segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setting {
    Attack,
    Decay,
    Sustain,
    Release,
    Glide,
}

impl Setting {
    fn from_cc(cc: u8) -> Option<(Setting, Mapping)> {
        match cc {
            1 => Some((Setting::Attack, Mapping::square().output(4.0, 0.0))),
            2 => Some((Setting::Decay, Mapping::square().output(4.0, 0.0))),
            3 => Some((Setting::Sustain, Mapping::linear())),
            4 => Some((Setting::Release, Mapping::square().output(4.0, 0.0))),
            5 => Some((Setting::Glide, Mapping::square().output(2.0, 0.0))),
            _ => None,
        }
    }
}

/// Monophonic subtractive synth voice driven by a legato note stack.
pub struct MonoSynth {
    ctx: AudioContext,
    unit: UnitId,
    name: String,
    envelope: VoiceEnvelope,
}

impl MonoSynth {
    pub fn new(ctx: &AudioContext, name: impl Into<String>, config: &EnvConfig) -> Self {
        let unit = ctx.allocate_unit();
        Self {
            ctx: ctx.clone(),
            unit,
            name: name.into(),
            envelope: VoiceEnvelope::new(ctx, unit, config),
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn envelope(&self) -> &VoiceEnvelope {
        &self.envelope
    }

    fn apply_setting(&mut self, setting: Setting, value: f32) {
        log::debug!(target: LOG_TARGET, "{}: {:?} = {:.3}", self.name, setting, value);
        match setting {
            Setting::Attack => self.envelope.set_attack(value as f64),
            Setting::Decay => self.envelope.set_decay(value as f64),
            Setting::Sustain => self.envelope.set_sustain(value),
            Setting::Release => self.envelope.set_release(value as f64),
            Setting::Glide => self.envelope.set_glide(value as f64),
        }
    }
}

impl PerformanceUnit for MonoSynth {
    fn name(&self) -> &str {
        &self.name
    }

    fn note_on(&mut self, pitch: u8, velocity: u8) {
        self.envelope.note_on(pitch, velocity);
    }

    fn note_off(&mut self, pitch: u8) {
        self.envelope.note_off(pitch);
    }

    fn cc(&mut self, number: u8, value: u8) {
        if let Some((setting, mapping)) = Setting::from_cc(number) {
            self.apply_setting(setting, mapping.map_raw(value));
            return;
        }
        if !apply_bindings(BINDINGS, &self.ctx, self.unit, number, value, LOG_TARGET) {
            log::debug!(target: LOG_TARGET, "{}: unmapped cc {}", self.name, number);
        }
    }

    fn pitch_bend(&mut self, value: f32) {
        let value = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
        log_failure(
            LOG_TARGET,
            "bend",
            self.ctx.smooth(
                ParamTarget::unit(self.unit, Param::PitchOffset),
                value * BEND_RANGE_CENTS,
                PITCH_SMOOTHING,
            ),
        );
    }

    fn stop(&mut self) {
        self.envelope.stop();
    }
}
