//! Monophonic note stack with a shared legato envelope.
//!
//! One voice serves every held note. Pressing a key while others are held
//! glides the pitch and retriggers the attack from wherever the envelope
//! currently is; releasing the newest key falls back to the previous one.
//! The envelope is rendered by the audio engine from scheduled ramps; this
//! module keeps an analytic copy of the same curve so the stage and level
//! can be queried without asking the engine.
//!
//! ```text
//!   level
//!   1.0 ┤    ╱╲
//!       │   ╱  ╲_____          attack: linear, `attack` seconds
//!     S ┤  ╱         ╲         decay:  exp approach to S, tau = decay / 8
//!       │ ╱           ╲__      release: exp approach to floor, tau = release / 8
//!   0.0 ┼╱───────────────→ t
//! ```

use liveset_types::{EnvConfig, Param, ParamTarget, Ramp, UnitId};

use crate::engine::{log_failure, AudioContext};
use crate::MIN_TIME;

/// Lowest level the envelope approaches; also the sustain floor.
pub const LEVEL_FLOOR: f32 = 0.0001;

/// Pitch whose control value is zero (A4).
pub const REFERENCE_PITCH: u8 = 69;

/// Amplitude smoothing when a note starts.
const AMP_ATTACK_SMOOTHING: f64 = 0.01;

/// Exponential segments use `duration / EXP_DIVISOR` as time constant.
const EXP_DIVISOR: f64 = 8.0;

const LOG_TARGET: &str = "liveset::synth";

/// Control value for a pitch: cents relative to A4.
pub fn pitch_to_cents(pitch: u8) -> f32 {
    (pitch as f32 - REFERENCE_PITCH as f32) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Release,
}

/// The curve segment currently being rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Idle,
    Attack {
        start: f64,
        from: f32,
        attack: f64,
        sustain: f32,
        decay_tc: f64,
    },
    Release {
        start: f64,
        from: f32,
        duration: f64,
    },
}

impl Segment {
    fn level_at(&self, t: f64) -> f32 {
        match *self {
            Segment::Idle => 0.0,
            Segment::Attack {
                start,
                from,
                attack,
                sustain,
                decay_tc,
            } => {
                let elapsed = (t - start).max(0.0);
                if elapsed < attack {
                    from + (1.0 - from) * (elapsed / attack) as f32
                } else {
                    let k = (-(elapsed - attack) / decay_tc).exp() as f32;
                    sustain + (1.0 - sustain) * k
                }
            }
            Segment::Release {
                start,
                from,
                duration,
            } => {
                let elapsed = (t - start).max(0.0);
                let k = (-elapsed / (duration / EXP_DIVISOR)).exp() as f32;
                LEVEL_FLOOR + (from - LEVEL_FLOOR) * k
            }
        }
    }

    fn stage_at(&self, t: f64) -> EnvelopeStage {
        match *self {
            Segment::Idle => EnvelopeStage::Idle,
            Segment::Attack { start, attack, .. } => {
                if t - start < attack {
                    EnvelopeStage::Attack
                } else {
                    EnvelopeStage::Decay
                }
            }
            Segment::Release {
                start, duration, ..
            } => {
                if t - start < duration {
                    EnvelopeStage::Release
                } else {
                    EnvelopeStage::Idle
                }
            }
        }
    }
}

/// Note stack plus envelope for one monophonic instrument.
pub struct VoiceEnvelope {
    ctx: AudioContext,
    unit: UnitId,

    attack: f64,
    decay: f64,
    sustain: f32,
    release: f64,
    glide: f64,

    stack: Vec<u8>,
    /// Pitch the glide is heading to
    last_pitch: Option<u8>,
    segment: Segment,
}

impl VoiceEnvelope {
    pub fn new(ctx: &AudioContext, unit: UnitId, config: &EnvConfig) -> Self {
        let mut env = Self {
            ctx: ctx.clone(),
            unit,
            attack: 0.0,
            decay: 0.0,
            sustain: 0.0,
            release: 0.0,
            glide: 0.0,
            stack: Vec::new(),
            last_pitch: None,
            segment: Segment::Idle,
        };
        env.set_attack(config.attack as f64);
        env.set_decay(config.decay as f64);
        env.set_sustain(config.sustain);
        env.set_release(config.release as f64);
        env.set_glide(config.glide as f64);
        env
    }

    pub fn set_attack(&mut self, secs: f64) {
        self.attack = floor_duration(secs);
    }

    pub fn set_decay(&mut self, secs: f64) {
        self.decay = floor_duration(secs);
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = if level.is_finite() {
            level.clamp(LEVEL_FLOOR, 1.0)
        } else {
            LEVEL_FLOOR
        };
    }

    pub fn set_release(&mut self, secs: f64) {
        self.release = floor_duration(secs);
    }

    pub fn set_glide(&mut self, secs: f64) {
        self.glide = floor_duration(secs);
    }

    pub fn attack(&self) -> f64 {
        self.attack
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    pub fn release(&self) -> f64 {
        self.release
    }

    pub fn glide(&self) -> f64 {
        self.glide
    }

    /// Held pitches, oldest first.
    pub fn stack(&self) -> &[u8] {
        &self.stack
    }

    /// Most recently pressed pitch still held.
    pub fn top(&self) -> Option<u8> {
        self.stack.last().copied()
    }

    /// Pitch the voice is sounding (or gliding toward).
    pub fn current_pitch(&self) -> Option<u8> {
        self.last_pitch
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.segment.stage_at(self.ctx.now())
    }

    pub fn level(&self) -> f32 {
        self.segment.level_at(self.ctx.now())
    }

    pub fn stage_at(&self, t: f64) -> EnvelopeStage {
        self.segment.stage_at(t)
    }

    pub fn level_at(&self, t: f64) -> f32 {
        self.segment.level_at(t)
    }

    pub fn note_on(&mut self, pitch: u8, _velocity: u8) {
        let pitch = pitch.min(127);
        self.stack.retain(|&p| p != pitch);
        self.stack.push(pitch);

        self.glide_to(pitch);
        self.trigger_attack();
    }

    pub fn note_off(&mut self, pitch: u8) {
        let pitch = pitch.min(127);
        let was_top = self.top() == Some(pitch);
        let before = self.stack.len();
        self.stack.retain(|&p| p != pitch);
        if self.stack.len() == before {
            // not held
            return;
        }

        match self.top() {
            Some(next) if was_top => {
                self.trigger_attack();
                self.glide_to(next);
            }
            Some(_) => {}
            None => self.trigger_release(),
        }
    }

    /// Panic: drop every note and silence the voice immediately.
    pub fn stop(&mut self) {
        if self.stack.is_empty() && self.segment == Segment::Idle {
            return;
        }
        self.stack.clear();
        self.trigger_release();

        let now = self.ctx.now();
        for param in [Param::Envelope, Param::Amp] {
            let target = self.target(param);
            log_failure(LOG_TARGET, "cancel", self.ctx.engine().cancel_scheduled(target, now));
            log_failure(LOG_TARGET, "hard zero", self.ctx.engine().set_param(target, 0.0, now, Ramp::Set));
        }
        self.segment = Segment::Idle;
    }

    fn target(&self, param: Param) -> ParamTarget {
        ParamTarget::unit(self.unit, param)
    }

    fn glide_to(&mut self, pitch: u8) {
        if self.last_pitch == Some(pitch) {
            return;
        }
        let now = self.ctx.now();
        let target = self.target(Param::Pitch);
        let engine = self.ctx.engine();
        log_failure(LOG_TARGET, "pitch hold", engine.cancel_scheduled(target, now));
        log_failure(
            LOG_TARGET,
            "pitch glide",
            engine.set_param(target, pitch_to_cents(pitch), now, Ramp::linear(self.glide)),
        );
        self.last_pitch = Some(pitch);
    }

    fn trigger_attack(&mut self) {
        let now = self.ctx.now();
        let from = self.segment.level_at(now);
        let env = self.target(Param::Envelope);
        let amp = self.target(Param::Amp);
        let engine = self.ctx.engine();

        log_failure(LOG_TARGET, "amp attack", engine.set_param(amp, 1.0, now, Ramp::target(AMP_ATTACK_SMOOTHING)));
        log_failure(LOG_TARGET, "envelope hold", engine.cancel_scheduled(env, now));
        log_failure(LOG_TARGET, "attack", engine.set_param(env, 1.0, now, Ramp::linear(self.attack)));
        log_failure(
            LOG_TARGET,
            "decay",
            engine.set_param(env, self.sustain, now + self.attack, Ramp::target(self.decay / EXP_DIVISOR)),
        );

        log::trace!(target: LOG_TARGET, "attack from {:.4} at {:.3}", from, now);
        self.segment = Segment::Attack {
            start: now,
            from,
            attack: self.attack,
            sustain: self.sustain,
            decay_tc: self.decay / EXP_DIVISOR,
        };
    }

    fn trigger_release(&mut self) {
        let now = self.ctx.now();
        let from = self.segment.level_at(now);
        let tc = self.release / EXP_DIVISOR;
        let engine = self.ctx.engine();

        for param in [Param::Amp, Param::Envelope] {
            let target = self.target(param);
            log_failure(LOG_TARGET, "release hold", engine.cancel_scheduled(target, now));
            log_failure(LOG_TARGET, "release", engine.set_param(target, LEVEL_FLOOR, now, Ramp::target(tc)));
        }

        self.segment = if matches!(self.segment, Segment::Idle) {
            Segment::Idle
        } else {
            Segment::Release {
                start: now,
                from,
                duration: self.release,
            }
        };
    }
}

fn floor_duration(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(MIN_TIME)
    } else {
        MIN_TIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{TestEngine, TestOp};
    use std::sync::Arc;

    fn setup() -> (Arc<TestEngine>, VoiceEnvelope) {
        let engine = Arc::new(TestEngine::new());
        let ctx = AudioContext::new(engine.clone());
        let config = EnvConfig {
            attack: 0.125,
            decay: 0.5,
            sustain: 0.5,
            release: 1.0,
            glide: 0.0625,
        };
        let env = VoiceEnvelope::new(&ctx, UnitId::new(1), &config);
        (engine, env)
    }

    fn attacks(engine: &TestEngine) -> usize {
        engine.count(|op| {
            matches!(
                op,
                TestOp::SetParam { target, value, ramp: Ramp::Linear { .. }, .. }
                    if target.param == Param::Envelope && *value == 1.0
            )
        })
    }

    fn releases(engine: &TestEngine) -> usize {
        engine.count(|op| {
            matches!(
                op,
                TestOp::SetParam { target, value, .. }
                    if target.param == Param::Envelope && *value == LEVEL_FLOOR
            )
        })
    }

    #[test]
    fn pitch_control_value() {
        assert_eq!(pitch_to_cents(69), 0.0);
        assert_eq!(pitch_to_cents(60), -900.0);
        assert_eq!(pitch_to_cents(81), 1200.0);
    }

    #[test]
    fn first_note_attacks_and_glides() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);

        assert_eq!(env.stack(), &[60]);
        assert_eq!(env.current_pitch(), Some(60));
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        assert_eq!(attacks(&engine), 1);
        assert_eq!(
            engine.param_changes(Param::Pitch),
            vec![(-900.0, 0.0, Ramp::Linear { duration: 0.0625 })]
        );
        // decay toward sustain scheduled after the attack
        assert!(engine
            .param_changes(Param::Envelope)
            .contains(&(0.5, 0.125, Ramp::Target { time_constant: 0.0625 })));
    }

    #[test]
    fn releasing_top_note_reverts_and_retriggers() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);
        env.note_on(64, 100);
        assert_eq!(env.current_pitch(), Some(64));
        engine.clear();

        env.note_off(64);
        assert_eq!(env.stack(), &[60]);
        assert_eq!(env.current_pitch(), Some(60));
        assert_eq!(attacks(&engine), 1);
        assert_eq!(releases(&engine), 0);
        assert_eq!(engine.last_value(ParamTarget::unit(UnitId::new(1), Param::Pitch)), Some(-900.0));
    }

    #[test]
    fn releasing_buried_note_keeps_pitch() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);
        env.note_on(64, 100);
        engine.clear();

        env.note_off(60);
        assert_eq!(env.stack(), &[64]);
        assert_eq!(env.current_pitch(), Some(64));
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn last_note_off_releases() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);
        engine.advance(1.0);
        env.note_off(60);

        assert!(env.stack().is_empty());
        assert_eq!(env.stage(), EnvelopeStage::Release);
        assert_eq!(releases(&engine), 1);
        assert_eq!(
            engine.last_value(ParamTarget::unit(UnitId::new(1), Param::Amp)),
            Some(LEVEL_FLOOR)
        );

        engine.advance(1.0);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert!(env.level() < 0.001);
    }

    #[test]
    fn unmatched_and_duplicate_note_off_are_noops() {
        let (engine, mut env) = setup();
        env.note_off(60);
        assert!(engine.operations().is_empty());

        env.note_on(60, 100);
        env.note_off(60);
        engine.clear();
        env.note_off(60);
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn push_then_release_restores_stack() {
        let (_engine, mut env) = setup();
        env.note_on(40, 100);
        env.note_on(47, 100);
        for p in 0..=127u8 {
            if env.stack().contains(&p) {
                continue;
            }
            let before = env.stack().to_vec();
            env.note_on(p, 100);
            env.note_off(p);
            assert_eq!(env.stack(), before.as_slice(), "pitch {}", p);
        }
    }

    #[test]
    fn repeated_pitch_appears_once() {
        let (_engine, mut env) = setup();
        env.note_on(60, 100);
        env.note_on(62, 100);
        env.note_on(60, 100);
        assert_eq!(env.stack(), &[62, 60]);
        env.note_off(60);
        assert_eq!(env.stack(), &[62]);
        assert_eq!(env.current_pitch(), Some(62));
    }

    #[test]
    fn legato_retrigger_starts_from_current_level() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);
        engine.advance(0.0625);
        let mid = env.level();
        assert!((mid - 0.5).abs() < 1e-3);

        env.note_on(64, 100);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        assert!((env.level() - mid).abs() < 1e-6);
    }

    #[test]
    fn analytic_curve_reaches_sustain() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);
        engine.set_time(0.125);
        assert_eq!(env.stage(), EnvelopeStage::Decay);
        assert!((env.level() - 1.0).abs() < 1e-6);
        engine.set_time(5.0);
        assert!((env.level() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn stop_clears_and_zeroes_immediately() {
        let (engine, mut env) = setup();
        env.note_on(60, 100);
        env.note_on(64, 100);
        engine.advance(0.2);
        env.stop();

        assert!(env.stack().is_empty());
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.level(), 0.0);
        assert_eq!(
            engine.last_value(ParamTarget::unit(UnitId::new(1), Param::Envelope)),
            Some(0.0)
        );

        // idempotent
        let ops = engine.operations().len();
        env.stop();
        env.stop();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(engine.operations().len(), ops);
    }

    #[test]
    fn stop_on_fresh_envelope_is_silent() {
        let (engine, mut env) = setup();
        env.stop();
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn durations_and_sustain_are_floored() {
        let (_engine, mut env) = setup();
        env.set_attack(0.0);
        env.set_release(-1.0);
        env.set_decay(f64::NAN);
        env.set_sustain(0.0);
        assert!(env.attack() > 0.0);
        assert!(env.release() > 0.0);
        assert!(env.decay() > 0.0);
        assert_eq!(env.sustain(), LEVEL_FLOOR);

        env.note_on(60, 100);
        env.note_off(60);
        assert!(env.level().is_finite());
    }

    #[test]
    fn out_of_range_pitch_is_clamped() {
        let (_engine, mut env) = setup();
        env.note_on(200, 100);
        assert_eq!(env.stack(), &[127]);
        env.note_off(255);
        assert!(env.stack().is_empty());
    }
}
