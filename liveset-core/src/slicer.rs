//! Tick-quantized slice playback.
//!
//! A loop of `ticks` clock pulses is cut into `slices` equal slices, each
//! addressed by a MIDI note. Playing a slice jumps the tick position to the
//! slice start and retriggers the sample every `quantize` ticks until one
//! slice length has elapsed. Timing follows the raw pulse count, so the
//! loop tracks any tempo the clock source runs at.

use liveset_types::{Param, ParamTarget, SampleBuffer, SlicerConfig, UnitId, VoiceHandle};

use crate::choke::{fade_out, CHOKE_FADE_SECS};
use crate::engine::{log_failure, AudioContext, EngineResult, VoiceRequest};
use crate::unit::PerformanceUnit;

/// Time constant of the fade-in on every retrigger.
const TRIGGER_SMOOTHING: f64 = 0.001;
/// Time constant of pitch-bend detune moves.
const BEND_SMOOTHING: f64 = 0.001;
/// Bend range in cents at full deflection.
pub const BEND_RANGE_CENTS: f32 = 1200.0;

const LOG_TARGET: &str = "liveset::slicer";

pub struct TickScheduler {
    ctx: AudioContext,
    unit: UnitId,
    name: String,

    ticks: u32,
    slices: u32,
    quantize: u32,
    start_note: u8,
    fade_secs: f64,

    buffer: Option<SampleBuffer>,
    detune_cents: f32,

    position: u32,
    /// Ticks since the current slice was triggered
    elapsed: u32,
    playing: bool,
    last_trigger: Option<u32>,
    voice: Option<VoiceHandle>,
}

impl TickScheduler {
    pub fn new(ctx: &AudioContext, name: impl Into<String>, config: &SlicerConfig) -> Self {
        Self {
            ctx: ctx.clone(),
            unit: ctx.allocate_unit(),
            name: name.into(),
            ticks: config.ticks.max(1),
            slices: config.slices.max(1),
            quantize: config.quantize.max(1),
            start_note: config.start_note.min(127),
            fade_secs: CHOKE_FADE_SECS,
            buffer: None,
            detune_cents: 0.0,
            position: 0,
            elapsed: 0,
            playing: false,
            last_trigger: None,
            voice: None,
        }
    }

    pub fn with_fade_secs(mut self, secs: f64) -> Self {
        self.fade_secs = secs;
        self
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Ticks per slice.
    pub fn slice_length(&self) -> f64 {
        self.ticks as f64 / self.slices as f64
    }

    pub fn slices(&self) -> u32 {
        self.slices
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Tick position of the most recent retrigger.
    pub fn last_trigger(&self) -> Option<u32> {
        self.last_trigger
    }

    pub fn active_voice(&self) -> Option<VoiceHandle> {
        self.voice
    }

    pub fn detune_cents(&self) -> f32 {
        self.detune_cents
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    /// Swap the loop sample. Silences the current voice and rewinds.
    pub fn set_buffer(&mut self, buffer: Option<SampleBuffer>) {
        self.choke();
        self.buffer = buffer;
        self.position = 0;
        self.elapsed = 0;
        self.playing = false;
        self.last_trigger = None;
    }

    /// Jump to `index` and start playing it, evaluating the current tick
    /// right away. An index past the last slice stops playback instead.
    pub fn trigger_slice(&mut self, index: u32) -> bool {
        if index >= self.slices {
            log::debug!(target: LOG_TARGET, "{}: slice {} out of range, stopping", self.name, index);
            self.playing = false;
            return false;
        }
        self.position = (self.slice_length() * index as f64).floor() as u32 % self.ticks;
        self.elapsed = 0;
        self.playing = true;
        self.step();
        true
    }

    /// One clock pulse.
    fn step(&mut self) {
        if let Some(buffer) = self.buffer {
            if self.playing && (self.elapsed as f64) < self.slice_length() {
                if self.position % self.quantize == 0 {
                    self.choke();
                    let offset = self.position as f64 / self.ticks as f64 * buffer.duration;
                    match self.start_voice(&buffer, offset) {
                        Ok(voice) => self.voice = Some(voice),
                        Err(e) => log::warn!(target: LOG_TARGET, "{}: retrigger failed: {}", self.name, e),
                    }
                    self.last_trigger = Some(self.position);
                }
            } else {
                self.choke();
            }
        }
        self.position = (self.position + 1) % self.ticks;
        self.elapsed = self.elapsed.saturating_add(1);
    }

    fn start_voice(&self, buffer: &SampleBuffer, offset: f64) -> EngineResult<VoiceHandle> {
        let now = self.ctx.now();
        let voice = self.ctx.engine().create_voice(&VoiceRequest {
            unit: self.unit,
            source: buffer.id,
            start_offset: offset,
            pitch_offset_cents: self.detune_cents,
            gain: 0.0,
            when: now,
        })?;
        // the voice is tracked either way so a later choke can reach it
        log_failure(
            LOG_TARGET,
            "fade in",
            self.ctx
                .smooth(ParamTarget::voice(voice, Param::Gain), 1.0, TRIGGER_SMOOTHING),
        );
        log::trace!(target: LOG_TARGET, "{}: {} at tick {} offset {:.3}s", self.name, voice, self.position, offset);
        Ok(voice)
    }

    fn choke(&mut self) {
        if let Some(voice) = self.voice.take() {
            log_failure(LOG_TARGET, "choke", fade_out(&self.ctx, voice, self.fade_secs));
        }
    }
}

impl PerformanceUnit for TickScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn note_on(&mut self, pitch: u8, _velocity: u8) {
        match pitch.checked_sub(self.start_note) {
            Some(index) => {
                self.trigger_slice(index as u32);
            }
            None => self.playing = false,
        }
    }

    fn pitch_bend(&mut self, value: f32) {
        let value = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
        self.detune_cents = value * BEND_RANGE_CENTS;
        if let Some(voice) = self.voice {
            log_failure(
                LOG_TARGET,
                "bend",
                self.ctx
                    .smooth(ParamTarget::voice(voice, Param::Detune), self.detune_cents, BEND_SMOOTHING),
            );
        }
    }

    fn clock(&mut self, _timestamp: f64) {
        self.step();
    }

    fn stop(&mut self) {
        self.choke();
        self.playing = false;
    }

    fn voice_ended(&mut self, voice: VoiceHandle) {
        if self.voice == Some(voice) {
            self.voice = None;
        }
    }
}
