use liveset_types::{PadConfig, SampleBuffer, UnitId, VoiceHandle};

use crate::choke::ChokeGroupArbiter;
use crate::engine::{AudioContext, VoiceRequest};
use crate::unit::PerformanceUnit;

const LOG_TARGET: &str = "liveset::drums";

struct Pad {
    config: PadConfig,
    buffer: Option<SampleBuffer>,
}

/// One-shot sample player with one pad per note of a contiguous range.
pub struct DrumSampler {
    ctx: AudioContext,
    unit: UnitId,
    name: String,
    first_note: u8,
    pads: Vec<Pad>,
    arbiter: ChokeGroupArbiter,
}

impl DrumSampler {
    /// Pads cover `first_note..=last_note`; the bounds may come in either order.
    pub fn new(ctx: &AudioContext, name: impl Into<String>, first_note: u8, last_note: u8) -> Self {
        let lo = first_note.min(last_note).min(127);
        let hi = first_note.max(last_note).min(127);
        let pads = (lo..=hi)
            .map(|_| Pad {
                config: PadConfig::default(),
                buffer: None,
            })
            .collect();
        Self {
            ctx: ctx.clone(),
            unit: ctx.allocate_unit(),
            name: name.into(),
            first_note: lo,
            pads,
            arbiter: ChokeGroupArbiter::default(),
        }
    }

    pub fn with_fade_secs(mut self, secs: f64) -> Self {
        self.arbiter = ChokeGroupArbiter::new(secs);
        self
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Note range covered by the pads.
    pub fn notes(&self) -> std::ops::RangeInclusive<u8> {
        self.first_note..=self.first_note + (self.pads.len() - 1) as u8
    }

    /// Configure a pad. Returns false if `note` has no pad.
    pub fn configure(&mut self, note: u8, config: PadConfig) -> bool {
        match self.pad_mut(note) {
            Some(pad) => {
                pad.config = config;
                true
            }
            None => {
                log::debug!(target: LOG_TARGET, "no pad for note {}", note);
                false
            }
        }
    }

    pub fn pad_config(&self, note: u8) -> Option<&PadConfig> {
        self.pad(note).map(|pad| &pad.config)
    }

    /// Assign the sample a pad plays. Returns false if `note` has no pad.
    pub fn set_buffer(&mut self, note: u8, buffer: Option<SampleBuffer>) -> bool {
        match self.pad_mut(note) {
            Some(pad) => {
                pad.buffer = buffer;
                true
            }
            None => false,
        }
    }

    pub fn arbiter(&self) -> &ChokeGroupArbiter {
        &self.arbiter
    }

    fn index(&self, note: u8) -> Option<usize> {
        let index = note.checked_sub(self.first_note)? as usize;
        (index < self.pads.len()).then_some(index)
    }

    fn pad(&self, note: u8) -> Option<&Pad> {
        self.index(note).map(|i| &self.pads[i])
    }

    fn pad_mut(&mut self, note: u8) -> Option<&mut Pad> {
        let index = self.index(note)?;
        self.pads.get_mut(index)
    }
}

impl PerformanceUnit for DrumSampler {
    fn name(&self) -> &str {
        &self.name
    }

    fn note_on(&mut self, pitch: u8, velocity: u8) {
        let Some(index) = self.index(pitch) else {
            return;
        };
        let pad = &self.pads[index];
        let Some(buffer) = pad.buffer else {
            log::debug!(target: LOG_TARGET, "{}: pad {} has no sample", self.name, pitch);
            return;
        };
        let gain = pad.config.volume * velocity.min(127) as f32 / 127.0;
        let unit = self.unit;
        let group = pad.config.choke_group.clone();

        let result = self.arbiter.trigger(&self.ctx, group.as_deref(), |ctx| {
            ctx.engine().create_voice(&VoiceRequest {
                unit,
                source: buffer.id,
                start_offset: 0.0,
                pitch_offset_cents: 0.0,
                gain,
                when: ctx.now(),
            })
        });
        if let Err(e) = result {
            log::warn!(target: LOG_TARGET, "{}: pad {} failed: {}", self.name, pitch, e);
        }
    }

    fn stop(&mut self) {
        self.arbiter.stop_all(&self.ctx);
    }

    fn voice_ended(&mut self, voice: VoiceHandle) {
        self.arbiter.voice_ended(voice);
    }
}
