//! Choke groups: mutually exclusive sample triggers.
//!
//! A group key names a set of trigger sources of which at most one may
//! sound at a time (open/closed hi-hats are the classic case). Starting a
//! voice in an occupied group fades the previous voice out first.

use std::collections::HashMap;

use liveset_types::{Param, ParamTarget, Ramp, VoiceHandle};

use crate::engine::{AudioContext, EngineResult};

/// Fade applied to a choked voice before it is stopped.
pub const CHOKE_FADE_SECS: f64 = 0.01;

/// Fade a voice to silence and stop it once the fade has run.
///
/// The gain ramp is issued before the stop so the engine never cuts a
/// voice mid-waveform. The stop is issued even when the ramp is rejected;
/// the first error is returned afterwards.
pub fn fade_out(ctx: &AudioContext, voice: VoiceHandle, fade_secs: f64) -> EngineResult {
    let now = ctx.now();
    let fade = fade_secs.max(crate::MIN_TIME);
    let ramp = ctx.engine().set_param(
        ParamTarget::voice(voice, Param::Gain),
        0.0,
        now,
        Ramp::target(fade / 10.0),
    );
    let stop = ctx.engine().schedule_stop(voice, now + fade);
    ramp.and(stop)
}

/// Tracks the single active voice of each choke group.
#[derive(Debug, Clone)]
pub struct ChokeGroupArbiter {
    active: HashMap<String, VoiceHandle>,
    fade_secs: f64,
}

impl ChokeGroupArbiter {
    pub fn new(fade_secs: f64) -> Self {
        Self {
            active: HashMap::new(),
            fade_secs,
        }
    }

    pub fn fade_secs(&self) -> f64 {
        self.fade_secs
    }

    /// Start a voice through the arbiter.
    ///
    /// With a group, the group's current voice (if any) is choked before
    /// `start` runs, and the new voice becomes the group's active voice.
    /// Without a group the voice plays polyphonically and is not tracked.
    pub fn trigger<F>(
        &mut self,
        ctx: &AudioContext,
        group: Option<&str>,
        start: F,
    ) -> EngineResult<VoiceHandle>
    where
        F: FnOnce(&AudioContext) -> EngineResult<VoiceHandle>,
    {
        if let Some(group) = group {
            self.choke(ctx, group);
        }

        let voice = start(ctx)?;
        if let Some(group) = group {
            log::trace!(target: "liveset::choke", "group {:?} -> {}", group, voice);
            self.active.insert(group.to_string(), voice);
        }
        Ok(voice)
    }

    /// Silence the group's active voice. Returns the choked handle.
    pub fn choke(&mut self, ctx: &AudioContext, group: &str) -> Option<VoiceHandle> {
        let voice = self.active.remove(group)?;
        if let Err(e) = fade_out(ctx, voice, self.fade_secs) {
            log::warn!(target: "liveset::choke", "choking {} in {:?} failed: {}", voice, group, e);
        }
        Some(voice)
    }

    /// A voice finished on its own. Only clears the slot that still holds
    /// this exact voice, so a late completion never evicts a newer voice.
    pub fn voice_ended(&mut self, voice: VoiceHandle) -> bool {
        let group = self
            .active
            .iter()
            .find(|(_, v)| **v == voice)
            .map(|(g, _)| g.clone());
        match group {
            Some(group) => {
                self.active.remove(&group);
                true
            }
            None => false,
        }
    }

    /// Choke every group. No-op when nothing is playing.
    pub fn stop_all(&mut self, ctx: &AudioContext) {
        let groups: Vec<String> = self.active.keys().cloned().collect();
        for group in groups {
            self.choke(ctx, &group);
        }
    }

    pub fn active(&self, group: &str) -> Option<VoiceHandle> {
        self.active.get(group).copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for ChokeGroupArbiter {
    fn default() -> Self {
        Self::new(CHOKE_FADE_SECS)
    }
}
