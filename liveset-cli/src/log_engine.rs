use std::collections::HashSet;
use std::sync::Mutex;

use liveset_core::engine::{AudioEngine, EngineResult, VoiceRequest};
use liveset_types::{ParamTarget, Ramp, VoiceHandle};

const LOG_TARGET: &str = "liveset::engine";

/// Counters reported after a replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    pub voices_started: usize,
    pub voices_stopped: usize,
    pub param_moves: usize,
    pub cancels: usize,
}

struct State {
    time: f64,
    next_voice: u64,
    live: HashSet<VoiceHandle>,
    stats: EngineStats,
}

/// An engine that renders nothing and logs every operation it is asked
/// to schedule. Time is whatever the replay sets it to.
pub struct LogEngine {
    state: Mutex<State>,
}

impl LogEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                time: 0.0,
                next_voice: 1,
                live: HashSet::new(),
                stats: EngineStats::default(),
            }),
        }
    }

    pub fn set_time(&self, time: f64) {
        if let Ok(mut state) = self.state.lock() {
            state.time = time;
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.state
            .lock()
            .map(|s| s.stats.clone())
            .unwrap_or_default()
    }

    /// Voices started and not yet stopped.
    pub fn live_voices(&self) -> usize {
        self.state.lock().map(|s| s.live.len()).unwrap_or(0)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> EngineResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| "engine state poisoned")?;
        Ok(f(&mut state))
    }
}

impl Default for LogEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for LogEngine {
    fn current_time(&self) -> f64 {
        self.state.lock().map(|s| s.time).unwrap_or(0.0)
    }

    fn create_voice(&self, request: &VoiceRequest) -> EngineResult<VoiceHandle> {
        let voice = self.with_state(|s| {
            let voice = VoiceHandle::new(s.next_voice);
            s.next_voice += 1;
            s.live.insert(voice);
            s.stats.voices_started += 1;
            voice
        })?;
        log::debug!(
            target: LOG_TARGET,
            "{:.4} start {} {} on {} offset {:.3}s detune {:+.0}c gain {:.2}",
            request.when,
            voice,
            request.source,
            request.unit,
            request.start_offset,
            request.pitch_offset_cents,
            request.gain
        );
        Ok(voice)
    }

    fn schedule_stop(&self, voice: VoiceHandle, when: f64) -> EngineResult {
        self.with_state(|s| {
            if s.live.remove(&voice) {
                s.stats.voices_stopped += 1;
            }
        })?;
        log::debug!(target: LOG_TARGET, "{:.4} stop {}", when, voice);
        Ok(())
    }

    fn set_param(&self, target: ParamTarget, value: f32, time: f64, ramp: Ramp) -> EngineResult {
        self.with_state(|s| s.stats.param_moves += 1)?;
        log::debug!(target: LOG_TARGET, "{:.4} {} -> {} ({:?})", time, target, value, ramp);
        Ok(())
    }

    fn cancel_scheduled(&self, target: ParamTarget, time: f64) -> EngineResult {
        self.with_state(|s| s.stats.cancels += 1)?;
        log::trace!(target: LOG_TARGET, "{:.4} hold {}", time, target);
        Ok(())
    }
}
