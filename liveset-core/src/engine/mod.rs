//! Audio engine seam: the only operations the control core issues toward
//! the signal-processing side.
//!
//! `AudioEngine` captures what a component *means* to do (start a voice,
//! stop it later, move a parameter) independently of how the engine renders
//! it. Every call is fire-and-forget and scheduled at or after the given
//! time, so handlers never block. `TestEngine` records operations for
//! assertions.

mod test_engine;

pub use test_engine::{TestEngine, TestOp};

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use liveset_types::{BufferId, ParamTarget, Ramp, UnitId, VoiceHandle};

/// Result type for engine operations.
pub type EngineResult<T = ()> = Result<T, EngineError>;

/// Error from an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EngineError {}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError(s.to_string())
    }
}

/// Everything the engine needs to start one sample voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRequest {
    /// Unit whose output the voice is routed to
    pub unit: UnitId,
    pub source: BufferId,
    /// Playback start position inside the buffer, in seconds
    pub start_offset: f64,
    pub pitch_offset_cents: f32,
    /// Initial gain of the voice's envelope
    pub gain: f32,
    /// Engine time at which playback begins
    pub when: f64,
}

/// Semantic-level audio engine trait.
pub trait AudioEngine: Send + Sync {
    /// Current engine time in seconds.
    fn current_time(&self) -> f64;

    /// Start a sample voice and return its handle.
    fn create_voice(&self, request: &VoiceRequest) -> EngineResult<VoiceHandle>;

    /// Stop a voice at the given engine time.
    fn schedule_stop(&self, voice: VoiceHandle, when: f64) -> EngineResult;

    /// Move a parameter toward `value` starting at `time`.
    fn set_param(&self, target: ParamTarget, value: f32, time: f64, ramp: Ramp) -> EngineResult;

    /// Drop every change scheduled for `target` at or after `time`,
    /// holding the value reached at `time`.
    fn cancel_scheduled(&self, target: ParamTarget, time: f64) -> EngineResult;
}

/// Explicit handle to the audio engine, passed to every component at
/// construction. Cloning is cheap and shares the same engine.
#[derive(Clone)]
pub struct AudioContext {
    engine: Arc<dyn AudioEngine>,
    next_unit: Arc<AtomicU32>,
}

impl AudioContext {
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self {
            engine,
            next_unit: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn engine(&self) -> &dyn AudioEngine {
        self.engine.as_ref()
    }

    /// Current engine time in seconds.
    pub fn now(&self) -> f64 {
        self.engine.current_time()
    }

    /// Hand out a fresh unit id for a newly constructed component.
    pub fn allocate_unit(&self) -> UnitId {
        UnitId::new(self.next_unit.fetch_add(1, Ordering::Relaxed))
    }

    /// Exponential approach toward `value`, starting now.
    pub fn smooth(&self, target: ParamTarget, value: f32, time_constant: f64) -> EngineResult {
        self.engine
            .set_param(target, value, self.now(), Ramp::target(time_constant))
    }

    /// Jump to `value` now.
    pub fn set_now(&self, target: ParamTarget, value: f32) -> EngineResult {
        self.engine.set_param(target, value, self.now(), Ramp::Set)
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}

/// Log a failed engine call and carry on. Live performance never stops on
/// an engine error.
pub(crate) fn log_failure(target: &str, what: &str, result: EngineResult) {
    if let Err(e) = result {
        log::warn!(target: target, "{} failed: {}", what, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveset_types::Param;

    #[test]
    fn context_allocates_distinct_units() {
        let ctx = AudioContext::new(Arc::new(TestEngine::new()));
        let a = ctx.allocate_unit();
        let b = ctx.clone().allocate_unit();
        assert_ne!(a, b);
    }

    #[test]
    fn smooth_schedules_target_ramp_at_now() {
        let engine = Arc::new(TestEngine::new());
        engine.set_time(2.5);
        let ctx = AudioContext::new(engine.clone());
        let target = ParamTarget::unit(UnitId::new(1), Param::Volume);
        ctx.smooth(target, 0.5, 0.01).unwrap();

        assert_eq!(
            engine.operations(),
            vec![TestOp::SetParam {
                target,
                value: 0.5,
                time: 2.5,
                ramp: Ramp::Target { time_constant: 0.01 },
            }]
        );
    }

    #[test]
    fn engine_error_display() {
        let e = EngineError::from("no server");
        assert_eq!(e.to_string(), "no server");
    }
}
