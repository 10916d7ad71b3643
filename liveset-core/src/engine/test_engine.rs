use std::collections::HashSet;
use std::sync::Mutex;

use liveset_types::{Param, ParamTarget, Ramp, VoiceHandle};

use super::{AudioEngine, EngineError, EngineResult, VoiceRequest};

/// Recorded engine operation for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    CreateVoice {
        voice: VoiceHandle,
        request: VoiceRequest,
    },
    ScheduleStop {
        voice: VoiceHandle,
        when: f64,
    },
    SetParam {
        target: ParamTarget,
        value: f32,
        time: f64,
        ramp: Ramp,
    },
    Cancel {
        target: ParamTarget,
        time: f64,
    },
}

struct Inner {
    ops: Vec<TestOp>,
    time: f64,
    next_voice: u64,
    failing: bool,
    failing_params: bool,
}

/// A test engine that records all operations into a vector for assertions.
/// Time only moves when the test says so. Uses `Mutex` for interior
/// mutability so the engine is `Send + Sync`.
pub struct TestEngine {
    inner: Mutex<Inner>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ops: Vec::new(),
                time: 0.0,
                next_voice: 1,
                failing: false,
                failing_params: false,
            }),
        }
    }

    pub fn set_time(&self, time: f64) {
        self.inner.lock().unwrap().time = time;
    }

    pub fn advance(&self, secs: f64) {
        self.inner.lock().unwrap().time += secs;
    }

    /// Make every subsequent operation fail (nothing is recorded).
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    /// Make only `set_param` fail; voices still start and stop.
    pub fn set_failing_params(&self, failing: bool) {
        self.inner.lock().unwrap().failing_params = failing;
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        self.inner.lock().unwrap().ops.clone()
    }

    /// Clear recorded operations.
    pub fn clear(&self) {
        self.inner.lock().unwrap().ops.clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.inner.lock().unwrap().ops.iter().filter(|op| f(op)).count()
    }

    /// Return the requests of all created voices, in order.
    pub fn voices_created(&self) -> Vec<(VoiceHandle, VoiceRequest)> {
        self.inner
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                TestOp::CreateVoice { voice, request } => Some((*voice, request.clone())),
                _ => None,
            })
            .collect()
    }

    /// Return every voice that received a stop.
    pub fn voices_stopped(&self) -> Vec<VoiceHandle> {
        self.inner
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                TestOp::ScheduleStop { voice, .. } => Some(*voice),
                _ => None,
            })
            .collect()
    }

    /// Voices created and never stopped.
    pub fn active_voices(&self) -> Vec<VoiceHandle> {
        let stopped: HashSet<VoiceHandle> = self.voices_stopped().into_iter().collect();
        self.voices_created()
            .into_iter()
            .map(|(v, _)| v)
            .filter(|v| !stopped.contains(v))
            .collect()
    }

    /// Last value scheduled for a target, if any.
    pub fn last_value(&self, target: ParamTarget) -> Option<f32> {
        self.inner
            .lock()
            .unwrap()
            .ops
            .iter()
            .rev()
            .find_map(|op| match op {
                TestOp::SetParam { target: t, value, .. } if *t == target => Some(*value),
                _ => None,
            })
    }

    /// All `SetParam` operations touching `param` on any node.
    pub fn param_changes(&self, param: Param) -> Vec<(f32, f64, Ramp)> {
        self.inner
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                TestOp::SetParam {
                    target,
                    value,
                    time,
                    ramp,
                } if target.param == param => Some((*value, *time, *ramp)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: TestOp) -> EngineResult {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing {
            return Err(EngineError::from("test engine failing"));
        }
        inner.ops.push(op);
        Ok(())
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for TestEngine {
    fn current_time(&self) -> f64 {
        self.inner.lock().unwrap().time
    }

    fn create_voice(&self, request: &VoiceRequest) -> EngineResult<VoiceHandle> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing {
            return Err(EngineError::from("test engine failing"));
        }
        let voice = VoiceHandle::new(inner.next_voice);
        inner.next_voice += 1;
        inner.ops.push(TestOp::CreateVoice {
            voice,
            request: request.clone(),
        });
        Ok(voice)
    }

    fn schedule_stop(&self, voice: VoiceHandle, when: f64) -> EngineResult {
        self.record(TestOp::ScheduleStop { voice, when })
    }

    fn set_param(&self, target: ParamTarget, value: f32, time: f64, ramp: Ramp) -> EngineResult {
        if self.inner.lock().unwrap().failing_params {
            return Err(EngineError::from("test engine rejecting params"));
        }
        self.record(TestOp::SetParam {
            target,
            value,
            time,
            ramp,
        })
    }

    fn cancel_scheduled(&self, target: ParamTarget, time: f64) -> EngineResult {
        self.record(TestOp::Cancel { target, time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveset_types::{BufferId, UnitId};

    fn request() -> VoiceRequest {
        VoiceRequest {
            unit: UnitId::new(1),
            source: BufferId::new(1),
            start_offset: 0.0,
            pitch_offset_cents: 0.0,
            gain: 1.0,
            when: 0.0,
        }
    }

    #[test]
    fn active_voices_excludes_stopped() {
        let engine = TestEngine::new();
        let a = engine.create_voice(&request()).unwrap();
        let b = engine.create_voice(&request()).unwrap();
        engine.schedule_stop(a, 0.01).unwrap();
        assert_eq!(engine.active_voices(), vec![b]);
    }

    #[test]
    fn failing_engine_records_nothing() {
        let engine = TestEngine::new();
        engine.set_failing(true);
        assert!(engine.create_voice(&request()).is_err());
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn failing_params_still_start_and_stop_voices() {
        let engine = TestEngine::new();
        engine.set_failing_params(true);
        let a = engine.create_voice(&request()).unwrap();
        let target = ParamTarget::voice(a, Param::Gain);
        assert!(engine.set_param(target, 0.0, 0.0, Ramp::Set).is_err());
        engine.schedule_stop(a, 0.01).unwrap();
        assert!(engine.active_voices().is_empty());
    }
}
