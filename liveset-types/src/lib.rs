//! # liveset-types
//!
//! Shared type definitions for the liveset performance core.
//! Identifiers, parameter addressing and the serde-backed configuration
//! values that both the core and the binary read.

mod config;
mod param;

pub use config::{EnvConfig, PadConfig, SlicerConfig};
pub use param::{NodeRef, Param, ParamTarget, Ramp};

/// Opaque handle to a sound playing in the audio engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct VoiceHandle(u64);

impl VoiceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifier of a decoded sample buffer owned by the audio engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct BufferId(u32);

impl BufferId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buf{}", self.0)
    }
}

/// Identifier of a performance unit (synth, slicer, mixer channel, ...).
/// Allocated by the audio context at construction time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(u32);

impl UnitId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A decoded sample as seen by the control core: just its engine id and length.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SampleBuffer {
    pub id: BufferId,
    /// Duration in seconds
    pub duration: f64,
}

impl SampleBuffer {
    pub fn new(id: BufferId, duration: f64) -> Self {
        Self {
            id,
            duration: duration.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(VoiceHandle::new(7).to_string(), "v7");
        assert_eq!(BufferId::new(3).to_string(), "buf3");
        assert_eq!(UnitId::new(12).to_string(), "u12");
    }

    #[test]
    fn sample_buffer_rejects_negative_duration() {
        let buf = SampleBuffer::new(BufferId::new(1), -2.0);
        assert_eq!(buf.duration, 0.0);
    }
}
