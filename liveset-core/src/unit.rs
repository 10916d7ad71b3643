use liveset_types::VoiceHandle;

/// Uniform event surface of every voice and effect component.
///
/// The router addresses heterogeneous units through this trait. Every
/// method defaults to a no-op so a unit only implements the events it
/// reacts to.
pub trait PerformanceUnit: Send {
    /// Short name for logs and status output.
    fn name(&self) -> &str;

    fn note_on(&mut self, _pitch: u8, _velocity: u8) {}

    fn note_off(&mut self, _pitch: u8) {}

    fn cc(&mut self, _number: u8, _value: u8) {}

    /// Normalized bend, `-1.0..=1.0`.
    fn pitch_bend(&mut self, _value: f32) {}

    /// One 24 PPQN clock pulse arriving at `timestamp` seconds.
    fn clock(&mut self, _timestamp: f64) {}

    fn start(&mut self) {}

    /// Transport stop or panic. Must be safe to call at any time.
    fn stop(&mut self) {}

    /// A voice this unit may own finished playing on its own.
    fn voice_ended(&mut self, _voice: VoiceHandle) {}
}
