//! Performance components addressed by the router.

mod delay;
mod drums;
mod mixer;
mod synth;

pub use delay::DelayFx;
pub use drums::DrumSampler;
pub use mixer::{MixerChannel, MixerSettings};
pub use synth::MonoSynth;
