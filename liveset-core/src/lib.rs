//! # liveset-core
//!
//! Real-time control core of a MIDI-performed modular rig. Turns note,
//! controller and clock messages into parameter moves and voice starts that
//! an audio engine renders ahead of real time.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use liveset_core::config::Config;
//! use liveset_core::engine::{AudioContext, TestEngine};
//! use liveset_core::router::MidiRouter;
//! use liveset_core::units::MonoSynth;
//!
//! let config = Config::load();
//! let ctx = AudioContext::new(Arc::new(TestEngine::new()));
//!
//! let mut router = MidiRouter::new(config.use_clock());
//! router.connect(2, Box::new(MonoSynth::new(&ctx, "bass", &config.synth())));
//! router.handle_bytes(ctx.now(), &[0x91, 60, 100]);
//! ```
//!
//! ## Module Overview
//!
//! - [`engine`]: `AudioEngine` trait, `AudioContext` handle, recording `TestEngine`
//! - [`curve`]: normalization, shaping curves, `ControlBinding`, three-way banding
//! - [`tempo`]: `TempoEstimator` over a 24 PPQN pulse train
//! - [`choke`]: `ChokeGroupArbiter`, one voice per group
//! - [`envelope`]: `VoiceEnvelope`, monophonic note stack with legato envelope
//! - [`slicer`]: `TickScheduler`, tick-quantized slice playback
//! - [`unit`]: `PerformanceUnit`, the method set every component exposes
//! - [`units`]: synth, drum sampler, delay and mixer channel components
//! - [`midi`] / [`router`]: raw MIDI parsing and per-channel dispatch
//! - [`config`]: TOML configuration (embedded defaults + user override)

pub mod choke;
pub mod config;
pub mod curve;
pub mod engine;
pub mod envelope;
pub mod midi;
pub mod router;
pub mod slicer;
pub mod tempo;
pub mod unit;
pub mod units;

pub use engine::{AudioContext, AudioEngine, EngineError, EngineResult, VoiceRequest};
pub use unit::PerformanceUnit;

/// Shortest duration ever scheduled: one sample at 48 kHz.
pub(crate) const MIN_TIME: f64 = 1.0 / 48_000.0;
