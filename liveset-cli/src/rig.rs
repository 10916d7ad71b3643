//! The performance rig: which unit listens on which MIDI channel.

use liveset_core::config::Config;
use liveset_core::engine::AudioContext;
use liveset_core::router::MidiRouter;
use liveset_core::slicer::TickScheduler;
use liveset_core::units::{DelayFx, DrumSampler, MixerChannel, MixerSettings, MonoSynth};
use liveset_types::{BufferId, PadConfig, SampleBuffer};

pub const DRUMS_CHANNEL: u8 = 1;
pub const BASS_CHANNEL: u8 = 2;
pub const LEAD_CHANNEL: u8 = 3;
pub const SLICER_CHANNEL: u8 = 4;
pub const ONESHOTS_CHANNEL: u8 = 5;
pub const DELAY_CHANNEL: u8 = 7;
/// Channel strips start here, in the order of `STRIPS`.
pub const FIRST_STRIP_CHANNEL: u8 = 8;

/// Placeholder length of every drum and one-shot sample.
pub const PAD_SAMPLE_SECS: f64 = 1.0;

const LOOP_BUFFER: u32 = 1;
const DRUM_BUFFER_BASE: u32 = 100;
const ONESHOT_BUFFER_BASE: u32 = 200;

const DRUM_NOTES: (u8, u8) = (36, 63);
const ONESHOT_NOTES: (u8, u8) = (36, 43);

/// `(note, volume)` of the ungrouped drum pads that are not at unity.
const DRUM_VOLUMES: &[(u8, f32)] = &[
    (36, 1.2),
    (37, 0.5),
    (39, 0.7),
    (48, 0.7),
    (56, 0.5),
    (57, 0.7),
    (58, 0.7),
    (59, 0.7),
    (40, 0.5),
    (42, 0.5),
    (44, 0.5),
    (49, 0.6),
    (51, 0.6),
    (53, 0.6),
];

/// Hi-hat pads, all in choke group "h".
const HAT_VOLUMES: &[(u8, f32)] = &[(41, 0.3), (43, 0.3), (50, 0.5), (52, 0.3), (54, 0.5), (63, 0.5)];

fn strips() -> [(&'static str, MixerSettings); 7] {
    let ducked = |duck_amount: f32, high_pass: f32| MixerSettings {
        duck_amount,
        high_pass,
        ..MixerSettings::default()
    };
    [
        ("drums-strip", MixerSettings::default()),
        ("bass-strip", ducked(0.9, 0.0)),
        ("lead-strip", ducked(1.0, 100.0)),
        ("slicer-strip", ducked(0.8, 0.0)),
        ("oneshots-strip", ducked(0.8, 0.0)),
        ("reverb-strip", ducked(0.8, 100.0)),
        (
            "delay-strip",
            MixerSettings {
                duck_amount: 1.0,
                high_pass: 200.0,
                volume: 1.0,
                reverb: 0.1,
            },
        ),
    ]
}

fn drums(ctx: &AudioContext, fade: f64) -> DrumSampler {
    let (lo, hi) = DRUM_NOTES;
    let mut drums = DrumSampler::new(ctx, "drums", lo, hi).with_fade_secs(fade);
    for &(note, volume) in DRUM_VOLUMES {
        drums.configure(note, PadConfig { choke_group: None, volume });
    }
    for &(note, volume) in HAT_VOLUMES {
        drums.configure(note, PadConfig::choked("h", volume));
    }
    for note in drums.notes() {
        let id = BufferId::new(DRUM_BUFFER_BASE + note as u32);
        drums.set_buffer(note, Some(SampleBuffer::new(id, PAD_SAMPLE_SECS)));
    }
    drums
}

fn oneshots(ctx: &AudioContext, fade: f64) -> DrumSampler {
    let (lo, hi) = ONESHOT_NOTES;
    let mut oneshots = DrumSampler::new(ctx, "oneshots", lo, hi).with_fade_secs(fade);
    oneshots.configure(36, PadConfig::choked("p", 1.5));
    oneshots.configure(37, PadConfig::choked("p", 0.5));
    for note in 39..=43 {
        oneshots.configure(note, PadConfig::choked("l", 1.0));
    }
    for note in oneshots.notes() {
        let id = BufferId::new(ONESHOT_BUFFER_BASE + note as u32);
        oneshots.set_buffer(note, Some(SampleBuffer::new(id, PAD_SAMPLE_SECS)));
    }
    oneshots
}

/// Build every unit and connect it to its channel.
pub fn build(ctx: &AudioContext, config: &Config, loop_secs: f64) -> MidiRouter {
    let fade = config.choke_fade_secs();
    let mut router = MidiRouter::new(config.use_clock());

    router.connect(DRUMS_CHANNEL, Box::new(drums(ctx, fade)));
    router.connect(BASS_CHANNEL, Box::new(MonoSynth::new(ctx, "bass", &config.synth())));
    router.connect(LEAD_CHANNEL, Box::new(MonoSynth::new(ctx, "lead", &config.synth())));

    let mut slicer = TickScheduler::new(ctx, "slicer", &config.slicer()).with_fade_secs(fade);
    slicer.set_buffer(Some(SampleBuffer::new(BufferId::new(LOOP_BUFFER), loop_secs)));
    router.connect(SLICER_CHANNEL, Box::new(slicer));

    router.connect(ONESHOTS_CHANNEL, Box::new(oneshots(ctx, fade)));
    router.connect(DELAY_CHANNEL, Box::new(DelayFx::new(ctx, "delay", config.tempo_estimator())));

    for (channel, (name, settings)) in (FIRST_STRIP_CHANNEL..).zip(strips()) {
        router.connect(channel, Box::new(MixerChannel::new(ctx, name, &settings)));
    }

    log::info!(target: "liveset::router", "rig ready: {} units", router.unit_count());
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_engine::LogEngine;
    use std::sync::Arc;

    #[test]
    fn rig_layout() {
        let ctx = AudioContext::new(Arc::new(LogEngine::new()));
        let config = Config::from_toml_str("").unwrap();
        let router = build(&ctx, &config, 8.0);

        let units: Vec<(u8, &str)> = router.units().collect();
        assert_eq!(units.len(), 13);
        assert_eq!(units[0], (1, "drums"));
        assert_eq!(units[3], (4, "slicer"));
        assert_eq!(units[5], (7, "delay"));
        assert_eq!(units[6], (8, "drums-strip"));
        assert_eq!(units[12], (14, "delay-strip"));
    }

    #[test]
    fn hats_share_a_choke_group() {
        let ctx = AudioContext::new(Arc::new(LogEngine::new()));
        let drums = drums(&ctx, 0.01);
        for &(note, _) in HAT_VOLUMES {
            assert_eq!(drums.pad_config(note).unwrap().choke_group.as_deref(), Some("h"));
        }
        assert_eq!(drums.pad_config(36).unwrap().volume, 1.2);
        assert_eq!(drums.pad_config(38).unwrap().volume, 1.0);
    }
}
