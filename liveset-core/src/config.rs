use std::path::{Path, PathBuf};

use liveset_types::{EnvConfig, SlicerConfig};
use serde::Deserialize;

use crate::choke::CHOKE_FADE_SECS;
use crate::tempo::{TempoEstimator, DEFAULT_SMOOTHING_WINDOW, MAX_SMOOTHING_WINDOW};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

const LOG_TARGET: &str = "liveset::config";

/// Longest accepted choke fade.
const MAX_FADE_SECS: f64 = 1.0;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    tempo: TempoSection,
    #[serde(default)]
    synth: SynthSection,
    #[serde(default)]
    slicer: SlicerSection,
    #[serde(default)]
    choke: ChokeSection,
    #[serde(default)]
    router: RouterSection,
}

#[derive(Deserialize, Default)]
struct TempoSection {
    smoothing_window: Option<u32>,
}

#[derive(Deserialize, Default)]
struct SynthSection {
    attack: Option<f32>,
    decay: Option<f32>,
    sustain: Option<f32>,
    release: Option<f32>,
    glide: Option<f32>,
}

#[derive(Deserialize, Default)]
struct SlicerSection {
    ticks: Option<u32>,
    slices: Option<u32>,
    quantize: Option<u32>,
    start_note: Option<u8>,
}

#[derive(Deserialize, Default)]
struct ChokeSection {
    fade_secs: Option<f64>,
}

#[derive(Deserialize, Default)]
struct RouterSection {
    use_clock: Option<bool>,
}

/// Rig configuration: embedded defaults with an optional user override.
pub struct Config {
    file: ConfigFile,
}

impl Config {
    /// Embedded defaults merged with `~/.config/liveset/config.toml`.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::embedded(),
        }
    }

    /// Embedded defaults merged with the file at `path`. A missing,
    /// unreadable or malformed file is logged and leaves the defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => config.merge(user),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: LOG_TARGET, "could not read config {}: {}", path.display(), e)
            }
        }
        config
    }

    /// Embedded defaults merged with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::embedded();
        config.merge(user);
        Ok(config)
    }

    fn embedded() -> Self {
        let file = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::warn!(target: LOG_TARGET, "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });
        Self { file }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_tempo(&mut self.file.tempo, user.tempo);
        merge_synth(&mut self.file.synth, user.synth);
        merge_slicer(&mut self.file.slicer, user.slicer);
        if user.choke.fade_secs.is_some() {
            self.file.choke.fade_secs = user.choke.fade_secs;
        }
        if user.router.use_clock.is_some() {
            self.file.router.use_clock = user.router.use_clock;
        }
    }

    /// Tempo smoothing window in pulses (clamped to 1..=64).
    pub fn smoothing_window(&self) -> u32 {
        self.file
            .tempo
            .smoothing_window
            .unwrap_or(DEFAULT_SMOOTHING_WINDOW)
            .clamp(1, MAX_SMOOTHING_WINDOW)
    }

    pub fn tempo_estimator(&self) -> TempoEstimator {
        TempoEstimator::new(self.smoothing_window())
    }

    pub fn synth(&self) -> EnvConfig {
        let fallback = EnvConfig::default();
        let s = &self.file.synth;
        EnvConfig {
            attack: non_negative(s.attack, fallback.attack),
            decay: non_negative(s.decay, fallback.decay),
            sustain: non_negative(s.sustain, fallback.sustain).min(1.0),
            release: non_negative(s.release, fallback.release),
            glide: non_negative(s.glide, fallback.glide),
        }
    }

    pub fn slicer(&self) -> SlicerConfig {
        let fallback = SlicerConfig::default();
        let s = &self.file.slicer;
        SlicerConfig {
            ticks: s.ticks.unwrap_or(fallback.ticks).max(1),
            slices: s.slices.unwrap_or(fallback.slices).max(1),
            quantize: s.quantize.unwrap_or(fallback.quantize).max(1),
            start_note: s.start_note.unwrap_or(fallback.start_note).min(127),
        }
    }

    /// Choke fade in seconds (clamped to 0..=1).
    pub fn choke_fade_secs(&self) -> f64 {
        match self.file.choke.fade_secs {
            Some(secs) if secs.is_finite() => secs.clamp(0.0, MAX_FADE_SECS),
            _ => CHOKE_FADE_SECS,
        }
    }

    /// Whether clock, start and stop messages are followed.
    pub fn use_clock(&self) -> bool {
        self.file.router.use_clock.unwrap_or(true)
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("liveset").join("config.toml"))
}

fn non_negative(value: Option<f32>, fallback: f32) -> f32 {
    match value {
        Some(v) if v.is_finite() => v.max(0.0),
        _ => fallback,
    }
}

fn merge_tempo(base: &mut TempoSection, user: TempoSection) {
    if user.smoothing_window.is_some() {
        base.smoothing_window = user.smoothing_window;
    }
}

fn merge_synth(base: &mut SynthSection, user: SynthSection) {
    if user.attack.is_some() {
        base.attack = user.attack;
    }
    if user.decay.is_some() {
        base.decay = user.decay;
    }
    if user.sustain.is_some() {
        base.sustain = user.sustain;
    }
    if user.release.is_some() {
        base.release = user.release;
    }
    if user.glide.is_some() {
        base.glide = user.glide;
    }
}

fn merge_slicer(base: &mut SlicerSection, user: SlicerSection) {
    if user.ticks.is_some() {
        base.ticks = user.ticks;
    }
    if user.slices.is_some() {
        base.slices = user.slices;
    }
    if user.quantize.is_some() {
        base.quantize = user.quantize;
    }
    if user.start_note.is_some() {
        base.start_note = user.start_note;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_config() {
        let config = Config::embedded();
        assert_eq!(config.smoothing_window(), 4);
        assert_eq!(config.synth(), EnvConfig::default());
        assert_eq!(config.slicer(), SlicerConfig::default());
        assert_eq!(config.choke_fade_secs(), 0.01);
        assert!(config.use_clock());
    }

    #[test]
    fn test_partial_override_keeps_other_fields() {
        let config = Config::from_toml_str(
            r#"
            [synth]
            attack = 0.02

            [router]
            use_clock = false
            "#,
        )
        .unwrap();
        let synth = config.synth();
        assert_eq!(synth.attack, 0.02);
        assert_eq!(synth.decay, 0.5);
        assert!(!config.use_clock());
        assert_eq!(config.smoothing_window(), 4);
    }

    #[test]
    fn test_values_are_clamped() {
        let config = Config::from_toml_str(
            r#"
            [tempo]
            smoothing_window = 500
            [synth]
            sustain = 3.0
            release = -1.0
            [slicer]
            slices = 0
            [choke]
            fade_secs = 9.0
            "#,
        )
        .unwrap();
        assert_eq!(config.smoothing_window(), 64);
        assert_eq!(config.synth().sustain, 1.0);
        assert_eq!(config.synth().release, 0.0);
        assert_eq!(config.slicer().slices, 1);
        assert_eq!(config.choke_fade_secs(), 1.0);
    }

    #[test]
    fn test_malformed_string_is_an_error() {
        assert!(Config::from_toml_str("[tempo]\nsmoothing_window = \"fast\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[slicer]\nticks = 96\nslices = 4").unwrap();
        let config = Config::load_from(file.path());
        let slicer = config.slicer();
        assert_eq!(slicer.ticks, 96);
        assert_eq!(slicer.slices, 4);
        assert_eq!(slicer.quantize, 6);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is [not toml").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.slicer(), SlicerConfig::default());

        let missing = Config::load_from(&dir.path().join("absent.toml"));
        assert!(missing.use_clock());
    }

    #[test]
    fn test_tempo_estimator_uses_window() {
        let config = Config::from_toml_str("[tempo]\nsmoothing_window = 8").unwrap();
        assert_eq!(config.tempo_estimator().window(), 8);
    }
}
