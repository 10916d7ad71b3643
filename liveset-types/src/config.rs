use serde::{Deserialize, Serialize};

/// Envelope and glide settings for a mono synth, all durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub glide: f32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            attack: 0.5,
            decay: 0.5,
            sustain: 0.0,
            release: 0.1,
            glide: 0.01,
        }
    }
}

/// Geometry of a sliced loop: `ticks` clock pulses split into `slices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    pub ticks: u32,
    pub slices: u32,
    /// Retrigger only on tick positions divisible by this
    pub quantize: u32,
    /// MIDI note mapped to slice 0
    pub start_note: u8,
}

impl SlicerConfig {
    /// Ticks per slice. May be fractional when `ticks` is not a multiple of `slices`.
    pub fn slice_length(&self) -> f64 {
        self.ticks as f64 / self.slices.max(1) as f64
    }
}

impl Default for SlicerConfig {
    fn default() -> Self {
        // 42 bars of 4/4 at 24 pulses per beat, one slice per beat
        Self {
            ticks: 42 * 24 * 4,
            slices: 42 * 4,
            quantize: 6,
            start_note: 0,
        }
    }
}

/// Per-note settings for a drum sampler pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadConfig {
    /// Pads sharing a group silence each other; `None` plays polyphonically
    pub choke_group: Option<String>,
    pub volume: f32,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            choke_group: None,
            volume: 1.0,
        }
    }
}

impl PadConfig {
    pub fn choked(group: impl Into<String>, volume: f32) -> Self {
        Self {
            choke_group: Some(group.into()),
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_config_default() {
        let env = EnvConfig::default();
        assert_eq!(env.attack, 0.5);
        assert_eq!(env.decay, 0.5);
        assert_eq!(env.sustain, 0.0);
        assert_eq!(env.release, 0.1);
        assert_eq!(env.glide, 0.01);
    }

    #[test]
    fn slicer_default_is_one_slice_per_beat() {
        let cfg = SlicerConfig::default();
        assert_eq!(cfg.slice_length(), 24.0);
    }

    #[test]
    fn slice_length_guards_zero_slices() {
        let cfg = SlicerConfig {
            slices: 0,
            ..SlicerConfig::default()
        };
        assert_eq!(cfg.slice_length(), cfg.ticks as f64);
    }

    #[test]
    fn partial_tables_fill_defaults() {
        let pad: PadConfig = toml::from_str("choke_group = \"h\"").unwrap();
        assert_eq!(pad.choke_group.as_deref(), Some("h"));
        assert_eq!(pad.volume, 1.0);

        let env: EnvConfig = toml::from_str("attack = 0.1").unwrap();
        assert_eq!(env.attack, 0.1);
        assert_eq!(env.release, 0.1);
    }
}
