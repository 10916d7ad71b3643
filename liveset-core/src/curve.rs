//! Control curves: turning 7-bit controller values into shaped, smoothed
//! parameter targets.
//!
//! Everything here is a pure function of the raw value. Mapped
//! destinations never jump; `ControlBinding::apply` always schedules an
//! exponential approach with a destination-specific time constant.

use liveset_types::{Param, ParamTarget, UnitId};

use crate::engine::{AudioContext, EngineResult};

pub const MIDI_MAX: u8 = 127;

/// Raw values in `NEUTRAL_LOW..=NEUTRAL_HIGH` pin dual-opposed controls
/// to their neutral position.
pub const NEUTRAL_LOW: u8 = 63;
pub const NEUTRAL_HIGH: u8 = 64;

/// Map `raw` from `lo..=hi` onto `0.0..=1.0`, clamping outside values.
pub fn normalize(raw: f32, lo: f32, hi: f32) -> f32 {
    if hi <= lo || !raw.is_finite() {
        return 0.0;
    }
    ((raw - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// `normalize` over the full MIDI data range.
pub fn midi_float(raw: u8) -> f32 {
    normalize(raw as f32, 0.0, MIDI_MAX as f32)
}

pub fn square(x: f32) -> f32 {
    x * x
}

pub fn cube(x: f32) -> f32 {
    x * x * x
}

/// Shaping curve applied after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    /// General perceptual mapping
    Square,
    /// Extra resolution near zero for sends and volumes
    Cube,
}

impl Curve {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Curve::Linear => x,
            Curve::Square => square(x),
            Curve::Cube => cube(x),
        }
    }
}

/// `curve(x * in_scale + in_offset) * out_scale + out_offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub curve: Curve,
    pub in_scale: f32,
    pub in_offset: f32,
    pub out_scale: f32,
    pub out_offset: f32,
}

impl Mapping {
    pub const fn new(curve: Curve) -> Self {
        Self {
            curve,
            in_scale: 1.0,
            in_offset: 0.0,
            out_scale: 1.0,
            out_offset: 0.0,
        }
    }

    pub const fn linear() -> Self {
        Self::new(Curve::Linear)
    }

    pub const fn square() -> Self {
        Self::new(Curve::Square)
    }

    pub const fn cube() -> Self {
        Self::new(Curve::Cube)
    }

    /// Transform the normalized input before the curve.
    pub const fn input(mut self, scale: f32, offset: f32) -> Self {
        self.in_scale = scale;
        self.in_offset = offset;
        self
    }

    /// Transform the curve output.
    pub const fn output(mut self, scale: f32, offset: f32) -> Self {
        self.out_scale = scale;
        self.out_offset = offset;
        self
    }

    /// Map a normalized `0.0..=1.0` value.
    pub fn map(&self, x: f32) -> f32 {
        self.curve.apply(x * self.in_scale + self.in_offset) * self.out_scale + self.out_offset
    }

    /// Map a raw controller value.
    pub fn map_raw(&self, raw: u8) -> f32 {
        self.map(midi_float(raw))
    }
}

/// Which side of a dual-opposed control a raw value falls on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Band {
    /// Below the neutral band; `x` is `raw` normalized over `0..63`
    Low { raw: u8, x: f32 },
    /// 63 or 64
    Neutral,
    /// Above the neutral band; `x` is `raw` normalized over `64..127`
    High { raw: u8, x: f32 },
}

/// Split a raw value into three bands. The two-value neutral band keeps a
/// knob resting near the centre from flickering between the outer bands.
pub fn band(raw: u8) -> Band {
    let raw = raw.min(MIDI_MAX);
    if raw > NEUTRAL_HIGH {
        Band::High {
            raw,
            x: normalize(raw as f32, NEUTRAL_HIGH as f32, MIDI_MAX as f32),
        }
    } else if raw < NEUTRAL_LOW {
        Band::Low {
            raw,
            x: normalize(raw as f32, 0.0, NEUTRAL_LOW as f32),
        }
    } else {
        Band::Neutral
    }
}

/// A controller number bound to one parameter of a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlBinding {
    pub cc: u8,
    pub mapping: Mapping,
    pub param: Param,
    /// Time constant of the exponential approach, in seconds
    pub smoothing: f64,
}

impl ControlBinding {
    pub const fn new(cc: u8, mapping: Mapping, param: Param, smoothing: f64) -> Self {
        Self {
            cc,
            mapping,
            param,
            smoothing,
        }
    }

    /// Target value for a raw controller value.
    pub fn value(&self, raw: u8) -> f32 {
        self.mapping.map_raw(raw)
    }

    /// Schedule the smoothed move for `raw` on `unit`.
    pub fn apply(&self, ctx: &AudioContext, unit: UnitId, raw: u8) -> EngineResult {
        ctx.smooth(
            ParamTarget::unit(unit, self.param),
            self.value(raw),
            self.smoothing,
        )
    }
}

/// Apply every binding registered for `cc`. Returns whether any matched.
pub fn apply_bindings(
    bindings: &[ControlBinding],
    ctx: &AudioContext,
    unit: UnitId,
    cc: u8,
    raw: u8,
    log_target: &str,
) -> bool {
    let mut matched = false;
    for binding in bindings.iter().filter(|b| b.cc == cc) {
        matched = true;
        crate::engine::log_failure(log_target, "control binding", binding.apply(ctx, unit, raw));
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_endpoints() {
        assert_eq!(midi_float(0), 0.0);
        assert_eq!(midi_float(127), 1.0);
        assert_eq!(normalize(64.0, 64.0, 127.0), 0.0);
        assert_eq!(normalize(127.0, 64.0, 127.0), 1.0);
    }

    #[test]
    fn normalize_clamps_out_of_range() {
        assert_eq!(midi_float(200), 1.0);
        assert_eq!(normalize(-5.0, 0.0, 127.0), 0.0);
        assert_eq!(normalize(10.0, 5.0, 5.0), 0.0);
        assert_eq!(normalize(f32::NAN, 0.0, 1.0), 0.0);
    }

    #[test]
    fn curves_hit_endpoints() {
        for curve in [Curve::Linear, Curve::Square, Curve::Cube] {
            assert_eq!(curve.apply(0.0), 0.0);
            assert_eq!(curve.apply(1.0), 1.0);
        }
        assert_eq!(Curve::Square.apply(0.5), 0.25);
        assert_eq!(Curve::Cube.apply(0.5), 0.125);
    }

    #[test]
    fn mapping_input_and_output_transforms() {
        // square(2x - 1) * 1200
        let m = Mapping::square().input(2.0, -1.0).output(1200.0, 0.0);
        assert_eq!(m.map(0.5), 0.0);
        assert_eq!(m.map(1.0), 1200.0);
        assert_eq!(m.map(0.0), 1200.0);

        // 16 - 15x
        let bits = Mapping::linear().output(-15.0, 16.0);
        assert_eq!(bits.map_raw(0), 16.0);
        assert_eq!(bits.map_raw(127), 1.0);
    }

    #[test]
    fn neutral_band_is_63_and_64() {
        assert_eq!(band(63), Band::Neutral);
        assert_eq!(band(64), Band::Neutral);
        assert!(matches!(band(62), Band::Low { raw: 62, .. }));
        assert!(matches!(band(65), Band::High { raw: 65, .. }));
    }

    #[test]
    fn band_positions_span_each_side() {
        assert_eq!(band(0), Band::Low { raw: 0, x: 0.0 });
        assert_eq!(band(127), Band::High { raw: 127, x: 1.0 });
        match band(62) {
            Band::Low { x, .. } => assert!((x - 62.0 / 63.0).abs() < 1e-6),
            other => panic!("expected low band, got {:?}", other),
        }
    }

    #[test]
    fn band_clamps_raw() {
        assert_eq!(band(255), Band::High { raw: 127, x: 1.0 });
    }

    #[test]
    fn binding_value_uses_mapping() {
        let b = ControlBinding::new(1, Mapping::cube().input(1.5, 0.0), Param::Volume, 0.01);
        assert_eq!(b.value(0), 0.0);
        assert!((b.value(127) - 3.375).abs() < 1e-5);
    }
}
