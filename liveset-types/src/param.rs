use serde::{Deserialize, Serialize};

use crate::{UnitId, VoiceHandle};

/// Named control inputs exposed by the audio engine's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    // mono synth
    /// Note value in cents relative to A4 (pitch 69)
    Pitch,
    /// Pitch-bend offset in cents
    PitchOffset,
    Envelope,
    Amp,
    FilterCutoff,
    FilterResonance,
    FilterEnvAmount,
    SquareLevel,
    SawLevel,
    SubLevel,
    NoiseLevel,
    OscDetune,
    Vibrato,
    // sample voices
    Gain,
    Detune,
    // delay
    DelayTime,
    Feedback,
    // mixer channel
    InputGain,
    Volume,
    ReverbSend,
    DelaySend,
    LowPass,
    HighPass,
    BitDepth,
    RateReduction,
}

impl Param {
    pub fn name(&self) -> &'static str {
        match self {
            Param::Pitch => "pitch",
            Param::PitchOffset => "pitch_offset",
            Param::Envelope => "envelope",
            Param::Amp => "amp",
            Param::FilterCutoff => "cutoff",
            Param::FilterResonance => "resonance",
            Param::FilterEnvAmount => "filter_env",
            Param::SquareLevel => "square",
            Param::SawLevel => "saw",
            Param::SubLevel => "sub",
            Param::NoiseLevel => "noise",
            Param::OscDetune => "osc_detune",
            Param::Vibrato => "vibrato",
            Param::Gain => "gain",
            Param::Detune => "detune",
            Param::DelayTime => "delay_time",
            Param::Feedback => "feedback",
            Param::InputGain => "input_gain",
            Param::Volume => "volume",
            Param::ReverbSend => "reverb_send",
            Param::DelaySend => "delay_send",
            Param::LowPass => "lowpass",
            Param::HighPass => "highpass",
            Param::BitDepth => "bit_depth",
            Param::RateReduction => "rate_reduction",
        }
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The engine node a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Unit(UnitId),
    Voice(VoiceHandle),
}

/// A fully addressed parameter: which node, which input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamTarget {
    pub node: NodeRef,
    pub param: Param,
}

impl ParamTarget {
    pub fn unit(unit: UnitId, param: Param) -> Self {
        Self {
            node: NodeRef::Unit(unit),
            param,
        }
    }

    pub fn voice(voice: VoiceHandle, param: Param) -> Self {
        Self {
            node: NodeRef::Voice(voice),
            param,
        }
    }
}

impl std::fmt::Display for ParamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node {
            NodeRef::Unit(id) => write!(f, "{}.{}", id, self.param),
            NodeRef::Voice(v) => write!(f, "{}.{}", v, self.param),
        }
    }
}

/// How a scheduled parameter change reaches its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Ramp {
    /// Jump to the value at the scheduled time.
    Set,
    /// Straight line from the value held at the scheduled time, arriving
    /// `duration` seconds later.
    Linear { duration: f64 },
    /// Exponential approach toward the value with the given time constant.
    Target { time_constant: f64 },
}

impl Ramp {
    pub fn target(time_constant: f64) -> Self {
        Ramp::Target { time_constant }
    }

    pub fn linear(duration: f64) -> Self {
        Ramp::Linear { duration }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_display_includes_node_and_param() {
        let t = ParamTarget::unit(UnitId::new(2), Param::FilterCutoff);
        assert_eq!(t.to_string(), "u2.cutoff");
        let v = ParamTarget::voice(VoiceHandle::new(9), Param::Detune);
        assert_eq!(v.to_string(), "v9.detune");
    }

    #[test]
    fn ramp_constructors() {
        assert_eq!(Ramp::target(0.01), Ramp::Target { time_constant: 0.01 });
        assert_eq!(Ramp::linear(0.5), Ramp::Linear { duration: 0.5 });
    }
}
