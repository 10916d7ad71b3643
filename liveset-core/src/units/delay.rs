use liveset_types::{Param, ParamTarget, UnitId};

use crate::curve::{apply_bindings, band, Band, ControlBinding, Mapping};
use crate::engine::{log_failure, AudioContext};
use crate::tempo::TempoEstimator;
use crate::unit::PerformanceUnit;

pub const INITIAL_DELAY_SECS: f32 = 0.2;
pub const INITIAL_FEEDBACK: f32 = 0.3;
pub const INITIAL_DIVIDER: u32 = 3;
/// Longest delay line the engine allocates.
pub const MAX_DELAY_SECS: f32 = 10.0;

const FREE_TIME_SMOOTHING: f64 = 0.1;
const SYNC_SMOOTHING: f64 = 0.5;

const LOG_TARGET: &str = "liveset::delay";

const BINDINGS: &[ControlBinding] = &[ControlBinding::new(
    2,
    Mapping::cube().output(2.0, 0.0),
    Param::Feedback,
    0.001,
)];

/// Feedback delay whose time follows the external clock.
///
/// In sync mode the delay is `divider` sixteenth notes long and is
/// recomputed on every clock pulse. Until a tempo is known the last delay
/// time is held.
pub struct DelayFx {
    ctx: AudioContext,
    unit: UnitId,
    name: String,
    tempo: TempoEstimator,
    /// `None` while in free-time mode
    divider: Option<u32>,
    delay_time: f32,
}

impl DelayFx {
    pub fn new(ctx: &AudioContext, name: impl Into<String>, tempo: TempoEstimator) -> Self {
        let fx = Self {
            ctx: ctx.clone(),
            unit: ctx.allocate_unit(),
            name: name.into(),
            tempo,
            divider: Some(INITIAL_DIVIDER),
            delay_time: INITIAL_DELAY_SECS,
        };
        log_failure(LOG_TARGET, "init", fx.ctx.set_now(fx.target(Param::DelayTime), INITIAL_DELAY_SECS));
        log_failure(LOG_TARGET, "init", fx.ctx.set_now(fx.target(Param::Feedback), INITIAL_FEEDBACK));
        fx
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn divider(&self) -> Option<u32> {
        self.divider
    }

    /// Last delay time scheduled, in seconds.
    pub fn delay_time(&self) -> f32 {
        self.delay_time
    }

    pub fn tempo(&self) -> Option<f64> {
        self.tempo.tempo()
    }

    fn target(&self, param: Param) -> ParamTarget {
        ParamTarget::unit(self.unit, param)
    }

    fn set_delay_time(&mut self, secs: f32, smoothing: f64) {
        let secs = secs.clamp(0.0, MAX_DELAY_SECS);
        self.delay_time = secs;
        log_failure(
            LOG_TARGET,
            "delay time",
            self.ctx.smooth(self.target(Param::DelayTime), secs, smoothing),
        );
    }

    fn follow_tempo(&mut self) {
        let divider = match self.divider {
            Some(d) if d > 0 => d,
            _ => return,
        };
        if let Some(bpm) = self.tempo.tempo() {
            let secs = 60.0 / (bpm * 4.0) * divider as f64;
            self.set_delay_time(secs as f32, SYNC_SMOOTHING);
        }
    }
}

impl PerformanceUnit for DelayFx {
    fn name(&self) -> &str {
        &self.name
    }

    fn cc(&mut self, number: u8, value: u8) {
        if number == 1 {
            match band(value) {
                Band::High { raw, .. } => {
                    let divider = ((raw - 64) as f32 / 8.0).round() as u32;
                    log::debug!(target: LOG_TARGET, "{}: sync 1/16 x {}", self.name, divider);
                    self.divider = Some(divider);
                }
                Band::Low { raw, .. } => {
                    self.divider = None;
                    self.set_delay_time(raw as f32 / 63.0 / 2.0, FREE_TIME_SMOOTHING);
                }
                Band::Neutral => self.divider = Some(1),
            }
            return;
        }
        if !apply_bindings(BINDINGS, &self.ctx, self.unit, number, value, LOG_TARGET) {
            log::debug!(target: LOG_TARGET, "{}: unmapped cc {}", self.name, number);
        }
    }

    fn clock(&mut self, timestamp: f64) {
        self.tempo.clock(timestamp);
        self.follow_tempo();
    }

    fn stop(&mut self) {
        self.tempo.stop();
    }
}
