//! Per-channel MIDI dispatch to performance units.

use liveset_types::VoiceHandle;

use crate::midi::{MidiEvent, MidiEventKind};
use crate::unit::PerformanceUnit;

const LOG_TARGET: &str = "liveset::router";

pub const MIDI_CHANNELS: u8 = 16;

struct Route {
    /// 1-based MIDI channel
    channel: u8,
    unit: Box<dyn PerformanceUnit>,
}

/// Fans incoming MIDI out to the units listening on each channel.
///
/// Channel messages reach every unit connected to that channel, in
/// connection order. System real-time messages are broadcast to all units
/// when clock following is enabled and dropped otherwise.
pub struct MidiRouter {
    use_clock: bool,
    routes: Vec<Route>,
}

impl MidiRouter {
    pub fn new(use_clock: bool) -> Self {
        Self {
            use_clock,
            routes: Vec::new(),
        }
    }

    pub fn use_clock(&self) -> bool {
        self.use_clock
    }

    /// Listen on a 1-based MIDI channel. Several units may share a channel.
    /// Returns false (and drops the unit) if the channel is out of range.
    pub fn connect(&mut self, channel: u8, unit: Box<dyn PerformanceUnit>) -> bool {
        if !(1..=MIDI_CHANNELS).contains(&channel) {
            log::warn!(target: LOG_TARGET, "cannot connect {} to channel {}", unit.name(), channel);
            return false;
        }
        log::debug!(target: LOG_TARGET, "{} on channel {}", unit.name(), channel);
        self.routes.push(Route { channel, unit });
        true
    }

    pub fn unit_count(&self) -> usize {
        self.routes.len()
    }

    /// `(channel, name)` of every connected unit, in connection order.
    pub fn units(&self) -> impl Iterator<Item = (u8, &str)> {
        self.routes.iter().map(|r| (r.channel, r.unit.name()))
    }

    /// Parse raw bytes received at `timestamp` and dispatch them.
    pub fn handle_bytes(&mut self, timestamp: f64, data: &[u8]) -> Option<MidiEvent> {
        match MidiEvent::parse(timestamp, data) {
            Some(event) => {
                self.dispatch(&event);
                Some(event)
            }
            None => {
                log::debug!(target: LOG_TARGET, "ignoring message {:02X?}", data);
                None
            }
        }
    }

    pub fn dispatch(&mut self, event: &MidiEvent) {
        match event.kind {
            MidiEventKind::NoteOn {
                channel,
                note,
                velocity,
            } => self.each_on(channel, |u| u.note_on(note, velocity)),
            MidiEventKind::NoteOff { channel, note } => self.each_on(channel, |u| u.note_off(note)),
            MidiEventKind::ControlChange {
                channel,
                controller,
                value,
            } => self.each_on(channel, |u| u.cc(controller, value)),
            MidiEventKind::PitchBend { channel, value } => {
                self.each_on(channel, |u| u.pitch_bend(value))
            }
            MidiEventKind::Clock => {
                if self.use_clock {
                    let ts = event.timestamp;
                    self.each(|u| u.clock(ts));
                }
            }
            MidiEventKind::Start | MidiEventKind::Continue => {
                if self.use_clock {
                    log::debug!(target: LOG_TARGET, "transport start");
                    self.each(|u| u.start());
                }
            }
            MidiEventKind::Stop => {
                if self.use_clock {
                    log::debug!(target: LOG_TARGET, "transport stop");
                    self.each(|u| u.stop());
                }
            }
        }
    }

    /// All notes off on every unit, regardless of clock following.
    pub fn panic(&mut self) {
        self.each(|u| u.stop());
    }

    /// Tell every unit a voice finished; only its owner reacts.
    pub fn voice_ended(&mut self, voice: VoiceHandle) {
        self.each(|u| u.voice_ended(voice));
    }

    fn each<F: FnMut(&mut dyn PerformanceUnit)>(&mut self, mut f: F) {
        for route in &mut self.routes {
            f(route.unit.as_mut());
        }
    }

    /// `wire_channel` is 0-based.
    fn each_on<F: FnMut(&mut dyn PerformanceUnit)>(&mut self, wire_channel: u8, mut f: F) {
        let channel = wire_channel + 1;
        for route in self.routes.iter_mut().filter(|r| r.channel == channel) {
            f(route.unit.as_mut());
        }
    }
}
