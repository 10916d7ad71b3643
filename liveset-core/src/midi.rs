/// A parsed MIDI message with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    /// Arrival time in engine seconds
    pub timestamp: f64,
    pub kind: MidiEventKind,
}

/// The specific type of MIDI event. Channels are 0-based as on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiEventKind {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    PitchBend {
        channel: u8,
        /// -1.0 (full down) to 1.0 (full up), 0.0 = center
        value: f32,
    },
    /// 24 PPQN timing pulse
    Clock,
    Start,
    Continue,
    Stop,
}

impl MidiEvent {
    pub fn new(timestamp: f64, kind: MidiEventKind) -> Self {
        Self { timestamp, kind }
    }

    /// Parse raw bytes received at `timestamp`.
    pub fn parse(timestamp: f64, data: &[u8]) -> Option<Self> {
        parse_midi_message(data).map(|kind| Self::new(timestamp, kind))
    }
}

impl MidiEventKind {
    /// 0-based channel of a channel message; `None` for system real-time.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiEventKind::NoteOn { channel, .. }
            | MidiEventKind::NoteOff { channel, .. }
            | MidiEventKind::ControlChange { channel, .. }
            | MidiEventKind::PitchBend { channel, .. } => Some(channel),
            MidiEventKind::Clock
            | MidiEventKind::Start
            | MidiEventKind::Continue
            | MidiEventKind::Stop => None,
        }
    }
}

/// Map a raw 14-bit bend (`0..=16383`, center 8192) onto `-1.0..=1.0`.
pub fn normalize_pitch_bend(raw: u16) -> f32 {
    let centered = raw.min(0x3FFF) as i32 - 8192;
    if centered < 0 {
        centered as f32 / 8192.0
    } else {
        centered as f32 / 8191.0
    }
}

/// Parse a raw MIDI message into a MidiEventKind
pub fn parse_midi_message(data: &[u8]) -> Option<MidiEventKind> {
    let &status = data.first()?;

    match status {
        0xF8 => return Some(MidiEventKind::Clock),
        0xFA => return Some(MidiEventKind::Start),
        0xFB => return Some(MidiEventKind::Continue),
        0xFC => return Some(MidiEventKind::Stop),
        0xF0..=0xFF => return None,
        _ => {}
    }

    let channel = status & 0x0F;
    let message_type = status & 0xF0;
    if data.len() < 3 {
        return None;
    }
    let (d1, d2) = (data[1] & 0x7F, data[2] & 0x7F);

    match message_type {
        0x80 => Some(MidiEventKind::NoteOff { channel, note: d1 }),
        0x90 => {
            // Note On (velocity 0 = note off)
            if d2 == 0 {
                Some(MidiEventKind::NoteOff { channel, note: d1 })
            } else {
                Some(MidiEventKind::NoteOn {
                    channel,
                    note: d1,
                    velocity: d2,
                })
            }
        }
        0xB0 => Some(MidiEventKind::ControlChange {
            channel,
            controller: d1,
            value: d2,
        }),
        0xE0 => {
            let raw = ((d2 as u16) << 7) | d1 as u16;
            Some(MidiEventKind::PitchBend {
                channel,
                value: normalize_pitch_bend(raw),
            })
        }
        _ => None,
    }
}
