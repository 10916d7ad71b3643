//! Event scripts: timed raw MIDI messages, one per line.
//!
//! ```text
//! # seconds  bytes (hex)
//! 0.000      FA
//! 0.000      90 24 64
//! 0.021      F8
//! ```

use std::fmt;

/// One timed message.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub time: f64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptErrorKind {
    MissingBytes,
    BadTime(String),
    BadByte(String),
    /// Time earlier than the previous line's
    OutOfOrder { time: f64, previous: f64 },
}

/// A script line that could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    /// 1-based line number
    pub line: usize,
    pub kind: ScriptErrorKind,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            ScriptErrorKind::MissingBytes => write!(f, "no MIDI bytes"),
            ScriptErrorKind::BadTime(s) => write!(f, "invalid time {:?}", s),
            ScriptErrorKind::BadByte(s) => write!(f, "invalid byte {:?}", s),
            ScriptErrorKind::OutOfOrder { time, previous } => {
                write!(f, "time {} is before previous event at {}", time, previous)
            }
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<ScriptError> for std::io::Error {
    fn from(e: ScriptError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    }
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    let mut events = Vec::new();
    let mut previous = 0.0;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let mut fields = content.split_whitespace();
        let time_str = fields.next().unwrap_or("");
        let time: f64 = match time_str.parse() {
            Ok(t) if f64::is_finite(t) && t >= 0.0 => t,
            _ => {
                return Err(ScriptError {
                    line,
                    kind: ScriptErrorKind::BadTime(time_str.to_string()),
                })
            }
        };
        if time < previous {
            return Err(ScriptError {
                line,
                kind: ScriptErrorKind::OutOfOrder { time, previous },
            });
        }

        let bytes = fields
            .map(|field| parse_byte(field).ok_or_else(|| ScriptError {
                line,
                kind: ScriptErrorKind::BadByte(field.to_string()),
            }))
            .collect::<Result<Vec<u8>, _>>()?;
        if bytes.is_empty() {
            return Err(ScriptError {
                line,
                kind: ScriptErrorKind::MissingBytes,
            });
        }

        previous = time;
        events.push(ScriptEvent { time, bytes });
    }
    Ok(events)
}

fn parse_byte(field: &str) -> Option<u8> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}
