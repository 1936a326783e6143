// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::types::FrequencyHz;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum_macros::{EnumIter, FromRepr};
use thiserror::Error;

/// Problems turning text like `"Eb2"` into a [Note].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NoteParseError {
    #[allow(missing_docs)]
    #[error("empty pitch name")]
    Empty,
    #[allow(missing_docs)]
    #[error("'{0}' is not a note letter")]
    BadLetter(char),
    #[allow(missing_docs)]
    #[error("'{0}' is not a valid octave")]
    BadOctave(String),
    #[allow(missing_docs)]
    #[error("{0} is outside the MIDI key range")]
    OutOfRange(i32),
}

/// The twelve equal-tempered pitch classes, numbered from C.
#[derive(Clone, Copy, Debug, EnumIter, Eq, FromRepr, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum PitchClass {
    C = 0,
    CSharp,
    D,
    EFlat,
    E,
    F,
    FSharp,
    G,
    AFlat,
    A,
    BFlat,
    B,
}
impl PitchClass {
    const NAMES: [&'static str; 12] = [
        "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
    ];

    fn name(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }
}

/// A pitch in scientific pitch notation, stored as a MIDI key number (C4 = 60).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note {
    key: u8,
}
impl Note {
    /// The highest MIDI key.
    pub const MAX_KEY: u8 = 127;

    /// Builds a note from its pitch class and octave. Keys beyond the MIDI range
    /// are clamped.
    pub fn new(pitch_class: PitchClass, octave: i8) -> Self {
        let key = (octave as i32 + 1) * 12 + pitch_class as i32;
        Self {
            key: key.clamp(0, Self::MAX_KEY as i32) as u8,
        }
    }

    #[allow(missing_docs)]
    pub fn new_with_key(key: u8) -> Self {
        Self {
            key: key.min(Self::MAX_KEY),
        }
    }

    #[allow(missing_docs)]
    pub fn key(&self) -> u8 {
        self.key
    }

    #[allow(missing_docs)]
    pub fn octave(&self) -> i8 {
        (self.key / 12) as i8 - 1
    }

    #[allow(missing_docs)]
    pub fn pitch_class(&self) -> PitchClass {
        PitchClass::from_repr((self.key % 12) as usize).unwrap_or(PitchClass::C)
    }

    /// Equal-tempered frequency, A4 = 440 Hz.
    pub fn frequency(&self) -> FrequencyHz {
        FrequencyHz(440.0 * 2.0f64.powf((self.key as f64 - 69.0) / 12.0))
    }
}
impl FromStr for Note {
    type Err = NoteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(NoteParseError::Empty)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(NoteParseError::BadLetter(letter)),
        };
        let rest = chars.as_str();
        let (accidental, octave_str) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest)
        };
        let octave: i32 = octave_str
            .parse()
            .map_err(|_| NoteParseError::BadOctave(octave_str.to_string()))?;
        let key = (octave + 1) * 12 + base + accidental;
        if !(0..=Self::MAX_KEY as i32).contains(&key) {
            return Err(NoteParseError::OutOfRange(key));
        }
        Ok(Self { key: key as u8 })
    }
}
impl TryFrom<String> for Note {
    type Error = NoteParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<Note> for String {
    fn from(value: Note) -> Self {
        value.to_string()
    }
}
impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}{}", self.pitch_class().name(), self.octave()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn parses_scientific_pitch_notation() {
        assert_eq!("C4".parse::<Note>().map(|n| n.key()), Ok(60));
        assert_eq!("A4".parse::<Note>().map(|n| n.key()), Ok(69));
        assert_eq!("C1".parse::<Note>().map(|n| n.key()), Ok(24));
        assert_eq!("Eb2".parse::<Note>().map(|n| n.key()), Ok(39));
        assert_eq!("G#4".parse::<Note>().map(|n| n.key()), Ok(68));
        assert_eq!("Bb4".parse::<Note>().map(|n| n.key()), Ok(70));
        assert_eq!("C-1".parse::<Note>().map(|n| n.key()), Ok(0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<Note>(), Err(NoteParseError::Empty));
        assert_eq!("H2".parse::<Note>(), Err(NoteParseError::BadLetter('H')));
        assert!(matches!(
            "C".parse::<Note>(),
            Err(NoteParseError::BadOctave(_))
        ));
        assert!(matches!(
            "C10".parse::<Note>(),
            Err(NoteParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn displays_with_flats() {
        assert_eq!(Note::new(PitchClass::EFlat, 2).to_string(), "Eb2");
        assert_eq!("D#3".parse::<Note>().map(|n| n.to_string()), Ok("Eb3".to_string()));
    }

    #[test]
    fn frequencies() {
        assert!(approx_eq!(
            f64,
            Note::new(PitchClass::A, 4).frequency().0,
            440.0,
            ulps = 4
        ));
        assert!(approx_eq!(
            f64,
            Note::new(PitchClass::C, 1).frequency().0,
            32.7032,
            epsilon = 0.001
        ));
    }
}
