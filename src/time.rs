// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Tempo, sample rates, and musical and wall-clock time.

use crate::types::ParameterType;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, AddAssign, Range, Sub},
};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Beats per minute.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Tempo(pub ParameterType);
impl Default for Tempo {
    fn default() -> Self {
        Self(120.0)
    }
}
impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:0.2} BPM", self.0))
    }
}
impl From<u16> for Tempo {
    fn from(value: u16) -> Self {
        Self(value as ParameterType)
    }
}
impl From<ParameterType> for Tempo {
    fn from(value: ParameterType) -> Self {
        Self(value)
    }
}
impl Tempo {
    /// The largest value we'll allow.
    pub const MAX_VALUE: ParameterType = 1024.0;

    /// The smallest value we'll allow. Zero would stop time altogether.
    pub const MIN_VALUE: ParameterType = 1.0;

    /// A getter for the raw value.
    pub fn value(&self) -> ParameterType {
        self.0
    }

    /// Beats per second.
    pub fn bps(&self) -> ParameterType {
        self.0 / 60.0
    }

    /// Whether this is a tempo that a transport can run at.
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.0 >= Self::MIN_VALUE
    }
}

/// Samples per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRate(usize);
impl SampleRate {
    /// The CD-quality rate that we use unless told otherwise.
    pub const DEFAULT_SAMPLE_RATE: usize = 44100;
    #[allow(missing_docs)]
    pub const DEFAULT: SampleRate = SampleRate::new(Self::DEFAULT_SAMPLE_RATE);

    #[allow(missing_docs)]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    #[allow(missing_docs)]
    pub fn value(&self) -> usize {
        self.0
    }
}
impl Default for SampleRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}
impl From<usize> for SampleRate {
    fn from(value: usize) -> Self {
        Self(value)
    }
}
impl From<SampleRate> for f64 {
    fn from(value: SampleRate) -> Self {
        value.0 as f64
    }
}

/// A duration in wall-clock seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(pub f64);
impl Seconds {
    #[allow(missing_docs)]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// How many frames this duration covers at the given sample rate.
    pub fn to_frames(&self, sample_rate: SampleRate) -> usize {
        (self.0.max(0.0) * sample_rate.value() as f64).round() as usize
    }
}
impl From<f64> for Seconds {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Beats per bar over the note value that gets one beat. wrenchbox is written
/// for 4/4, but the arithmetic doesn't assume it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// The number of beats in a bar.
    pub top: usize,
    /// The value of a beat (4 = quarter note).
    pub bottom: usize,
}
impl Default for TimeSignature {
    fn default() -> Self {
        Self { top: 4, bottom: 4 }
    }
}
impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.top, self.bottom))
    }
}

/// A position or length in musical time, measured in fixed fractions of a
/// beat. Integral so that grid positions compare exactly.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MusicalTime {
    units: usize,
}
impl MusicalTime {
    /// A part is a sixteenth of a beat.
    pub const PARTS_IN_BEAT: usize = 16;
    /// Resolution below a part.
    pub const UNITS_IN_PART: usize = 4096;
    /// Resolution of a beat.
    pub const UNITS_IN_BEAT: usize = Self::PARTS_IN_BEAT * Self::UNITS_IN_PART;

    /// The beginning of time.
    pub const START: MusicalTime = MusicalTime { units: 0 };
    #[allow(missing_docs)]
    pub const DURATION_WHOLE: MusicalTime = MusicalTime {
        units: Self::UNITS_IN_BEAT * 4,
    };
    #[allow(missing_docs)]
    pub const DURATION_HALF: MusicalTime = MusicalTime {
        units: Self::UNITS_IN_BEAT * 2,
    };
    #[allow(missing_docs)]
    pub const DURATION_QUARTER: MusicalTime = MusicalTime {
        units: Self::UNITS_IN_BEAT,
    };
    #[allow(missing_docs)]
    pub const DURATION_EIGHTH: MusicalTime = MusicalTime {
        units: Self::UNITS_IN_BEAT / 2,
    };
    #[allow(missing_docs)]
    pub const DURATION_SIXTEENTH: MusicalTime = MusicalTime {
        units: Self::UNITS_IN_BEAT / 4,
    };
    #[allow(missing_docs)]
    pub const DURATION_THIRTY_SECOND: MusicalTime = MusicalTime {
        units: Self::UNITS_IN_BEAT / 8,
    };

    #[allow(missing_docs)]
    pub const fn new_with_units(units: usize) -> Self {
        Self { units }
    }

    #[allow(missing_docs)]
    pub const fn new_with_beats(beats: usize) -> Self {
        Self {
            units: beats * Self::UNITS_IN_BEAT,
        }
    }

    #[allow(missing_docs)]
    pub fn new_with_bars(time_signature: &TimeSignature, bars: usize) -> Self {
        Self::new_with_beats(bars * time_signature.top)
    }

    #[allow(missing_docs)]
    pub fn total_units(&self) -> usize {
        self.units
    }

    /// Whole beats elapsed, rounded down.
    pub fn total_beats(&self) -> usize {
        self.units / Self::UNITS_IN_BEAT
    }

    /// Whole bars elapsed, rounded down.
    pub fn total_bars(&self, time_signature: &TimeSignature) -> usize {
        self.total_beats() / time_signature.top.max(1)
    }

    /// How many of these units pass each second at the given tempo.
    pub fn units_per_second(tempo: Tempo) -> f64 {
        tempo.bps() * Self::UNITS_IN_BEAT as f64
    }

    /// The wall-clock length of this duration at the given tempo.
    pub fn as_seconds(&self, tempo: Tempo) -> Seconds {
        Seconds(self.units as f64 / Self::units_per_second(tempo))
    }

    /// The nearest musical duration to the given wall-clock length.
    pub fn from_seconds(seconds: Seconds, tempo: Tempo) -> Self {
        Self::new_with_units((seconds.0.max(0.0) * Self::units_per_second(tempo)).round() as usize)
    }
}
impl Add for MusicalTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            units: self.units + rhs.units,
        }
    }
}
impl AddAssign for MusicalTime {
    fn add_assign(&mut self, rhs: Self) {
        self.units += rhs.units;
    }
}
// Saturates rather than wrapping; a negative musical duration is meaningless.
impl Sub for MusicalTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            units: self.units.saturating_sub(rhs.units),
        }
    }
}
impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let beats = self.total_beats();
        let parts = (self.units % Self::UNITS_IN_BEAT) / Self::UNITS_IN_PART;
        let units = self.units % Self::UNITS_IN_PART;
        f.write_fmt(format_args!("{}.{}.{}", beats, parts, units))
    }
}

/// A half-open range of [MusicalTime].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRange(pub Range<MusicalTime>);
impl TimeRange {
    #[allow(missing_docs)]
    pub fn new(start: MusicalTime, end: MusicalTime) -> Self {
        Self(start..end)
    }

    #[allow(missing_docs)]
    pub fn start(&self) -> MusicalTime {
        self.0.start
    }

    #[allow(missing_docs)]
    pub fn end(&self) -> MusicalTime {
        self.0.end
    }

    #[allow(missing_docs)]
    pub fn contains(&self, time: &MusicalTime) -> bool {
        self.0.contains(time)
    }
}

/// The musical grid unit a pattern advances by. The string forms follow the
/// common "8n" (eighth note) notation.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
)]
pub enum Subdivision {
    #[allow(missing_docs)]
    #[serde(rename = "1n")]
    #[strum(serialize = "1n")]
    Whole,
    #[allow(missing_docs)]
    #[serde(rename = "2n")]
    #[strum(serialize = "2n")]
    Half,
    #[allow(missing_docs)]
    #[serde(rename = "4n")]
    #[strum(serialize = "4n")]
    Quarter,
    #[allow(missing_docs)]
    #[default]
    #[serde(rename = "8n")]
    #[strum(serialize = "8n")]
    Eighth,
    #[allow(missing_docs)]
    #[serde(rename = "16n")]
    #[strum(serialize = "16n")]
    Sixteenth,
    #[allow(missing_docs)]
    #[serde(rename = "32n")]
    #[strum(serialize = "32n")]
    ThirtySecond,
}
impl Subdivision {
    /// The length of one step at this subdivision.
    pub fn duration(&self) -> MusicalTime {
        match self {
            Subdivision::Whole => MusicalTime::DURATION_WHOLE,
            Subdivision::Half => MusicalTime::DURATION_HALF,
            Subdivision::Quarter => MusicalTime::DURATION_QUARTER,
            Subdivision::Eighth => MusicalTime::DURATION_EIGHTH,
            Subdivision::Sixteenth => MusicalTime::DURATION_SIXTEENTH,
            Subdivision::ThirtySecond => MusicalTime::DURATION_THIRTY_SECOND,
        }
    }
}
