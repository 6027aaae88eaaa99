//! # Fretboard Module
//!
//! Static map of the first twelve frets of a six-string guitar in standard
//! tuning. The map is derived once from the open-string notes and the
//! chromatic scale and never changes afterwards.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::FretboardError;
use crate::notes::PitchClass;

/// Number of strings on the instrument.
pub const STRING_COUNT: usize = 6;
/// Highest fret in play. Twelve frets span exactly one octave.
pub const MAX_FRET: u8 = 12;

/// Open-string notes in standard tuning, string 1 (high E) first.
const OPEN_STRING_NOTES: [PitchClass; STRING_COUNT] = [
    PitchClass::E,
    PitchClass::B,
    PitchClass::G,
    PitchClass::D,
    PitchClass::A,
    PitchClass::E,
];

/// Open-string frequencies in Hz (E4 B3 G3 D3 A2 E2).
const OPEN_STRING_FREQUENCIES: [f32; STRING_COUNT] =
    [329.63, 246.94, 196.00, 146.83, 110.00, 82.41];

/// A guitar string, 1 = highest pitched, 6 = lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StringIndex(u8);

impl StringIndex {
    /// All six strings, high to low.
    pub const ALL: [StringIndex; STRING_COUNT] = [
        StringIndex(1),
        StringIndex(2),
        StringIndex(3),
        StringIndex(4),
        StringIndex(5),
        StringIndex(6),
    ];

    pub fn number(self) -> u8 {
        self.0
    }

    fn slot(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Pitch class of the open string.
    pub fn open_note(self) -> PitchClass {
        OPEN_STRING_NOTES[self.slot()]
    }

    /// Frequency of the open string in Hz.
    pub fn open_frequency(self) -> f32 {
        OPEN_STRING_FREQUENCIES[self.slot()]
    }
}

impl TryFrom<u8> for StringIndex {
    type Error = FretboardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=STRING_COUNT as u8).contains(&value) {
            Ok(StringIndex(value))
        } else {
            Err(FretboardError::InvalidString(value))
        }
    }
}

impl From<StringIndex> for u8 {
    fn from(value: StringIndex) -> Self {
        value.0
    }
}

impl fmt::Display for StringIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fret position, 0 (open) through 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Fret(u8);

impl Fret {
    pub const OPEN: Fret = Fret(0);

    pub fn number(self) -> u8 {
        self.0
    }

    /// Every fret from 0 to 12 in order.
    pub fn all() -> impl Iterator<Item = Fret> {
        (0..=MAX_FRET).map(Fret)
    }
}

impl TryFrom<u8> for Fret {
    type Error = FretboardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= MAX_FRET {
            Ok(Fret(value))
        } else {
            Err(FretboardError::InvalidFret(value))
        }
    }
}

impl From<Fret> for u8 {
    fn from(value: Fret) -> Self {
        value.0
    }
}

impl fmt::Display for Fret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup table from (string, fret) to pitch class.
#[derive(Debug, Clone)]
pub struct FretboardMap {
    notes: [[PitchClass; MAX_FRET as usize + 1]; STRING_COUNT],
}

impl FretboardMap {
    /// Builds the table for standard tuning:
    /// `pitch(string, fret) = chromatic[(index(open(string)) + fret) mod 12]`.
    fn standard() -> Self {
        let mut notes = [[PitchClass::C; MAX_FRET as usize + 1]; STRING_COUNT];
        for string in StringIndex::ALL {
            for fret in Fret::all() {
                notes[string.slot()][fret.0 as usize] =
                    string.open_note().transpose(fret.0 as i64);
            }
        }
        Self { notes }
    }

    /// Pitch class sounded at a position.
    pub fn pitch_at(&self, string: StringIndex, fret: Fret) -> PitchClass {
        self.notes[string.slot()][fret.0 as usize]
    }

    /// Every fret on `string` that sounds `pitch_class`, ascending.
    pub fn find_frets(&self, string: StringIndex, pitch_class: PitchClass) -> Vec<Fret> {
        Fret::all()
            .filter(|&fret| self.pitch_at(string, fret) == pitch_class)
            .collect()
    }
}

/// The standard-tuning fretboard, computed on first use.
pub static FRETBOARD: Lazy<FretboardMap> = Lazy::new(FretboardMap::standard);

/// Shorthand for `FRETBOARD.pitch_at`.
pub fn pitch_at(string: StringIndex, fret: Fret) -> PitchClass {
    FRETBOARD.pitch_at(string, fret)
}

/// Shorthand for `FRETBOARD.find_frets`.
pub fn find_frets(string: StringIndex, pitch_class: PitchClass) -> Vec<Fret> {
    FRETBOARD.find_frets(string, pitch_class)
}
