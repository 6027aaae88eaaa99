//! # Pitch Class Module
//!
//! Pitch classes and the quantizer that folds any frequency onto one of them.
//! Everything here is 12-tone equal temperament referenced to A4 = 440 Hz and
//! deliberately octave-insensitive: an E on the open sixth string and an E at
//! the twelfth fret of the first string are the same answer.
//!
//! ## Features
//! - `PitchClass` with sharp spelling for display and flat spelling accepted on parse
//! - Frequency to pitch class quantization
//! - Pitch class (plus octave) to frequency, for fixtures and cue synthesis
//! - Cent differences between two frequencies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NoteError, QuantizeError};

/// Reference pitch for A4 in Hz.
pub const A4_HZ: f32 = 440.0;

/// Frequency of C0, the anchor of the half-step count: `440 * 2^(-4.75)`.
pub const C0_HZ: f32 = 16.351_598;

/// One of the twelve note names, without an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

/// The chromatic scale starting at C.
pub const CHROMATIC: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::CSharp,
    PitchClass::D,
    PitchClass::DSharp,
    PitchClass::E,
    PitchClass::F,
    PitchClass::FSharp,
    PitchClass::G,
    PitchClass::GSharp,
    PitchClass::A,
    PitchClass::ASharp,
    PitchClass::B,
];

/// Pitch classes without a sharp or flat.
pub const NATURALS: [PitchClass; 7] = [
    PitchClass::C,
    PitchClass::D,
    PitchClass::E,
    PitchClass::F,
    PitchClass::G,
    PitchClass::A,
    PitchClass::B,
];

impl PitchClass {
    /// Position in the chromatic scale, C = 0 through B = 11.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class at a chromatic position. Any integer is accepted and
    /// folded with a non-negative modulus.
    pub fn from_index(index: i64) -> Self {
        CHROMATIC[index.rem_euclid(12) as usize]
    }

    /// Moves up the chromatic scale by `semitones`, wrapping at the octave.
    pub fn transpose(self, semitones: i64) -> Self {
        Self::from_index(self.index() as i64 + semitones)
    }

    pub fn is_natural(self) -> bool {
        NATURALS.contains(&self)
    }

    /// Display name using sharps.
    pub fn name(self) -> &'static str {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        NAMES[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = NoteError;

    /// Parses "C", "C#", "Db" and friends. Flats are folded onto their sharp
    /// enharmonic.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .ok_or_else(|| NoteError::InvalidName(s.to_string()))?;
        let base = match letter.to_ascii_uppercase() {
            'C' => PitchClass::C,
            'D' => PitchClass::D,
            'E' => PitchClass::E,
            'F' => PitchClass::F,
            'G' => PitchClass::G,
            'A' => PitchClass::A,
            'B' => PitchClass::B,
            _ => return Err(NoteError::InvalidName(s.to_string())),
        };
        match chars.as_str() {
            "" => Ok(base),
            "#" | "♯" => Ok(base.transpose(1)),
            "b" | "♭" => Ok(base.transpose(-1)),
            _ => Err(NoteError::InvalidName(s.to_string())),
        }
    }
}

/// A quantized frequency: the nearest pitch class and how far off it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPitch {
    pub pitch_class: PitchClass,
    /// Signed offset from the nearest equal-tempered pitch. Within the
    /// guitar's range this lies in [-50, 50): a frequency halfway between
    /// two pitches is named after the higher one.
    pub cents: f32,
}

fn validate(freq_hz: f32) -> Result<(), QuantizeError> {
    if !freq_hz.is_finite() || freq_hz <= 0.0 {
        return Err(QuantizeError::InvalidFrequency(freq_hz));
    }
    Ok(())
}

/// Converts a frequency to the nearest of the 12 pitch classes.
///
/// Computes `round(12 * log2(freq / C0))` and folds the half-step count onto
/// the chromatic scale, so every octave of a note lands on the same class.
///
/// # Arguments
/// * `freq_hz` - Frequency in Hz, must be positive
///
/// # Returns
/// * `Ok(pitch_class)` - Nearest pitch class
/// * `Err(QuantizeError::InvalidFrequency)` - Frequency was not positive and finite
pub fn frequency_to_pitch_class(freq_hz: f32) -> Result<PitchClass, QuantizeError> {
    nearest_pitch(freq_hz).map(|nearest| nearest.pitch_class)
}

/// Like [`frequency_to_pitch_class`], but also reports the cent offset from
/// the equal-tempered target. The offset is for display only.
pub fn nearest_pitch(freq_hz: f32) -> Result<NearestPitch, QuantizeError> {
    validate(freq_hz)?;
    // f64 keeps the rounding stable for frequencies sitting near a half-step boundary.
    let exact = 12.0 * (freq_hz as f64 / C0_HZ as f64).log2();
    let half_steps = exact.round();
    Ok(NearestPitch {
        pitch_class: PitchClass::from_index(half_steps as i64),
        cents: ((exact - half_steps) * 100.0) as f32,
    })
}

/// Frequency of a pitch class in a given octave (scientific pitch notation,
/// A4 = 440 Hz).
///
/// # Arguments
/// * `pitch_class` - Note name
/// * `octave` - Octave number, 4 being the octave that contains A4
///
/// # Returns
/// * Frequency in Hz
pub fn pitch_class_to_frequency(pitch_class: PitchClass, octave: i32) -> f32 {
    let half_steps =
        pitch_class.index() as i32 - PitchClass::A.index() as i32 + (octave - 4) * 12;
    A4_HZ * 2.0_f32.powf(half_steps as f32 / 12.0)
}

/// Calculates the difference between two frequencies in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive when `freq_a` is higher than `freq_b`
pub fn cents_difference(freq_a: f32, freq_b: f32) -> f32 {
    1200.0 * (freq_a / freq_b).log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn c0_matches_its_definition() {
        assert_abs_diff_eq!(C0_HZ, 440.0 * 2.0_f32.powf(-4.75), epsilon = 1e-3);
    }

    #[test]
    fn reference_frequencies() {
        assert_eq!(frequency_to_pitch_class(440.0), Ok(PitchClass::A));
        assert_eq!(frequency_to_pitch_class(329.63), Ok(PitchClass::E));
        assert_eq!(frequency_to_pitch_class(82.41), Ok(PitchClass::E));
        assert_eq!(frequency_to_pitch_class(261.63), Ok(PitchClass::C));
        assert_eq!(frequency_to_pitch_class(246.94), Ok(PitchClass::B));
    }

    #[test]
    fn octave_invariance() {
        for pitch_class in CHROMATIC {
            // Slightly detuned so the test does not sit on a rounding boundary.
            let base = pitch_class_to_frequency(pitch_class, 2) * 1.01;
            let expected = frequency_to_pitch_class(base).unwrap();
            assert_eq!(expected, pitch_class);
            for k in -1..=4 {
                let shifted = base * 2.0_f32.powi(k);
                assert_eq!(frequency_to_pitch_class(shifted).unwrap(), expected);
            }
        }
    }

    #[test]
    fn rejects_non_positive_frequencies() {
        assert_eq!(
            frequency_to_pitch_class(0.0),
            Err(QuantizeError::InvalidFrequency(0.0))
        );
        assert!(frequency_to_pitch_class(-110.0).is_err());
        assert!(frequency_to_pitch_class(f32::NAN).is_err());
        assert!(frequency_to_pitch_class(f32::INFINITY).is_err());
    }

    #[test]
    fn round_trip_through_frequency() {
        for pitch_class in CHROMATIC {
            for octave in 1..=6 {
                let freq = pitch_class_to_frequency(pitch_class, octave);
                assert_eq!(frequency_to_pitch_class(freq).unwrap(), pitch_class);
            }
        }
        assert_abs_diff_eq!(pitch_class_to_frequency(PitchClass::A, 4), 440.0, epsilon = 1e-3);
        assert_abs_diff_eq!(pitch_class_to_frequency(PitchClass::E, 2), 82.41, epsilon = 0.01);
    }

    #[test]
    fn cents_sign_and_scale() {
        assert_abs_diff_eq!(cents_difference(880.0, 440.0), 1200.0, epsilon = 1e-3);
        assert_abs_diff_eq!(cents_difference(440.0, 880.0), -1200.0, epsilon = 1e-3);
        assert!(cents_difference(445.0, 440.0) > 0.0);
    }

    #[test]
    fn nearest_pitch_reports_offset() {
        let sharp_a = 440.0 * 2.0_f32.powf(20.0 / 1200.0);
        let nearest = nearest_pitch(sharp_a).unwrap();
        assert_eq!(nearest.pitch_class, PitchClass::A);
        assert_abs_diff_eq!(nearest.cents, 20.0, epsilon = 0.05);
    }

    #[test]
    fn offset_flips_sign_past_the_half_step_midpoint() {
        let below = nearest_pitch(440.0 * 2.0_f32.powf(49.0 / 1200.0)).unwrap();
        assert_eq!(below.pitch_class, PitchClass::A);
        assert_abs_diff_eq!(below.cents, 49.0, epsilon = 0.05);

        let above = nearest_pitch(440.0 * 2.0_f32.powf(51.0 / 1200.0)).unwrap();
        assert_eq!(above.pitch_class, PitchClass::ASharp);
        assert_abs_diff_eq!(above.cents, -49.0, epsilon = 0.05);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("C#".parse::<PitchClass>(), Ok(PitchClass::CSharp));
        assert_eq!("Db".parse::<PitchClass>(), Ok(PitchClass::CSharp));
        assert_eq!("Cb".parse::<PitchClass>(), Ok(PitchClass::B));
        assert_eq!("g".parse::<PitchClass>(), Ok(PitchClass::G));
        assert_eq!("H".parse::<PitchClass>(), Err(NoteError::InvalidName("H".into())));
        assert!("".parse::<PitchClass>().is_err());
        assert_eq!(PitchClass::FSharp.to_string(), "F#");
    }

    #[test]
    fn natural_subset() {
        let naturals: Vec<_> = CHROMATIC.iter().filter(|p| p.is_natural()).collect();
        assert_eq!(naturals.len(), 7);
        assert!(!PitchClass::ASharp.is_natural());
    }

    #[test]
    fn serde_uses_sharp_names() {
        let json = serde_json::to_string(&PitchClass::GSharp).unwrap();
        assert_eq!(json, "\"G#\"");
        let back: PitchClass = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PitchClass::GSharp);
    }
}
