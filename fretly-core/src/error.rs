//! Error types for the trainer core

use thiserror::Error;

/// Raised by the pitch quantizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantizeError {
    /// Frequency was zero, negative or not a finite number
    #[error("Invalid frequency: {0} Hz")]
    InvalidFrequency(f32),
}

/// Raised when a raw integer does not name a position on the neck.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FretboardError {
    /// Strings are numbered 1 (high E) to 6 (low E)
    #[error("Invalid string: {0}, expected 1-6")]
    InvalidString(u8),

    /// Only the first octave of the neck is trained
    #[error("Invalid fret: {0}, expected 0-12")]
    InvalidFret(u8),
}

/// Raised when parsing a note name such as `"F#"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("Invalid note name: {0:?}")]
    InvalidName(String),
}

/// Raised by the question generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// No (string, fret) pair survived the settings filter. The settings
    /// mutators keep at least one string selected, so this means a caller
    /// bypassed them.
    #[error("Question pool is empty for the current settings")]
    EmptyPool,
}
