// fretly-core/src/lib.rs

//! The core logic for the Fretly guitar ear trainer.
//! This crate is responsible for pitch detection, note naming, question
//! generation and the practice session itself. It is completely headless
//! and contains no GUI code.

pub mod audio;
pub mod controller;
pub mod cues;
pub mod error;
pub mod fft;
pub mod fretboard;
pub mod listen;
pub mod notes;
pub mod persistence;
pub mod pitch;
pub mod question;
pub mod session;
pub mod settings;
pub mod timer;

pub use controller::{
    ControllerOptions, SessionController, SessionEvent, SessionHandle, SessionSnapshot,
    SharedFrames,
};
pub use error::{FretboardError, GeneratorError, NoteError, QuantizeError};
pub use fretboard::{Fret, StringIndex};
pub use notes::PitchClass;
pub use pitch::{Detection, PitchReading, YinDetector};
pub use question::Question;
pub use session::{GameMode, GameSession, GameStatus, PersistentStats};
pub use settings::GameSettings;
