//! # Question Generator Module
//!
//! Picks the next (string, note) prompt from the positions allowed by the
//! current settings.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::fretboard::{FRETBOARD, Fret, StringIndex};
use crate::notes::PitchClass;
use crate::settings::GameSettings;

/// Upper bound on draws spent avoiding a repeat of the previous prompt.
/// Once it is spent any candidate is accepted, which keeps single-candidate
/// pools from looping forever.
pub const MAX_GENERATION_ATTEMPTS: usize = 100;

/// One quiz prompt: play `pitch_class` on `string`.
///
/// `fret` is the position that was drawn; other frets that sound the same
/// pitch class on the string are found with [`Question::valid_frets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    pub string: StringIndex,
    pub pitch_class: PitchClass,
    pub fret: Fret,
}

impl Question {
    /// Builds the question for a fretboard position.
    pub fn at(string: StringIndex, fret: Fret) -> Self {
        Self {
            string,
            pitch_class: FRETBOARD.pitch_at(string, fret),
            fret,
        }
    }

    /// True when both prompts ask for the same note on the same string.
    pub fn same_prompt(&self, other: &Question) -> bool {
        self.string == other.string && self.pitch_class == other.pitch_class
    }

    /// Every fret 0-12 on this string that sounds this pitch class.
    pub fn valid_frets(&self) -> Vec<Fret> {
        FRETBOARD.find_frets(self.string, self.pitch_class)
    }
}

/// Every position the settings allow, strings ascending then frets ascending.
pub fn candidate_pool(settings: &GameSettings) -> Vec<Question> {
    settings
        .selected_strings()
        .flat_map(|string| Fret::all().map(move |fret| Question::at(string, fret)))
        .filter(|q| settings.include_accidentals() || q.pitch_class.is_natural())
        .collect()
}

/// Random question source.
pub struct QuestionGenerator<R = StdRng> {
    rng: R,
}

impl QuestionGenerator<StdRng> {
    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Deterministic generator, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> QuestionGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draws the next question.
    ///
    /// Uniform over the settings' candidate pool, rejecting draws that repeat
    /// `previous`'s (string, pitch class) for at most
    /// [`MAX_GENERATION_ATTEMPTS`] draws.
    ///
    /// # Arguments
    /// * `settings` - Selected strings and the accidentals filter
    /// * `previous` - The question being replaced, if any
    ///
    /// # Returns
    /// * `Ok(question)` - The drawn question
    /// * `Err(GeneratorError::EmptyPool)` - The settings allow no positions at all
    pub fn generate(
        &mut self,
        settings: &GameSettings,
        previous: Option<&Question>,
    ) -> Result<Question, GeneratorError> {
        self.pick(&candidate_pool(settings), previous)
    }

    /// Draws from an explicit pool with the same repeat-avoidance policy as
    /// [`generate`](Self::generate).
    pub fn pick(
        &mut self,
        pool: &[Question],
        previous: Option<&Question>,
    ) -> Result<Question, GeneratorError> {
        if pool.is_empty() {
            return Err(GeneratorError::EmptyPool);
        }

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let Some(candidate) = pool.choose(&mut self.rng) else {
                break;
            };
            match previous {
                Some(prev) if candidate.same_prompt(prev) => continue,
                _ => return Ok(*candidate),
            }
        }

        log::debug!("[QUESTION] Repeat-avoidance gave up after {MAX_GENERATION_ATTEMPTS} draws");
        pool.choose(&mut self.rng)
            .copied()
            .ok_or(GeneratorError::EmptyPool)
    }
}
