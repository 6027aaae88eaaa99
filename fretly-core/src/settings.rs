//! # Game Settings Module
//!
//! User-facing configuration of a practice session. The mutators are the
//! guards for the settings invariants: at least one string stays selected and
//! the timer stays within its slider range.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::fretboard::StringIndex;

/// Shortest allowed answer time in seconds.
pub const TIMER_MIN_SECS: f32 = 2.0;
/// Longest allowed answer time in seconds.
pub const TIMER_MAX_SECS: f32 = 15.0;
/// Answer time used until the user changes it.
pub const DEFAULT_TIMER_SECS: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    selected_strings: BTreeSet<StringIndex>,
    include_accidentals: bool,
    timer_duration_secs: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            selected_strings: StringIndex::ALL.into_iter().collect(),
            include_accidentals: false,
            timer_duration_secs: DEFAULT_TIMER_SECS,
        }
    }
}

impl GameSettings {
    /// Selected strings in ascending order (1 first).
    pub fn selected_strings(&self) -> impl Iterator<Item = StringIndex> + '_ {
        self.selected_strings.iter().copied()
    }

    pub fn is_selected(&self, string: StringIndex) -> bool {
        self.selected_strings.contains(&string)
    }

    pub fn include_accidentals(&self) -> bool {
        self.include_accidentals
    }

    pub fn timer_duration_secs(&self) -> f32 {
        self.timer_duration_secs
    }

    /// Adds or removes a string. Removing the last selected string is refused.
    ///
    /// # Returns
    /// * `true` if the selection changed
    pub fn toggle_string(&mut self, string: StringIndex) -> bool {
        if self.selected_strings.contains(&string) {
            if self.selected_strings.len() == 1 {
                return false;
            }
            self.selected_strings.remove(&string);
        } else {
            self.selected_strings.insert(string);
        }
        true
    }

    /// Replaces the whole selection. An empty selection is refused.
    pub fn set_selected_strings<I>(&mut self, strings: I) -> bool
    where
        I: IntoIterator<Item = StringIndex>,
    {
        let strings: BTreeSet<_> = strings.into_iter().collect();
        if strings.is_empty() {
            return false;
        }
        self.selected_strings = strings;
        true
    }

    pub fn set_include_accidentals(&mut self, include: bool) {
        self.include_accidentals = include;
    }

    /// Sets the answer time, clamped into [2, 15] seconds. Non-finite values
    /// are ignored.
    pub fn set_timer_duration(&mut self, secs: f32) -> bool {
        if !secs.is_finite() {
            return false;
        }
        self.timer_duration_secs = secs.clamp(TIMER_MIN_SECS, TIMER_MAX_SECS);
        true
    }

    /// Restores the defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Repairs a deserialized value that bypassed the mutators.
    pub fn sanitized(mut self) -> Self {
        if self.selected_strings.is_empty() {
            self.selected_strings = StringIndex::ALL.into_iter().collect();
        }
        if !self.timer_duration_secs.is_finite() {
            self.timer_duration_secs = DEFAULT_TIMER_SECS;
        }
        self.timer_duration_secs = self.timer_duration_secs.clamp(TIMER_MIN_SECS, TIMER_MAX_SECS);
        self
    }
}
