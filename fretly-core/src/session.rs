//! # Game Session Module
//!
//! The quiz state machine: status, questions, streaks and the last answer.
//! It never drives timers or detection itself; the controller calls into it
//! and reacts to what it reports.
//!
//! Calls that do not match a transition from the current status are ignored
//! and reported as `false`. Late timer expiries and duplicate detections are
//! routine here, so none of them is an error.

use serde::{Deserialize, Serialize};

use crate::question::Question;

/// How answers are collected during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Play the note; the microphone judges it.
    Listening,
    /// Find the note mentally; the countdown reveals the fret.
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Idle,
    Playing,
    Paused,
    Feedback,
    Finished,
}

/// Best streak across all sessions, owned by the persistence collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentStats {
    pub best_streak_ever: u32,
}

impl PersistentStats {
    /// Raises the record if `streak` beats it.
    ///
    /// # Returns
    /// * `true` if the record changed
    pub fn record(&mut self, streak: u32) -> bool {
        if streak > self.best_streak_ever {
            self.best_streak_ever = streak;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    mode: Option<GameMode>,
    status: GameStatus,
    current_question: Option<Question>,
    previous_question: Option<Question>,
    streak: u32,
    best_streak_this_session: u32,
    last_answer_correct: Option<bool>,
    time_remaining_secs: f32,
    stats: PersistentStats,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(PersistentStats::default())
    }
}

impl GameSession {
    /// Idle session carrying the stored all-time record.
    pub fn new(stats: PersistentStats) -> Self {
        Self {
            mode: None,
            status: GameStatus::Idle,
            current_question: None,
            previous_question: None,
            streak: 0,
            best_streak_this_session: 0,
            last_answer_correct: None,
            time_remaining_secs: 0.0,
            stats,
        }
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_question.as_ref()
    }

    pub fn previous_question(&self) -> Option<&Question> {
        self.previous_question.as_ref()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak_this_session(&self) -> u32 {
        self.best_streak_this_session
    }

    pub fn last_answer_correct(&self) -> Option<bool> {
        self.last_answer_correct
    }

    pub fn time_remaining_secs(&self) -> f32 {
        self.time_remaining_secs
    }

    pub fn stats(&self) -> PersistentStats {
        self.stats
    }

    /// Idle → Playing. Clears streak and questions and arms the time display.
    pub fn start_game(&mut self, mode: GameMode, timer_duration_secs: f32) -> bool {
        if self.status != GameStatus::Idle {
            log::debug!("[SESSION] start_game ignored in {:?}", self.status);
            return false;
        }
        *self = Self {
            mode: Some(mode),
            status: GameStatus::Playing,
            time_remaining_secs: timer_duration_secs,
            ..Self::new(self.stats)
        };
        log::info!("[SESSION] Started {:?} session", mode);
        true
    }

    /// Installs the next question. Allowed in every status; the old current
    /// question becomes the previous one.
    pub fn set_question(&mut self, question: Question, timer_duration_secs: f32) {
        self.previous_question = self.current_question.replace(question);
        self.last_answer_correct = None;
        self.time_remaining_secs = timer_duration_secs;
    }

    /// Playing → Feedback with the answer scored.
    ///
    /// Only the first answer for a question counts: once the session has
    /// left Playing, further calls are ignored.
    pub fn submit_answer(&mut self, correct: bool) -> bool {
        if self.status != GameStatus::Playing {
            log::debug!("[SESSION] submit_answer({}) ignored in {:?}", correct, self.status);
            return false;
        }
        self.streak = if correct { self.streak + 1 } else { 0 };
        self.best_streak_this_session = self.best_streak_this_session.max(self.streak);
        self.stats.record(self.streak);
        self.last_answer_correct = Some(correct);
        self.status = GameStatus::Feedback;
        log::info!(
            "[SESSION] Answer {} (streak {})",
            if correct { "correct" } else { "incorrect" },
            self.streak
        );
        true
    }

    /// Feedback → Playing. The caller supplies the question via `set_question`.
    pub fn next_question(&mut self) -> bool {
        if self.status != GameStatus::Feedback {
            log::debug!("[SESSION] next_question ignored in {:?}", self.status);
            return false;
        }
        self.last_answer_correct = None;
        self.status = GameStatus::Playing;
        true
    }

    /// Playing → Paused.
    pub fn pause(&mut self) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }
        self.status = GameStatus::Paused;
        true
    }

    /// Paused → Playing.
    pub fn resume(&mut self) -> bool {
        if self.status != GameStatus::Paused {
            return false;
        }
        self.status = GameStatus::Playing;
        true
    }

    /// Playing | Paused | Feedback → Finished, folding the streak into the record.
    pub fn end_game(&mut self) -> bool {
        match self.status {
            GameStatus::Playing | GameStatus::Paused | GameStatus::Feedback => {
                self.stats.record(self.streak);
                self.status = GameStatus::Finished;
                log::info!(
                    "[SESSION] Finished (best this session {}, best ever {})",
                    self.best_streak_this_session,
                    self.stats.best_streak_ever
                );
                true
            }
            _ => {
                log::debug!("[SESSION] end_game ignored in {:?}", self.status);
                false
            }
        }
    }

    /// Any status → Idle with every session field cleared. The all-time
    /// record survives.
    pub fn reset_game(&mut self) {
        *self = Self::new(self.stats);
    }

    /// Mirrors the countdown for display.
    pub fn update_time_remaining(&mut self, secs: f32) {
        self.time_remaining_secs = secs.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fretboard::{Fret, StringIndex};

    fn question(string: u8, fret: u8) -> Question {
        Question::at(
            StringIndex::try_from(string).unwrap(),
            Fret::try_from(fret).unwrap(),
        )
    }

    fn playing() -> GameSession {
        let mut session = GameSession::default();
        assert!(session.start_game(GameMode::Listening, 5.0));
        session.set_question(question(1, 5), 5.0);
        session
    }

    #[test]
    fn starts_idle_and_empty() {
        let session = GameSession::default();
        assert_eq!(session.status(), GameStatus::Idle);
        assert_eq!(session.mode(), None);
        assert!(session.current_question().is_none());
        assert!(session.previous_question().is_none());
        assert_eq!(session.last_answer_correct(), None);
    }

    #[test]
    fn start_game_enters_playing() {
        let mut session = GameSession::default();
        assert!(session.start_game(GameMode::Listening, 7.0));
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.streak(), 0);
        assert_eq!(session.mode(), Some(GameMode::Listening));
        assert_eq!(session.time_remaining_secs(), 7.0);
        assert!(!session.start_game(GameMode::Image, 7.0));
    }

    #[test]
    fn streak_sequence() {
        let mut session = playing();
        assert!(session.submit_answer(true));
        session.next_question();
        session.set_question(question(2, 1), 5.0);
        assert!(session.submit_answer(true));
        assert_eq!(session.streak(), 2);
        assert_eq!(session.best_streak_this_session(), 2);

        session.next_question();
        assert!(session.submit_answer(false));
        assert_eq!(session.streak(), 0);
        assert_eq!(session.best_streak_this_session(), 2);
        assert_eq!(session.last_answer_correct(), Some(false));
    }

    #[test]
    fn duplicate_submit_is_ignored() {
        let mut session = playing();
        assert!(session.submit_answer(true));
        assert!(!session.submit_answer(false));
        assert_eq!(session.streak(), 1);
        assert_eq!(session.last_answer_correct(), Some(true));
        assert_eq!(session.status(), GameStatus::Feedback);
    }

    #[test]
    fn set_question_shifts_current_to_previous() {
        let mut session = playing();
        session.submit_answer(false);
        session.update_time_remaining(0.0);
        session.set_question(question(3, 2), 6.0);
        assert_eq!(session.previous_question(), Some(&question(1, 5)));
        assert_eq!(session.current_question(), Some(&question(3, 2)));
        assert_eq!(session.last_answer_correct(), None);
        assert_eq!(session.time_remaining_secs(), 6.0);
        // set_question does not change status
        assert_eq!(session.status(), GameStatus::Feedback);
    }

    #[test]
    fn next_question_requires_feedback() {
        let mut session = playing();
        assert!(!session.next_question());
        session.submit_answer(true);
        assert!(session.next_question());
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.last_answer_correct(), None);
    }

    #[test]
    fn end_game_records_best_streak() {
        let mut session = playing();
        session.submit_answer(true);
        session.next_question();
        session.submit_answer(true);
        assert!(session.end_game());
        assert_eq!(session.status(), GameStatus::Finished);
        assert_eq!(session.stats().best_streak_ever, 2);
        assert!(!session.end_game());
        assert!(!session.submit_answer(true));
    }

    #[test]
    fn best_ever_never_decreases() {
        let mut session = GameSession::new(PersistentStats { best_streak_ever: 10 });
        session.start_game(GameMode::Image, 5.0);
        session.submit_answer(true);
        session.end_game();
        assert_eq!(session.stats().best_streak_ever, 10);
    }

    #[test]
    fn pause_and_resume() {
        let mut session = playing();
        assert!(session.pause());
        assert_eq!(session.status(), GameStatus::Paused);
        assert!(!session.submit_answer(true));
        assert!(session.resume());
        assert!(session.submit_answer(true));
        assert!(!session.pause());
    }

    #[test]
    fn end_game_from_paused() {
        let mut session = playing();
        session.pause();
        assert!(session.end_game());
    }

    #[test]
    fn out_of_order_calls_from_idle_are_ignored() {
        let mut session = GameSession::default();
        assert!(!session.submit_answer(true));
        assert!(!session.next_question());
        assert!(!session.end_game());
        assert!(!session.pause());
        assert!(!session.resume());
        assert_eq!(session.status(), GameStatus::Idle);
    }

    #[test]
    fn reset_clears_everything_but_the_record() {
        let mut session = playing();
        session.submit_answer(true);
        session.reset_game();
        assert_eq!(session.status(), GameStatus::Idle);
        assert_eq!(session.streak(), 0);
        assert_eq!(session.mode(), None);
        assert!(session.current_question().is_none());
        assert_eq!(session.stats().best_streak_ever, 1);
    }
}
