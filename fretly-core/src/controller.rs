//! # Session Controller Module
//!
//! Single writer for the game: owns the settings, the session state machine,
//! the question generator and the per-question resources (countdown timer and
//! detection loop), and applies every input as a [`SessionEvent`], one at a
//! time.
//!
//! ## Features
//! - Mode orchestration for listening and image training
//! - Question serials: timer and detection events for an older question are
//!   dropped
//! - Deadline-scheduled auto-advance after feedback
//! - Settings and best streak written back to the store on every change
//! - [`SessionHandle`]: the controller on a worker thread, with a published
//!   [`SessionSnapshot`] for the presentation layer

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;

use crate::cues::{Cue, CueSink};
use crate::fretboard::{Fret, StringIndex};
use crate::listen::{DetectionLoop, FrameSource, POLL_INTERVAL};
use crate::persistence::{PersistedState, SettingsStore};
use crate::pitch::PitchReading;
use crate::question::{Question, QuestionGenerator};
use crate::session::{GameMode, GameSession, GameStatus};
use crate::settings::GameSettings;
use crate::timer::{CountdownTimer, TICK_INTERVAL, TimerEvent};

/// Pause after a correct listening answer before the next question.
pub const LISTENING_ADVANCE_DELAY: Duration = Duration::from_millis(1000);
/// How long image mode shows the revealed fret.
pub const IMAGE_FEEDBACK_DELAY: Duration = Duration::from_millis(1500);

/// Timing knobs of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    pub listening_advance_delay: Duration,
    pub image_feedback_delay: Duration,
    pub detection_interval: Duration,
    pub timer_tick: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            listening_advance_delay: LISTENING_ADVANCE_DELAY,
            image_feedback_delay: IMAGE_FEEDBACK_DELAY,
            detection_interval: POLL_INTERVAL,
            timer_tick: TICK_INTERVAL,
        }
    }
}

/// Shared audio input, attached once the microphone is running.
#[derive(Clone)]
pub struct SharedFrames(pub Arc<dyn FrameSource>);

impl fmt::Debug for SharedFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedFrames({} Hz)", self.0.sample_rate())
    }
}

/// Every input the controller accepts.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    // --- User commands ---
    StartGame(GameMode),
    NextQuestion,
    Pause,
    Resume,
    EndGame,
    ResetGame,
    ToggleString(StringIndex),
    SetIncludeAccidentals(bool),
    SetTimerDuration(f32),
    ResetSettings,

    // --- Audio input ---
    AttachAudio(SharedFrames),
    AudioUnavailable(String),

    // --- Produced for a specific question ---
    TimerTick { serial: u64, remaining_secs: f32 },
    TimerExpired { serial: u64 },
    PitchDetected { serial: u64, reading: PitchReading },
    AutoAdvance { serial: u64 },

    /// Stops a [`SessionHandle`]'s worker thread.
    Shutdown,
}

/// Read-only view of the controller for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: GameStatus,
    pub mode: Option<GameMode>,
    pub question: Option<Question>,
    /// Frets that sound the question's note, shown once it is answered.
    pub valid_frets: Vec<Fret>,
    pub streak: u32,
    pub best_streak_this_session: u32,
    pub best_streak_ever: u32,
    pub last_answer_correct: Option<bool>,
    pub time_remaining_secs: f32,
    pub settings: GameSettings,
    pub last_reading: Option<PitchReading>,
    pub audio_ready: bool,
    pub audio_error: Option<String>,
}

impl SessionSnapshot {
    /// Countdown progress in [0, 1], 1 meaning the full time is left.
    pub fn time_fraction(&self) -> f32 {
        let total = self.settings.timer_duration_secs();
        if total > 0.0 {
            (self.time_remaining_secs / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

pub struct SessionController {
    options: ControllerOptions,
    settings: GameSettings,
    session: GameSession,
    generator: QuestionGenerator,
    store: Box<dyn SettingsStore>,
    cues: Box<dyn CueSink>,
    frames: Option<Arc<dyn FrameSource>>,
    audio_error: Option<String>,
    events: Sender<SessionEvent>,
    serial: u64,
    timer: Option<CountdownTimer>,
    detection: Option<DetectionLoop>,
    pending_advance: Option<(Instant, u64)>,
    last_reading: Option<PitchReading>,
    saved_best: u32,
}

impl SessionController {
    /// Creates an idle controller with the stored settings and record.
    ///
    /// # Arguments
    /// * `options` - Delays and polling intervals
    /// * `store` - Where settings and the best streak are loaded and saved
    /// * `cues` - Notified on every scored answer
    /// * `events` - Sender of the channel this controller is fed from; timer
    ///   and detection events are posted to it
    pub fn new(
        options: ControllerOptions,
        store: Box<dyn SettingsStore>,
        cues: Box<dyn CueSink>,
        events: Sender<SessionEvent>,
    ) -> Self {
        let state = store.load().unwrap_or_else(|e| {
            log::warn!("[STORE] Could not load settings: {:#}", e);
            PersistedState::default()
        });
        Self {
            options,
            settings: state.settings.clone(),
            session: GameSession::new(state.stats()),
            generator: QuestionGenerator::from_entropy(),
            store,
            cues,
            frames: None,
            audio_error: None,
            events,
            serial: 0,
            timer: None,
            detection: None,
            pending_advance: None,
            last_reading: None,
            saved_best: state.best_streak_ever,
        }
    }

    /// Replaces the random generator with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator = QuestionGenerator::seeded(seed);
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Serial of the current question. Events tagged with another serial are
    /// ignored.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// When the scheduled auto-advance is due, if one is pending.
    pub fn pending_advance(&self) -> Option<Instant> {
        self.pending_advance.map(|(at, _)| at)
    }

    /// Fires the scheduled auto-advance if it is due at `now`.
    pub fn fire_due(&mut self, now: Instant) {
        if let Some((at, serial)) = self.pending_advance {
            if at <= now {
                self.handle(SessionEvent::AutoAdvance { serial });
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let question = self.session.current_question().copied();
        let revealed = self.session.status() == GameStatus::Feedback;
        SessionSnapshot {
            status: self.session.status(),
            mode: self.session.mode(),
            question,
            valid_frets: question
                .filter(|_| revealed)
                .map(|q| q.valid_frets())
                .unwrap_or_default(),
            streak: self.session.streak(),
            best_streak_this_session: self.session.best_streak_this_session(),
            best_streak_ever: self.session.stats().best_streak_ever,
            last_answer_correct: self.session.last_answer_correct(),
            time_remaining_secs: self.session.time_remaining_secs(),
            settings: self.settings.clone(),
            last_reading: self.last_reading,
            audio_ready: self.frames.is_some(),
            audio_error: self.audio_error.clone(),
        }
    }

    /// Applies one event.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StartGame(mode) => self.start_game(mode),
            SessionEvent::NextQuestion => self.advance(),
            SessionEvent::Pause => self.pause(),
            SessionEvent::Resume => self.resume(),
            SessionEvent::EndGame => self.end_game(),
            SessionEvent::ResetGame => self.reset_game(),
            SessionEvent::ToggleString(string) => {
                if self.settings.toggle_string(string) {
                    self.persist();
                }
            }
            SessionEvent::SetIncludeAccidentals(include) => {
                self.settings.set_include_accidentals(include);
                self.persist();
            }
            SessionEvent::SetTimerDuration(secs) => {
                if self.settings.set_timer_duration(secs) {
                    self.persist();
                }
            }
            SessionEvent::ResetSettings => {
                self.settings.reset();
                self.persist();
            }
            SessionEvent::AttachAudio(SharedFrames(frames)) => {
                log::info!("[SESSION] Microphone attached at {} Hz", frames.sample_rate());
                self.frames = Some(frames);
                self.audio_error = None;
                if self.listening_active() {
                    self.start_detection();
                }
            }
            SessionEvent::AudioUnavailable(message) => {
                log::warn!("[SESSION] Microphone unavailable: {}", message);
                self.frames = None;
                self.detection = None;
                self.audio_error = Some(message);
            }
            SessionEvent::TimerTick {
                serial,
                remaining_secs,
            } => {
                if serial == self.serial && self.session.status() == GameStatus::Playing {
                    self.session.update_time_remaining(remaining_secs);
                }
            }
            SessionEvent::TimerExpired { serial } => {
                if serial == self.serial && self.session.status() == GameStatus::Playing {
                    self.session.update_time_remaining(0.0);
                    self.submit(false);
                }
            }
            SessionEvent::PitchDetected { serial, reading } => {
                if serial != self.serial {
                    return;
                }
                self.last_reading = Some(reading);
                let target = self.session.current_question().map(|q| q.pitch_class);
                if self.listening_active() && target == Some(reading.pitch_class) {
                    self.submit(true);
                }
            }
            SessionEvent::AutoAdvance { serial } => {
                if matches!(self.pending_advance, Some((_, pending)) if pending == serial)
                    && serial == self.serial
                {
                    self.advance();
                }
            }
            SessionEvent::Shutdown => {}
        }
    }

    fn listening_active(&self) -> bool {
        self.session.status() == GameStatus::Playing
            && self.session.mode() == Some(GameMode::Listening)
    }

    fn start_game(&mut self, mode: GameMode) {
        if !self.session.start_game(mode, self.settings.timer_duration_secs()) {
            return;
        }
        if mode == GameMode::Listening && self.frames.is_none() {
            log::warn!("[SESSION] Listening without a microphone; answers will time out");
        }
        if self.install_question() {
            self.enter_playing();
        }
    }

    /// Feedback → Playing with a fresh question.
    fn advance(&mut self) {
        if !self.session.next_question() {
            return;
        }
        if self.install_question() {
            self.enter_playing();
        }
    }

    /// Draws the next question and makes it current. Ends the game if the
    /// settings allow no question at all.
    fn install_question(&mut self) -> bool {
        let previous = self.session.current_question().copied();
        match self.generator.generate(&self.settings, previous.as_ref()) {
            Ok(question) => {
                self.session
                    .set_question(question, self.settings.timer_duration_secs());
                self.serial += 1;
                self.pending_advance = None;
                self.last_reading = None;
                log::info!(
                    "[SESSION] Question {}: string {} -> {}",
                    self.serial,
                    question.string,
                    question.pitch_class
                );
                true
            }
            Err(e) => {
                log::error!("[SESSION] Could not generate a question: {}", e);
                self.session.end_game();
                self.release_resources();
                false
            }
        }
    }

    /// Starts the per-question resources for the current serial.
    fn enter_playing(&mut self) {
        self.start_timer(self.settings.timer_duration_secs());
        if self.session.mode() == Some(GameMode::Listening) {
            self.start_detection();
        }
    }

    fn start_timer(&mut self, duration_secs: f32) {
        let tx = self.events.clone();
        let serial = self.serial;
        let mut timer = CountdownTimer::with_tick_interval(self.options.timer_tick, move |event| {
            let event = match event {
                TimerEvent::Tick { remaining_secs } => SessionEvent::TimerTick {
                    serial,
                    remaining_secs,
                },
                TimerEvent::Expired => SessionEvent::TimerExpired { serial },
            };
            let _ = tx.send(event);
        });
        timer.start(duration_secs);
        self.timer = Some(timer);
    }

    fn start_detection(&mut self) {
        self.detection = None;
        let Some(frames) = self.frames.clone() else {
            return;
        };
        let tx = self.events.clone();
        let serial = self.serial;
        match DetectionLoop::spawn(frames, self.options.detection_interval, move |reading| {
            let _ = tx.send(SessionEvent::PitchDetected { serial, reading });
        }) {
            Ok(detection) => self.detection = Some(detection),
            Err(e) => log::error!("[SESSION] Could not start pitch detection: {}", e),
        }
    }

    /// Scores the current question and schedules what comes after it.
    fn submit(&mut self, correct: bool) {
        if !self.session.submit_answer(correct) {
            return;
        }
        self.timer = None;
        self.detection = None;
        self.cues.play(Cue::for_answer(correct));
        self.persist_best();

        let delay = match (self.session.mode(), correct) {
            (Some(GameMode::Listening), true) => Some(self.options.listening_advance_delay),
            (Some(GameMode::Image), _) => Some(self.options.image_feedback_delay),
            _ => None,
        };
        self.pending_advance = delay.map(|d| (Instant::now() + d, self.serial));
    }

    fn pause(&mut self) {
        if !self.session.pause() {
            return;
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.pause();
        }
        self.detection = None;
        log::info!("[SESSION] Paused");
    }

    fn resume(&mut self) {
        if !self.session.resume() {
            return;
        }
        log::info!("[SESSION] Resumed");
        let resumed = self.timer.as_mut().is_some_and(|timer| timer.resume());
        if !resumed {
            // The countdown ran out before the pause took effect.
            self.session.update_time_remaining(0.0);
            self.submit(false);
            return;
        }
        if self.session.mode() == Some(GameMode::Listening) {
            self.start_detection();
        }
    }

    fn end_game(&mut self) {
        if self.session.end_game() {
            self.release_resources();
            self.persist_best();
        }
    }

    fn reset_game(&mut self) {
        self.session.reset_game();
        self.release_resources();
        self.serial += 1;
        self.last_reading = None;
        log::info!("[SESSION] Reset");
    }

    fn release_resources(&mut self) {
        self.timer = None;
        self.detection = None;
        self.pending_advance = None;
    }

    fn persist_best(&mut self) {
        if self.session.stats().best_streak_ever > self.saved_best {
            self.persist();
        }
    }

    fn persist(&mut self) {
        let state = PersistedState {
            settings: self.settings.clone(),
            best_streak_ever: self.session.stats().best_streak_ever,
        };
        match self.store.save(&state) {
            Ok(()) => self.saved_best = state.best_streak_ever,
            Err(e) => log::warn!("[STORE] Could not save settings: {:#}", e),
        }
    }
}

/// A [`SessionController`] running on its own thread.
pub struct SessionHandle {
    tx: Sender<SessionEvent>,
    snapshot: Arc<Mutex<SessionSnapshot>>,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Spawns the worker thread.
    ///
    /// # Returns
    /// * `Ok(handle)` - Send events with [`send`](Self::send), read state
    ///   with [`snapshot`](Self::snapshot)
    /// * `Err(e)` - The thread could not be spawned
    pub fn spawn(
        options: ControllerOptions,
        store: Box<dyn SettingsStore>,
        cues: Box<dyn CueSink>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let controller = SessionController::new(options, store, cues, tx.clone());
        let snapshot = Arc::new(Mutex::new(controller.snapshot()));
        let published = Arc::clone(&snapshot);

        let thread = thread::Builder::new()
            .name("session".into())
            .spawn(move || run(controller, rx, published))?;

        Ok(Self {
            tx,
            snapshot,
            thread: Some(thread),
        })
    }

    pub fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            log::error!("[SESSION] Worker thread is gone");
        }
    }

    /// Sender for collaborators that post events themselves.
    pub fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }

    /// State after the most recently applied event.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.lock().clone()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(SessionEvent::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    mut controller: SessionController,
    rx: Receiver<SessionEvent>,
    snapshot: Arc<Mutex<SessionSnapshot>>,
) {
    log::debug!("[SESSION] Worker started");
    loop {
        let received = match controller.pending_advance() {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(SessionEvent::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(event) => controller.handle(event),
            Err(RecvTimeoutError::Timeout) => controller.fire_due(Instant::now()),
        }
        *snapshot.lock() = controller.snapshot();
    }
    controller.release_resources();
    log::debug!("[SESSION] Worker stopped");
}
