//! # Fretly - Guitar Ear Trainer GUI
//!
//! Desktop front end for the Fretly fretboard trainer. It renders the home
//! and game screens from the session snapshot and turns user input into
//! session events.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Session Thread**: `SessionHandle` from fretly-core, the only writer of game state
//! - **Audio Thread**: Owns the microphone stream and hands its frame buffer to the session
//! - **Sound Thread**: Owns the output stream that plays answer cues
//! - **Updates**: 60 FPS snapshot polling via subscription

mod sound;
mod ui;

use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::StreamTrait;
use crossbeam_channel::Sender;
use fretly_core::persistence::JsonFileStore;
use fretly_core::{
    ControllerOptions, GameMode, GameStatus, SessionEvent, SessionHandle, SessionSnapshot,
    SharedFrames, StringIndex, audio,
};
use iced::{Element, Subscription, Theme};

/// Main entry point for the Fretly application.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("[MAIN] Starting Fretly...");
    let result = iced::application("Fretly", FretlyApp::update, FretlyApp::view)
        .subscription(FretlyApp::subscription)
        .theme(FretlyApp::theme)
        .run();
    log::info!("[MAIN] Application finished with result: {:?}", result);
    result
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    // Home screen
    ToggleString(StringIndex),
    SetAccidentals(bool),
    SetTimerDuration(f32),
    ResetSettings,
    StartListening,
    StartImage,

    // Game screen
    Next,
    Pause,
    Resume,
    Stop,
    BackHome,

    // Continuous update message
    Tick,
}

/// Main application state.
struct FretlyApp {
    session: SessionHandle,
    snapshot: SessionSnapshot,
    _audio_worker: Option<AudioWorker>,
    _sound_worker: Option<sound::SoundWorker>,
}

/// Audio capture thread management structure.
///
/// The cpal stream is not `Send` on every platform, so it lives and dies on
/// its own thread; only the frame buffer crosses over to the session.
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for FretlyApp {
    fn default() -> Self {
        log::info!("[MAIN] Creating FretlyApp...");
        let store = JsonFileStore::from_env();
        log::info!("[MAIN] Settings file: {}", store.path().display());

        let (sound_worker, cues) = sound::SoundWorker::start();
        let session = match SessionHandle::spawn(
            ControllerOptions::default(),
            Box::new(store),
            Box::new(cues),
        ) {
            Ok(session) => session,
            Err(e) => {
                log::error!("[MAIN] Could not start the session thread: {}", e);
                std::process::exit(1);
            }
        };

        let audio_worker = start_audio(session.sender());
        let snapshot = session.snapshot();
        Self {
            session,
            snapshot,
            _audio_worker: audio_worker,
            _sound_worker: sound_worker,
        }
    }
}

/// Starts the microphone on a dedicated thread.
///
/// The outcome is reported to the session either way: `AttachAudio` with
/// the live frame, or `AudioUnavailable` with a message for the home screen.
fn start_audio(events: Sender<SessionEvent>) -> Option<AudioWorker> {
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    let spawned = thread::Builder::new()
        .name("audio-capture".into())
        .spawn(move || {
            log::info!("[AUDIO-THREAD] Starting audio capture...");
            let stream = match audio::start_capture() {
                Ok((stream, frame)) => {
                    let _ = events.send(SessionEvent::AttachAudio(SharedFrames(frame)));
                    stream
                }
                Err(e) => {
                    log::error!("[AUDIO-THREAD] Could not start audio: {:#}", e);
                    let _ = events.send(SessionEvent::AudioUnavailable(format!("{:#}", e)));
                    return;
                }
            };

            let _ = shutdown_rx.recv();

            log::info!("[AUDIO-THREAD] Stopping stream and exiting...");
            if let Err(e) = stream.pause() {
                log::warn!("[AUDIO-THREAD] Error pausing stream: {}", e);
            }
            drop(stream);
        });

    match spawned {
        Ok(handle) => Some(AudioWorker {
            shutdown_tx,
            thread_handle: Some(handle),
        }),
        Err(e) => {
            log::error!("[MAIN] Could not spawn the audio thread: {}", e);
            None
        }
    }
}

impl FretlyApp {
    fn update(&mut self, message: Message) {
        if !matches!(message, Message::Tick) {
            log::debug!("[UPDATE] Received message: {:?}", message);
        }

        let event = match message {
            Message::ToggleString(string) => SessionEvent::ToggleString(string),
            Message::SetAccidentals(include) => SessionEvent::SetIncludeAccidentals(include),
            Message::SetTimerDuration(secs) => SessionEvent::SetTimerDuration(secs),
            Message::ResetSettings => SessionEvent::ResetSettings,
            Message::StartListening => SessionEvent::StartGame(GameMode::Listening),
            Message::StartImage => SessionEvent::StartGame(GameMode::Image),
            Message::Next => SessionEvent::NextQuestion,
            Message::Pause => SessionEvent::Pause,
            Message::Resume => SessionEvent::Resume,
            Message::Stop => SessionEvent::EndGame,
            Message::BackHome => SessionEvent::ResetGame,
            Message::Tick => {
                self.snapshot = self.session.snapshot();
                return;
            }
        };
        self.session.send(event);
    }

    fn view(&self) -> Element<'_, Message> {
        match self.snapshot.status {
            GameStatus::Idle => ui::home::view(&self.snapshot),
            _ => ui::game::view(&self.snapshot),
        }
    }

    /// Polls the session snapshot every 16 ms (60 FPS).
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
