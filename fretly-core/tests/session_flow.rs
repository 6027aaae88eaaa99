use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use fretly_core::SessionSnapshot;
use fretly_core::controller::{ControllerOptions, SessionEvent, SessionHandle, SharedFrames};
use fretly_core::cues::Cue;
use fretly_core::listen::FrameSource;
use fretly_core::notes::pitch_class_to_frequency;
use fretly_core::persistence::{MemoryStore, PersistedState};
use fretly_core::session::{GameMode, GameStatus};

/// Frame source that plays whatever tone the test asks for.
#[derive(Default)]
struct VirtualGuitar {
    tone: Mutex<Option<f32>>,
    polls: AtomicUsize,
}

impl VirtualGuitar {
    fn play(&self, freq: f32) {
        *self.tone.lock() = Some(freq);
    }

    fn mute(&self) {
        *self.tone.lock() = None;
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl FrameSource for VirtualGuitar {
    fn sample_rate(&self) -> u32 {
        44_100
    }

    fn latest_frame(&self, frame: &mut Vec<f32>) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let tone = *self.tone.lock();
        frame.clear();
        frame.extend((0..2048).map(|i| match tone {
            Some(freq) => 0.4 * (2.0 * PI * freq * i as f32 / 44_100.0).sin(),
            None => 0.0,
        }));
        true
    }
}

fn fast_options() -> ControllerOptions {
    ControllerOptions {
        listening_advance_delay: Duration::from_millis(100),
        image_feedback_delay: Duration::from_millis(100),
        detection_interval: Duration::from_millis(5),
        timer_tick: Duration::from_millis(20),
    }
}

fn wait_for<F>(handle: &SessionHandle, what: &str, done: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = handle.snapshot();
        if done(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}: {snapshot:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn listening_session_answers_from_the_microphone() {
    let store = Arc::new(MemoryStore::new(PersistedState::default()));
    let (cue_tx, cue_rx) = crossbeam_channel::unbounded();
    let handle =
        SessionHandle::spawn(fast_options(), Box::new(Arc::clone(&store)), Box::new(cue_tx))
            .unwrap();

    let guitar = Arc::new(VirtualGuitar::default());
    handle.send(SessionEvent::AttachAudio(SharedFrames(guitar.clone())));
    handle.send(SessionEvent::StartGame(GameMode::Listening));

    for expected_streak in 1..=3 {
        let snapshot = wait_for(&handle, "a question", |s| {
            s.status == GameStatus::Playing
                && s.question.is_some()
                && s.streak == expected_streak - 1
        });
        let question = snapshot.question.unwrap();
        guitar.play(pitch_class_to_frequency(question.pitch_class, 3));

        let snapshot = wait_for(&handle, "the correct answer", |s| s.streak == expected_streak);
        assert_eq!(snapshot.status, GameStatus::Feedback);
        assert_eq!(snapshot.last_answer_correct, Some(true));
        assert!(snapshot.valid_frets.contains(&question.fret));
        guitar.mute();
        assert_eq!(cue_rx.recv_timeout(Duration::from_secs(1)), Ok(Cue::Correct));
    }

    handle.send(SessionEvent::EndGame);
    let snapshot = wait_for(&handle, "the end", |s| s.status == GameStatus::Finished);
    assert_eq!(snapshot.best_streak_this_session, 3);
    assert_eq!(store.snapshot().best_streak_ever, 3);
}

#[test]
fn image_session_times_out_and_moves_on() {
    let store = Arc::new(MemoryStore::default());
    let handle = SessionHandle::spawn(
        fast_options(),
        Box::new(Arc::clone(&store)),
        Box::new(fretly_core::cues::Silent),
    )
    .unwrap();

    handle.send(SessionEvent::SetTimerDuration(2.0));
    handle.send(SessionEvent::StartGame(GameMode::Image));
    let first = wait_for(&handle, "a question", |s| s.question.is_some()).question;

    let feedback = wait_for(&handle, "the reveal", |s| s.status == GameStatus::Feedback);
    assert_eq!(feedback.last_answer_correct, Some(false));
    assert_eq!(feedback.time_remaining_secs, 0.0);
    assert!(!feedback.valid_frets.is_empty());

    let next = wait_for(&handle, "the next question", |s| s.status == GameStatus::Playing);
    assert_ne!(next.question, None);
    assert!(!next.question.unwrap().same_prompt(&first.unwrap()));
    assert_eq!(store.snapshot().settings.timer_duration_secs(), 2.0);

    handle.send(SessionEvent::ResetGame);
    wait_for(&handle, "idle", |s| s.status == GameStatus::Idle);
}

#[test]
fn stopping_a_session_releases_the_microphone_and_the_countdown() {
    let handle = SessionHandle::spawn(
        fast_options(),
        Box::new(MemoryStore::default()),
        Box::new(fretly_core::cues::Silent),
    )
    .unwrap();
    let guitar = Arc::new(VirtualGuitar::default());
    handle.send(SessionEvent::AttachAudio(SharedFrames(guitar.clone())));

    for (stop, stopped_status) in [
        (SessionEvent::EndGame, GameStatus::Finished),
        (SessionEvent::ResetGame, GameStatus::Idle),
    ] {
        handle.send(SessionEvent::ResetGame);
        handle.send(SessionEvent::StartGame(GameMode::Listening));
        wait_for(&handle, "a question", |s| {
            s.status == GameStatus::Playing && s.question.is_some()
        });

        // Both the detection loop and the countdown are running.
        let before = guitar.polls();
        let deadline = Instant::now() + Duration::from_secs(5);
        while guitar.polls() <= before {
            assert!(Instant::now() < deadline, "detection never polled");
            thread::sleep(Duration::from_millis(5));
        }
        let first = handle.snapshot().time_remaining_secs;
        wait_for(&handle, "a timer tick", |s| s.time_remaining_secs < first);

        handle.send(stop);
        let stopped = wait_for(&handle, "the session to stop", |s| s.status == stopped_status);
        let polls = guitar.polls();

        thread::sleep(Duration::from_millis(200));
        assert_eq!(guitar.polls(), polls, "still polling after {stopped_status:?}");
        let later = handle.snapshot();
        assert_eq!(later.status, stopped_status);
        assert_eq!(later.time_remaining_secs, stopped.time_remaining_secs);
    }
}
