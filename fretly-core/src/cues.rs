//! # Feedback Cues Module
//!
//! Short sounds played when an answer is scored, rendered as mono f32
//! samples so any output backend can play them.
//!
//! ## Features
//! - Correct: rising C5-E5-G5 sine arpeggio
//! - Incorrect: low sawtooth buzz
//! - Linear attack followed by an exponential decay, per note

use crossbeam_channel::Sender;

/// C5, E5 and G5 in Hz.
const CORRECT_NOTES: [f32; 3] = [523.25, 659.25, 783.99];
const CORRECT_NOTE_SECS: f32 = 0.12;
const CORRECT_PEAK: f32 = 0.3;

const INCORRECT_FREQUENCY: f32 = 150.0;
const INCORRECT_SECS: f32 = 0.25;
const INCORRECT_PEAK: f32 = 0.25;

const ATTACK_SECS: f32 = 0.02;
/// Gain at the end of the decay.
const FLOOR_GAIN: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Incorrect,
}

impl Cue {
    pub fn for_answer(correct: bool) -> Self {
        if correct { Cue::Correct } else { Cue::Incorrect }
    }

    /// Total length of the rendered sound.
    pub fn duration_secs(self) -> f32 {
        match self {
            Cue::Correct => CORRECT_NOTE_SECS * CORRECT_NOTES.len() as f32,
            Cue::Incorrect => INCORRECT_SECS,
        }
    }
}

/// Receiver of fire-and-forget cue notifications.
pub trait CueSink: Send {
    fn play(&self, cue: Cue);
}

/// Sink that drops every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl CueSink for Silent {
    fn play(&self, _cue: Cue) {}
}

/// Hands cues to a playback thread. A full or closed channel drops the cue.
impl CueSink for Sender<Cue> {
    fn play(&self, cue: Cue) {
        if self.try_send(cue).is_err() {
            log::debug!("[CUES] Dropped {:?} cue", cue);
        }
    }
}

/// Renders a cue as mono samples at `sample_rate`.
pub fn synthesize(cue: Cue, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    match cue {
        Cue::Correct => CORRECT_NOTES
            .iter()
            .flat_map(|&freq| tone(freq, CORRECT_NOTE_SECS, CORRECT_PEAK, sr, sine))
            .collect(),
        Cue::Incorrect => tone(INCORRECT_FREQUENCY, INCORRECT_SECS, INCORRECT_PEAK, sr, sawtooth),
    }
}

fn tone(freq: f32, secs: f32, peak: f32, sample_rate: f32, wave: fn(f32) -> f32) -> Vec<f32> {
    let len = (secs * sample_rate).round() as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            wave((freq * t).fract()) * envelope(t, secs, peak)
        })
        .collect()
}

fn envelope(t: f32, secs: f32, peak: f32) -> f32 {
    if t < ATTACK_SECS {
        peak * t / ATTACK_SECS
    } else {
        let progress = ((t - ATTACK_SECS) / (secs - ATTACK_SECS)).clamp(0.0, 1.0);
        peak * (FLOOR_GAIN / peak).powf(progress)
    }
}

/// One cycle of a sine, `phase` in [0, 1).
fn sine(phase: f32) -> f32 {
    (std::f32::consts::TAU * phase).sin()
}

fn sawtooth(phase: f32) -> f32 {
    2.0 * phase - 1.0
}
