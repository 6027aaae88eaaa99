//! # Detection Loop Module
//!
//! Polls a frame source at a fixed cadence and runs the YIN detector on the
//! newest frame. Every poll reads whatever the source holds right now; frames
//! that arrived in between are skipped rather than queued.
//!
//! ## Features
//! - Source-agnostic: anything implementing [`FrameSource`] can feed it
//! - Explicit [`CancellationToken`], checked on every iteration
//! - RAII handle: dropping a [`DetectionLoop`] cancels and joins its thread

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::pitch::{DetectorConfig, PitchReading, YinDetector};

/// Delay between two polls, about one display frame.
pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Supplier of the most recent audio frame.
pub trait FrameSource: Send + Sync {
    fn sample_rate(&self) -> u32;

    /// Copies the newest samples into `frame`, replacing its contents.
    ///
    /// # Returns
    /// * `true` - `frame` holds fresh audio
    /// * `false` - Nothing captured yet
    fn latest_frame(&self, frame: &mut Vec<f32>) -> bool;
}

/// Shared stop flag for a running loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a running detection thread.
pub struct DetectionLoop {
    token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl DetectionLoop {
    /// Starts polling `source` every `interval`, reporting each detected
    /// pitch to `on_reading`. Frames without a pitch are not reported.
    ///
    /// # Arguments
    /// * `source` - Where frames come from; also fixes the sample rate
    /// * `interval` - Delay between polls
    /// * `on_reading` - Called on the loop thread for every detected pitch
    ///
    /// # Returns
    /// * `Ok(handle)` - The loop is running
    /// * `Err(e)` - The thread could not be spawned
    pub fn spawn<F>(
        source: Arc<dyn FrameSource>,
        interval: Duration,
        on_reading: F,
    ) -> std::io::Result<Self>
    where
        F: Fn(PitchReading) + Send + 'static,
    {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let detector = YinDetector::new(DetectorConfig::with_sample_rate(source.sample_rate()));

        let thread = thread::Builder::new()
            .name("pitch-detect".into())
            .spawn(move || {
                log::debug!("[DETECT] Loop started at {} Hz", detector.config().sample_rate);
                let mut frame = Vec::with_capacity(detector.config().frame_size);
                while !loop_token.is_cancelled() {
                    if source.latest_frame(&mut frame) {
                        if let Some(reading) = detector.analyze(&frame) {
                            log::trace!(
                                "[DETECT] {:.1} Hz -> {} ({:+.0} cents)",
                                reading.estimate.frequency_hz,
                                reading.pitch_class,
                                reading.cents
                            );
                            if loop_token.is_cancelled() {
                                break;
                            }
                            on_reading(reading);
                        }
                    }
                    thread::sleep(interval);
                }
                log::debug!("[DETECT] Loop stopped");
            })?;

        Ok(Self {
            token,
            thread: Some(thread),
        })
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the loop and waits for its thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
