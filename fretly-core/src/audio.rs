//! # Audio Capture Module
//!
//! Microphone input through CPAL (Cross-Platform Audio Library). The stream
//! callback keeps the newest detector frame of samples in a [`LiveFrame`],
//! which the detection loop reads as a [`FrameSource`].
//!
//! ## Features
//! - Default input device selection
//! - 32-bit float format, 44.1 kHz preferred
//! - Multi-channel devices reduced to their first channel
//! - Window sized from the device rate, so 88.2/96 kHz devices still reach 70 Hz
//! - Errors reported with context for the user-facing message

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};
use parking_lot::Mutex;

use crate::listen::FrameSource;
use crate::pitch::DetectorConfig;

/// Sample rate requested from the device when it offers a choice.
pub const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// Rolling window over the newest captured samples.
pub struct LiveFrame {
    sample_rate: u32,
    capacity: usize,
    samples: Mutex<VecDeque<f32>>,
}

impl LiveFrame {
    pub fn new(sample_rate: u32, capacity: usize) -> Self {
        Self {
            sample_rate,
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// A window as long as the detector's frame at `sample_rate`.
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        Self::new(
            sample_rate,
            DetectorConfig::with_sample_rate(sample_rate).frame_size,
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends interleaved samples, keeping channel 0 only.
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        let channels = channels.max(1);
        let mut samples = self.samples.lock();
        samples.extend(data.iter().step_by(channels).copied());
        let excess = samples.len().saturating_sub(self.capacity);
        samples.drain(..excess);
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSource for LiveFrame {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fails until a full window has been captured.
    fn latest_frame(&self, frame: &mut Vec<f32>) -> bool {
        let samples = self.samples.lock();
        if samples.len() < self.capacity {
            return false;
        }
        frame.clear();
        frame.extend(samples.iter().copied());
        true
    }
}

/// Starts capturing from the default input device.
///
/// # Returns
/// * `Ok((stream, frame))` - The running stream, which must be kept alive, and
///   the frame it fills
/// * `Err(e)` - No device, no usable format, or the stream could not start
pub fn start_capture() -> Result<(cpal::Stream, Arc<LiveFrame>)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No microphone found"))?;

    log::info!(
        "[AUDIO] Using input device: {}",
        device.name().unwrap_or_else(|_| "<unnamed>".into())
    );

    let configs = device
        .supported_input_configs()
        .context("Could not query microphone formats")?
        .collect::<Vec<_>>();
    let supported = find_supported_config(configs, PREFERRED_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("The microphone offers no 32-bit float format"))?;

    let sample_rate = supported.sample_rate().0;
    let channels = usize::from(supported.channels());
    let config: cpal::StreamConfig = supported.into();
    log::info!("[AUDIO] Capturing {} Hz, {} channel(s)", sample_rate, channels);

    let frame = Arc::new(LiveFrame::for_sample_rate(sample_rate));
    log::debug!("[AUDIO] Frame window: {} samples", frame.capacity());
    let sink = Arc::clone(&frame);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                sink.push_interleaved(data, channels);
            },
            |err| log::error!("[AUDIO] Input stream error: {}", err),
            None,
        )
        .context("Could not open the microphone stream")?;

    stream.play().context("Could not start the microphone stream")?;

    Ok((stream, frame))
}

/// Picks the input format closest to what the detector wants.
///
/// Only f32 formats qualify. Among those, ranges containing `target_rate`
/// win, then fewer channels; a range without the target runs at its rate
/// nearest to it.
///
/// # Returns
/// * `Some(config)` - Best matching configuration, rate fixed
/// * `None` - No f32 format at all
pub fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfig> {
    let distance = |c: &SupportedStreamConfigRange| {
        let min = c.min_sample_rate().0;
        let max = c.max_sample_rate().0;
        if (min..=max).contains(&target_rate) {
            0
        } else {
            min.abs_diff(target_rate).min(max.abs_diff(target_rate))
        }
    };

    let best = configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| (distance(c), c.channels()))?;

    let rate = target_rate.clamp(best.min_sample_rate().0, best.max_sample_rate().0);
    Some(best.with_sample_rate(cpal::SampleRate(rate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listen::DetectionLoop;
    use crate::notes::PitchClass;
    use cpal::{SampleRate, SupportedBufferSize};
    use std::f32::consts::PI;
    use std::time::Duration;

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn live_frame_waits_for_a_full_window() {
        let frame = LiveFrame::new(44_100, 4);
        let mut out = Vec::new();
        frame.push_interleaved(&[0.1, 0.2, 0.3], 1);
        assert!(!frame.latest_frame(&mut out));
        frame.push_interleaved(&[0.4, 0.5], 1);
        assert!(frame.latest_frame(&mut out));
        assert_eq!(out, vec![0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn live_frame_keeps_the_first_channel() {
        let frame = LiveFrame::new(48_000, 3);
        frame.push_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0], 2);
        let mut out = Vec::new();
        assert!(frame.latest_frame(&mut out));
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
        assert_eq!(frame.sample_rate(), 48_000);
    }

    #[test]
    fn window_grows_for_high_sample_rates() {
        assert_eq!(LiveFrame::for_sample_rate(44_100).capacity(), 2048);
        assert_eq!(LiveFrame::for_sample_rate(96_000).capacity(), 4096);
    }

    #[test]
    fn detects_a_stereo_tone_captured_at_96k() {
        let rate = 96_000;
        let frame = Arc::new(LiveFrame::for_sample_rate(rate));
        // One second of G3 on the left channel, arriving in device-sized blocks.
        let interleaved: Vec<f32> = (0..rate as usize)
            .flat_map(|i| {
                let s = 0.5 * (2.0 * PI * 196.0 * i as f32 / rate as f32).sin();
                [s, 0.0]
            })
            .collect();
        for block in interleaved.chunks(960) {
            frame.push_interleaved(block, 2);
        }
        assert_eq!(frame.len(), frame.capacity());

        let (tx, rx) = crossbeam_channel::unbounded();
        let detection = DetectionLoop::spawn(frame, Duration::from_millis(5), move |reading| {
            let _ = tx.send(reading);
        })
        .unwrap();
        let reading = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        detection.stop();
        assert_eq!(reading.pitch_class, PitchClass::G);
        assert!((reading.estimate.frequency_hz - 196.0).abs() < 1.0);
    }

    #[test]
    fn prefers_a_mono_float_range_with_the_target_rate() {
        let configs = vec![
            range(2, 8_000, 96_000, SampleFormat::F32),
            range(1, 8_000, 96_000, SampleFormat::I16),
            range(1, 44_100, 48_000, SampleFormat::F32),
        ];
        let chosen = find_supported_config(configs, 44_100).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.sample_rate().0, 44_100);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn falls_back_to_the_nearest_rate() {
        let configs = vec![range(2, 48_000, 48_000, SampleFormat::F32)];
        let chosen = find_supported_config(configs, 44_100).unwrap();
        assert_eq!(chosen.sample_rate().0, 48_000);
        assert_eq!(chosen.channels(), 2);
    }

    #[test]
    fn integer_only_devices_are_rejected() {
        let configs = vec![range(1, 44_100, 44_100, SampleFormat::I16)];
        assert!(find_supported_config(configs, 44_100).is_none());
    }
}
