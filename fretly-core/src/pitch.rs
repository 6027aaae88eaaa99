//! # Pitch Detection Module
//!
//! Monophonic fundamental-frequency estimation for a single guitar note,
//! based on the YIN algorithm.
//!
//! ## Features
//! - RMS noise gate that rejects silence and room noise before any analysis
//! - Difference function computed through FFT correlation
//! - Cumulative mean normalized difference with an absolute threshold
//! - Parabolic interpolation for sub-sample accuracy
//! - Valid-range check for the guitar's fundamental (70–1200 Hz)

use crate::fft::{Correlator, energy_prefix};
use crate::notes::{PitchClass, nearest_pitch};

/// Default analysis frame length in samples, and the floor at any rate.
pub const DEFAULT_FRAME_SIZE: usize = 2048;
/// Minimum RMS amplitude for pitch detection.
pub const SILENCE_THRESHOLD: f32 = 0.01;
/// Absolute threshold on the normalized difference function.
pub const YIN_THRESHOLD: f32 = 0.1;
/// Lowest accepted fundamental (low E is ~82 Hz, with margin).
pub const MIN_FREQUENCY: f32 = 70.0;
/// Highest accepted fundamental (high E at the 12th fret is ~660 Hz, with margin).
pub const MAX_FREQUENCY: f32 = 1200.0;

/// Detector settings, fixed for the lifetime of a [`YinDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub silence_threshold: f32,
    pub yin_threshold: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            frame_size: DEFAULT_FRAME_SIZE,
            silence_threshold: SILENCE_THRESHOLD,
            yin_threshold: YIN_THRESHOLD,
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
        }
    }
}

impl DetectorConfig {
    /// Default settings at `sample_rate`, with the frame grown to the next
    /// power of two that holds [`min_frame_len`](Self::min_frame_len).
    ///
    /// 44.1 and 48 kHz keep the 2048-sample frame; 88.2 and 96 kHz get 4096.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        let mut config = Self {
            sample_rate,
            ..Self::default()
        };
        config.frame_size = config
            .min_frame_len()
            .next_power_of_two()
            .max(DEFAULT_FRAME_SIZE);
        config
    }

    /// Smallest lag searched, from the highest accepted frequency.
    pub fn min_lag(&self) -> usize {
        ((self.sample_rate as f32 / self.max_frequency).floor() as usize).max(2)
    }

    /// Largest lag searched, from the lowest accepted frequency.
    pub fn max_lag(&self) -> usize {
        (self.sample_rate as f32 / self.min_frequency).ceil() as usize
    }

    /// Shortest frame that still holds two periods of the lowest frequency.
    pub fn min_frame_len(&self) -> usize {
        2 * self.max_lag() + 1
    }
}

/// A successful estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental frequency in Hz.
    pub frequency_hz: f32,
    /// `1 - d'(τ)` at the chosen lag, in [0, 1]. For display only.
    pub confidence: f32,
    /// RMS amplitude of the frame.
    pub rms: f32,
}

/// Outcome of analysing one frame. Not finding a pitch is the normal case
/// between notes, so it is a variant rather than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    Detected(PitchEstimate),
    NotDetected,
}

impl Detection {
    pub fn estimate(self) -> Option<PitchEstimate> {
        match self {
            Detection::Detected(estimate) => Some(estimate),
            Detection::NotDetected => None,
        }
    }

    pub fn frequency(self) -> Option<f32> {
        self.estimate().map(|e| e.frequency_hz)
    }
}

/// A detected pitch resolved to a note name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchReading {
    pub estimate: PitchEstimate,
    pub pitch_class: PitchClass,
    /// Offset from the equal-tempered pitch in cents.
    pub cents: f32,
}

/// YIN pitch detector.
///
/// Stateless across calls: the only things it keeps are its configuration
/// and the FFT plans for the configured frame size, so it can be fed
/// overlapping or disjoint frames at whatever cadence the caller likes.
pub struct YinDetector {
    config: DetectorConfig,
    correlator: Correlator,
}

impl YinDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let correlator = Correlator::new(config.frame_size);
        Self { config, correlator }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Estimates the fundamental frequency of one frame.
    ///
    /// # Arguments
    /// * `frame` - Consecutive samples in [-1, 1]
    ///
    /// # Returns
    /// * `Detection::Detected` - Frequency inside the configured range
    /// * `Detection::NotDetected` - Silence, noise, a frame too short for the
    ///   lowest frequency, or a pitch outside the range
    pub fn detect(&self, frame: &[f32]) -> Detection {
        let config = &self.config;
        if frame.is_empty() || frame.len() < config.min_frame_len() {
            return Detection::NotDetected;
        }

        // --- Noise gate ---
        let level = rms(frame);
        if level < config.silence_threshold {
            return Detection::NotDetected;
        }

        // --- Difference function and its normalized form ---
        let max_lag = config.max_lag();
        let diff = if frame.len() <= self.correlator.frame_size() {
            difference_function(&self.correlator, frame, max_lag)
        } else {
            difference_function(&Correlator::new(frame.len()), frame, max_lag)
        };
        let cmnd = cumulative_mean_normalized_difference(&diff);

        // --- Absolute threshold ---
        let Some(lag) = first_dip_below(&cmnd, config.min_lag(), config.yin_threshold) else {
            return Detection::NotDetected;
        };

        // --- Sub-sample refinement ---
        let refined = parabolic_interpolation(&cmnd, lag);
        let frequency = config.sample_rate as f32 / refined;

        if !frequency.is_finite()
            || frequency < config.min_frequency
            || frequency > config.max_frequency
        {
            return Detection::NotDetected;
        }

        Detection::Detected(PitchEstimate {
            frequency_hz: frequency,
            confidence: (1.0 - cmnd[lag]).clamp(0.0, 1.0),
            rms: level,
        })
    }

    /// Runs [`detect`](Self::detect) and names the resulting note.
    pub fn analyze(&self, frame: &[f32]) -> Option<PitchReading> {
        let estimate = self.detect(frame).estimate()?;
        let nearest = nearest_pitch(estimate.frequency_hz).ok()?;
        Some(PitchReading {
            estimate,
            pitch_class: nearest.pitch_class,
            cents: nearest.cents,
        })
    }
}

/// Root-mean-square amplitude of a frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// YIN difference function `d(τ) = Σ_{i<W} (x[i] - x[i+τ])²` for `τ` in
/// `0..=max_lag`, with the window `W = len - max_lag`.
///
/// Expanded as `Σ x[i]² + Σ x[i+τ]² - 2·r(τ)` so the cross term comes from
/// one FFT correlation.
fn difference_function(correlator: &Correlator, frame: &[f32], max_lag: usize) -> Vec<f32> {
    let window = frame.len() - max_lag;
    let prefix = energy_prefix(frame);
    let correlation = correlator.cross_correlate(frame, window, max_lag);
    let head_energy = prefix[window];

    (0..=max_lag)
        .map(|tau| {
            let tail_energy = prefix[tau + window] - prefix[tau];
            // Rounding in the transform can dip a hair below zero.
            (head_energy + tail_energy - 2.0 * correlation[tau]).max(0.0) as f32
        })
        .collect()
}

/// Cumulative mean normalized difference `d'(τ) = d(τ)·τ / Σ_{j=1..τ} d(j)`.
///
/// `d'(0)` is 1 by definition, and so is any lag whose running sum is zero
/// (an all-zero frame), so those lags can never pass the threshold.
fn cumulative_mean_normalized_difference(diff: &[f32]) -> Vec<f32> {
    let mut cmnd = vec![1.0; diff.len()];
    let mut running_sum = 0.0_f32;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        if running_sum > 0.0 {
            cmnd[tau] = diff[tau] * tau as f32 / running_sum;
        }
    }
    cmnd
}

/// Smallest lag at or above `min_lag` whose normalized difference is under
/// `threshold`, followed down to the bottom of its dip.
fn first_dip_below(cmnd: &[f32], min_lag: usize, threshold: f32) -> Option<usize> {
    let last = cmnd.len().checked_sub(1)?;
    let mut tau = min_lag.max(1);
    while tau <= last {
        if cmnd[tau] < threshold {
            while tau < last && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }
    None
}

/// Parabolic interpolation around a minimum; returns the refined lag.
fn parabolic_interpolation(cmnd: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f32;
    }
    let y1 = cmnd[tau - 1];
    let y2 = cmnd[tau];
    let y3 = cmnd[tau + 1];
    let denominator = y1 - 2.0 * y2 + y3;
    if denominator.abs() < 1e-12 {
        return tau as f32;
    }
    let shift = 0.5 * (y1 - y3) / denominator;
    // A true minimum never moves by more than half a sample.
    tau as f32 + shift.clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn detector(sample_rate: u32) -> YinDetector {
        YinDetector::new(DetectorConfig::with_sample_rate(sample_rate))
    }

    #[test]
    fn silent_frame_is_not_detected() {
        let frame = vec![0.0_f32; DEFAULT_FRAME_SIZE];
        assert_eq!(detector(44_100).detect(&frame), Detection::NotDetected);
    }

    #[test]
    fn quiet_tone_is_gated() {
        let frame = sine(440.0, 0.005, 44_100, DEFAULT_FRAME_SIZE);
        assert_eq!(detector(44_100).detect(&frame), Detection::NotDetected);
    }

    #[test]
    fn detects_a4() {
        let frame = sine(440.0, 0.5, 44_100, DEFAULT_FRAME_SIZE);
        let estimate = detector(44_100).detect(&frame).estimate().unwrap();
        assert_abs_diff_eq!(estimate.frequency_hz, 440.0, epsilon = 2.0);
        assert!(estimate.confidence > 0.9);
        assert_abs_diff_eq!(estimate.rms, 0.5 / 2.0_f32.sqrt(), epsilon = 0.01);
    }

    #[test]
    fn detects_low_e_at_48k() {
        let frame = sine(82.41, 0.5, 48_000, DEFAULT_FRAME_SIZE);
        let freq = detector(48_000).detect(&frame).frequency().unwrap();
        assert_abs_diff_eq!(freq, 82.41, epsilon = 1.0);
    }

    #[test]
    fn tone_below_the_guitar_range_is_rejected() {
        // One period of 50 Hz is longer than the largest searched lag.
        let frame = sine(50.0, 0.5, 44_100, DEFAULT_FRAME_SIZE);
        assert_eq!(detector(44_100).detect(&frame), Detection::NotDetected);
    }

    #[test]
    fn short_frame_is_rejected() {
        let frame = sine(440.0, 0.5, 44_100, 512);
        assert_eq!(detector(44_100).detect(&frame), Detection::NotDetected);
    }

    #[test]
    fn analyze_names_the_note() {
        let frame = sine(196.0, 0.5, 44_100, DEFAULT_FRAME_SIZE);
        let reading = detector(44_100).analyze(&frame).unwrap();
        assert_eq!(reading.pitch_class, PitchClass::G);
        assert!(reading.cents.abs() < 10.0);
    }

    #[test]
    fn cmnd_of_zero_difference_is_one() {
        let cmnd = cumulative_mean_normalized_difference(&[0.0; 16]);
        assert!(cmnd.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn parabolic_interpolation_finds_the_vertex() {
        let cmnd: Vec<f32> = (0..10).map(|i| (i as f32 - 5.2).powi(2)).collect();
        assert_abs_diff_eq!(parabolic_interpolation(&cmnd, 5), 5.2, epsilon = 0.01);
    }

    #[test]
    fn first_dip_walks_to_the_minimum() {
        let cmnd = [1.0, 1.0, 0.9, 0.08, 0.05, 0.02, 0.04, 0.5];
        assert_eq!(first_dip_below(&cmnd, 2, 0.1), Some(5));
        assert_eq!(first_dip_below(&cmnd, 2, 0.01), None);
    }

    #[test]
    fn frame_size_follows_the_sample_rate() {
        assert_eq!(DetectorConfig::with_sample_rate(44_100).frame_size, 2048);
        assert_eq!(DetectorConfig::with_sample_rate(48_000).frame_size, 2048);
        assert_eq!(DetectorConfig::with_sample_rate(88_200).frame_size, 4096);
        assert_eq!(DetectorConfig::with_sample_rate(96_000).frame_size, 4096);
        for rate in [22_050, 44_100, 48_000, 88_200, 96_000, 192_000] {
            let config = DetectorConfig::with_sample_rate(rate);
            assert!(config.frame_size >= config.min_frame_len(), "{rate} Hz");
        }
    }

    #[test]
    fn detects_g3_at_high_sample_rates() {
        for rate in [88_200, 96_000] {
            let detector = detector(rate);
            let frame = sine(196.0, 0.5, rate, detector.config().frame_size);
            let freq = detector.detect(&frame).frequency().unwrap();
            assert_abs_diff_eq!(freq, 196.0, epsilon = 1.0);
        }
    }

    #[test]
    fn lag_range_covers_the_guitar() {
        let config = DetectorConfig::with_sample_rate(44_100);
        assert_eq!(config.min_lag(), 36);
        assert_eq!(config.max_lag(), 630);
        assert!(config.min_frame_len() <= DEFAULT_FRAME_SIZE);
    }
}
