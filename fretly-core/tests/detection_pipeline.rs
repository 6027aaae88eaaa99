use std::f32::consts::PI;

use fretly_core::fretboard::{FRETBOARD, Fret, StringIndex};
use fretly_core::notes::frequency_to_pitch_class;
use fretly_core::pitch::{DEFAULT_FRAME_SIZE, Detection, DetectorConfig, YinDetector};

/// Plucked-string stand-in: fundamental plus decaying overtones.
fn pluck(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let partials = [(1.0, 0.5), (2.0, 0.25), (3.0, 0.12), (4.0, 0.06)];
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            partials
                .iter()
                .map(|(n, amp)| amp * (2.0 * PI * freq * n * t).sin())
                .sum::<f32>()
        })
        .collect()
}

fn fret_frequency(string: StringIndex, fret: Fret) -> f32 {
    string.open_frequency() * 2.0_f32.powf(fret.number() as f32 / 12.0)
}

#[test]
fn every_fretboard_position_is_named_correctly() {
    let detector = YinDetector::new(DetectorConfig::with_sample_rate(44_100));
    for string in StringIndex::ALL {
        for fret in Fret::all() {
            let freq = fret_frequency(string, fret);
            let frame = pluck(freq, 44_100, DEFAULT_FRAME_SIZE);
            let reading = detector
                .analyze(&frame)
                .unwrap_or_else(|| panic!("no pitch for string {string} fret {fret}"));
            assert_eq!(
                reading.pitch_class,
                FRETBOARD.pitch_at(string, fret),
                "string {string} fret {fret} at {freq:.2} Hz read as {:.2} Hz",
                reading.estimate.frequency_hz
            );
        }
    }
}

#[test]
fn detection_agrees_with_the_quantizer_at_48k() {
    let detector = YinDetector::new(DetectorConfig::with_sample_rate(48_000));
    for freq in [82.41_f32, 110.0, 146.83, 196.0, 246.94, 329.63, 659.26] {
        let frame = pluck(freq, 48_000, DEFAULT_FRAME_SIZE);
        let detected = detector.detect(&frame).frequency().unwrap();
        assert!(
            (detected - freq).abs() / freq < 0.01,
            "{freq} Hz detected as {detected} Hz"
        );
        assert_eq!(
            frequency_to_pitch_class(detected).unwrap(),
            frequency_to_pitch_class(freq).unwrap()
        );
    }
}

#[test]
fn white_noise_below_the_gate_is_silent() {
    let detector = YinDetector::new(DetectorConfig::default());
    // Deterministic pseudo-noise with an RMS well under 0.01.
    let mut state = 0x2545_f491_u32;
    let frame: Vec<f32> = (0..DEFAULT_FRAME_SIZE)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32 - 0.5) * 0.01
        })
        .collect();
    assert_eq!(detector.detect(&frame), Detection::NotDetected);
}
