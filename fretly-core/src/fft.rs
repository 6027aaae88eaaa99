//! # Fast Fourier Transform (FFT) Module
//!
//! FFT-backed correlation used by the YIN difference function. Computing the
//! lag products in the frequency domain turns the O(N·τ) inner loop into a
//! pair of transforms, which keeps a 2048-sample frame well inside one
//! display frame of processing time.
//!
//! ## Features
//! - Forward and inverse plans prepared once per frame size
//! - Windowed cross-correlation `r(τ) = Σ_{i<W} x[i]·x[i+τ]`
//! - Running energy sums for the difference function

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Cross-correlates the head of a frame against the whole frame.
///
/// Holds forward and inverse plans sized for one frame length; the
/// transforms themselves are immutable and can be shared between threads.
pub struct Correlator {
    frame_size: usize,
    fft_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Correlator {
    /// Plans transforms for frames of `frame_size` samples.
    ///
    /// The transform length is padded to a power of two of at least twice
    /// the frame size so circular wrap-around never reaches the lags we read.
    pub fn new(frame_size: usize) -> Self {
        let fft_len = (frame_size * 2).max(2).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);
        Self {
            frame_size,
            fft_len,
            forward,
            inverse,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Computes `r(τ) = Σ_{i<window} frame[i]·frame[i+τ]` for `τ` in `0..=max_lag`.
    ///
    /// # Arguments
    /// * `frame` - Samples, at most `frame_size` long
    /// * `window` - Length of the integration window
    /// * `max_lag` - Largest lag to return; `window + max_lag` must not exceed the frame
    ///
    /// # Returns
    /// * `Vec<f64>` of length `max_lag + 1`
    pub fn cross_correlate(&self, frame: &[f32], window: usize, max_lag: usize) -> Vec<f64> {
        debug_assert!(frame.len() <= self.frame_size);
        debug_assert!(window + max_lag <= frame.len());

        let zero = Complex { re: 0.0_f64, im: 0.0 };
        let mut head = vec![zero; self.fft_len];
        let mut whole = vec![zero; self.fft_len];
        for (i, &sample) in frame.iter().enumerate() {
            whole[i].re = sample as f64;
            if i < window {
                head[i].re = sample as f64;
            }
        }

        self.forward.process(&mut head);
        self.forward.process(&mut whole);

        // conj(A)·B is the spectrum of the cross-correlation of a with b.
        for (h, w) in head.iter_mut().zip(whole.iter()) {
            *h = h.conj() * *w;
        }
        self.inverse.process(&mut head);

        let scale = 1.0 / self.fft_len as f64;
        head.iter().take(max_lag + 1).map(|c| c.re * scale).collect()
    }
}

/// Prefix sums of squared samples: `out[k] = Σ_{i<k} x[i]²`.
pub fn energy_prefix(frame: &[f32]) -> Vec<f64> {
    let mut prefix = Vec::with_capacity(frame.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0_f64;
    for &sample in frame {
        acc += sample as f64 * sample as f64;
        prefix.push(acc);
    }
    prefix
}
