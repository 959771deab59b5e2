//! Short-time Fourier transform
//!
//! Hann-windowed magnitude spectrogram shared by the chroma, spectral, MFCC
//! and tempo extractors.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

/// Magnitude spectrogram, one `Vec` of `frame_size / 2 + 1` bins per frame
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Magnitude frames (time-major)
    pub frames: Vec<Vec<f32>>,

    /// Sample rate of the source signal in Hz
    pub sample_rate: u32,

    /// FFT frame size in samples
    pub frame_size: usize,

    /// Hop size in samples
    pub hop_size: usize,
}

impl Spectrogram {
    /// Number of frequency bins per frame
    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.frame_size as f32
    }
}

/// Compute the magnitude spectrogram of a mono signal
///
/// Signals shorter than one frame are zero-padded to a single frame, so any
/// non-empty signal yields at least one frame.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for empty input, zero sample rate, or
/// zero frame/hop sizes.
pub fn magnitude_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Result<Spectrogram, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }
    if frame_size == 0 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Frame and hop size must be > 0 (frame={}, hop={})",
            frame_size, hop_size
        )));
    }

    let num_frames = if samples.len() > frame_size {
        (samples.len() - frame_size) / hop_size + 1
    } else {
        1
    };

    log::debug!(
        "Computing STFT: {} samples, frame={}, hop={}, {} frames",
        samples.len(),
        frame_size,
        hop_size,
        num_frames
    );

    let window = hann_window(frame_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let n_bins = frame_size / 2 + 1;

    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];

    for i in 0..num_frames {
        let start = i * hop_size;
        for (j, slot) in buffer.iter_mut().enumerate() {
            let s = samples.get(start + j).copied().unwrap_or(0.0);
            *slot = Complex::new(s * window[j], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
    }

    Ok(Spectrogram {
        frames,
        sample_rate,
        frame_size,
        hop_size,
    })
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 22050;
        let spec = magnitude_spectrogram(&sine(1000.0, sr, 1.0), sr, 2048, 512).unwrap();
        assert!(spec.num_frames() > 1);
        assert_eq!(spec.frames[0].len(), spec.num_bins());

        let frame = &spec.frames[spec.num_frames() / 2];
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert!((spec.bin_frequency(peak) - 1000.0).abs() < 15.0);
    }

    #[test]
    fn test_short_signal_padded_to_one_frame() {
        let spec = magnitude_spectrogram(&[0.1; 100], 22050, 2048, 512).unwrap();
        assert_eq!(spec.num_frames(), 1);
    }

    #[test]
    fn test_invalid_input() {
        assert!(magnitude_spectrogram(&[], 22050, 2048, 512).is_err());
        assert!(magnitude_spectrogram(&[0.0; 4096], 0, 2048, 512).is_err());
        assert!(magnitude_spectrogram(&[0.0; 4096], 22050, 2048, 0).is_err());
    }

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }
}
