//! Tempo estimation
//!
//! Spectral-flux onset envelope followed by FFT-accelerated autocorrelation.
//!
//! # Algorithm
//!
//! 1. Onset envelope: half-wave rectified frame-to-frame increase of
//!    log-compressed magnitude, summed over bins
//! 2. Subtract the envelope mean and compute `ACF = IFFT(|FFT(envelope)|²)`
//! 3. Restrict lags to the BPM range and pick the strongest one
//! 4. Refine the lag with parabolic interpolation and convert:
//!    `BPM = 60 * sample_rate / (lag * hop_size)`
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use crate::error::AnalysisError;
use crate::features::stft::Spectrogram;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Estimate tempo in BPM from a magnitude spectrogram
///
/// Returns 0.0 when the signal is too short to hold two periods of the
/// slowest tempo, or carries no onset energy.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an invalid BPM range.
pub fn estimate_tempo(
    spectrogram: &Spectrogram,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<f32, AnalysisError> {
    if min_bpm <= 0.0 || max_bpm <= 0.0 || min_bpm >= max_bpm {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            min_bpm, max_bpm
        )));
    }

    let envelope = onset_envelope(spectrogram);
    let frame_rate = spectrogram.sample_rate as f32 / spectrogram.hop_size as f32;

    let lag_min = ((60.0 * frame_rate) / max_bpm).floor().max(1.0) as usize;
    let lag_max = ((60.0 * frame_rate) / min_bpm).ceil() as usize;

    if envelope.len() < 2 * lag_max {
        log::debug!(
            "Onset envelope too short for tempo: {} frames, need {}",
            envelope.len(),
            2 * lag_max
        );
        return Ok(0.0);
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|&v| v - mean).collect();
    let acf = autocorrelation_fft(&centered);

    if acf[0] < EPSILON {
        log::debug!("Flat onset envelope, no tempo");
        return Ok(0.0);
    }

    let mut best_lag = lag_min;
    for lag in lag_min..=lag_max.min(acf.len() - 2) {
        if acf[lag] > acf[best_lag] {
            best_lag = lag;
        }
    }

    if acf[best_lag] <= 0.0 {
        return Ok(0.0);
    }

    // Parabolic refinement around the peak
    let refined = if best_lag > 0 && best_lag + 1 < acf.len() {
        let (a, b, c) = (acf[best_lag - 1], acf[best_lag], acf[best_lag + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > EPSILON {
            best_lag as f32 + 0.5 * (a - c) / denom
        } else {
            best_lag as f32
        }
    } else {
        best_lag as f32
    };

    let bpm = 60.0 * frame_rate / refined;
    log::debug!("Tempo estimate: {:.2} BPM (lag {:.2} frames)", bpm, refined);
    Ok(bpm)
}

/// Spectral-flux onset strength, one value per frame (first frame is 0.0)
pub fn onset_envelope(spectrogram: &Spectrogram) -> Vec<f32> {
    let mut envelope = Vec::with_capacity(spectrogram.num_frames());
    let mut prev: Option<Vec<f32>> = None;

    for frame in &spectrogram.frames {
        let log_frame: Vec<f32> = frame.iter().map(|&m| (1.0 + 1000.0 * m).ln()).collect();
        let flux = match &prev {
            Some(p) => log_frame
                .iter()
                .zip(p.iter())
                .map(|(&c, &q)| (c - q).max(0.0))
                .sum(),
            None => 0.0,
        };
        envelope.push(flux);
        prev = Some(log_frame);
    }
    envelope
}

/// Autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(signal)|²)`
fn autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);
    for x in &mut buffer {
        *x = *x * x.conj();
    }
    planner.plan_fft_inverse(fft_size).process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    buffer[..n].iter().map(|x| x.re * scale).collect()
}
