//! Mel-frequency cepstral coefficients
//!
//! Triangular mel filterbank over the power spectrum, log compression, then a
//! DCT-II across mel bands.

use crate::error::AnalysisError;
use crate::features::stft::Spectrogram;

/// Floor applied before the log
const LOG_FLOOR: f32 = 1e-10;

/// MFCC matrix (coefficient-major)
#[derive(Debug, Clone)]
pub struct Mfcc {
    /// `coefficients[c][t]` is coefficient `c` at frame `t`
    pub coefficients: Vec<Vec<f32>>,
}

impl Mfcc {
    /// `(coefficients, frames)`
    pub fn shape(&self) -> (usize, usize) {
        let frames = self.coefficients.first().map(|c| c.len()).unwrap_or(0);
        (self.coefficients.len(), frames)
    }
}

/// Compute MFCCs from a magnitude spectrogram
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `n_mfcc` is zero or larger than
/// `n_mels`.
pub fn mfcc(spectrogram: &Spectrogram, n_mfcc: usize, n_mels: usize) -> Result<Mfcc, AnalysisError> {
    if n_mfcc == 0 || n_mels == 0 || n_mfcc > n_mels {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid MFCC parameters: n_mfcc={}, n_mels={}",
            n_mfcc, n_mels
        )));
    }

    let filters = mel_filterbank(spectrogram, n_mels);
    let mut coefficients = vec![Vec::with_capacity(spectrogram.num_frames()); n_mfcc];

    for frame in &spectrogram.frames {
        let log_mel: Vec<f32> = filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .map(|&(k, w)| frame.get(k).map(|m| m * m * w).unwrap_or(0.0))
                    .sum();
                energy.max(LOG_FLOOR).log10() * 10.0
            })
            .collect();

        for (c, row) in coefficients.iter_mut().enumerate() {
            row.push(dct_ii(&log_mel, c));
        }
    }

    log::debug!(
        "Computed MFCC: {} coefficients x {} frames",
        n_mfcc,
        spectrogram.num_frames()
    );

    Ok(Mfcc { coefficients })
}

/// Orthonormal DCT-II coefficient `c` of `x`
fn dct_ii(x: &[f32], c: usize) -> f32 {
    let n = x.len() as f32;
    let sum: f32 = x
        .iter()
        .enumerate()
        .map(|(i, &v)| v * (std::f32::consts::PI * c as f32 * (i as f32 + 0.5) / n).cos())
        .sum();
    let scale = if c == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
    sum * scale
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Sparse triangular filters: for each mel band, `(bin, weight)` pairs
fn mel_filterbank(spectrogram: &Spectrogram, n_mels: usize) -> Vec<Vec<(usize, f32)>> {
    let nyquist = spectrogram.sample_rate as f32 / 2.0;
    let mel_max = hz_to_mel(nyquist);
    let points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lo, center, hi) = (points[m], points[m + 1], points[m + 2]);
            (0..spectrogram.num_bins())
                .filter_map(|k| {
                    let f = spectrogram.bin_frequency(k);
                    let w = if f > lo && f <= center {
                        (f - lo) / (center - lo)
                    } else if f > center && f < hi {
                        (hi - f) / (hi - center)
                    } else {
                        0.0
                    };
                    (w > 0.0).then_some((k, w))
                })
                .collect()
        })
        .collect()
}
