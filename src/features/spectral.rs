//! Spectral shape descriptors
//!
//! Per-frame spectral centroid, flatness and octave-band contrast computed
//! from a magnitude spectrogram.

use crate::features::stft::Spectrogram;

/// Numerical floor for power and log computations
const AMIN: f32 = 1e-10;

/// Fraction of each band used for the peak and valley estimates
const CONTRAST_QUANTILE: f32 = 0.02;

/// Lowest edge of the first contrast band in Hz
const CONTRAST_FMIN: f32 = 200.0;

/// Spectral centroid (magnitude-weighted mean frequency) per frame, in Hz
///
/// Silent frames yield 0.0.
pub fn spectral_centroid(spectrogram: &Spectrogram) -> Vec<f32> {
    spectrogram
        .frames
        .iter()
        .map(|frame| {
            let mut weighted = 0.0f64;
            let mut total = 0.0f64;
            for (k, &mag) in frame.iter().enumerate() {
                weighted += spectrogram.bin_frequency(k) as f64 * mag as f64;
                total += mag as f64;
            }
            if total > AMIN as f64 {
                (weighted / total) as f32
            } else {
                0.0
            }
        })
        .collect()
}

/// Spectral flatness per frame: geometric mean over arithmetic mean of power
///
/// Values lie in (0, 1]; noise-like frames approach 1, tonal frames approach 0.
/// Powers are floored at `1e-10` so silent frames report 1.0.
pub fn spectral_flatness(spectrogram: &Spectrogram) -> Vec<f32> {
    spectrogram
        .frames
        .iter()
        .map(|frame| {
            if frame.is_empty() {
                return 0.0;
            }
            let n = frame.len() as f64;
            let mut log_sum = 0.0f64;
            let mut sum = 0.0f64;
            for &mag in frame {
                let power = (mag * mag).max(AMIN) as f64;
                log_sum += power.ln();
                sum += power;
            }
            let geometric = (log_sum / n).exp();
            let arithmetic = sum / n;
            (geometric / arithmetic) as f32
        })
        .collect()
}

/// Octave-band spectral contrast
///
/// The spectrum is split into `n_bands + 1` bands: `[0, 200)` Hz, then octaves
/// starting at 200 Hz, the last band running to Nyquist. For each band and
/// frame, contrast is the dB difference between the mean of the strongest and
/// the weakest 2% of bins.
///
/// # Returns
///
/// Matrix of `n_bands + 1` rows, each holding one value per frame
pub fn spectral_contrast(spectrogram: &Spectrogram, n_bands: usize) -> Vec<Vec<f32>> {
    let n_bins = spectrogram.num_bins();
    let nyquist = spectrogram.sample_rate as f32 / 2.0;

    // Band edges in Hz: 0, 200, 400, 800, ...
    let mut edges = Vec::with_capacity(n_bands + 2);
    edges.push(0.0f32);
    for b in 0..=n_bands {
        edges.push((CONTRAST_FMIN * 2f32.powi(b as i32)).min(nyquist));
    }
    if let Some(last) = edges.last_mut() {
        *last = nyquist;
    }

    let band_bins: Vec<(usize, usize)> = edges
        .windows(2)
        .map(|w| {
            let lo = (0..n_bins)
                .find(|&k| spectrogram.bin_frequency(k) >= w[0])
                .unwrap_or(n_bins);
            let hi = (0..n_bins)
                .find(|&k| spectrogram.bin_frequency(k) >= w[1])
                .unwrap_or(n_bins);
            // Last band includes the Nyquist bin
            let hi = if w[1] >= nyquist { n_bins } else { hi };
            (lo, hi.max(lo))
        })
        .collect();

    log::debug!(
        "Spectral contrast: {} bands over {} bins",
        band_bins.len(),
        n_bins
    );

    band_bins
        .iter()
        .map(|&(lo, hi)| {
            spectrogram
                .frames
                .iter()
                .map(|frame| band_contrast(&frame[lo.min(frame.len())..hi.min(frame.len())]))
                .collect()
        })
        .collect()
}

/// Peak-to-valley contrast of one band in dB
fn band_contrast(band: &[f32]) -> f32 {
    if band.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f32> = band.iter().map(|&m| m * m).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let take = ((sorted.len() as f32 * CONTRAST_QUANTILE).round() as usize).max(1);
    let valley = sorted[..take].iter().sum::<f32>() / take as f32;
    let peak = sorted[sorted.len() - take..].iter().sum::<f32>() / take as f32;

    10.0 * (peak.max(AMIN).log10() - valley.max(AMIN).log10())
}
