//! Key detection by profile correlation
//!
//! Averages chroma vectors across all frames, then computes the Pearson
//! correlation of the average with each of the 24 key profiles. The profile
//! with the highest correlation is the estimated key.
//!
//! Ties go to the earliest profile in canonical order (major 0-11, then
//! minor 0-11), so the result never depends on iteration quirks.
//!
//! # Example
//!
//! ```
//! use stratum_batch::features::key::{detect_key, KeyProfileModel, MAJOR_PROFILE};
//! use stratum_batch::analysis::result::Key;
//!
//! let model = KeyProfileModel::new();
//! let chroma = vec![MAJOR_PROFILE; 4]; // four frames of a pure C major profile
//! let estimate = detect_key(&chroma, &model)?;
//! assert_eq!(estimate.key, Key::Major(0));
//! # Ok::<(), stratum_batch::AnalysisError>(())
//! ```

use super::templates::KeyProfileModel;
use super::KeyEstimate;
use crate::analysis::result::Key;
use crate::error::AnalysisError;

/// Denominator floor below which a correlation is reported as 0.0
const EPSILON: f64 = 1e-12;

/// Estimate the key of a chroma sequence
///
/// # Arguments
///
/// * `chroma` - Chroma frames (12 pitch-class energies per frame)
/// * `model` - Key profile model
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `chroma` has no frames and
/// `AnalysisError::NumericalError` if it contains non-finite values.
pub fn detect_key(
    chroma: &[[f32; 12]],
    model: &KeyProfileModel,
) -> Result<KeyEstimate, AnalysisError> {
    let mean = average_chroma(chroma)?;
    detect_key_from_mean(&mean, model)
}

/// Estimate the key from an already time-averaged chroma vector
pub fn detect_key_from_mean(
    mean_chroma: &[f32; 12],
    model: &KeyProfileModel,
) -> Result<KeyEstimate, AnalysisError> {
    if mean_chroma.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalError(
            "Averaged chroma contains non-finite values".to_string(),
        ));
    }

    let correlations: Vec<f64> = model
        .profiles()
        .iter()
        .map(|p| pearson_correlation(mean_chroma, &p.weights))
        .collect();

    let best = best_index(&correlations);

    let scores: Vec<(Key, f32)> = model
        .profiles()
        .iter()
        .zip(correlations.iter())
        .map(|(p, &r)| (p.key, r as f32))
        .collect();
    let (key, correlation) = scores[best];
    log::debug!(
        "Estimated key {} (r={:.4}) from {} profiles",
        key.label(),
        correlation,
        scores.len()
    );

    Ok(KeyEstimate {
        key,
        correlation,
        scores,
    })
}

/// Position of the largest value; strict comparison keeps the first maximum
fn best_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Mean of each pitch class across all frames
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty sequence.
pub fn average_chroma(chroma: &[[f32; 12]]) -> Result<[f32; 12], AnalysisError> {
    if chroma.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty chroma vectors".to_string(),
        ));
    }

    let mut sums = [0.0f64; 12];
    for frame in chroma {
        for (acc, &v) in sums.iter_mut().zip(frame.iter()) {
            *acc += v as f64;
        }
    }

    let n = chroma.len() as f64;
    let mut mean = [0.0f32; 12];
    for (m, s) in mean.iter_mut().zip(sums.iter()) {
        *m = (s / n) as f32;
    }
    Ok(mean)
}

/// Pearson correlation coefficient of two 12-element vectors
///
/// Returns 0.0 when either vector has zero variance.
pub fn pearson_correlation(x: &[f32; 12], y: &[f32; 12]) -> f64 {
    let n = 12.0f64;
    let mean_x = x.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_y = y.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut cov = 0.0f64;
    let mut var_x = 0.0f64;
    let mut var_y = 0.0f64;

    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a as f64 - mean_x;
        let dy = b as f64 - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom > EPSILON {
        cov / denom
    } else {
        0.0
    }
}
