//! Degree of harmony
//!
//! Estimates how many pitch classes sound at once, on average. For each frame
//! the threshold is half the frame's strongest pitch class; the classes at or
//! above it are counted, and the counts are averaged over all frames.
//!
//! Rough reading of the result:
//! - 1.0-1.5: monophonic, one note at a time
//! - 2.0-3.0: harmonized lines or chords
//! - above 3.0: dense polyphony

use crate::error::AnalysisError;

/// Fraction of the frame maximum a pitch class must reach to count
pub const HARMONY_THRESHOLD_RATIO: f32 = 0.5;

/// Compute the mean number of strong pitch classes per frame
///
/// A frame of all zeros counts 12, since every class meets a zero threshold.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `chroma` has no frames.
pub fn degree_of_harmony(chroma: &[[f32; 12]]) -> Result<f32, AnalysisError> {
    if chroma.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Cannot estimate harmony from zero chroma frames".to_string(),
        ));
    }

    let total: usize = chroma
        .iter()
        .map(|frame| {
            let max = frame.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let threshold = HARMONY_THRESHOLD_RATIO * max;
            frame.iter().filter(|&&v| v >= threshold).count()
        })
        .sum();

    Ok(total as f32 / chroma.len() as f32)
}
