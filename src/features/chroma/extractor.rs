//! Chroma vector extraction
//!
//! Folds an STFT magnitude spectrogram into 12-element pitch-class energy
//! vectors, one per frame.

use super::normalization::normalize_max;
use crate::config::AnalysisConfig;
use crate::features::stft::Spectrogram;

/// Extract chroma vectors from a magnitude spectrogram
///
/// Each bin between `min_chroma_freq` and `max_chroma_freq` adds its power to
/// the nearest equal-tempered pitch class (relative to `tuning_a4`). Frames are
/// then max-normalized so the strongest pitch class is 1.0; silent frames stay
/// all-zero.
///
/// # Returns
///
/// One 12-element chroma vector per spectrogram frame (index 0 = C)
pub fn extract_chroma(spectrogram: &Spectrogram, config: &AnalysisConfig) -> Vec<[f32; 12]> {
    log::debug!(
        "Extracting chroma: {} frames, {} bins, range=[{:.0}, {:.0}] Hz",
        spectrogram.num_frames(),
        spectrogram.num_bins(),
        config.min_chroma_freq,
        config.max_chroma_freq
    );

    // Bin → pitch-class lookup, computed once per spectrogram
    let bin_classes: Vec<Option<usize>> = (0..spectrogram.num_bins())
        .map(|k| {
            let freq = spectrogram.bin_frequency(k);
            if freq >= config.min_chroma_freq && freq <= config.max_chroma_freq {
                Some(frequency_to_pitch_class(freq, config.tuning_a4))
            } else {
                None
            }
        })
        .collect();

    spectrogram
        .frames
        .iter()
        .map(|frame| {
            let mut chroma = [0.0f32; 12];
            for (mag, class) in frame.iter().zip(bin_classes.iter()) {
                if let Some(pc) = class {
                    chroma[*pc] += mag * mag;
                }
            }
            normalize_max(&mut chroma);
            chroma
        })
        .collect()
}

/// Map a frequency to its nearest pitch class (0 = C, ..., 11 = B)
pub fn frequency_to_pitch_class(freq: f32, tuning_a4: f32) -> usize {
    let midi = 69.0 + 12.0 * (freq / tuning_a4).log2();
    (midi.round() as i32).rem_euclid(12) as usize
}
