//! Audio feature extractor seam
//!
//! [`AudioFeatureExtractor`] is everything the track analyzer needs from the
//! signal-processing layer: turn a file into a waveform, and a waveform into
//! raw feature series. [`DspFeatureExtractor`] is the built-in implementation;
//! tests and alternative backends plug in their own.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::mfcc::{mfcc, Mfcc};
use crate::features::stft::magnitude_spectrogram;
use crate::features::{chroma, spectral, tempo};
use crate::io::decoder::{decode_audio, Waveform};
use std::path::Path;

/// Raw per-track features, before summarization
#[derive(Debug, Clone)]
pub struct RawFeatures {
    /// Chroma frames (12 pitch-class energies per frame)
    pub chroma: Vec<[f32; 12]>,

    /// Tempo estimate in BPM
    pub tempo: f32,

    /// MFCC matrix
    pub mfcc: Mfcc,

    /// Spectral contrast matrix (bands x frames)
    pub spectral_contrast: Vec<Vec<f32>>,

    /// Spectral centroid per frame (Hz)
    pub spectral_centroid: Vec<f32>,

    /// Spectral flatness per frame
    pub spectral_flatness: Vec<f32>,
}

/// Source of waveforms and raw features
///
/// Implementations are shared across worker threads.
pub trait AudioFeatureExtractor: Send + Sync {
    /// Decode `path` into a mono waveform
    fn load(&self, path: &Path) -> Result<Waveform, AnalysisError>;

    /// Compute raw features for a decoded waveform
    fn extract(&self, waveform: &Waveform) -> Result<RawFeatures, AnalysisError>;
}

/// Default extractor: Symphonia decoding plus the crate's STFT-based features
#[derive(Debug, Clone, Default)]
pub struct DspFeatureExtractor {
    config: AnalysisConfig,
}

impl DspFeatureExtractor {
    /// Create an extractor with the given analysis parameters
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analysis parameters in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}

impl AudioFeatureExtractor for DspFeatureExtractor {
    fn load(&self, path: &Path) -> Result<Waveform, AnalysisError> {
        decode_audio(path)
    }

    fn extract(&self, waveform: &Waveform) -> Result<RawFeatures, AnalysisError> {
        let config = &self.config;
        let spec = magnitude_spectrogram(
            &waveform.samples,
            waveform.sample_rate,
            config.frame_size,
            config.hop_size,
        )?;

        let chroma = chroma::extract_chroma(&spec, config);
        let tempo = tempo::estimate_tempo(&spec, config.min_bpm, config.max_bpm)?;
        let mfcc = mfcc(&spec, config.n_mfcc, config.n_mels)?;
        let spectral_contrast = spectral::spectral_contrast(&spec, config.contrast_bands);
        let spectral_centroid = spectral::spectral_centroid(&spec);
        let spectral_flatness = spectral::spectral_flatness(&spec);

        Ok(RawFeatures {
            chroma,
            tempo,
            mfcc,
            spectral_contrast,
            spectral_centroid,
            spectral_flatness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_dsp_extract_shapes() {
        let sr = 22050u32;
        let samples: Vec<f32> = (0..sr as usize * 2)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sr as f32).sin() * 0.5)
            .collect();
        let waveform = Waveform {
            samples,
            sample_rate: sr,
        };

        let extractor = DspFeatureExtractor::default();
        let raw = extractor.extract(&waveform).unwrap();
        let frames = raw.chroma.len();
        assert!(frames > 0);
        assert_eq!(raw.mfcc.shape(), (13, frames));
        assert_eq!(raw.spectral_contrast.len(), 7);
        assert_eq!(raw.spectral_centroid.len(), frames);
        assert_eq!(raw.spectral_flatness.len(), frames);

        // A4 dominates every chroma frame
        let mid = raw.chroma[frames / 2];
        assert_eq!(mid[9], 1.0);
    }

    #[test]
    fn test_dsp_extract_rejects_empty() {
        let waveform = Waveform {
            samples: vec![],
            sample_rate: 22050,
        };
        assert!(DspFeatureExtractor::default().extract(&waveform).is_err());
    }
}
