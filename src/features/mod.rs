//! Feature extraction modules
//!
//! This module contains the signal-level feature extractors:
//! - STFT magnitude spectrogram
//! - Chroma extraction and degree of harmony
//! - Key detection
//! - Spectral shape (centroid, flatness, contrast)
//! - MFCC
//! - Tempo estimation

pub mod chroma;
pub mod key;
pub mod mfcc;
pub mod spectral;
pub mod stft;
pub mod tempo;
