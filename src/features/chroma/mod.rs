//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Chroma vector computation
//! - Normalization
//! - Degree of harmony

pub mod extractor;
pub mod harmony;
pub mod normalization;

pub use extractor::{extract_chroma, frequency_to_pitch_class};
pub use harmony::degree_of_harmony;
