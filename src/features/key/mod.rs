//! Key detection modules
//!
//! Detect musical key using:
//! - Krumhansl-Schmuckler templates (24 keys)
//! - Pearson correlation against the time-averaged chroma

pub mod detector;
pub mod templates;

pub use detector::{average_chroma, detect_key, detect_key_from_mean, pearson_correlation};
pub use templates::{KeyProfile, KeyProfileModel, MAJOR_PROFILE, MINOR_PROFILE, NUM_KEYS};

use crate::analysis::result::Key;

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyEstimate {
    /// Detected key (best match)
    pub key: Key,

    /// Pearson correlation of the best match (-1.0 to 1.0)
    pub correlation: f32,

    /// All 24 key scores, in canonical profile order
    pub scores: Vec<(Key, f32)>,
}
