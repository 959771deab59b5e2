//! Analysis result types

use serde::{Deserialize, Serialize};

/// Pitch-class names, index 0 = C, advancing chromatically
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Tonic pitch class name (e.g., "C", "F#")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_batch::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).tonic(), "C");
    /// assert_eq!(Key::Minor(6).tonic(), "F#");
    /// ```
    pub fn tonic(&self) -> &'static str {
        PITCH_CLASS_NAMES[self.pitch_class() as usize % 12]
    }

    /// Mode name: "major" or "minor"
    pub fn mode(&self) -> &'static str {
        match self {
            Key::Major(_) => "major",
            Key::Minor(_) => "minor",
        }
    }

    /// Tonic pitch class (0-11)
    pub fn pitch_class(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// Human-readable label, `"<tonic> <mode>"` (e.g., "A minor")
    ///
    /// ```
    /// use stratum_batch::analysis::result::Key;
    ///
    /// assert_eq!(Key::Minor(9).label(), "A minor");
    /// assert_eq!(Key::Major(1).label(), "C# major");
    /// ```
    pub fn label(&self) -> String {
        format!("{} {}", self.tonic(), self.mode())
    }
}

/// Flat per-track feature record
///
/// Field order is the column order of checkpoint and final artifacts. The
/// `*_var` columns keep their historical names; the values are standard
/// deviations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFeatures {
    /// Mean number of pitch classes at or above half the frame maximum
    pub harmony_degree: f32,

    /// Estimated key tonic (e.g., "C#")
    pub tonic: String,

    /// Estimated key mode ("major" / "minor")
    pub mode: String,

    /// Tempo estimate in BPM (0.0 when no periodicity was found)
    pub tempo: f32,

    /// MFCC matrix shape, rendered as `"(coefficients, frames)"`
    pub mfcc_shape: String,

    /// Mean of the spectral contrast matrix
    pub spectral_contrast_mean: f32,

    /// Standard deviation of the spectral contrast matrix
    #[serde(rename = "spectral_contrast_var")]
    pub spectral_contrast_std: f32,

    /// Mean spectral centroid in Hz
    pub spectral_centroid_mean: f32,

    /// Standard deviation of the spectral centroid
    #[serde(rename = "spectral_centroid_var")]
    pub spectral_centroid_std: f32,

    /// Mean spectral flatness
    pub spectral_flatness_mean: f32,

    /// Standard deviation of the spectral flatness
    #[serde(rename = "spectral_flatness_var")]
    pub spectral_flatness_std: f32,
}

impl TrackFeatures {
    /// Column names, in serialization order
    pub const COLUMNS: [&'static str; 11] = [
        "harmony_degree",
        "tonic",
        "mode",
        "tempo",
        "mfcc_shape",
        "spectral_contrast_mean",
        "spectral_contrast_var",
        "spectral_centroid_mean",
        "spectral_centroid_var",
        "spectral_flatness_mean",
        "spectral_flatness_var",
    ];

    /// Field values as strings, in [`TrackFeatures::COLUMNS`] order
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.harmony_degree.to_string(),
            self.tonic.clone(),
            self.mode.clone(),
            self.tempo.to_string(),
            self.mfcc_shape.clone(),
            self.spectral_contrast_mean.to_string(),
            self.spectral_contrast_std.to_string(),
            self.spectral_centroid_mean.to_string(),
            self.spectral_centroid_std.to_string(),
            self.spectral_flatness_mean.to_string(),
            self.spectral_flatness_std.to_string(),
        ]
    }
}

/// Render a matrix shape the way the downstream artifacts expect, e.g. `"(13, 1292)"`
pub fn format_shape(rows: usize, cols: usize) -> String {
    format!("({}, {})", rows, cols)
}

/// Mean and population standard deviation of a series
///
/// Returns `(0.0, 0.0)` for an empty series.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}
