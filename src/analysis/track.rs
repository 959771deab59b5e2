//! Per-track analysis
//!
//! A [`TrackAnalyzer`] turns one [`TrackRow`] into exactly one
//! [`TrackOutcome`]. Missing audio is a skip, not a failure; every error or
//! panic raised while extracting features is contained here and reported as a
//! failed outcome tagged with the row index.

use super::extractor::{AudioFeatureExtractor, RawFeatures};
use super::result::{format_shape, mean_std, TrackFeatures};
use crate::error::AnalysisError;
use crate::features::chroma::degree_of_harmony;
use crate::features::key::{detect_key, KeyProfileModel};
use crate::io::dataset::TrackRow;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of analyzing one track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// Expected audio file is not present locally
    Skipped {
        /// Row index
        index: usize,
    },

    /// Analysis raised an error or panicked
    Failed {
        /// Row index
        index: usize,
        /// Error message
        reason: String,
    },

    /// Features were extracted
    Succeeded {
        /// Row index
        index: usize,
        /// Extracted features
        features: TrackFeatures,
    },
}

impl TrackOutcome {
    /// Index of the originating row
    pub fn index(&self) -> usize {
        match self {
            TrackOutcome::Skipped { index }
            | TrackOutcome::Failed { index, .. }
            | TrackOutcome::Succeeded { index, .. } => *index,
        }
    }

    /// Features, if the track succeeded
    pub fn features(&self) -> Option<&TrackFeatures> {
        match self {
            TrackOutcome::Succeeded { features, .. } => Some(features),
            _ => None,
        }
    }
}

/// Expected local file name for a track: `"{artist} - {track}.mp3"`
///
/// `/` and `:` are replaced with `-` so the name stays a single path segment.
///
/// ```
/// use stratum_batch::analysis::track::expected_audio_filename;
///
/// assert_eq!(
///     expected_audio_filename("AC/DC", "Live: 1991"),
///     "AC-DC - Live- 1991.mp3"
/// );
/// ```
pub fn expected_audio_filename(artist: &str, track: &str) -> String {
    format!("{} - {}.mp3", artist, track)
        .replace('/', "-")
        .replace(':', "-")
}

/// Analyzes single tracks against a shared key model and extractor
#[derive(Clone)]
pub struct TrackAnalyzer {
    audio_dir: PathBuf,
    profiles: Arc<KeyProfileModel>,
    extractor: Arc<dyn AudioFeatureExtractor>,
}

impl TrackAnalyzer {
    /// Create an analyzer reading audio from `audio_dir`
    pub fn new(
        audio_dir: impl Into<PathBuf>,
        profiles: Arc<KeyProfileModel>,
        extractor: Arc<dyn AudioFeatureExtractor>,
    ) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            profiles,
            extractor,
        }
    }

    /// Directory searched for audio files
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Full path the row's audio is expected at
    pub fn audio_path(&self, row: &TrackRow) -> PathBuf {
        self.audio_dir
            .join(expected_audio_filename(&row.artist_name, &row.track_name))
    }

    /// Analyze one row; never panics and never returns an error
    pub fn analyze(&self, row: &TrackRow) -> TrackOutcome {
        let index = row.index;

        if row.artist_name.is_empty() || row.track_name.is_empty() {
            let err = AnalysisError::InvalidInput(
                "Row is missing artist_name or track_name".to_string(),
            );
            log::warn!("Error processing {}: {}", index, err);
            return TrackOutcome::Failed {
                index,
                reason: err.to_string(),
            };
        }

        let path = self.audio_path(row);
        if !path.exists() {
            log::debug!("Skipping {}: {} not found", index, path.display());
            return TrackOutcome::Skipped { index };
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.analyze_file(&path)));

        match result {
            Ok(Ok(features)) => {
                log::debug!(
                    "Analyzed {}: key={} {}, tempo={:.1}, harmony={:.2}",
                    index,
                    features.tonic,
                    features.mode,
                    features.tempo,
                    features.harmony_degree
                );
                TrackOutcome::Succeeded { index, features }
            }
            Ok(Err(err)) => {
                log::warn!("Error processing {} ({}): {}", index, path.display(), err);
                TrackOutcome::Failed {
                    index,
                    reason: err.to_string(),
                }
            }
            Err(payload) => {
                let reason = format!("analysis panicked: {}", panic_message(payload.as_ref()));
                log::warn!("Error processing {} ({}): {}", index, path.display(), reason);
                TrackOutcome::Failed { index, reason }
            }
        }
    }

    fn analyze_file(&self, path: &Path) -> Result<TrackFeatures, AnalysisError> {
        let waveform = self.extractor.load(path)?;
        let raw = self.extractor.extract(&waveform)?;
        summarize(&raw, &self.profiles)
    }
}

/// Reduce raw features to the flat per-track record
///
/// # Errors
///
/// Fails if the chroma has no frames or contains non-finite values.
pub fn summarize(raw: &RawFeatures, profiles: &KeyProfileModel) -> Result<TrackFeatures, AnalysisError> {
    let harmony_degree = degree_of_harmony(&raw.chroma)?;
    let key = detect_key(&raw.chroma, profiles)?.key;

    if !raw.tempo.is_finite() {
        return Err(AnalysisError::NumericalError(format!(
            "Non-finite tempo estimate: {}",
            raw.tempo
        )));
    }

    let contrast: Vec<f32> = raw.spectral_contrast.iter().flatten().copied().collect();
    let (spectral_contrast_mean, spectral_contrast_std) = mean_std(&contrast);
    let (spectral_centroid_mean, spectral_centroid_std) = mean_std(&raw.spectral_centroid);
    let (spectral_flatness_mean, spectral_flatness_std) = mean_std(&raw.spectral_flatness);
    let (rows, cols) = raw.mfcc.shape();

    Ok(TrackFeatures {
        harmony_degree,
        tonic: key.tonic().to_string(),
        mode: key.mode().to_string(),
        tempo: raw.tempo,
        mfcc_shape: format_shape(rows, cols),
        spectral_contrast_mean,
        spectral_contrast_std,
        spectral_centroid_mean,
        spectral_centroid_std,
        spectral_flatness_mean,
        spectral_flatness_std,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::templates::{rotate_right, MAJOR_PROFILE};
    use crate::features::mfcc::Mfcc;
    use crate::io::decoder::Waveform;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
        fail: bool,
        panic: bool,
    }

    impl AudioFeatureExtractor for CountingExtractor {
        fn load(&self, _path: &Path) -> Result<Waveform, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::DecodingError("corrupt mp3".to_string()));
            }
            if self.panic {
                panic!("decoder blew up");
            }
            Ok(Waveform {
                samples: vec![0.0; 16],
                sample_rate: 22050,
            })
        }

        fn extract(&self, _waveform: &Waveform) -> Result<RawFeatures, AnalysisError> {
            Ok(g_major_features())
        }
    }

    fn g_major_features() -> RawFeatures {
        RawFeatures {
            chroma: vec![rotate_right(&MAJOR_PROFILE, 7); 4],
            tempo: 128.0,
            mfcc: Mfcc {
                coefficients: vec![vec![0.0; 4]; 13],
            },
            spectral_contrast: vec![vec![10.0, 20.0]; 7],
            spectral_centroid: vec![1000.0, 3000.0],
            spectral_flatness: vec![0.1, 0.1],
        }
    }

    fn row(index: usize, artist: &str, track: &str) -> TrackRow {
        let mut fields = Map::new();
        fields.insert("artist_name".into(), Value::String(artist.into()));
        fields.insert("track_name".into(), json!(track));
        TrackRow::new(index, fields)
    }

    fn analyzer(dir: &Path, extractor: Arc<CountingExtractor>) -> TrackAnalyzer {
        TrackAnalyzer::new(dir, Arc::new(KeyProfileModel::new()), extractor)
    }

    #[test]
    fn test_missing_file_is_skipped_without_extractor_call() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(CountingExtractor::default());
        let outcome = analyzer(dir.path(), extractor.clone()).analyze(&row(7, "Nobody", "Nothing"));
        assert_eq!(outcome, TrackOutcome::Skipped { index: 7 });
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extractor_error_is_failed_with_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A - B.mp3"), b"x").unwrap();
        let extractor = Arc::new(CountingExtractor {
            fail: true,
            ..Default::default()
        });
        let outcome = analyzer(dir.path(), extractor).analyze(&row(42, "A", "B"));
        match outcome {
            TrackOutcome::Failed { index, reason } => {
                assert_eq!(index, 42);
                assert!(reason.contains("corrupt mp3"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_extractor_panic_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A - B.mp3"), b"x").unwrap();
        let extractor = Arc::new(CountingExtractor {
            panic: true,
            ..Default::default()
        });
        let outcome = analyzer(dir.path(), extractor).analyze(&row(3, "A", "B"));
        match outcome {
            TrackOutcome::Failed { index, reason } => {
                assert_eq!(index, 3);
                assert!(reason.contains("decoder blew up"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_success_populates_features() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AC-DC - Live- 1991.mp3"), b"x").unwrap();
        let extractor = Arc::new(CountingExtractor::default());
        let outcome = analyzer(dir.path(), extractor.clone()).analyze(&row(1, "AC/DC", "Live: 1991"));
        let features = outcome.features().expect("should succeed").clone();
        assert_eq!(outcome.index(), 1);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(features.tonic, "G");
        assert_eq!(features.mode, "major");
        assert_eq!(features.tempo, 128.0);
        assert_eq!(features.mfcc_shape, "(13, 4)");
        assert_eq!(features.spectral_contrast_mean, 15.0);
        assert_eq!(features.spectral_contrast_std, 5.0);
        assert_eq!(features.spectral_centroid_mean, 2000.0);
        assert_eq!(features.spectral_centroid_std, 1000.0);
        assert_eq!(features.spectral_flatness_std, 0.0);
        assert!(features.harmony_degree >= 1.0);
    }

    #[test]
    fn test_missing_identifiers_fail() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Arc::new(CountingExtractor::default());
        let outcome = analyzer(dir.path(), extractor).analyze(&row(5, "", "Solo"));
        assert!(matches!(outcome, TrackOutcome::Failed { index: 5, .. }));
    }

    #[test]
    fn test_summarize_rejects_empty_chroma() {
        let mut raw = g_major_features();
        raw.chroma.clear();
        assert!(summarize(&raw, &KeyProfileModel::new()).is_err());
    }

    #[test]
    fn test_filename_pattern() {
        assert_eq!(expected_audio_filename("Artist", "Song"), "Artist - Song.mp3");
        assert_eq!(expected_audio_filename("a:b", "c/d"), "a-b - c-d.mp3");
    }
}
