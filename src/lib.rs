//! # Stratum Batch
//!
//! Checkpointed parallel audio feature extraction for playlist datasets.
//! Every track with a local audio file gets a musical key, a degree of
//! harmony, a tempo and a handful of spectral summaries; results are
//! checkpointed per chunk and joined back onto the dataset at the end.
//!
//! ## Features
//!
//! - **Key Detection**: Krumhansl-Schmuckler template matching (24 keys, Pearson correlation)
//! - **Degree of Harmony**: Mean count of prominent pitch classes per chroma frame
//! - **Spectral Summary**: Tempo, MFCC shape, spectral contrast/centroid/flatness statistics
//! - **Chunked Scheduling**: Bounded rayon pool per chunk, CSV checkpoint per chunk, opt-in resume
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use stratum_batch::{run_batch, BatchConfig};
//!
//! let config = BatchConfig::new("/data/run").with_chunk_size(100);
//! let summary = run_batch(config, Path::new("/data/run/playlist_data3.json"))?;
//!
//! println!("{} analyzed, {} skipped, {} failed", summary.succeeded, summary.skipped, summary.failed);
//! # Ok::<(), stratum_batch::BatchError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Playlist JSON → TrackRows → chunk → [TrackAnalyzer × workers] → checkpoint_{start}_{end}.csv
//!                                                                   ↓ (all chunks)
//!                                                           initialAnalysis.csv
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod io;

// Re-export main types
pub use analysis::extractor::{AudioFeatureExtractor, DspFeatureExtractor, RawFeatures};
pub use analysis::result::{Key, TrackFeatures};
pub use analysis::track::{TrackAnalyzer, TrackOutcome};
pub use batch::{CheckpointStore, ChunkOutcome, ChunkedScheduler, RunSummary};
pub use config::{AnalysisConfig, BatchConfig};
pub use error::{AnalysisError, BatchError};
pub use features::key::KeyProfileModel;
pub use io::{load_playlists, TrackRow};

use std::path::Path;
use std::sync::Arc;

/// Main batch entry point
///
/// Loads the playlist dataset at `dataset`, analyzes every track with the
/// default [`DspFeatureExtractor`], and writes checkpoints plus the final
/// artifact into `config.working_dir`.
///
/// # Errors
///
/// Returns `BatchError` if the configuration is invalid, the dataset cannot
/// be loaded, or an artifact cannot be persisted.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use stratum_batch::{run_batch, BatchConfig};
///
/// let config = BatchConfig::new("/data/run").with_resume(true);
/// let summary = run_batch(config, Path::new("/data/run/playlist_data3.json"))?;
/// assert!(summary.final_path.is_some());
/// # Ok::<(), stratum_batch::BatchError>(())
/// ```
pub fn run_batch(config: BatchConfig, dataset: &Path) -> Result<RunSummary, BatchError> {
    run_batch_with(config, dataset, AnalysisConfig::default())
}

/// [`run_batch`] with explicit analysis parameters
pub fn run_batch_with(
    config: BatchConfig,
    dataset: &Path,
    analysis: AnalysisConfig,
) -> Result<RunSummary, BatchError> {
    config.validate()?;
    let rows = load_playlists(dataset)?;
    let extractor = Arc::new(DspFeatureExtractor::new(analysis));
    let scheduler = ChunkedScheduler::with_extractor(config, extractor)?;
    scheduler.run(&rows)
}
