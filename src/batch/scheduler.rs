//! Chunked parallel scheduler
//!
//! Splits the ordered row list into contiguous chunks, analyzes each chunk on
//! a fresh rayon pool, and checkpoints the chunk before moving on. After the
//! last chunk, all successful rows are joined back onto the dataset.

use super::checkpoint::CheckpointStore;
use crate::analysis::extractor::AudioFeatureExtractor;
use crate::analysis::result::TrackFeatures;
use crate::analysis::track::{TrackAnalyzer, TrackOutcome};
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::features::key::KeyProfileModel;
use crate::io::dataset::TrackRow;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError};
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Successful rows and counters for one chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
    /// First list position (inclusive)
    pub start: usize,

    /// Last list position (exclusive)
    pub end: usize,

    /// Successful rows, sorted by index
    pub results: Vec<(usize, TrackFeatures)>,

    /// Rows whose audio was not found
    pub skipped: usize,

    /// Rows whose analysis failed
    pub failed: usize,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Number of planned chunks
    pub chunks: usize,

    /// Chunks taken from existing checkpoints instead of re-analyzed
    pub resumed_chunks: usize,

    /// Chunks whose worker pool could not be built
    pub dispatch_failures: usize,

    /// Rows with features (including resumed rows)
    pub succeeded: usize,

    /// Rows skipped for missing audio
    pub skipped: usize,

    /// Rows whose analysis failed
    pub failed: usize,

    /// Final artifact, if one was written
    pub final_path: Option<PathBuf>,
}

/// Contiguous `[start, end)` list offsets covering `len` rows
///
/// ```
/// use stratum_batch::batch::plan_chunks;
///
/// assert_eq!(plan_chunks(250, 100), vec![(0, 100), (100, 200), (200, 250)]);
/// assert!(plan_chunks(0, 100).is_empty());
/// ```
pub fn plan_chunks(len: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    if chunk_size == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(chunk_size)
        .map(|start| (start, std::cmp::min(start + chunk_size, len)))
        .collect()
}

/// Builds the worker pool for one chunk, given the worker count
pub type PoolFactory =
    Arc<dyn Fn(usize) -> Result<ThreadPool, ThreadPoolBuildError> + Send + Sync>;

/// Fresh rayon pool with `workers` threads
pub fn default_pool(workers: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new().num_threads(workers).build()
}

/// Drives a batch run: dispatch, collect, checkpoint, finalize
pub struct ChunkedScheduler {
    config: BatchConfig,
    analyzer: TrackAnalyzer,
    store: CheckpointStore,
    pool_factory: PoolFactory,
}

impl ChunkedScheduler {
    /// Create a scheduler around an existing analyzer
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Config` if the configuration is invalid.
    pub fn new(config: BatchConfig, analyzer: TrackAnalyzer) -> Result<Self, BatchError> {
        config.validate()?;
        let store = CheckpointStore::new(&config.working_dir, config.final_filename.clone());
        Ok(Self {
            config,
            analyzer,
            store,
            pool_factory: Arc::new(default_pool),
        })
    }

    /// Replace the per-chunk pool construction
    pub fn with_pool_factory(mut self, pool_factory: PoolFactory) -> Self {
        self.pool_factory = pool_factory;
        self
    }

    /// Create a scheduler whose analyzer reads from `config.audio_dir` with
    /// the standard key profiles
    pub fn with_extractor(
        config: BatchConfig,
        extractor: Arc<dyn AudioFeatureExtractor>,
    ) -> Result<Self, BatchError> {
        let analyzer = TrackAnalyzer::new(
            config.audio_dir.clone(),
            Arc::new(KeyProfileModel::new()),
            extractor,
        );
        Self::new(config, analyzer)
    }

    /// Run configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Artifact store
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Process every row and persist checkpoints plus the final artifact
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Persistence` if any artifact cannot be written or
    /// a resumed checkpoint cannot be read. Pool construction failures are
    /// logged and do not abort the run.
    pub fn run(&self, rows: &[TrackRow]) -> Result<RunSummary, BatchError> {
        let plan = plan_chunks(rows.len(), self.config.chunk_size);
        let existing = self.existing_checkpoints(&plan)?;

        log::info!(
            "Starting batch: {} tracks, {} chunks of {}, {} workers",
            rows.len(),
            plan.len(),
            self.config.chunk_size,
            self.config.workers
        );

        let mut summary = RunSummary {
            chunks: plan.len(),
            ..Default::default()
        };
        let mut results: BTreeMap<usize, TrackFeatures> = BTreeMap::new();
        let run_start = Instant::now();

        for (n, &(start, end)) in plan.iter().enumerate() {
            if existing.contains(&(start, end)) {
                let resumed = self.store.read_chunk(start, end)?;
                let chunk_indices: HashSet<usize> =
                    rows[start..end].iter().map(|row| row.index).collect();
                let stray = resumed
                    .iter()
                    .map(|(index, _)| *index)
                    .find(|index| !chunk_indices.contains(index));
                if let Some(stray) = stray {
                    log::warn!(
                        "Checkpoint [{}, {}) holds index {} outside this chunk; re-analyzing",
                        start,
                        end,
                        stray
                    );
                } else {
                    log::info!(
                        "Chunk {}/{} [{}, {}): resumed {} rows from checkpoint",
                        n + 1,
                        plan.len(),
                        start,
                        end,
                        resumed.len()
                    );
                    summary.resumed_chunks += 1;
                    summary.succeeded += resumed.len();
                    results.extend(resumed);
                    continue;
                }
            }

            let chunk_start = Instant::now();
            let outcome = match self.dispatch(start, &rows[start..end]) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Chunk [{}, {}) could not be dispatched: {}", start, end, e);
                    summary.dispatch_failures += 1;
                    continue;
                }
            };

            self.store.write_chunk(start, end, &outcome.results)?;

            log::info!(
                "Chunk {}/{} [{}, {}): {} analyzed, {} skipped, {} failed in {:.2}s",
                n + 1,
                plan.len(),
                start,
                end,
                outcome.results.len(),
                outcome.skipped,
                outcome.failed,
                chunk_start.elapsed().as_secs_f32()
            );
            if outcome.failed > 0 {
                log::warn!("Chunk [{}, {}): {} tracks failed", start, end, outcome.failed);
            }

            summary.succeeded += outcome.results.len();
            summary.skipped += outcome.skipped;
            summary.failed += outcome.failed;
            results.extend(outcome.results);
        }

        if results.is_empty() {
            log::warn!("No tracks were analyzed; final dataset not written");
        } else {
            summary.final_path = Some(self.store.write_final(rows, &results)?);
        }

        log::info!(
            "Batch finished in {:.1}s: {} analyzed, {} skipped, {} failed",
            run_start.elapsed().as_secs_f32(),
            summary.succeeded,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    /// Analyze one chunk on a dedicated pool and wait for every unit
    ///
    /// `offset` is the list position of `rows[0]`.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Dispatch` if the worker pool cannot be built.
    pub fn dispatch(&self, offset: usize, rows: &[TrackRow]) -> Result<ChunkOutcome, BatchError> {
        let pool = (self.pool_factory)(self.config.workers)?;

        let outcomes: Vec<TrackOutcome> = pool.install(|| {
            rows.par_iter()
                .map(|row| {
                    panic::catch_unwind(AssertUnwindSafe(|| self.analyzer.analyze(row)))
                        .unwrap_or_else(|_| TrackOutcome::Failed {
                            index: row.index,
                            reason: "analysis panicked".to_string(),
                        })
                })
                .collect()
        });

        let mut chunk = ChunkOutcome {
            start: offset,
            end: offset + rows.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                TrackOutcome::Succeeded { index, features } => chunk.results.push((index, features)),
                TrackOutcome::Skipped { .. } => chunk.skipped += 1,
                TrackOutcome::Failed { .. } => chunk.failed += 1,
            }
        }
        chunk.results.sort_by_key(|(index, _)| *index);

        Ok(chunk)
    }

    fn existing_checkpoints(
        &self,
        plan: &[(usize, usize)],
    ) -> Result<HashSet<(usize, usize)>, BatchError> {
        if !self.config.resume {
            return Ok(HashSet::new());
        }

        let planned: HashSet<(usize, usize)> = plan.iter().copied().collect();
        let mut matched = HashSet::new();
        for bounds in self.store.completed_chunks()? {
            if planned.contains(&bounds) {
                matched.insert(bounds);
            } else {
                log::info!(
                    "Ignoring checkpoint [{}, {}): does not match the current chunk plan",
                    bounds.0,
                    bounds.1
                );
            }
        }
        log::info!("Resuming with {} existing checkpoints", matched.len());
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extractor::RawFeatures;
    use crate::error::AnalysisError;
    use crate::features::key::templates::{rotate_right, MINOR_PROFILE};
    use crate::features::mfcc::Mfcc;
    use crate::io::decoder::Waveform;
    use serde_json::{json, Map};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubExtractor;

    impl AudioFeatureExtractor for StubExtractor {
        fn load(&self, path: &Path) -> Result<Waveform, AnalysisError> {
            let name = path.file_name().unwrap().to_string_lossy();
            if name.contains("broken") {
                return Err(AnalysisError::DecodingError("bad header".to_string()));
            }
            Ok(Waveform {
                samples: vec![0.0; 8],
                sample_rate: 22050,
            })
        }

        fn extract(&self, _waveform: &Waveform) -> Result<RawFeatures, AnalysisError> {
            Ok(RawFeatures {
                chroma: vec![rotate_right(&MINOR_PROFILE, 9); 3],
                tempo: 96.0,
                mfcc: Mfcc {
                    coefficients: vec![vec![0.0; 3]; 13],
                },
                spectral_contrast: vec![vec![1.0; 3]; 7],
                spectral_centroid: vec![500.0; 3],
                spectral_flatness: vec![0.2; 3],
            })
        }
    }

    fn rows(names: &[&str]) -> Vec<TrackRow> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut fields = Map::new();
                fields.insert("artist_name".into(), json!("Band"));
                fields.insert("track_name".into(), json!(name));
                TrackRow::new(i, fields)
            })
            .collect()
    }

    fn scheduler(dir: &Path, chunk_size: usize) -> ChunkedScheduler {
        let config = BatchConfig::new(dir)
            .with_audio_dir(dir)
            .with_chunk_size(chunk_size)
            .with_workers(2);
        ChunkedScheduler::with_extractor(config, Arc::new(StubExtractor)).unwrap()
    }

    #[test]
    fn test_plan_chunks() {
        assert_eq!(plan_chunks(5, 2), vec![(0, 2), (2, 4), (4, 5)]);
        assert_eq!(plan_chunks(4, 2), vec![(0, 2), (2, 4)]);
        assert_eq!(plan_chunks(3, 10), vec![(0, 3)]);
        assert!(plan_chunks(0, 10).is_empty());
        assert!(plan_chunks(10, 0).is_empty());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = BatchConfig::new("/tmp/none").with_chunk_size(0);
        assert!(matches!(
            ChunkedScheduler::with_extractor(config, Arc::new(StubExtractor)),
            Err(BatchError::Config(_))
        ));
    }

    #[test]
    fn test_dispatch_counts_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b", "broken", "d"] {
            std::fs::write(dir.path().join(format!("Band - {}.mp3", name)), b"x").unwrap();
        }
        let rows = rows(&["missing", "b", "broken", "d"]);
        let sched = scheduler(dir.path(), 10);

        let chunk = sched.dispatch(0, &rows).unwrap();
        assert_eq!((chunk.start, chunk.end), (0, 4));
        assert_eq!(chunk.skipped, 1);
        assert_eq!(chunk.failed, 1);
        let indices: Vec<usize> = chunk.results.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(chunk.results[0].1.tonic, "A");
        assert_eq!(chunk.results[0].1.mode, "minor");
    }

    #[test]
    fn test_pool_failure_skips_chunk_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["a", "b", "c", "d", "e", "f"];
        for name in names {
            std::fs::write(dir.path().join(format!("Band - {}.mp3", name)), b"x").unwrap();
        }

        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let factory: PoolFactory = Arc::new(move |workers| {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .spawn_handler(|_| {
                        Err(std::io::Error::new(std::io::ErrorKind::Other, "no threads"))
                    })
                    .build()
            } else {
                default_pool(workers)
            }
        });
        let sched = scheduler(dir.path(), 2).with_pool_factory(factory);
        let summary = sched.run(&rows(&names)).unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 3);
        assert_eq!(summary.dispatch_failures, 1);
        assert_eq!(summary.succeeded, 4);
        assert!(sched.store().checkpoint_path(0, 2).exists());
        assert!(!sched.store().checkpoint_path(2, 4).exists());
        assert!(sched.store().checkpoint_path(4, 6).exists());

        let mut reader = csv::Reader::from_path(summary.final_path.unwrap()).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 6);
        assert_eq!(&records[2][2], "");
        assert_eq!(&records[4][3], "A");
    }

    #[test]
    fn test_resume_rejects_checkpoint_with_foreign_indices() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["p", "q", "r"] {
            std::fs::write(dir.path().join(format!("Band - {}.mp3", name)), b"x").unwrap();
        }
        let mut current = rows(&["p", "q", "r"]);
        for row in current.iter_mut() {
            row.index += 10;
        }

        let config = BatchConfig::new(dir.path())
            .with_audio_dir(dir.path())
            .with_chunk_size(3)
            .with_workers(2)
            .with_resume(true);
        let sched = ChunkedScheduler::with_extractor(config, Arc::new(StubExtractor)).unwrap();

        // Left over from a run over a different dataset
        let stale = sched.dispatch(0, &rows(&["p", "q", "r"])).unwrap();
        sched.store().write_chunk(0, 3, &stale.results).unwrap();

        let summary = sched.run(&current).unwrap();
        assert_eq!(summary.resumed_chunks, 0);
        assert_eq!(summary.succeeded, 3);

        let reread = sched.store().read_chunk(0, 3).unwrap();
        let indices: Vec<usize> = reread.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![10, 11, 12]);
    }

    #[test]
    fn test_run_without_successes_writes_no_final() {
        let dir = tempfile::tempdir().unwrap();
        let sched = scheduler(dir.path(), 2);
        let summary = sched.run(&rows(&["x", "y", "z"])).unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.succeeded, 0);
        assert!(summary.final_path.is_none());
        assert!(!sched.store().final_path().exists());
        assert!(sched.store().checkpoint_path(0, 2).exists());
        assert!(sched.store().checkpoint_path(2, 3).exists());
    }
}
