//! Configuration parameters for feature extraction and batch runs

use crate::error::BatchError;
use std::path::{Path, PathBuf};

/// Default number of tracks per checkpointed chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default name of the joined output artifact
pub const DEFAULT_FINAL_FILENAME: &str = "initialAnalysis.csv";

/// Feature extraction parameters used by the default DSP extractor
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    // STFT parameters
    /// Frame size for STFT (default: 2048)
    pub frame_size: usize,

    /// Hop size for STFT (default: 512)
    pub hop_size: usize,

    // Chroma
    /// Reference tuning for pitch-class mapping (default: 440.0 Hz, A4)
    pub tuning_a4: f32,

    /// Lowest frequency folded into chroma (default: 65.0 Hz, ~C2)
    pub min_chroma_freq: f32,

    /// Highest frequency folded into chroma (default: 4000.0 Hz)
    pub max_chroma_freq: f32,

    // Timbre
    /// Number of MFCC coefficients (default: 13)
    pub n_mfcc: usize,

    /// Number of mel bands feeding the MFCC DCT (default: 40)
    pub n_mels: usize,

    /// Number of octave bands for spectral contrast (default: 6, giving 7 rows)
    pub contrast_bands: usize,

    // Tempo
    /// Minimum BPM to consider (default: 60.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 200.0)
    pub max_bpm: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            tuning_a4: 440.0,
            min_chroma_freq: 65.0,
            max_chroma_freq: 4000.0,
            n_mfcc: 13,
            n_mels: 40,
            contrast_bands: 6,
            min_bpm: 60.0,
            max_bpm: 200.0,
        }
    }
}

/// Batch run configuration consumed by the scheduler at startup
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory receiving checkpoints and the final artifact
    pub working_dir: PathBuf,

    /// Directory holding `"{artist} - {track}.mp3"` files
    pub audio_dir: PathBuf,

    /// Tracks per chunk (default: 100)
    pub chunk_size: usize,

    /// Worker threads per chunk pool (default: available CPU threads - 1, min 1)
    pub workers: usize,

    /// File name of the joined output inside `working_dir`
    pub final_filename: String,

    /// Skip chunks that already have a checkpoint with matching offsets
    pub resume: bool,
}

impl BatchConfig {
    /// Create a configuration rooted at `working_dir`, with audio under `working_dir/downloads`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let audio_dir = working_dir.join("downloads");
        Self {
            working_dir,
            audio_dir,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
            final_filename: DEFAULT_FINAL_FILENAME.to_string(),
            resume: false,
        }
    }

    /// Override the audio directory
    pub fn with_audio_dir(mut self, audio_dir: impl AsRef<Path>) -> Self {
        self.audio_dir = audio_dir.as_ref().to_path_buf();
        self
    }

    /// Override the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Override the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable resume-from-checkpoint
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Path of the joined output artifact
    pub fn final_path(&self) -> PathBuf {
        self.working_dir.join(&self.final_filename)
    }

    /// Reject configurations the scheduler cannot run
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Config("chunk_size must be > 0".to_string()));
        }
        if self.workers == 0 {
            return Err(BatchError::Config("workers must be > 0".to_string()));
        }
        if self.final_filename.is_empty() {
            return Err(BatchError::Config(
                "final_filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Available CPU threads minus one, keeping one core free for the system
pub fn default_workers() -> usize {
    let n = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}
