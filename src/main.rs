//! Batch analysis CLI
//!
//! **Usage:**
//! ```bash
//! stratum-batch --working-dir DIR [--dataset FILE] [--audio-dir DIR] \
//!     [--chunk-size N] [--jobs N] [--resume] [--output NAME]
//! ```
//!
//! Verbosity is controlled with `RUST_LOG` (default: `info`).

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use stratum_batch::{run_batch, BatchConfig};

/// Default playlist file name inside the working directory
const DEFAULT_DATASET: &str = "playlist_data3.json";

/// Checkpointed parallel audio feature extraction
#[derive(Parser, Debug)]
#[clap(name = "stratum-batch")]
#[clap(about = "Extract key, harmony and spectral features for every track of a playlist dataset")]
struct Args {
    /// Directory receiving checkpoints and the final dataset
    #[clap(long, value_name = "DIR")]
    working_dir: PathBuf,

    /// Playlist JSON file (default: <working-dir>/playlist_data3.json)
    #[clap(long, value_name = "FILE")]
    dataset: Option<PathBuf>,

    /// Directory holding "{artist} - {track}.mp3" files (default: <working-dir>/downloads)
    #[clap(long, value_name = "DIR")]
    audio_dir: Option<PathBuf>,

    /// Tracks per chunk
    #[clap(long, default_value_t = stratum_batch::config::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Parallel workers per chunk (default: CPU-1)
    #[clap(long)]
    jobs: Option<usize>,

    /// Skip chunks that already have a checkpoint
    #[clap(long)]
    resume: bool,

    /// Final dataset file name
    #[clap(long, value_name = "NAME", default_value = stratum_batch::config::DEFAULT_FINAL_FILENAME)]
    output: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let dataset = args
        .dataset
        .clone()
        .unwrap_or_else(|| args.working_dir.join(DEFAULT_DATASET));

    let mut config = BatchConfig::new(args.working_dir)
        .with_chunk_size(args.chunk_size)
        .with_resume(args.resume);
    if let Some(audio_dir) = args.audio_dir {
        config = config.with_audio_dir(audio_dir);
    }
    if let Some(jobs) = args.jobs {
        config = config.with_workers(jobs);
    }
    config.final_filename = args.output;

    match run_batch(config, &dataset) {
        Ok(summary) => {
            println!(
                "Chunks: {} ({} resumed, {} not dispatched)",
                summary.chunks, summary.resumed_chunks, summary.dispatch_failures
            );
            println!(
                "Tracks: {} analyzed, {} skipped, {} failed",
                summary.succeeded, summary.skipped, summary.failed
            );
            match summary.final_path {
                Some(path) => println!("Saved final dataset to {}", path.display()),
                None => println!("No tracks analyzed; final dataset not written"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Batch failed: {}", e);
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
