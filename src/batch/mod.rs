//! Batch orchestration
//!
//! - [`ChunkedScheduler`]: chunked parallel dispatch with per-chunk checkpoints
//! - [`CheckpointStore`]: checkpoint and final artifact persistence

pub mod checkpoint;
pub mod scheduler;

pub use checkpoint::CheckpointStore;
pub use scheduler::{plan_chunks, ChunkOutcome, ChunkedScheduler, RunSummary};
