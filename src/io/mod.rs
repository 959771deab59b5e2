//! Input modules
//!
//! Audio decoding using Symphonia and playlist dataset loading.

pub mod dataset;
pub mod decoder;

pub use dataset::{load_playlists, TrackRow};
pub use decoder::{decode_audio, Waveform};
