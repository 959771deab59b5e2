//! Audio decoding using Symphonia
//!
//! Decodes any container/codec Symphonia supports into mono `f32` samples.

use crate::error::AnalysisError;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded mono waveform
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Mono samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode an audio file to a mono waveform
///
/// Multi-channel audio is averaged down to mono. Corrupted packets are
/// skipped; any other decoder error fails the whole file.
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened,
/// probed or decoded, or holds no audio samples.
pub fn decode_audio(path: &Path) -> Result<Waveform, AnalysisError> {
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                if sample_rate == 0 {
                    sample_rate = spec.rate;
                }

                let buf = sample_buf
                    .get_or_insert_with(|| SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
                if buf.capacity() < decoded.capacity() * channels {
                    *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                }
                buf.copy_interleaved_ref(decoded);

                mono.extend(
                    buf.samples()
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping corrupted packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if mono.is_empty() {
        return Err(AnalysisError::DecodingError(format!(
            "No audio samples decoded from {}",
            path.display()
        )));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::DecodingError(format!(
            "Unknown sample rate in {}",
            path.display()
        )));
    }

    log::debug!(
        "Decoded {} samples at {} Hz from {}",
        mono.len(),
        sample_rate,
        path.display()
    );

    Ok(Waveform {
        samples: mono,
        sample_rate,
    })
}
