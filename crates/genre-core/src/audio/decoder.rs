//! Symphonia-based decoding to bounded mono audio
//!
//! The duration cap is applied to the source stream while decoding (so a long
//! upload never gets fully decoded into memory) and again after resampling.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{resample, RawAudio};
use crate::error::{ClassifyError, Result};
use crate::features::{DURATION_SECS, SAMPLE_RATE};

/// Decodes wav/mp3/flac/ogg into mono audio at a fixed sample rate
#[derive(Debug, Clone)]
pub struct AudioDecoder {
    target_rate: u32,
    max_duration_secs: u32,
}

impl Default for AudioDecoder {
    fn default() -> Self {
        Self::new(SAMPLE_RATE, DURATION_SECS)
    }
}

impl AudioDecoder {
    pub fn new(target_rate: u32, max_duration_secs: u32) -> Self {
        Self {
            target_rate,
            max_duration_secs,
        }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Maximum number of output samples this decoder ever returns
    pub fn max_samples(&self) -> usize {
        self.target_rate as usize * self.max_duration_secs as usize
    }

    /// Decode an audio file from disk
    pub fn decode_file(&self, path: &Path) -> Result<RawAudio> {
        let file = File::open(path).map_err(|e| ClassifyError::AudioRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        log::debug!("Decoding {:?}", path);
        self.decode_source(Box::new(file), hint)
    }

    /// Decode an in-memory payload; `extension` is only a probing hint
    pub fn decode_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<RawAudio> {
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext.trim_start_matches('.'));
        }
        self.decode_source(Box::new(Cursor::new(bytes)), hint)
    }

    fn decode_source(&self, source: Box<dyn MediaSource>, hint: Hint) -> Result<RawAudio> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ClassifyError::Decode(format!("Unrecognized container: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ClassifyError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let source_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| ClassifyError::Decode("Unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ClassifyError::Decode(format!("Unsupported codec: {}", e)))?;

        let max_source_frames = source_rate as usize * self.max_duration_secs as usize;
        let mut mono: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut decoded_packets = 0usize;
        let mut failed_packets = 0usize;
        let mut last_error: Option<String> = None;

        while mono.len() < max_source_frames {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    log::warn!("Error reading packet: {}", e);
                    last_error = Some(e.to_string());
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping corrupt packet: {}", e);
                    failed_packets += 1;
                    last_error = Some(e.to_string());
                    continue;
                }
                Err(e) => {
                    return Err(ClassifyError::Decode(e.to_string()));
                }
            };
            decoded_packets += 1;

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let needed = decoded.capacity() * channels;
            if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(ref mut buf) = sample_buf {
                buf.copy_interleaved_ref(decoded);
                downmix_into(buf.samples(), channels, &mut mono);
            }
        }

        if decoded_packets == 0 && (failed_packets > 0 || last_error.is_some()) {
            return Err(ClassifyError::Decode(format!(
                "No decodable audio: {}",
                last_error.unwrap_or_else(|| "all packets corrupt".to_string())
            )));
        }

        mono.truncate(max_source_frames);
        log::debug!(
            "Decoded {} mono frames @ {}Hz ({} packets, {} skipped)",
            mono.len(),
            source_rate,
            decoded_packets,
            failed_packets
        );

        let mut samples = resample(&mono, source_rate, self.target_rate)?;
        samples.truncate(self.max_samples());

        Ok(RawAudio::new(samples, self.target_rate))
    }
}

/// Append the per-frame channel mean of interleaved samples
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
