//! Audio decoding to mono f32
//!
//! WAV is read with hound; every other container goes through the symphonia probe.
//! Multi-channel input is averaged down to mono while decoding.

use std::fmt;
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat;

use crate::{FileError, FileResult};

// ═══════════════════════════════════════════════════════════════════════════════
// FORMAT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Container format, from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
    Aiff,
    Mp3,
    Ogg,
    Aac,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "wav" | "wave" => Self::Wav,
            "flac" => Self::Flac,
            "aif" | "aiff" | "aifc" => Self::Aiff,
            "mp3" => Self::Mp3,
            "ogg" | "oga" => Self::Ogg,
            "aac" | "m4a" | "mp4" => Self::Aac,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

/// Stored sample format of the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Int8,
    Int16,
    Int24,
    Int32,
    Float32,
    Float64,
}

impl BitDepth {
    pub fn bits(&self) -> u32 {
        match self {
            Self::Int8 => 8,
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Int32 | Self::Float32 => 32,
            Self::Float64 => 64,
        }
    }

    fn from_int_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Int8),
            16 => Some(Self::Int16),
            24 => Some(Self::Int24),
            32 => Some(Self::Int32),
            _ => None,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int8 => "PCM_S8",
            Self::Int16 => "PCM_16",
            Self::Int24 => "PCM_24",
            Self::Int32 => "PCM_32",
            Self::Float32 => "FLOAT",
            Self::Float64 => "DOUBLE",
        };
        f.write_str(name)
    }
}

/// Result of decoding one file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples (channel average)
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source
    pub channels: u16,
    /// None for lossy codecs without a stored depth
    pub bit_depth: Option<BitDepth>,
    pub format: AudioFormat,
}

/// Decode any supported file to mono
pub fn decode_mono<P: AsRef<Path>>(path: P) -> FileResult<DecodedAudio> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FileError::NotFound(path.display().to_string()));
    }

    let format = AudioFormat::from_path(path);
    let decoded = if format == AudioFormat::Wav {
        read_wav(path)?
    } else {
        read_symphonia(path, format)?
    };

    if decoded.samples.is_empty() {
        return Err(FileError::Empty(path.display().to_string()));
    }
    Ok(decoded)
}

// ═══════════════════════════════════════════════════════════════════════════════
// WAV READING (hound)
// ═══════════════════════════════════════════════════════════════════════════════

fn read_wav(path: &Path) -> FileResult<DecodedAudio> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let (bit_depth, interleaved): (Option<BitDepth>, Vec<f32>) = match spec.sample_format {
        hound::SampleFormat::Float => {
            let samples = reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?;
            (Some(BitDepth::Float32), samples)
        }
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            let samples = reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?;
            (BitDepth::from_int_bits(spec.bits_per_sample as u32), samples)
        }
    };

    let mut samples = Vec::with_capacity(interleaved.len() / channels);
    downmix_into(&interleaved, channels, &mut samples);

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bit_depth,
        format: AudioFormat::Wav,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYMPHONIA READING (FLAC, AIFF, MP3, OGG, AAC)
// ═══════════════════════════════════════════════════════════════════════════════

fn read_symphonia(path: &Path, format: AudioFormat) -> FileResult<DecodedAudio> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

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
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(FileError::NoAudioTrack)?;

    let track_id = track.id;
    let params = track.codec_params.clone();
    let mut sample_rate = params.sample_rate;
    let mut channels = params.channels.map(|c| c.count() as u16);
    let bit_depth = match params.sample_format {
        Some(SampleFormat::F32) => Some(BitDepth::Float32),
        Some(SampleFormat::F64) => Some(BitDepth::Float64),
        _ => params.bits_per_sample.and_then(BitDepth::from_int_bits),
    };

    let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut buf_frames = 0usize;

    loop {
        let packet = match reader.next_packet() {
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

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping corrupt packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let packet_channels = spec.channels.count().max(1);
        channels.get_or_insert(packet_channels as u16);

        if sample_buf.is_none() || decoded.capacity() > buf_frames {
            buf_frames = decoded.capacity();
            sample_buf = Some(SampleBuffer::new(buf_frames as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), packet_channels, &mut samples);
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| FileError::DecodeError("stream has no sample rate".to_string()))?;

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels: channels.unwrap_or(1),
        bit_depth,
        format,
    })
}

/// Average interleaved frames down to mono, appending to `out`
pub fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let inv = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * inv),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_from_extension() {
        assert_eq!(AudioFormat::from_extension("WAV"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("aiff"), AudioFormat::Aiff);
        assert_eq!(AudioFormat::from_extension("flac"), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_extension("m4a"), AudioFormat::Aac);
        assert_eq!(AudioFormat::from_extension("xyz"), AudioFormat::Unknown);
    }

    #[test]
    fn test_downmix_averages() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);

        downmix_into(&[0.25], 1, &mut out);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_bit_depth_names() {
        assert_eq!(BitDepth::Int16.to_string(), "PCM_16");
        assert_eq!(BitDepth::Int24.to_string(), "PCM_24");
        assert_eq!(BitDepth::Float32.to_string(), "FLOAT");
    }

    #[test]
    fn test_missing_file() {
        let err = decode_mono("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
    }
}
