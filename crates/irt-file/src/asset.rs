//! Loaded IR / DI material

use std::fmt;
use std::path::{Path, PathBuf};

use irt_core::AudioBuffer;
use irt_dsp::normalize::normalize_peak;

use crate::{AudioFormat, BitDepth, FileResult, decode_mono};

/// Which slot an asset fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Impulse response (the kernel)
    Ir,
    /// Direct input (the dry signal)
    Di,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ir => "IR",
            Self::Di => "DI",
        })
    }
}

/// What the file looked like before downmix and normalization
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub format: AudioFormat,
    pub channels: u16,
    pub bit_depth: Option<BitDepth>,
    /// Peak before normalization
    pub original_peak: f32,
}

/// A decoded, mono, peak-normalized file
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub kind: AssetKind,
    pub path: PathBuf,
    pub buffer: AudioBuffer,
    pub source: SourceInfo,
}

impl AudioAsset {
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    /// One-line description, e.g. `IR: 48000Hz, PCM_24, 0.500s, 24000 samples`
    pub fn info(&self) -> String {
        let format = self
            .source
            .bit_depth
            .map(|b| b.to_string())
            .unwrap_or_else(|| format!("{:?}", self.source.format).to_uppercase());
        format!(
            "{}: {}Hz, {}, {:.3}s, {} samples",
            self.kind,
            self.sample_rate(),
            format,
            self.duration(),
            self.buffer.len()
        )
    }
}

impl fmt::Display for AudioAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info())
    }
}

/// Load an impulse response
pub fn load_ir<P: AsRef<Path>>(path: P) -> FileResult<AudioAsset> {
    load_asset(path, AssetKind::Ir)
}

/// Load a direct-input recording
pub fn load_di<P: AsRef<Path>>(path: P) -> FileResult<AudioAsset> {
    load_asset(path, AssetKind::Di)
}

/// Decode, downmix and peak-normalize a file
pub fn load_asset<P: AsRef<Path>>(path: P, kind: AssetKind) -> FileResult<AudioAsset> {
    let path = path.as_ref();
    let decoded = decode_mono(path)?;

    let mut samples = decoded.samples;
    let original_peak = normalize_peak(&mut samples);
    let buffer = AudioBuffer::new(samples, decoded.sample_rate)?;

    let asset = AudioAsset {
        kind,
        path: path.to_path_buf(),
        buffer,
        source: SourceInfo {
            format: decoded.format,
            channels: decoded.channels,
            bit_depth: decoded.bit_depth,
            original_peak,
        },
    };
    log::info!("Loaded {} ({})", asset.info(), path.display());
    Ok(asset)
}
