//! Normalized WAV export

use std::path::Path;

use irt_core::AudioBuffer;
use irt_dsp::normalize::normalize_peak;

use crate::{AudioAsset, BitDepth, FileResult};

/// Write `buffer` as mono WAV at `bit_depth`
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer, bit_depth: BitDepth) -> FileResult<()> {
    let bit_depth = wav_bit_depth(Some(bit_depth));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: bit_depth.bits() as u16,
        sample_format: match bit_depth {
            BitDepth::Float32 | BitDepth::Float64 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        },
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
    let samples = buffer.samples().iter().map(|s| s.clamp(-1.0, 1.0));

    match bit_depth {
        BitDepth::Int8 => {
            for s in samples {
                writer.write_sample((s * 127.0).round() as i8)?;
            }
        }
        BitDepth::Int16 => {
            for s in samples {
                writer.write_sample((s * 32767.0).round() as i16)?;
            }
        }
        BitDepth::Int24 => {
            for s in samples {
                writer.write_sample((s as f64 * 8388607.0).round() as i32)?;
            }
        }
        BitDepth::Int32 => {
            for s in samples {
                writer.write_sample((s as f64 * 2147483647.0).round() as i32)?;
            }
        }
        BitDepth::Float32 | BitDepth::Float64 => {
            for s in samples {
                writer.write_sample(s)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Export the asset's peak-normalized buffer, keeping its source depth where WAV allows
pub fn export_normalized<P: AsRef<Path>>(asset: &AudioAsset, path: P) -> FileResult<()> {
    let mut samples = asset.buffer.samples().to_vec();
    normalize_peak(&mut samples);
    let buffer = AudioBuffer::new(samples, asset.sample_rate())?;

    let bit_depth = wav_bit_depth(asset.source.bit_depth);
    write_wav(path.as_ref(), &buffer, bit_depth)?;
    log::info!(
        "Exported normalized {} to {} ({})",
        asset.kind,
        path.as_ref().display(),
        bit_depth
    );
    Ok(())
}

/// WAV has no 64-bit float in hound; unknown depths become 32-bit float
fn wav_bit_depth(source: Option<BitDepth>) -> BitDepth {
    match source {
        Some(BitDepth::Float64) | None => BitDepth::Float32,
        Some(other) => other,
    }
}
