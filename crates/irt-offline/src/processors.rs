//! Processing stages run by the worker
//!
//! Usable synchronously too: pass a fresh [`CancelToken`] and a no-op progress sink.

use irt_core::AudioBuffer;
use irt_dsp::convolution::fft_convolve;
use irt_dsp::equalizer;
use irt_dsp::normalize::{mix_dry_wet, normalize_peak, normalize_to};
use irt_dsp::resample::resample_fft;

use crate::{
    CancelToken, ConvolutionResult, JobId, JobKind, PipelineConfig, ProcessingError,
    ProcessingResult,
};

/// Progress checkpoints, in percent
pub mod checkpoint {
    pub const STARTED: u8 = 10;
    pub const RESAMPLED: u8 = 30;
    pub const CONVOLVED: u8 = 70;
    pub const MIXED: u8 = 90;
    pub const DONE: u8 = 100;
}

/// Convolve `di` with `ir` and blend with the dry signal.
///
/// The IR is resampled to the DI rate when they differ. The wet signal is peak-normalized
/// before mixing and the blend is normalized to `headroom`. Output length is
/// `len(di) + len(ir') - 1` at the DI sample rate.
pub fn render_convolution(
    ir: &AudioBuffer,
    di: &AudioBuffer,
    wet_mix: f64,
    headroom: f32,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(u8),
) -> ProcessingResult<AudioBuffer> {
    if ir.is_empty() {
        return Err(ProcessingError::EmptyInput("impulse response".to_string()));
    }
    if di.is_empty() {
        return Err(ProcessingError::EmptyInput("direct input".to_string()));
    }
    progress(checkpoint::STARTED);

    let resampled;
    let kernel: &[f32] = if ir.sample_rate() != di.sample_rate() {
        log::debug!(
            "Resampling IR {} Hz -> {} Hz ({} samples)",
            ir.sample_rate(),
            di.sample_rate(),
            ir.len()
        );
        resampled = resample_fft(ir.samples(), ir.sample_rate(), di.sample_rate())?;
        &resampled
    } else {
        ir.samples()
    };
    cancel.check()?;
    progress(checkpoint::RESAMPLED);

    let mut wet = fft_convolve(di.samples(), kernel)?;
    cancel.check()?;
    progress(checkpoint::CONVOLVED);

    normalize_peak(&mut wet);
    let wet_mix = if wet_mix.is_nan() { 1.0 } else { wet_mix.clamp(0.0, 1.0) };
    let mut out = if wet_mix < 1.0 {
        mix_dry_wet(di.samples(), &wet, wet_mix as f32)
    } else {
        wet
    };
    normalize_to(&mut out, headroom);
    cancel.check()?;
    progress(checkpoint::MIXED);

    if out.is_empty() {
        return Err(ProcessingError::EmptyInput("empty result".to_string()));
    }
    AudioBuffer::new(out, di.sample_rate())
        .map_err(|e| ProcessingError::ProcessingFailed(e.to_string()))
}

/// Equalize a buffer; flat gains return it unchanged
pub fn render_equalize(raw: &AudioBuffer, gains: &[f64], q: f64) -> ProcessingResult<AudioBuffer> {
    Ok(equalizer::process_with_q(raw, gains, q)?)
}

/// Run one job to completion
pub fn run_job(
    job: JobId,
    kind: &JobKind,
    config: &PipelineConfig,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(u8),
) -> ProcessingResult<ConvolutionResult> {
    let result = match kind {
        JobKind::Convolve {
            ir,
            di,
            wet_mix,
            gains,
        } => {
            let raw = render_convolution(ir, di, *wet_mix, config.headroom, cancel, progress)?;
            let output = match gains {
                Some(gains) => render_equalize(&raw, gains, config.eq_q)?,
                None => raw.clone(),
            };
            ConvolutionResult {
                job,
                raw,
                output,
                wet_mix: Some(*wet_mix),
            }
        }
        JobKind::Equalize { raw, gains } => {
            progress(checkpoint::STARTED);
            let output = render_equalize(raw, gains, config.eq_q)?;
            ConvolutionResult {
                job,
                raw: raw.clone(),
                output,
                wet_mix: None,
            }
        }
    };
    cancel.check()?;
    progress(checkpoint::DONE);
    Ok(result)
}
