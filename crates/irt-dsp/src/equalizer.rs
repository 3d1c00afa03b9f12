//! 10-band graphic equalizer over a whole buffer
//!
//! Pure: the same buffer and gains always produce the same output, and filter state never
//! outlives a call. An all-zero gain vector hands the input back untouched.

use irt_core::{AudioBuffer, EQ_Q, ISO_BANDS, NUM_BANDS};

use crate::biquad::{BiquadCoeffs, SosCascade};
use crate::{DspError, DspResult, MonoProcessor};

/// Apply the equalizer with the default Q
pub fn process(buffer: &AudioBuffer, gains: &[f64]) -> DspResult<AudioBuffer> {
    process_with_q(buffer, gains, EQ_Q)
}

/// Apply the equalizer; the sample rate is taken from the buffer
pub fn process_with_q(buffer: &AudioBuffer, gains: &[f64], q: f64) -> DspResult<AudioBuffer> {
    if gains.len() != NUM_BANDS {
        return Err(DspError::InvalidBandCount {
            expected: NUM_BANDS,
            got: gains.len(),
        });
    }
    if is_bypass(gains) {
        return Ok(buffer.clone());
    }

    let sample_rate = buffer.sample_rate();
    let mut cascade = design_cascade(gains, sample_rate as f64, q);
    if cascade.is_empty() {
        return Ok(buffer.clone());
    }

    log::debug!(
        "EQ: {} sections over {} samples @ {}Hz",
        cascade.len(),
        buffer.len(),
        sample_rate
    );

    let mut work: Vec<f64> = buffer.samples().iter().map(|&x| x as f64).collect();
    cascade.process_block(&mut work);
    let output: Vec<f32> = work.into_iter().map(clip).collect();

    Ok(AudioBuffer::new(output, sample_rate)?)
}

/// True when every gain is exactly zero
#[inline]
pub fn is_bypass(gains: &[f64]) -> bool {
    gains.iter().all(|&g| g == 0.0)
}

/// One peaking section per non-zero band, ascending frequency.
/// Bands at or above Nyquist are left out.
pub fn design_cascade(gains: &[f64], sample_rate: f64, q: f64) -> SosCascade {
    let nyquist = sample_rate * 0.5;
    let mut cascade = SosCascade::new();
    for (&freq, &gain) in ISO_BANDS.iter().zip(gains) {
        if gain == 0.0 || freq >= nyquist {
            continue;
        }
        cascade.push(BiquadCoeffs::peaking(freq, q, gain, sample_rate));
    }
    cascade
}

#[inline(always)]
fn clip(x: f64) -> f32 {
    if x.is_finite() {
        x.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sr: u32, len: usize, amp: f32) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| amp * (2.0 * std::f64::consts::PI * freq * i as f64 / sr as f64).sin() as f32)
            .collect();
        AudioBuffer::new(samples, sr).unwrap()
    }

    fn rms(samples: &[f32]) -> f64 {
        (samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_flat_gains_return_same_buffer() {
        let input = sine(440.0, 44100, 4096, 0.5);
        let output = process(&input, &[0.0; NUM_BANDS]).unwrap();
        assert!(output.ptr_eq(&input));
    }

    #[test]
    fn test_wrong_band_count() {
        let input = sine(440.0, 44100, 128, 0.5);
        let err = process(&input, &[0.0; 9]).unwrap_err();
        assert_eq!(err, DspError::InvalidBandCount { expected: 10, got: 9 });
        assert!(process(&input, &[1.0; 11]).is_err());
    }

    #[test]
    fn test_boost_raises_band_level() {
        let input = sine(1000.0, 48000, 48000, 0.25);
        let mut gains = [0.0; NUM_BANDS];
        gains[5] = 6.0;
        let output = process(&input, &gains).unwrap();

        // Skip the filter transient
        let ratio = rms(&output.samples()[4800..]) / rms(&input.samples()[4800..]);
        let db = 20.0 * ratio.log10();
        assert!((db - 6.0).abs() < 0.5, "measured {db} dB");
    }

    #[test]
    fn test_cut_leaves_distant_band_alone() {
        let input = sine(100.0, 48000, 48000, 0.25);
        let mut gains = [0.0; NUM_BANDS];
        gains[8] = -12.0;
        let output = process(&input, &gains).unwrap();

        let ratio = rms(&output.samples()[4800..]) / rms(&input.samples()[4800..]);
        assert!((20.0 * ratio.log10()).abs() < 0.2);
    }

    #[test]
    fn test_deterministic() {
        let input = sine(250.0, 44100, 2048, 0.7);
        let gains = [3.0, -2.0, 1.0, 0.0, 0.0, 4.0, -6.0, 2.0, 0.0, 5.0];
        let a = process(&input, &gains).unwrap();
        let b = process(&input, &gains).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bands_above_nyquist_skipped() {
        let cascade = design_cascade(&[6.0; NUM_BANDS], 22050.0, EQ_Q);
        // 16 kHz is above 11.025 kHz
        assert_eq!(cascade.len(), 9);
    }

    #[test]
    fn test_only_nyquist_band_is_bypass() {
        let input = sine(440.0, 22050, 512, 0.5);
        let mut gains = [0.0; NUM_BANDS];
        gains[9] = 6.0;
        let output = process(&input, &gains).unwrap();
        assert!(output.ptr_eq(&input));
    }
}
