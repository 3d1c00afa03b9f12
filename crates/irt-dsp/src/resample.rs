//! FFT-domain resampling
//!
//! The spectrum of the input is truncated or zero-extended to the output length and transformed
//! back. Output length is `round(len * target / source)`. Suited to short signals such as impulse
//! responses; the signal is treated as periodic.

use realfft::RealFftPlanner;
use rustfft::num_complex::Complex;

use crate::{DspError, DspResult};

/// Output length for a rate change
pub fn resampled_len(len: usize, source_rate: u32, target_rate: u32) -> usize {
    (len as f64 * target_rate as f64 / source_rate as f64).round() as usize
}

/// Resample `input` from `source_rate` to `target_rate`
pub fn resample_fft(input: &[f32], source_rate: u32, target_rate: u32) -> DspResult<Vec<f32>> {
    if source_rate == 0 {
        return Err(DspError::InvalidSampleRate(source_rate));
    }
    if target_rate == 0 {
        return Err(DspError::InvalidSampleRate(target_rate));
    }
    if input.is_empty() {
        return Err(DspError::EmptyInput("resample input"));
    }
    if source_rate == target_rate {
        return Ok(input.to_vec());
    }

    let n_in = input.len();
    let n_out = resampled_len(n_in, source_rate, target_rate);
    if n_out == 0 {
        return Err(DspError::Resample(format!(
            "{n_in} samples at {source_rate}Hz leave nothing at {target_rate}Hz"
        )));
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n_in);
    let inverse = planner.plan_fft_inverse(n_out);

    let mut time_in: Vec<f64> = input.iter().map(|&x| x as f64).collect();
    let mut spectrum_in = forward.make_output_vec();
    forward
        .process(&mut time_in, &mut spectrum_in)
        .map_err(|e| DspError::Fft(e.to_string()))?;

    let mut spectrum_out = inverse.make_input_vec();
    let shared = spectrum_in.len().min(spectrum_out.len());
    spectrum_out[..shared].copy_from_slice(&spectrum_in[..shared]);

    // The bin at min(n_in, n_out)/2 is a real Nyquist bin on the shorter side only.
    let n_min = n_in.min(n_out);
    if n_min % 2 == 0 {
        let k = n_min / 2;
        if n_out > n_in {
            // Upsampling: split the old Nyquist energy across +/- frequencies
            spectrum_out[k] *= 0.5;
        } else if n_out < n_in {
            // Downsampling: fold the +/- pair into the new Nyquist bin
            spectrum_out[k] = Complex::new(2.0 * spectrum_out[k].re, 0.0);
        }
    }
    // DC is real; the last bin is a real Nyquist bin only for even lengths
    spectrum_out[0].im = 0.0;
    if n_out % 2 == 0 {
        if let Some(last) = spectrum_out.last_mut() {
            last.im = 0.0;
        }
    }

    let mut time_out = inverse.make_output_vec();
    inverse
        .process(&mut spectrum_out, &mut time_out)
        .map_err(|e| DspError::Fft(e.to_string()))?;

    let scale = 1.0 / n_in as f64;
    Ok(time_out.into_iter().map(|x| (x * scale) as f32).collect())
}
