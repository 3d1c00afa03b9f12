//! Offline FFT convolution
//!
//! Whole-buffer linear convolution: both signals are zero-padded to the next power of two at or
//! above N+M-1, multiplied in the frequency domain and transformed back.

use realfft::RealFftPlanner;
use rustfft::num_complex::Complex;

use crate::{DspError, DspResult};

/// Full linear convolution of `signal` with `kernel`, length N+M-1
pub fn fft_convolve(signal: &[f32], kernel: &[f32]) -> DspResult<Vec<f32>> {
    if signal.is_empty() {
        return Err(DspError::EmptyInput("signal"));
    }
    if kernel.is_empty() {
        return Err(DspError::EmptyInput("kernel"));
    }

    let out_len = signal.len() + kernel.len() - 1;
    let fft_size = out_len.next_power_of_two();

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_size);
    let inverse = planner.plan_fft_inverse(fft_size);

    let mut time = forward.make_input_vec();
    let mut signal_spectrum = forward.make_output_vec();
    let mut kernel_spectrum = forward.make_output_vec();

    load_padded(&mut time, signal);
    forward
        .process(&mut time, &mut signal_spectrum)
        .map_err(|e| DspError::Fft(e.to_string()))?;

    load_padded(&mut time, kernel);
    forward
        .process(&mut time, &mut kernel_spectrum)
        .map_err(|e| DspError::Fft(e.to_string()))?;

    for (s, k) in signal_spectrum.iter_mut().zip(&kernel_spectrum) {
        *s *= *k;
    }
    // c2r rejects non-zero imaginary parts at DC and Nyquist
    zero_edge_imaginary(&mut signal_spectrum);

    inverse
        .process(&mut signal_spectrum, &mut time)
        .map_err(|e| DspError::Fft(e.to_string()))?;

    let scale = 1.0 / fft_size as f64;
    Ok(time[..out_len].iter().map(|&x| (x * scale) as f32).collect())
}

/// Direct-form convolution, O(N*M). Reference for short inputs and tests.
pub fn direct_convolve(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0f64; signal.len() + kernel.len() - 1];
    for (i, &x) in signal.iter().enumerate() {
        for (j, &h) in kernel.iter().enumerate() {
            out[i + j] += x as f64 * h as f64;
        }
    }
    out.into_iter().map(|x| x as f32).collect()
}

fn load_padded(dst: &mut [f64], src: &[f32]) {
    let (head, tail) = dst.split_at_mut(src.len());
    for (d, &s) in head.iter_mut().zip(src) {
        *d = s as f64;
    }
    tail.fill(0.0);
}

pub(crate) fn zero_edge_imaginary(spectrum: &mut [Complex<f64>]) {
    if let Some(first) = spectrum.first_mut() {
        first.im = 0.0;
    }
    if let Some(last) = spectrum.last_mut() {
        last.im = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_length_is_n_plus_m_minus_one() {
        let out = fft_convolve(&[1.0; 1000], &[0.5; 37]).unwrap();
        assert_eq!(out.len(), 1036);
    }

    #[test]
    fn test_matches_direct() {
        let signal: Vec<f32> = (0..300).map(|i| ((i * 7919) % 97) as f32 / 97.0 - 0.5).collect();
        let kernel: Vec<f32> = (0..45).map(|i| (-(i as f32) / 10.0).exp()).collect();

        let fast = fft_convolve(&signal, &kernel).unwrap();
        let slow = direct_convolve(&signal, &kernel);
        assert_eq!(fast.len(), slow.len());
        for (&a, &b) in fast.iter().zip(&slow) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_unit_impulse_is_identity() {
        let signal = [0.1, -0.2, 0.3, 0.4];
        let out = fft_convolve(&signal, &[1.0]).unwrap();
        for (&a, &b) in out.iter().zip(&signal) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(fft_convolve(&[], &[1.0]), Err(DspError::EmptyInput("signal")));
        assert_eq!(fft_convolve(&[1.0], &[]), Err(DspError::EmptyInput("kernel")));
    }
}
