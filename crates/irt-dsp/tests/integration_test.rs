//! DSP integration tests
//!
//! Exercise the offline chain the pipeline runs: resample, convolve, normalize, mix, EQ.

use approx::assert_abs_diff_eq;
use irt_core::{AudioBuffer, HEADROOM, NUM_BANDS};
use irt_dsp::convolution::fft_convolve;
use irt_dsp::normalize::{mix_dry_wet, normalize_peak, normalize_to, peak};
use irt_dsp::resample::resample_fft;
use irt_dsp::equalizer;

fn generate_noise(len: usize, seed: u32) -> Vec<f32> {
    // xorshift, deterministic
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

fn generate_sine(freq: f64, sr: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr as f64).sin() as f32)
        .collect()
}

#[test]
fn test_two_second_di_half_second_ir() {
    let di = generate_sine(220.0, 44100, 2 * 44100);
    let ir = generate_noise(22050, 7);

    let wet = fft_convolve(&di, &ir).unwrap();
    assert_eq!(wet.len(), 110249);
}

#[test]
fn test_resampled_ir_length_feeds_convolution() {
    let di = generate_sine(110.0, 44100, 44100);
    let ir = generate_noise(24000, 3);

    let ir = resample_fft(&ir, 48000, 44100).unwrap();
    assert_eq!(ir.len(), 22050);
    let wet = fft_convolve(&di, &ir).unwrap();
    assert_eq!(wet.len(), 44100 + 22050 - 1);
}

#[test]
fn test_dry_only_mix_is_proportional_to_di() {
    let di = generate_sine(330.0, 48000, 4800);
    let ir = generate_noise(512, 11);

    let mut wet = fft_convolve(&di, &ir).unwrap();
    normalize_peak(&mut wet);
    let mut out = mix_dry_wet(&di, &wet, 0.0);
    normalize_to(&mut out, HEADROOM);

    let scale = HEADROOM / peak(&di);
    for (i, &o) in out.iter().enumerate() {
        let expected = di.get(i).copied().unwrap_or(0.0) * scale;
        assert_abs_diff_eq!(o, expected, epsilon = 1e-5);
    }
}

#[test]
fn test_eq_boundedness_across_gains() {
    let input = AudioBuffer::new(generate_noise(8192, 42), 44100).unwrap();
    let extremes = [12.0, -12.0, 12.0, -12.0, 12.0, -12.0, 12.0, -12.0, 12.0, -12.0];
    let all_boost = [12.0; NUM_BANDS];

    for gains in [extremes, all_boost] {
        let out = equalizer::process(&input, &gains).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}

#[test]
fn test_eq_after_convolution_keeps_length() {
    let di = generate_sine(80.0, 44100, 44100);
    let ir = generate_noise(4410, 5);
    let mut wet = fft_convolve(&di, &ir).unwrap();
    normalize_to(&mut wet, HEADROOM);

    let buffer = AudioBuffer::new(wet, 44100).unwrap();
    let mut gains = [0.0; NUM_BANDS];
    gains[1] = 4.0;
    let out = equalizer::process(&buffer, &gains).unwrap();
    assert_eq!(out.len(), buffer.len());
    assert_eq!(out.sample_rate(), 44100);
}
