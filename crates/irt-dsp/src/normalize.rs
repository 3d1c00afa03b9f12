//! Peak normalization and dry/wet blending

/// Absolute peak of a signal
#[inline]
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()))
}

/// Scale so the absolute peak equals `target`. Silent input stays silent.
/// Returns the peak before scaling.
pub fn normalize_to(samples: &mut [f32], target: f32) -> f32 {
    let p = peak(samples);
    if p > 0.0 && p.is_finite() {
        let gain = target / p;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
    p
}

/// Peak-normalize to unit amplitude
#[inline]
pub fn normalize_peak(samples: &mut [f32]) -> f32 {
    normalize_to(samples, 1.0)
}

/// `(1 - wet) * dry + wet * wet_signal`, with `dry` zero-padded to the wet length.
/// `wet` is clamped to [0, 1].
pub fn mix_dry_wet(dry: &[f32], wet_signal: &[f32], wet: f32) -> Vec<f32> {
    let wet = wet.clamp(0.0, 1.0);
    let dry_gain = 1.0 - wet;
    wet_signal
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let d = dry.get(i).copied().unwrap_or(0.0);
            dry_gain * d + wet * w
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalize_peak() {
        let mut s = vec![0.1, -0.4, 0.2];
        let before = normalize_peak(&mut s);
        assert_eq!(before, 0.4);
        assert_abs_diff_eq!(peak(&s), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(s[0], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_silence_untouched() {
        let mut s = vec![0.0; 8];
        assert_eq!(normalize_to(&mut s, 0.9), 0.0);
        assert!(s.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_mix_pads_dry() {
        let out = mix_dry_wet(&[1.0, 1.0], &[0.0, 0.0, 0.5, 0.5], 0.5);
        assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_mix_endpoints() {
        let dry = [0.3, -0.3];
        let wet = [0.9, 0.1, 0.2];
        assert_eq!(mix_dry_wet(&dry, &wet, 1.0), wet.to_vec());
        assert_eq!(mix_dry_wet(&dry, &wet, 0.0), vec![0.3, -0.3, 0.0]);
    }
}
