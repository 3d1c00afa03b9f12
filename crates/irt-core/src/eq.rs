//! Equalizer state: ten gains on the ISO bands plus an enable flag

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, ISO_BANDS, MAX_GAIN_DB, NUM_BANDS};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerState {
    gains: [f64; NUM_BANDS],
    pub enabled: bool,
}

impl Default for EqualizerState {
    fn default() -> Self {
        Self {
            gains: [0.0; NUM_BANDS],
            enabled: true,
        }
    }
}

impl EqualizerState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn gains(&self) -> &[f64; NUM_BANDS] {
        &self.gains
    }

    /// Band center frequency in Hz
    pub fn band_frequency(band: usize) -> Option<f64> {
        ISO_BANDS.get(band).copied()
    }

    /// Set one band; the gain is clamped to ±MAX_GAIN_DB
    pub fn set_gain(&mut self, band: usize, gain_db: f64) -> CoreResult<()> {
        let slot = self
            .gains
            .get_mut(band)
            .ok_or(CoreError::InvalidBand(band))?;
        *slot = clamp_gain(gain_db)?;
        Ok(())
    }

    /// Replace all gains; anything but exactly ten values is rejected
    pub fn set_gains(&mut self, gains: &[f64]) -> CoreResult<()> {
        if gains.len() != NUM_BANDS {
            return Err(CoreError::InvalidBandCount {
                expected: NUM_BANDS,
                got: gains.len(),
            });
        }
        let mut next = [0.0; NUM_BANDS];
        for (dst, &g) in next.iter_mut().zip(gains) {
            *dst = clamp_gain(g)?;
        }
        self.gains = next;
        Ok(())
    }

    pub fn reset_flat(&mut self) {
        self.gains = [0.0; NUM_BANDS];
    }

    /// All gains exactly zero
    pub fn is_flat(&self) -> bool {
        self.gains.iter().all(|&g| g == 0.0)
    }

    /// Whether processing would change the signal
    pub fn is_active(&self) -> bool {
        self.enabled && !self.is_flat()
    }
}

fn clamp_gain(gain_db: f64) -> CoreResult<f64> {
    if !gain_db.is_finite() {
        return Err(CoreError::InvalidParam(format!("gain {gain_db} dB")));
    }
    Ok(gain_db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_flat_and_enabled() {
        let eq = EqualizerState::default();
        assert!(eq.is_flat());
        assert!(eq.enabled);
        assert!(!eq.is_active());
    }

    #[test]
    fn test_set_gains_requires_ten() {
        let mut eq = EqualizerState::new();
        let err = eq.set_gains(&[1.0; 9]).unwrap_err();
        assert_eq!(err, CoreError::InvalidBandCount { expected: 10, got: 9 });
        assert!(eq.is_flat());
    }

    #[test]
    fn test_gain_clamped() {
        let mut eq = EqualizerState::new();
        eq.set_gain(3, 40.0).unwrap();
        eq.set_gain(4, -40.0).unwrap();
        assert_eq!(eq.gains()[3], MAX_GAIN_DB);
        assert_eq!(eq.gains()[4], -MAX_GAIN_DB);
        assert!(eq.set_gain(10, 1.0).is_err());
        assert!(eq.set_gain(0, f64::NAN).is_err());
    }

    #[test]
    fn test_reset_flat() {
        let mut eq = EqualizerState::new();
        eq.set_gains(&[3.0; NUM_BANDS]).unwrap();
        assert!(eq.is_active());
        eq.reset_flat();
        assert!(eq.is_flat());
    }

    #[test]
    fn test_band_frequency() {
        assert_eq!(EqualizerState::band_frequency(0), Some(31.0));
        assert_eq!(EqualizerState::band_frequency(9), Some(16000.0));
        assert_eq!(EqualizerState::band_frequency(10), None);
    }
}
