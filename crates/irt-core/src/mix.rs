//! Wet/dry mix state

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixState {
    wet: f64,
    /// Last non-dry mix, restored by `toggle_dry_wet`
    last_wet: f64,
}

impl Default for MixState {
    fn default() -> Self {
        Self {
            wet: 1.0,
            last_wet: 1.0,
        }
    }
}

impl MixState {
    pub fn new(wet: f64) -> Self {
        let mut mix = Self::default();
        mix.set(wet);
        mix
    }

    #[inline]
    pub fn wet(&self) -> f64 {
        self.wet
    }

    /// Set the wet ratio, clamped to [0, 1]; NaN is ignored
    pub fn set(&mut self, wet: f64) {
        if wet.is_nan() {
            return;
        }
        self.wet = wet.clamp(0.0, 1.0);
        if self.wet > 0.0 {
            self.last_wet = self.wet;
        }
    }

    /// Flip between fully dry and the last wet setting, returning the new mix
    pub fn toggle_dry_wet(&mut self) -> f64 {
        if self.wet > 0.0 {
            self.wet = 0.0;
        } else {
            self.wet = self.last_wet;
        }
        self.wet
    }
}
