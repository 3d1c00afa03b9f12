//! Pipeline configuration

use irt_core::{EQ_Q, HEADROOM};
use serde::{Deserialize, Serialize};

/// Background processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker thread name
    pub thread_name: String,

    /// Peak level of the final mix
    pub headroom: f32,

    /// Equalizer Q
    pub eq_q: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thread_name: "irt-convolver".to_string(),
            headroom: HEADROOM,
            eq_q: EQ_Q,
        }
    }
}

impl PipelineConfig {
    /// Set worker thread name
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set output headroom, clamped to (0, 1]
    pub fn with_headroom(mut self, headroom: f32) -> Self {
        self.headroom = headroom.clamp(f32::EPSILON, 1.0);
        self
    }

    /// Set equalizer Q
    pub fn with_eq_q(mut self, q: f64) -> Self {
        self.eq_q = q.max(0.1);
        self
    }
}
