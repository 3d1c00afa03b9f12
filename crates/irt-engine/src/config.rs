//! Session configuration

use std::path::Path;
use std::time::Duration;

use irt_core::{DEFAULT_BLOCK_SIZE, DEFAULT_VOLUME};
use irt_offline::PipelineConfig;
use serde::{Deserialize, Serialize};

use crate::SessionResult;

/// Session configuration, loadable from JSON. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames per output callback
    pub block_size: usize,

    /// Quiet time after a mix or gain change before recomputing (ms)
    pub debounce_ms: u64,

    /// Position notification interval (ms)
    pub position_interval_ms: u64,

    /// Restart at the end of the buffer
    pub looping: bool,

    /// Initial volume, 0..=1
    pub volume: f32,

    /// Rewind / fast-forward step (seconds)
    pub seek_step_secs: f64,

    /// Output device name (None = system default)
    pub output_device: Option<String>,

    /// Background processing
    pub pipeline: PipelineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            debounce_ms: 300,
            position_interval_ms: 100,
            looping: true,
            volume: DEFAULT_VOLUME,
            seek_step_secs: 5.0,
            output_device: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> SessionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> SessionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_block_size(mut self, frames: usize) -> Self {
        self.block_size = frames.max(1);
        self
    }

    pub fn with_output_device(mut self, name: Option<String>) -> Self {
        self.output_device = name;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }
}
