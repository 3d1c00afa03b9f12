//! IR / DI slots and the convolution request they make

use std::path::Path;

use irt_core::{AudioBuffer, HEADROOM, NUM_BANDS};
use irt_file::{AssetKind, AudioAsset, FileResult};
use irt_offline::{CancelToken, JobKind, ProcessingResult, render_convolution};

/// Holds at most one IR and one DI
#[derive(Debug, Clone)]
pub struct Convolver {
    ir: Option<AudioAsset>,
    di: Option<AudioAsset>,
    headroom: f32,
}

impl Default for Convolver {
    fn default() -> Self {
        Self::new(HEADROOM)
    }
}

impl Convolver {
    pub fn new(headroom: f32) -> Self {
        Self {
            ir: None,
            di: None,
            headroom,
        }
    }

    /// Load an IR; on failure the slot is left empty
    pub fn load_ir<P: AsRef<Path>>(&mut self, path: P) -> FileResult<&AudioAsset> {
        self.load(path.as_ref(), AssetKind::Ir)
    }

    /// Load a DI; on failure the slot is left empty
    pub fn load_di<P: AsRef<Path>>(&mut self, path: P) -> FileResult<&AudioAsset> {
        self.load(path.as_ref(), AssetKind::Di)
    }

    /// Put an already decoded asset into its slot
    pub fn set_asset(&mut self, asset: AudioAsset) -> &AudioAsset {
        match asset.kind {
            AssetKind::Ir => self.ir.insert(asset),
            AssetKind::Di => self.di.insert(asset),
        }
    }

    fn load(&mut self, path: &Path, kind: AssetKind) -> FileResult<&AudioAsset> {
        match irt_file::load_asset(path, kind) {
            Ok(asset) => Ok(self.set_asset(asset)),
            Err(e) => {
                log::warn!("Failed to load {} {}: {}", kind, path.display(), e);
                self.clear(kind);
                Err(e)
            }
        }
    }

    pub fn clear(&mut self, kind: AssetKind) {
        match kind {
            AssetKind::Ir => self.ir = None,
            AssetKind::Di => self.di = None,
        }
    }

    pub fn ir(&self) -> Option<&AudioAsset> {
        self.ir.as_ref()
    }

    pub fn di(&self) -> Option<&AudioAsset> {
        self.di.as_ref()
    }

    /// Both slots filled
    pub fn is_ready(&self) -> bool {
        self.ir.is_some() && self.di.is_some()
    }

    /// Background job for the current pair, or None if a slot is empty
    pub fn job(&self, wet_mix: f64, gains: Option<[f64; NUM_BANDS]>) -> Option<JobKind> {
        let (ir, di) = (self.ir.as_ref()?, self.di.as_ref()?);
        Some(JobKind::Convolve {
            ir: ir.buffer.clone(),
            di: di.buffer.clone(),
            wet_mix,
            gains,
        })
    }

    /// Run the convolution on the calling thread. `Ok(None)` when a slot is empty.
    pub fn process(&self, wet_mix: f64) -> ProcessingResult<Option<AudioBuffer>> {
        let (Some(ir), Some(di)) = (self.ir.as_ref(), self.di.as_ref()) else {
            return Ok(None);
        };
        render_convolution(
            &ir.buffer,
            &di.buffer,
            wet_mix,
            self.headroom,
            &CancelToken::new(),
            &mut |_| {},
        )
        .map(Some)
    }
}
