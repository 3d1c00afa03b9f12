//! Processing job definitions

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use irt_core::{AudioBuffer, NUM_BANDS};

use crate::{ProcessingError, ProcessingResult};

/// Unique job identifier, increasing in submission order
pub type JobId = u64;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_job_id() -> JobId {
    NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed)
}

/// What a job computes
#[derive(Debug, Clone)]
pub enum JobKind {
    /// Resample, convolve and mix IR with DI, then equalize
    Convolve {
        ir: AudioBuffer,
        di: AudioBuffer,
        wet_mix: f64,
        /// None when EQ is disabled
        gains: Option<[f64; NUM_BANDS]>,
    },
    /// Equalize an existing convolution result
    Equalize {
        raw: AudioBuffer,
        gains: [f64; NUM_BANDS],
    },
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convolve { .. } => "convolve",
            Self::Equalize { .. } => "equalize",
        }
    }
}

/// Finished job payload
#[derive(Debug, Clone)]
pub struct ConvolutionResult {
    pub job: JobId,
    /// Convolution output before EQ
    pub raw: AudioBuffer,
    /// What should be heard; shares `raw` when EQ was a no-op
    pub output: AudioBuffer,
    /// Mix used, for convolve jobs
    pub wet_mix: Option<f64>,
}

impl ConvolutionResult {
    /// True for results of an `Equalize` job
    pub fn is_eq_only(&self) -> bool {
        self.wet_mix.is_none()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }
}

/// Event sent from a worker
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// 0..=100, non-decreasing within a job
    Progress { job: JobId, percent: u8 },
    Finished { job: JobId, result: ConvolutionResult },
    Failed { job: JobId, message: String },
}

impl PipelineEvent {
    pub fn job(&self) -> JobId {
        match self {
            Self::Progress { job, .. } | Self::Finished { job, .. } | Self::Failed { job, .. } => {
                *job
            }
        }
    }
}

/// Cooperative cancellation flag shared with one worker
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Err(Cancelled) once cancelled; called between stages
    pub fn check(&self) -> ProcessingResult<()> {
        if self.is_cancelled() {
            Err(ProcessingError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_increase() {
        let a = next_job_id();
        let b = next_job_id();
        assert!(b > a);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(token.check().is_ok());
        shared.cancel();
        assert_eq!(token.check(), Err(ProcessingError::Cancelled));
    }
}
