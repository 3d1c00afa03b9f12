//! Single-flight background pipeline
//!
//! At most one worker exists. Submitting a job cancels the running one and joins its thread
//! before spawning the next, so two results can never race each other. Events from superseded
//! jobs that were already queued are dropped on the receiving side.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::{
    CancelToken, JobId, JobKind, PipelineConfig, PipelineEvent, ProcessingError, ProcessingResult,
    next_job_id, run_job,
};

struct RunningJob {
    id: JobId,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Runs convolution / EQ jobs off the caller's thread
pub struct ProcessingPipeline {
    config: PipelineConfig,
    sender: Sender<PipelineEvent>,
    receiver: Receiver<PipelineEvent>,
    current: Option<RunningJob>,
    /// Latest submitted job; everything older is stale
    latest: Option<JobId>,
}

impl Default for ProcessingPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl ProcessingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            config,
            sender,
            receiver,
            current: None,
            latest: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Cancel and join whatever runs, then start `kind` on a fresh worker
    pub fn submit(&mut self, kind: JobKind) -> ProcessingResult<JobId> {
        self.cancel_current();

        let id = next_job_id();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let sender = self.sender.clone();
        let config = self.config.clone();
        let name = kind.name();

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker(id, kind, config, worker_cancel, sender))
            .map_err(|e| ProcessingError::Spawn(e.to_string()))?;

        log::debug!("Submitted {} job {}", name, id);
        self.latest = Some(id);
        self.current = Some(RunningJob { id, cancel, handle });
        Ok(id)
    }

    /// Cancel the running job and wait for its thread. Events it already queued,
    /// a result included, are never delivered.
    pub fn cancel_current(&mut self) {
        if let Some(job) = self.current.take() {
            job.cancel.cancel();
            join_worker(job);
        }
        self.latest = None;
    }

    /// A worker is still computing
    pub fn is_busy(&self) -> bool {
        self.current
            .as_ref()
            .map(|job| !job.handle.is_finished())
            .unwrap_or(false)
    }

    /// Id of the most recently submitted job; None after `cancel_current`
    pub fn latest_job(&self) -> Option<JobId> {
        self.latest
    }

    /// Pending events of the latest job, without blocking
    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        let events: Vec<PipelineEvent> = self.receiver.try_iter().collect();
        let events = self.filter_stale(events);
        self.reap_finished();
        events
    }

    /// Block up to `timeout` for the next event of the latest job
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<PipelineEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(event) if Some(event.job()) == self.latest => {
                    if !matches!(event, PipelineEvent::Progress { .. }) {
                        self.reap_finished();
                    }
                    return Some(event);
                }
                Ok(stale) => {
                    log::trace!("Dropping event from superseded job {}", stale.job());
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    fn filter_stale(&self, events: Vec<PipelineEvent>) -> Vec<PipelineEvent> {
        let latest = self.latest;
        events
            .into_iter()
            .filter(|event| {
                let fresh = Some(event.job()) == latest;
                if !fresh {
                    log::trace!("Dropping event from superseded job {}", event.job());
                }
                fresh
            })
            .collect()
    }

    /// Join a worker that has already exited
    fn reap_finished(&mut self) {
        let done = self
            .current
            .as_ref()
            .map(|job| job.handle.is_finished())
            .unwrap_or(false);
        if done {
            if let Some(job) = self.current.take() {
                join_worker(job);
            }
        }
    }
}

fn join_worker(job: RunningJob) {
    if job.handle.join().is_err() {
        log::error!("Worker for job {} panicked", job.id);
    }
}

impl Drop for ProcessingPipeline {
    fn drop(&mut self) {
        self.cancel_current();
    }
}

fn worker(
    id: JobId,
    kind: JobKind,
    config: PipelineConfig,
    cancel: CancelToken,
    sender: Sender<PipelineEvent>,
) {
    let started = Instant::now();
    let mut last_percent = 0u8;
    let progress_sender = sender.clone();
    let mut progress = |percent: u8| {
        // Non-decreasing per job
        if percent >= last_percent {
            last_percent = percent;
            let _ = progress_sender.send(PipelineEvent::Progress { job: id, percent });
        }
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        run_job(id, &kind, &config, &cancel, &mut progress)
    }));

    let event = match outcome {
        Ok(Ok(result)) => {
            log::info!(
                "Job {} ({}) finished in {:.1} ms: {} samples @ {} Hz",
                id,
                kind.name(),
                started.elapsed().as_secs_f64() * 1000.0,
                result.output.len(),
                result.sample_rate()
            );
            Some(PipelineEvent::Finished { job: id, result })
        }
        Ok(Err(ProcessingError::Cancelled)) => {
            log::debug!("Job {} cancelled", id);
            None
        }
        Ok(Err(e)) => {
            log::warn!("Job {} failed: {}", id, e);
            Some(PipelineEvent::Failed {
                job: id,
                message: e.to_string(),
            })
        }
        Err(_) => {
            log::error!("Job {} panicked", id);
            Some(PipelineEvent::Failed {
                job: id,
                message: "processing panicked".to_string(),
            })
        }
    };

    if let Some(event) = event {
        let _ = sender.send(event);
    }
}
