//! The IR tester session
//!
//! Commands mutate state and, where a recompute is needed, either submit a background job
//! right away (asset loads, EQ toggle) or arm a debouncer (mix and gain changes). Nothing
//! blocks on processing: [`Session::poll`] fires due debouncers, applies finished jobs to the
//! playback engine and reports what happened.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use irt_audio::{CpalBackend, OutputBackend, PlaybackEngine, PlaybackState};
use irt_core::{AudioBuffer, EqualizerState, MixState};
use irt_file::{AssetKind, AudioAsset, BitDepth};
use irt_offline::{ConvolutionResult, JobId, JobKind, PipelineEvent, ProcessingPipeline};

use crate::{Convolver, Debouncer, SessionConfig, SessionResult};

/// Something the shell should know about
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Background job progress, 0..=100
    Progress(u8),
    /// A new buffer is in the engine
    ProcessingFinished { sample_rate: u32, len: usize },
    ProcessingError(String),
    /// Output could not be (re)started
    AudioError(String),
    /// Seconds
    Position { position: f64, duration: f64 },
    /// Playback wrapped back to the start
    PlaybackRestarted,
    /// Playback reached the end with looping off
    PlaybackEnded,
}

/// What to do with the transport once a convolution result is loaded
#[derive(Debug, Clone, Copy, PartialEq)]
enum Resume {
    /// Seek back near `position`, play only if it was playing
    Keep { position: f64, was_playing: bool },
    /// Play from the top
    FromStart,
}

#[derive(Debug, Clone, Copy)]
struct PendingJob {
    id: JobId,
    /// None for EQ-only jobs
    resume: Option<Resume>,
}

pub struct Session {
    config: SessionConfig,
    convolver: Convolver,
    eq: EqualizerState,
    mix: MixState,
    /// Latest convolution output before EQ
    raw: Option<AudioBuffer>,
    /// Set while the playing buffer does not reflect the loaded IR/DI/mix
    needs_convolution: bool,
    pending: Option<PendingJob>,
    mix_debounce: Debouncer,
    eq_debounce: Debouncer,
    last_position_tick: Option<Instant>,
    pipeline: ProcessingPipeline,
    engine: PlaybackEngine,
}

impl Session {
    pub fn new(config: SessionConfig, backend: Box<dyn OutputBackend>) -> Self {
        let engine = PlaybackEngine::new(backend, config.block_size);
        engine.set_volume(config.volume);
        engine.set_looping(config.looping);

        Self {
            convolver: Convolver::new(config.pipeline.headroom),
            eq: EqualizerState::new(),
            mix: MixState::default(),
            raw: None,
            needs_convolution: false,
            pending: None,
            mix_debounce: Debouncer::new(config.debounce()),
            eq_debounce: Debouncer::new(config.debounce()),
            last_position_tick: None,
            pipeline: ProcessingPipeline::new(config.pipeline.clone()),
            engine,
            config,
        }
    }

    /// Session on the configured (or default) cpal output device
    pub fn with_cpal(config: SessionConfig) -> Self {
        let backend = CpalBackend::new(config.output_device.clone());
        Self::new(config, Box::new(backend))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn convolver(&self) -> &Convolver {
        &self.convolver
    }

    pub fn eq(&self) -> &EqualizerState {
        &self.eq
    }

    pub fn wet_mix(&self) -> f64 {
        self.mix.wet()
    }

    /// Convolution output before EQ
    pub fn raw_output(&self) -> Option<&AudioBuffer> {
        self.raw.as_ref()
    }

    /// What the engine is playing
    pub fn current_output(&self) -> Option<AudioBuffer> {
        self.engine.current_buffer()
    }

    // ─── assets ────────────────────────────────────────────────────────────────

    /// Load an IR and reconvolve, keeping the playback position. Returns the info line.
    pub fn load_ir<P: AsRef<Path>>(&mut self, path: P) -> SessionResult<String> {
        let info = self.convolver.load_ir(path)?.info();
        log::info!("{}", info);
        let resume = self.keep_position();
        self.schedule_convolution(resume)?;
        Ok(info)
    }

    /// Load a DI and reconvolve, playing from the start. Returns the info line.
    pub fn load_di<P: AsRef<Path>>(&mut self, path: P) -> SessionResult<String> {
        let info = self.convolver.load_di(path)?.info();
        log::info!("{}", info);
        self.schedule_convolution(Resume::FromStart)?;
        Ok(info)
    }

    pub fn ir_info(&self) -> Option<String> {
        self.convolver.ir().map(AudioAsset::info)
    }

    pub fn di_info(&self) -> Option<String> {
        self.convolver.di().map(AudioAsset::info)
    }

    /// Write a peak-normalized copy of the IR or DI. `false` when that slot is empty.
    pub fn export_asset<P: AsRef<Path>>(&self, kind: AssetKind, path: P) -> SessionResult<bool> {
        let asset = match kind {
            AssetKind::Ir => self.convolver.ir(),
            AssetKind::Di => self.convolver.di(),
        };
        match asset {
            Some(asset) => {
                irt_file::export_normalized(asset, path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the buffer currently in the engine as 32-bit float WAV. `false` when nothing is loaded.
    pub fn export_output<P: AsRef<Path>>(&self, path: P) -> SessionResult<bool> {
        match self.engine.current_buffer() {
            Some(buffer) => {
                irt_file::write_wav(path, &buffer, BitDepth::Float32)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ─── mix / EQ ──────────────────────────────────────────────────────────────

    /// Wet ratio 0..=1; recomputed after the debounce delay
    pub fn set_mix(&mut self, wet: f64) {
        self.mix.set(wet);
        self.mix_debounce.trigger(Instant::now());
    }

    /// Switch between fully dry and the last non-zero mix
    pub fn toggle_dry_wet(&mut self) -> f64 {
        let wet = self.mix.toggle_dry_wet();
        self.mix_debounce.trigger(Instant::now());
        wet
    }

    /// Replace all ten band gains (dB)
    pub fn set_gains(&mut self, gains: &[f64]) -> SessionResult<()> {
        self.eq.set_gains(gains)?;
        self.eq_debounce.trigger(Instant::now());
        Ok(())
    }

    pub fn set_gain(&mut self, band: usize, gain_db: f64) -> SessionResult<()> {
        self.eq.set_gain(band, gain_db)?;
        self.eq_debounce.trigger(Instant::now());
        Ok(())
    }

    pub fn reset_eq(&mut self) {
        self.eq.reset_flat();
        self.eq_debounce.trigger(Instant::now());
    }

    /// Disabling swaps the raw result in at once; enabling queues an EQ pass
    pub fn set_eq_enabled(&mut self, enabled: bool) -> SessionResult<()> {
        if self.eq.enabled == enabled {
            return Ok(());
        }
        self.eq.enabled = enabled;
        self.eq_debounce.cancel();

        if enabled {
            if !self.eq.is_flat() {
                self.schedule_equalize()?;
            }
            return Ok(());
        }

        if let Some(PendingJob { resume: None, .. }) = self.pending {
            self.pipeline.cancel_current();
            self.pending = None;
        }
        if let Some(raw) = &self.raw {
            if !self.needs_convolution {
                self.engine.update_audio(raw.clone());
            }
        }
        Ok(())
    }

    // ─── transport ─────────────────────────────────────────────────────────────

    pub fn play(&self) -> SessionResult<()> {
        Ok(self.engine.play()?)
    }

    pub fn pause(&self) {
        self.engine.pause();
    }

    pub fn resume(&self) -> SessionResult<()> {
        Ok(self.engine.resume()?)
    }

    /// Playing → paused, paused → resumed, stopped → play. Returns the new state.
    pub fn toggle_play_pause(&self) -> SessionResult<PlaybackState> {
        match self.engine.state() {
            PlaybackState::Playing => self.engine.pause(),
            PlaybackState::Paused => self.engine.resume()?,
            PlaybackState::Stopped => self.engine.play()?,
        }
        Ok(self.engine.state())
    }

    pub fn stop(&self) {
        self.engine.stop();
    }

    pub fn seek(&self, seconds: f64) {
        self.engine.seek(seconds);
    }

    pub fn seek_relative(&self, delta_seconds: f64) {
        self.engine.seek_relative(delta_seconds);
    }

    pub fn rewind(&self) {
        self.engine.seek_relative(-self.config.seek_step_secs);
    }

    pub fn fast_forward(&self) {
        self.engine.seek_relative(self.config.seek_step_secs);
    }

    pub fn set_volume(&self, volume: f32) {
        self.engine.set_volume(volume);
    }

    pub fn set_looping(&self, looping: bool) {
        self.engine.set_looping(looping);
    }

    pub fn position(&self) -> f64 {
        self.engine.position()
    }

    pub fn duration(&self) -> f64 {
        self.engine.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    // ─── polling ───────────────────────────────────────────────────────────────

    /// A background job has not reported back yet
    pub fn is_processing(&self) -> bool {
        self.pending.is_some()
    }

    /// A mix or gain change is waiting out its debounce delay
    pub fn has_pending_changes(&self) -> bool {
        self.mix_debounce.is_pending() || self.eq_debounce.is_pending()
    }

    /// Fire due debouncers, apply finished jobs, service the engine
    pub fn poll(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if self.mix_debounce.fire(now) {
            log::debug!("Mix settled at {:.2}", self.mix.wet());
            let resume = self.keep_position();
            if let Err(e) = self.schedule_convolution(resume) {
                events.push(SessionEvent::ProcessingError(e.to_string()));
            }
        }
        if self.eq_debounce.fire(now) {
            if let Err(e) = self.schedule_equalize() {
                events.push(SessionEvent::ProcessingError(e.to_string()));
            }
        }

        for event in self.pipeline.drain() {
            match event {
                PipelineEvent::Progress { percent, .. } => {
                    events.push(SessionEvent::Progress(percent));
                }
                PipelineEvent::Finished { result, .. } => self.apply_result(result, &mut events),
                PipelineEvent::Failed { job, message } => {
                    if self.pending.map(|p| p.id) == Some(job) {
                        self.pending = None;
                    }
                    log::error!("Processing failed: {}", message);
                    events.push(SessionEvent::ProcessingError(message));
                }
            }
        }

        let tick = self.engine.maintain();
        if tick.loops > 0 {
            events.push(SessionEvent::PlaybackRestarted);
        }
        if tick.ended {
            events.push(SessionEvent::PlaybackEnded);
        }

        if self.engine.has_audio() {
            let due = self
                .last_position_tick
                .map(|last| now.saturating_duration_since(last) >= self.config.position_interval())
                .unwrap_or(true);
            if due {
                self.last_position_tick = Some(now);
                events.push(SessionEvent::Position {
                    position: self.engine.position(),
                    duration: self.engine.duration(),
                });
            }
        }

        events
    }

    /// Poll until no change or job is outstanding, or `timeout` runs out
    pub fn settle(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        loop {
            events.extend(self.poll(Instant::now()));
            if !self.is_processing() && !self.has_pending_changes() {
                break;
            }
            if Instant::now() >= deadline {
                log::warn!("Session did not settle within {:?}", timeout);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        events
    }

    // ─── internals ─────────────────────────────────────────────────────────────

    fn keep_position(&self) -> Resume {
        Resume::Keep {
            position: self.engine.position(),
            was_playing: self.engine.is_playing(),
        }
    }

    /// Submit a full convolution for the loaded pair. No-op until both are loaded.
    fn schedule_convolution(&mut self, resume: Resume) -> SessionResult<Option<JobId>> {
        let gains = self.eq.is_active().then(|| *self.eq.gains());
        let Some(kind) = self.convolver.job(self.mix.wet(), gains) else {
            return Ok(None);
        };
        self.mix_debounce.cancel();
        self.eq_debounce.cancel();

        // A superseded DI load still owes a start from the top
        let resume = match self.pending {
            Some(PendingJob {
                resume: Some(Resume::FromStart),
                ..
            }) => Resume::FromStart,
            _ => resume,
        };

        let id = self.pipeline.submit(kind)?;
        self.needs_convolution = true;
        self.pending = Some(PendingJob {
            id,
            resume: Some(resume),
        });
        Ok(Some(id))
    }

    /// Submit an EQ pass over the current raw result
    fn schedule_equalize(&mut self) -> SessionResult<Option<JobId>> {
        if !self.eq.enabled {
            return Ok(None);
        }
        let raw = match &self.raw {
            Some(raw) if !self.needs_convolution => raw.clone(),
            _ => {
                let resume = self.keep_position();
                return self.schedule_convolution(resume);
            }
        };

        let id = self.pipeline.submit(JobKind::Equalize {
            raw,
            gains: *self.eq.gains(),
        })?;
        self.pending = Some(PendingJob { id, resume: None });
        Ok(Some(id))
    }

    fn apply_result(&mut self, result: ConvolutionResult, events: &mut Vec<SessionEvent>) {
        let pending = match self.pending {
            Some(p) if p.id == result.job => p,
            _ => {
                log::debug!("Ignoring result of job {}", result.job);
                return;
            }
        };
        self.pending = None;

        let sample_rate = result.sample_rate();
        let len = result.output.len();

        match pending.resume {
            None => {
                if self.eq.enabled {
                    self.engine.update_audio(result.output);
                }
            }
            Some(resume) => {
                let output = if self.eq.is_active() {
                    result.output
                } else {
                    result.raw.clone()
                };
                self.raw = Some(result.raw);
                self.needs_convolution = false;
                self.engine.load_audio(output);

                let start = match resume {
                    Resume::Keep {
                        position,
                        was_playing,
                    } => {
                        let target = position.min(self.engine.duration() - 0.1).max(0.0);
                        self.engine.seek(target);
                        was_playing
                    }
                    Resume::FromStart => true,
                };
                if start {
                    if let Err(e) = self.engine.play() {
                        events.push(SessionEvent::AudioError(e.to_string()));
                    }
                }
            }
        }

        log::info!("Processing finished: {} samples at {} Hz", len, sample_rate);
        events.push(SessionEvent::ProcessingFinished { sample_rate, len });
    }
}
