//! Playback engine
//!
//! ```text
//! controller thread                         audio thread
//! ─────────────────                         ────────────
//! load_audio / update_audio ──► ArcSwapOption<AudioBuffer> ──► render()
//! play / pause / stop       ──► AtomicBool flags          ──►   (one load per block)
//! seek                      ──► AtomicUsize cursor        ◄──►  compare_exchange advance
//! set_volume                ──► AtomicU32 (f32 bits)      ──►
//! maintain()                ◄── finished / loops / faults ◄──
//! ```
//!
//! Replaced buffers are parked in a retired list on the controller side and freed only after
//! the audio thread has completed two further blocks, so `render` never runs a deallocation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use arc_swap::ArcSwapOption;
use irt_core::{AudioBuffer, DEFAULT_BLOCK_SIZE, DEFAULT_VOLUME};
use parking_lot::Mutex;

use crate::{
    AudioError, AudioResult, CpalBackend, OutputBackend, OutputStream, RenderCallback,
    StreamSettings,
};

// ═══════════════════════════════════════════════════════════════════════════════
// PLAYBACK STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Transport state as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// State shared between the controller and the render callback
pub struct PlaybackShared {
    buffer: ArcSwapOption<AudioBuffer>,
    /// Next sample index to play; never above the active buffer length
    cursor: AtomicUsize,
    playing: AtomicBool,
    paused: AtomicBool,
    looping: AtomicBool,
    /// Set by the callback when a non-looping buffer ran out
    finished: AtomicBool,
    /// f32 bits
    volume: AtomicU32,
    /// Completed render calls
    render_epoch: AtomicU64,
    /// Loop restarts since last drained
    loops: AtomicU64,
    /// Panicking blocks since last drained
    faults: AtomicU64,
}

impl Default for PlaybackShared {
    fn default() -> Self {
        Self {
            buffer: ArcSwapOption::empty(),
            cursor: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            looping: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            volume: AtomicU32::new(DEFAULT_VOLUME.to_bits()),
            render_epoch: AtomicU64::new(0),
            loops: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }
}

impl PlaybackShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill one output block. Real-time safe: no allocation, no locks, no I/O.
    pub fn render(&self, out: &mut [f32]) {
        let result = catch_unwind(AssertUnwindSafe(|| self.render_block(out)));
        if result.is_err() {
            out.fill(0.0);
            self.faults.fetch_add(1, Ordering::Relaxed);
        }
        self.render_epoch.fetch_add(1, Ordering::Release);
    }

    fn render_block(&self, out: &mut [f32]) {
        if !self.playing.load(Ordering::Acquire) || self.paused.load(Ordering::Acquire) {
            out.fill(0.0);
            return;
        }

        // Single load per block; a concurrent swap is picked up next time
        let guard = self.buffer.load();
        let Some(buffer) = guard.as_ref() else {
            out.fill(0.0);
            return;
        };
        let samples = buffer.samples();
        let len = samples.len();
        let volume = f32::from_bits(self.volume.load(Ordering::Relaxed));
        let looping = self.looping.load(Ordering::Relaxed);

        let start = self.cursor.load(Ordering::Acquire);
        let mut pos = start.min(len);
        let mut written = 0;

        while written < out.len() {
            if pos >= len {
                if looping && len > 0 {
                    pos = 0;
                    self.loops.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                if written == 0 {
                    self.finished.store(true, Ordering::Release);
                    self.playing.store(false, Ordering::Release);
                }
                out[written..].fill(0.0);
                break;
            }

            let n = (len - pos).min(out.len() - written);
            for (o, &s) in out[written..written + n]
                .iter_mut()
                .zip(&samples[pos..pos + n])
            {
                let v = s * volume;
                *o = if v.is_finite() { v } else { 0.0 };
            }
            pos += n;
            written += n;
        }

        // A seek/stop/load that landed mid-block wins
        let _ = self
            .cursor
            .compare_exchange(start, pos, Ordering::AcqRel, Ordering::Relaxed);
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    #[inline]
    fn epoch(&self) -> u64 {
        self.render_epoch.load(Ordering::Acquire)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAYBACK ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// What the controller learned from the audio thread since the last `maintain`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineTick {
    /// Playback ran off the end (not looping) and the stream was released
    pub ended: bool,
    /// Loop restarts
    pub loops: u64,
    /// Blocks replaced with silence after a panic
    pub faults: u64,
}

/// Owns the output stream and the controller side of the shared state.
///
/// Every method is safe to call while the callback runs.
pub struct PlaybackEngine {
    shared: Arc<PlaybackShared>,
    backend: Box<dyn OutputBackend>,
    stream: Mutex<Option<Box<dyn OutputStream>>>,
    /// (epoch at retirement, buffer)
    retired: Mutex<Vec<(u64, Arc<AudioBuffer>)>>,
    sample_rate: AtomicU32,
    block_size: usize,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn OutputBackend>, block_size: usize) -> Self {
        Self {
            shared: Arc::new(PlaybackShared::new()),
            backend,
            stream: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
            sample_rate: AtomicU32::new(0),
            block_size: block_size.max(1),
        }
    }

    /// Engine on the default (or named) cpal output device
    pub fn with_cpal(device_name: Option<String>) -> Self {
        Self::new(Box::new(CpalBackend::new(device_name)), DEFAULT_BLOCK_SIZE)
    }

    pub fn shared(&self) -> &Arc<PlaybackShared> {
        &self.shared
    }

    // ─── buffers ────────────────────────────────────────────────────────────────

    /// Stop, replace the buffer and its sample rate, rewind to 0
    pub fn load_audio(&self, buffer: AudioBuffer) {
        self.stop();
        self.sample_rate.store(buffer.sample_rate(), Ordering::Release);
        log::debug!("Loading {:?}", buffer);
        let old = self.shared.buffer.swap(Some(Arc::new(buffer)));
        self.shared.cursor.store(0, Ordering::Release);
        self.retire(old);
        self.reclaim();
    }

    /// Hot-swap the buffer, keeping cursor and sample rate
    pub fn update_audio(&self, buffer: AudioBuffer) {
        if self.sample_rate.load(Ordering::Acquire) == 0 {
            self.sample_rate.store(buffer.sample_rate(), Ordering::Release);
        }
        let len = buffer.len();
        let old = self.shared.buffer.swap(Some(Arc::new(buffer)));
        // Shorter replacement: pull the cursor back inside
        let _ = self
            .shared
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c > len).then_some(len)
            });
        self.retire(old);
        self.reclaim();
    }

    /// Clone of the active buffer
    pub fn current_buffer(&self) -> Option<AudioBuffer> {
        self.shared.buffer.load_full().map(|b| (*b).clone())
    }

    pub fn has_audio(&self) -> bool {
        self.shared.buffer.load().is_some()
    }

    // ─── transport ─────────────────────────────────────────────────────────────

    /// Open a fresh stream at the cursor; a finished buffer restarts from 0
    pub fn play(&self) -> AudioResult<()> {
        self.release_stream();

        let len = {
            let guard = self.shared.buffer.load();
            match guard.as_ref() {
                Some(b) => b.len(),
                None => return Err(AudioError::NothingLoaded),
            }
        };
        if self.shared.cursor() >= len {
            self.shared.cursor.store(0, Ordering::Release);
        }

        self.shared.finished.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.shared.playing.store(true, Ordering::Release);

        let settings = StreamSettings {
            sample_rate: self.sample_rate.load(Ordering::Acquire),
            block_size: self.block_size,
        };
        let shared = Arc::clone(&self.shared);
        let render: RenderCallback = Box::new(move |out: &mut [f32]| shared.render(out));

        let started = self
            .backend
            .open(settings, render)
            .and_then(|stream| stream.start().map(|_| stream));

        match started {
            Ok(stream) => {
                *self.stream.lock() = Some(stream);
                log::info!(
                    "Playback started at {:.3}s ({} Hz)",
                    self.position(),
                    settings.sample_rate
                );
                Ok(())
            }
            Err(e) => {
                self.shared.playing.store(false, Ordering::Release);
                log::error!("Failed to start playback: {}", e);
                Err(e)
            }
        }
    }

    /// Silence output, keep stream and cursor
    pub fn pause(&self) {
        if self.shared.playing.load(Ordering::Acquire) {
            self.shared.paused.store(true, Ordering::Release);
        }
    }

    /// Continue after pause; with no stream this is `play`
    pub fn resume(&self) -> AudioResult<()> {
        if self.stream.lock().is_none() || !self.shared.playing.load(Ordering::Acquire) {
            return self.play();
        }
        self.shared.paused.store(false, Ordering::Release);
        Ok(())
    }

    /// Release the stream and rewind
    pub fn stop(&self) {
        self.shared.playing.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.release_stream();
        self.shared.cursor.store(0, Ordering::Release);
        self.shared.finished.store(false, Ordering::Release);
        self.reclaim();
    }

    /// Jump to `seconds`, clamped to the last sample. No-op without a buffer.
    ///
    /// Once a non-looping buffer has ended, the new position takes effect on the next `play()`;
    /// the ended stream is still reaped by `maintain()`.
    pub fn seek(&self, seconds: f64) {
        if seconds.is_nan() {
            return;
        }
        let guard = self.shared.buffer.load();
        let Some(buffer) = guard.as_ref() else {
            return;
        };
        if buffer.is_empty() {
            return;
        }
        let sr = self.sample_rate.load(Ordering::Acquire) as f64;
        let target = (seconds * sr).floor().max(0.0);
        let index = if target >= (buffer.len() - 1) as f64 {
            buffer.len() - 1
        } else {
            target as usize
        };
        self.shared.cursor.store(index, Ordering::Release);
    }

    /// Seek relative to the current position (negative rewinds)
    pub fn seek_relative(&self, delta_seconds: f64) {
        self.seek(self.position() + delta_seconds);
    }

    // ─── parameters ────────────────────────────────────────────────────────────

    /// Volume clamped to [0, 1]
    pub fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.shared
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.shared.volume.load(Ordering::Relaxed))
    }

    pub fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }

    pub fn is_looping(&self) -> bool {
        self.shared.looping.load(Ordering::Relaxed)
    }

    // ─── queries ───────────────────────────────────────────────────────────────

    /// Seconds
    pub fn position(&self) -> f64 {
        let sr = self.sample_rate.load(Ordering::Acquire);
        if sr == 0 {
            return 0.0;
        }
        self.shared.cursor() as f64 / sr as f64
    }

    /// Seconds; 0 without a buffer
    pub fn duration(&self) -> f64 {
        let sr = self.sample_rate.load(Ordering::Acquire);
        match self.shared.buffer.load().as_ref() {
            Some(b) if sr > 0 => b.len() as f64 / sr as f64,
            _ => 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn state(&self) -> PlaybackState {
        let playing = self.shared.playing.load(Ordering::Acquire);
        let paused = self.shared.paused.load(Ordering::Acquire);
        match (playing, paused) {
            (true, true) => PlaybackState::Paused,
            (true, false) => PlaybackState::Playing,
            _ => PlaybackState::Stopped,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    // ─── housekeeping ──────────────────────────────────────────────────────────

    /// Controller-side upkeep: release a stream that ran out, free retired buffers,
    /// drain loop and fault counters.
    pub fn maintain(&self) -> EngineTick {
        let mut tick = EngineTick::default();

        if self.shared.is_finished() && self.stream.lock().is_some() {
            self.release_stream();
            tick.ended = true;
            log::info!("Playback reached end of buffer");
        }

        tick.loops = self.shared.loops.swap(0, Ordering::Relaxed);
        tick.faults = self.shared.faults.swap(0, Ordering::Relaxed);
        if tick.faults > 0 {
            log::warn!("Audio callback faulted {} time(s); emitted silence", tick.faults);
        }

        self.reclaim();
        tick
    }

    fn release_stream(&self) {
        let stream = self.stream.lock().take();
        // Dropped outside the lock; joins the device thread
        drop(stream);
    }

    fn retire(&self, old: Option<Arc<AudioBuffer>>) {
        if let Some(old) = old {
            let epoch = self.shared.epoch();
            self.retired.lock().push((epoch, old));
        }
    }

    /// Free retired buffers the callback can no longer hold
    fn reclaim(&self) {
        let stream_alive = self.stream.lock().is_some();
        let now = self.shared.epoch();
        let mut retired = self.retired.lock();
        if stream_alive {
            retired.retain(|(epoch, _)| now < epoch + 2);
        } else {
            retired.clear();
        }
    }

    #[cfg(test)]
    fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualBackend;

    fn ramp(len: usize, sr: u32) -> AudioBuffer {
        AudioBuffer::new((0..len).map(|i| i as f32 / len as f32).collect(), sr).unwrap()
    }

    fn engine(block: usize) -> (PlaybackEngine, ManualBackend) {
        let backend = ManualBackend::new();
        let engine = PlaybackEngine::new(Box::new(backend.clone()), block);
        engine.set_volume(1.0);
        (engine, backend)
    }

    #[test]
    fn test_render_silent_when_stopped() {
        let shared = PlaybackShared::new();
        shared.buffer.store(Some(Arc::new(ramp(16, 16))));
        let mut out = [1.0f32; 8];
        shared.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(shared.cursor(), 0);
    }

    #[test]
    fn test_render_scales_by_volume() {
        let shared = PlaybackShared::new();
        shared.buffer.store(Some(Arc::new(AudioBuffer::new(vec![1.0; 8], 8).unwrap())));
        shared.playing.store(true, Ordering::Release);
        shared.volume.store(0.5f32.to_bits(), Ordering::Relaxed);

        let mut out = [0.0f32; 4];
        shared.render(&mut out);
        assert_eq!(out, [0.5; 4]);
        assert_eq!(shared.cursor(), 4);
    }

    #[test]
    fn test_render_zeroes_non_finite() {
        let shared = PlaybackShared::new();
        let samples = vec![f32::NAN, f32::INFINITY, 0.25, 0.5];
        shared.buffer.store(Some(Arc::new(AudioBuffer::new(samples, 4).unwrap())));
        shared.playing.store(true, Ordering::Release);
        shared.volume.store(1.0f32.to_bits(), Ordering::Relaxed);

        let mut out = [9.0f32; 4];
        shared.render(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.25, 0.5]);
    }

    #[test]
    fn test_partial_tail_then_finished() {
        let shared = PlaybackShared::new();
        shared.buffer.store(Some(Arc::new(AudioBuffer::new(vec![1.0; 6], 6).unwrap())));
        shared.playing.store(true, Ordering::Release);
        shared.looping.store(false, Ordering::Relaxed);
        shared.volume.store(1.0f32.to_bits(), Ordering::Relaxed);

        let mut out = [0.0f32; 4];
        shared.render(&mut out);
        shared.render(&mut out);
        assert_eq!(out, [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(shared.cursor(), 6);
        assert!(!shared.is_finished());

        shared.render(&mut out);
        assert_eq!(out, [0.0; 4]);
        assert!(shared.is_finished());
        assert_eq!(shared.cursor(), 6);
    }

    #[test]
    fn test_loop_wraps_within_block() {
        let shared = PlaybackShared::new();
        let samples = vec![1.0, 2.0, 3.0];
        shared.buffer.store(Some(Arc::new(AudioBuffer::new(samples, 3).unwrap())));
        shared.playing.store(true, Ordering::Release);
        shared.volume.store(1.0f32.to_bits(), Ordering::Relaxed);

        let mut out = [0.0f32; 5];
        shared.render(&mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 1.0, 2.0]);
        assert_eq!(shared.cursor(), 2);
        assert_eq!(shared.loops.load(Ordering::Relaxed), 1);
        assert!(!shared.is_finished());
    }

    #[test]
    fn test_seek_clamps() {
        let (engine, _) = engine(1024);
        engine.seek(3.0);
        assert_eq!(engine.position(), 0.0);

        engine.load_audio(ramp(441_000, 44100));
        engine.seek(-5.0);
        assert_eq!(engine.position(), 0.0);

        engine.seek(1000.0);
        assert_eq!(engine.shared().cursor(), 441_000 - 1);
        assert!(engine.position() < engine.duration());

        engine.seek(2.5);
        assert_eq!(engine.shared().cursor(), 110_250);
        engine.seek_relative(-5.0);
        assert_eq!(engine.position(), 0.0);
        engine.seek_relative(1.0);
        assert_eq!(engine.shared().cursor(), 44100);
    }

    #[test]
    fn test_volume_clamped() {
        let (engine, _) = engine(64);
        engine.set_volume(3.0);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(-1.0);
        assert_eq!(engine.volume(), 0.0);
        engine.set_volume(f32::NAN);
        assert_eq!(engine.volume(), 0.0);
    }

    #[test]
    fn test_state_machine() {
        let (engine, backend) = engine(64);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.play(), Err(AudioError::NothingLoaded));

        engine.load_audio(ramp(1000, 1000));
        engine.play().unwrap();
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(backend.is_running());
        assert_eq!(
            backend.last_settings(),
            Some(StreamSettings {
                sample_rate: 1000,
                block_size: 64,
            })
        );

        engine.pause();
        assert_eq!(engine.state(), PlaybackState::Paused);
        assert!(!engine.is_playing());
        let before = engine.shared().cursor();
        assert_eq!(backend.pull(64), Some(vec![0.0; 64]));
        assert_eq!(engine.shared().cursor(), before);

        engine.resume().unwrap();
        assert!(engine.is_playing());
        assert_eq!(backend.open_count(), 1);

        engine.stop();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.position(), 0.0);
        assert!(!backend.is_open());

        // resume without a stream behaves like play
        engine.resume().unwrap();
        assert!(engine.is_playing());
        assert_eq!(backend.open_count(), 2);
    }

    #[test]
    fn test_play_replaces_stream() {
        let (engine, backend) = engine(64);
        engine.load_audio(ramp(1000, 1000));
        engine.play().unwrap();
        engine.play().unwrap();
        assert_eq!(backend.open_count(), 2);
        assert!(backend.is_running());
    }

    #[test]
    fn test_device_failure_reverts_to_stopped() {
        let (engine, backend) = engine(64);
        engine.load_audio(ramp(1000, 1000));
        backend.set_fail_open(true);
        assert_eq!(engine.play(), Err(AudioError::NoDevice));
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_update_audio_keeps_cursor_and_rate() {
        let (engine, backend) = engine(100);
        engine.load_audio(ramp(1000, 1000));
        engine.play().unwrap();
        backend.pull(100).unwrap();
        assert_eq!(engine.shared().cursor(), 100);

        let replacement = AudioBuffer::new(vec![0.5; 1000], 48000).unwrap();
        engine.update_audio(replacement);
        assert_eq!(engine.shared().cursor(), 100);
        assert_eq!(engine.sample_rate(), 1000);
        assert_eq!(backend.pull(4), Some(vec![0.5; 4]));

        // shorter buffer clamps the cursor
        engine.update_audio(AudioBuffer::new(vec![0.25; 50], 1000).unwrap());
        assert_eq!(engine.shared().cursor(), 50);
    }

    #[test]
    fn test_controller_races_render_thread() {
        use std::thread;
        use std::time::{Duration, Instant};

        const LONG: usize = 1000;
        let (engine, backend) = engine(64);
        engine.set_volume(0.8);
        let short = AudioBuffer::new(vec![0.25; 300], 1000).unwrap();
        let long = AudioBuffer::new(vec![0.5; LONG], 1000).unwrap();
        let allowed = [0.25f32 * 0.8, 0.5f32 * 0.8];

        engine.load_audio(long.clone());
        engine.play().unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let rendered = Arc::new(AtomicU64::new(0));
        let render_thread = {
            let backend = backend.clone();
            let shared = Arc::clone(engine.shared());
            let running = Arc::clone(&running);
            let rendered = Arc::clone(&rendered);
            thread::spawn(move || {
                let mut out = vec![0.0f32; 64];
                while running.load(Ordering::Acquire) {
                    assert!(backend.pull_into(&mut out));
                    assert!(shared.cursor() <= LONG);
                    assert!(out.iter().all(|s| allowed.contains(s)), "{out:?}");
                    rendered.fetch_add(1, Ordering::Release);
                }
            })
        };

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut i = 0usize;
        while i < 2000 || rendered.load(Ordering::Acquire) < 200 {
            assert!(!render_thread.is_finished(), "render thread exited early");
            assert!(Instant::now() < deadline, "render thread stalled");
            let next = if i % 2 == 0 { &short } else { &long };
            engine.update_audio(next.clone());
            engine.seek((i % 7) as f64 * 0.04);
            let tick = engine.maintain();
            assert_eq!(tick.faults, 0);
            assert!(!tick.ended);

            // Reclamation keeps pace with the callback
            while engine.retired_count() > 32 {
                assert!(Instant::now() < deadline, "retired buffers piling up");
                thread::yield_now();
                engine.maintain();
            }
            i += 1;
        }

        running.store(false, Ordering::Release);
        render_thread.join().unwrap();
        assert!(engine.is_playing());

        backend.pull(64).unwrap();
        backend.pull(64).unwrap();
        engine.maintain();
        assert_eq!(engine.retired_count(), 0);
    }

    #[test]
    fn test_seek_after_end_keeps_end_pending() {
        let (engine, backend) = engine(8);
        engine.set_looping(false);
        engine.load_audio(ramp(16, 16));
        engine.play().unwrap();

        backend.pull(8).unwrap();
        backend.pull(8).unwrap();
        backend.pull(8).unwrap();
        assert!(engine.is_finished());

        // Seek lands before maintain() has reaped the stream
        engine.seek(0.5);
        assert!(engine.is_finished());
        assert_eq!(backend.pull(8), Some(vec![0.0; 8]));

        let tick = engine.maintain();
        assert!(tick.ended);
        assert!(!backend.is_open());

        engine.play().unwrap();
        assert_eq!(engine.shared().cursor(), 8);
        assert!(!engine.is_finished());
    }

    #[test]
    fn test_retired_buffers_freed_after_two_blocks() {
        let (engine, backend) = engine(16);
        engine.load_audio(ramp(1000, 1000));
        engine.play().unwrap();

        engine.update_audio(ramp(1000, 1000));
        assert_eq!(engine.retired_count(), 1);
        backend.pull(16).unwrap();
        engine.maintain();
        assert_eq!(engine.retired_count(), 1);
        backend.pull(16).unwrap();
        engine.maintain();
        assert_eq!(engine.retired_count(), 0);
    }

    #[test]
    fn test_maintain_releases_finished_stream() {
        let (engine, backend) = engine(8);
        engine.set_looping(false);
        engine.load_audio(ramp(8, 8));
        engine.play().unwrap();

        backend.pull(8).unwrap();
        assert_eq!(engine.maintain(), EngineTick::default());
        backend.pull(8).unwrap();
        assert!(engine.is_finished());
        assert!(!engine.is_playing());

        let tick = engine.maintain();
        assert!(tick.ended);
        assert!(!backend.is_open());

        // play after the end starts over
        engine.play().unwrap();
        assert_eq!(engine.shared().cursor(), 0);
        assert!(engine.is_playing());
    }
}
