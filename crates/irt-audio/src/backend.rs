//! Output backends
//!
//! A backend turns a mono render callback into a running output stream. The stream lives until
//! its handle is dropped.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize as CpalBufferSize, Device, FromSample, SampleFormat, SampleRate, SizedSample,
    StreamConfig, SupportedBufferSize,
};
use parking_lot::Mutex;

use crate::{AudioError, AudioResult, get_default_output_device, get_output_device_by_name};

/// Mono render callback, invoked on the audio thread with one block at a time
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// What the engine asks of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub sample_rate: u32,
    /// Requested frames per callback
    pub block_size: usize,
}

/// A running output stream; dropping it stops and releases the device
pub trait OutputStream: Send {
    fn start(&self) -> AudioResult<()>;
}

/// Opens output streams
pub trait OutputBackend: Send + Sync {
    fn open(
        &self,
        settings: StreamSettings,
        render: RenderCallback,
    ) -> AudioResult<Box<dyn OutputStream>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CPAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Hardware output through cpal
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn device(&self) -> AudioResult<Device> {
        match &self.device_name {
            Some(name) => get_output_device_by_name(name),
            None => get_default_output_device(),
        }
    }
}

/// Wrapper to make Stream Send
struct CpalStream(cpal::Stream);

// SAFETY: the stream handle is only touched by the controller that owns it, behind a mutex
unsafe impl Send for CpalStream {}

impl OutputStream for CpalStream {
    fn start(&self) -> AudioResult<()> {
        self.0
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }
}

impl OutputBackend for CpalBackend {
    fn open(
        &self,
        settings: StreamSettings,
        render: RenderCallback,
    ) -> AudioResult<Box<dyn OutputStream>> {
        let device = self.device()?;
        let (config, format) = select_config(&device, settings)?;

        log::info!(
            "Opening output '{}': {} Hz, {} ch, {:?}, {:?}",
            device.name().unwrap_or_default(),
            config.sample_rate.0,
            config.channels,
            config.buffer_size,
            format
        );

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, settings.block_size, render)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, settings.block_size, render)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, settings.block_size, render)?,
            other => {
                return Err(AudioError::ConfigError(format!(
                    "Unsupported sample format {other:?}"
                )));
            }
        };

        Ok(Box::new(CpalStream(stream)))
    }
}

/// Prefer mono f32 at the buffer's rate; otherwise the fewest channels that support the rate.
fn select_config(
    device: &Device,
    settings: StreamSettings,
) -> AudioResult<(StreamConfig, SampleFormat)> {
    let rate = SampleRate(settings.sample_rate);
    let ranges: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
        .filter(|r| {
            matches!(
                r.sample_format(),
                SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
            )
        })
        .collect();

    let best = ranges
        .iter()
        .min_by_key(|r| (r.sample_format() != SampleFormat::F32, r.channels()))
        .ok_or(AudioError::UnsupportedSampleRate(settings.sample_rate))?;

    let block = settings.block_size as u32;
    let buffer_size = match best.buffer_size() {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&block) => {
            CpalBufferSize::Fixed(block)
        }
        _ => CpalBufferSize::Default,
    };

    Ok((
        StreamConfig {
            channels: best.channels(),
            sample_rate: rate,
            buffer_size,
        },
        best.sample_format(),
    ))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    block_size: usize,
    mut render: RenderCallback,
) -> AudioResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    // Pre-allocated mono scratch; larger device blocks are rendered in chunks
    let mut scratch = vec![0.0f32; block_size.max(4096)];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(scratch.len() * channels) {
                    let frames = chunk.len() / channels;
                    let mono = &mut scratch[..frames];
                    render(mono);
                    for (frame, &sample) in chunk.chunks_exact_mut(channels).zip(mono.iter()) {
                        let value = T::from_sample(sample);
                        for out in frame {
                            *out = value;
                        }
                    }
                }
            },
            |err| log::error!("Audio output stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANUAL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct ManualState {
    render: Option<RenderCallback>,
    running: bool,
    generation: u64,
    opened: u64,
    settings: Option<StreamSettings>,
    fail_open: bool,
}

/// Backend pulled by the caller instead of a device: headless bounces and tests.
///
/// Clones share one virtual device.
#[derive(Clone, Default)]
pub struct ManualBackend {
    state: Arc<Mutex<ManualState>>,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `frames` samples from the current stream, or None without a started stream
    pub fn pull(&self, frames: usize) -> Option<Vec<f32>> {
        let mut out = vec![0.0; frames];
        self.pull_into(&mut out).then_some(out)
    }

    /// Render into `out`; false if no stream is running
    pub fn pull_into(&self, out: &mut [f32]) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            return false;
        }
        match state.render.as_mut() {
            Some(render) => {
                render(out);
                true
            }
            None => false,
        }
    }

    /// A stream exists (started or not)
    pub fn is_open(&self) -> bool {
        self.state.lock().render.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Streams opened so far
    pub fn open_count(&self) -> u64 {
        self.state.lock().opened
    }

    /// Settings of the most recent open
    pub fn last_settings(&self) -> Option<StreamSettings> {
        self.state.lock().settings
    }

    /// Make subsequent opens fail like a missing device
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }
}

struct ManualStream {
    state: Arc<Mutex<ManualState>>,
    generation: u64,
}

impl OutputStream for ManualStream {
    fn start(&self) -> AudioResult<()> {
        let mut state = self.state.lock();
        if state.generation != self.generation {
            return Err(AudioError::StreamError("stream superseded".to_string()));
        }
        state.running = true;
        Ok(())
    }
}

impl Drop for ManualStream {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.generation == self.generation {
            state.render = None;
            state.running = false;
        }
    }
}

impl OutputBackend for ManualBackend {
    fn open(
        &self,
        settings: StreamSettings,
        render: RenderCallback,
    ) -> AudioResult<Box<dyn OutputStream>> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(AudioError::NoDevice);
        }
        state.generation += 1;
        state.opened += 1;
        state.render = Some(render);
        state.running = false;
        state.settings = Some(settings);

        Ok(Box::new(ManualStream {
            state: Arc::clone(&self.state),
            generation: state.generation,
        }))
    }
}
