//! IR Tester - headless audition
//!
//! Usage:
//!   irt --ir cab.wav --di guitar.wav                 - convolve and play (loops)
//!   irt --ir cab.wav --di guitar.wav --mix 0.5 --gains 0,0,3,0,0,0,-2,0,0,0
//!   irt --ir cab.wav --di guitar.wav --seconds 0 --export out.wav
//!   irt --list-devices

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;

use irt_audio::ManualBackend;
use irt_core::NUM_BANDS;
use irt_engine::{Session, SessionConfig, SessionEvent};
use irt_file::AssetKind;

/// Longest wait for a convolution to finish
const PROCESS_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "irt", about = "Audition a DI through an impulse response")]
struct Args {
    /// Impulse response file
    #[arg(long, required_unless_present = "list_devices")]
    ir: Option<PathBuf>,

    /// Direct input (dry) file
    #[arg(long, required_unless_present = "list_devices")]
    di: Option<PathBuf>,

    /// Wet ratio, 0 (dry) to 1 (wet)
    #[arg(long, default_value_t = 1.0)]
    mix: f64,

    /// Ten EQ gains in dB, comma separated (31 Hz .. 16 kHz)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    gains: Option<Vec<f64>>,

    /// Output volume, 0 to 1
    #[arg(long)]
    volume: Option<f32>,

    /// Play once instead of looping
    #[arg(long)]
    no_loop: bool,

    /// Seconds to play; 0 processes without opening a device
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// JSON session config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the processed result as 32-bit float WAV
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write a peak-normalized copy of the IR
    #[arg(long)]
    export_ir: Option<PathBuf>,

    /// Output device name
    #[arg(long)]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config = load_config(&args)?;
    let mut session = if args.seconds > 0.0 {
        Session::with_cpal(config)
    } else {
        Session::new(config, Box::new(ManualBackend::new()))
    };

    let (Some(ir), Some(di)) = (&args.ir, &args.di) else {
        bail!("--ir and --di are required");
    };

    // Mix and EQ first so the initial convolution already uses them
    session.set_mix(args.mix);
    if let Some(gains) = &args.gains {
        if gains.len() != NUM_BANDS {
            bail!("--gains takes {} values, got {}", NUM_BANDS, gains.len());
        }
        session.set_gains(gains).context("Invalid EQ gains")?;
    }

    let info = session
        .load_ir(ir)
        .with_context(|| format!("Failed to load IR {}", ir.display()))?;
    println!("{info}");
    let info = session
        .load_di(di)
        .with_context(|| format!("Failed to load DI {}", di.display()))?;
    println!("{info}");

    for event in session.settle(PROCESS_TIMEOUT) {
        report(&event)?;
    }
    if session.is_processing() {
        bail!("Processing did not finish within {:?}", PROCESS_TIMEOUT);
    }

    if args.seconds > 0.0 {
        play_for(&mut session, Duration::from_secs_f64(args.seconds))?;
    }

    if let Some(path) = &args.export {
        if !session.export_output(path)? {
            bail!("Nothing to export");
        }
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &args.export_ir {
        session
            .export_asset(AssetKind::Ir, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if args.device.is_some() {
        config.output_device = args.device.clone();
    }
    if let Some(volume) = args.volume {
        config = config.with_volume(volume);
    }
    if args.no_loop {
        config.looping = false;
    }
    Ok(config)
}

fn list_devices() -> Result<()> {
    let devices = irt_audio::list_output_devices().context("Failed to enumerate devices")?;
    if devices.is_empty() {
        println!("No output devices");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!(
            "{} {} ({} ch, {:?} Hz)",
            marker, device.name, device.output_channels, device.sample_rates
        );
    }
    Ok(())
}

fn play_for(session: &mut Session, length: Duration) -> Result<()> {
    if !session.is_playing() {
        session.play().context("Failed to start playback")?;
    }
    let interval = session.config().position_interval();
    let start = Instant::now();

    while start.elapsed() < length {
        for event in session.poll(Instant::now()) {
            if event == SessionEvent::PlaybackEnded {
                println!("Done");
                return Ok(());
            }
            report(&event)?;
        }
        thread::sleep(interval);
    }

    session.stop();
    Ok(())
}

fn report(event: &SessionEvent) -> Result<()> {
    match event {
        SessionEvent::Progress(percent) => log::debug!("Processing {}%", percent),
        SessionEvent::ProcessingFinished { sample_rate, len } => {
            println!(
                "Processed {} samples at {} Hz ({:.3}s)",
                len,
                sample_rate,
                *len as f64 / *sample_rate as f64
            );
        }
        SessionEvent::ProcessingError(message) => bail!("Processing failed: {message}"),
        SessionEvent::AudioError(message) => bail!("Audio output failed: {message}"),
        SessionEvent::Position { position, duration } => {
            log::debug!("{:.2} / {:.2}s", position, duration);
        }
        SessionEvent::PlaybackRestarted => log::debug!("Looped"),
        SessionEvent::PlaybackEnded => {}
    }
    Ok(())
}
