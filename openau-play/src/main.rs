//! openau-play - Main entry point
//!
//! Plays one WAV file on an audio device until it ends or the process is
//! asked to stop, or lists the available devices.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use openau_core::{AudioBackend, DeviceReport, LatencyPreference, NullBackend, Session};
use openau_play::{logging, CliOverrides, CpalBackend, PlayerConfig};
use tokio::signal;
use tracing::{debug, info, warn};

/// How often playback completion is polled
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How often progress is logged at debug level
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Command-line arguments for openau-play
#[derive(Parser, Debug)]
#[command(name = "openau-play")]
#[command(about = "Play an uncompressed PCM WAV file")]
#[command(version)]
struct Args {
    /// WAV file to play
    #[arg(required_unless_present = "list_devices")]
    file: Option<PathBuf>,

    /// Output device: "default", an index, or a device name [env: OPENAU_DEVICE]
    #[arg(short, long)]
    device: Option<String>,

    /// Frames per audio callback [env: OPENAU_BUFFER_FRAMES]
    #[arg(short, long)]
    buffer_frames: Option<u32>,

    /// Which device default latency to request (low or high)
    #[arg(long)]
    latency: Option<LatencyPreference>,

    /// List audio devices and exit
    #[arg(short, long)]
    list_devices: bool,

    /// Print the device list as JSON
    #[arg(long, requires = "list_devices")]
    json: bool,

    /// Discard audio instead of opening a sound device
    #[arg(long)]
    null_output: bool,

    /// Configuration file [env: OPENAU_CONFIG]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cli = CliOverrides {
        config: args.config.clone(),
        device: args.device.clone(),
        buffer_frames: args.buffer_frames,
        latency: args.latency,
        log_level: args.log_level.clone(),
    };
    let config = PlayerConfig::resolve(&cli).context("Failed to load configuration")?;

    let filter = logging::build_filter(args.log_level.as_deref(), &config.log_level)?;
    logging::init(filter)?;

    info!("openau-play {}", openau_play::build_info());
    if let Some(path) = &config.config_file {
        info!("Configuration file: {}", path.display());
    }

    let backend: Box<dyn AudioBackend> = if args.null_output {
        Box::new(NullBackend::realtime())
    } else {
        Box::new(CpalBackend::new())
    };

    if args.list_devices {
        let report = DeviceReport::collect(backend.as_ref()).context("Failed to enumerate audio devices")?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report);
        }
        return Ok(());
    }

    let file = args.file.context("No file given")?;
    play(backend.as_ref(), &file, &config).await
}

async fn play(backend: &dyn AudioBackend, file: &Path, config: &PlayerConfig) -> Result<()> {
    let mut session =
        Session::open(file).with_context(|| format!("Failed to open {}", file.display()))?;

    session
        .start_with(backend, &config.device, &config.output)
        .with_context(|| format!("Failed to start playback on {}", config.device))?;

    let latency = session
        .negotiated_format()
        .map(|format| format.params.suggested_latency)
        .unwrap_or_default();

    let finished = tokio::select! {
        _ = wait_for_completion(&session) => true,
        _ = shutdown_signal() => false,
    };

    if finished {
        // Let the buffers already handed to the device play out
        tokio::time::sleep(latency + POLL_INTERVAL).await;
        info!(
            "Playback complete: {} frames ({:.2}s)",
            session.frames_played(),
            session.position().as_secs_f64()
        );
    } else {
        info!(
            "Playback stopped at {:.2}s of {:.2}s",
            session.position().as_secs_f64(),
            session.duration().as_secs_f64()
        );
    }

    session.close().context("Failed to close output stream")?;

    if let Some(e) = session.take_stream_error() {
        warn!("Playback ended early after a read error: {}", e);
    }
    Ok(())
}

async fn wait_for_completion(session: &Session) {
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut last_report = tokio::time::Instant::now();
    while !session.is_complete() {
        poll.tick().await;
        if last_report.elapsed() >= PROGRESS_INTERVAL {
            last_report = tokio::time::Instant::now();
            debug!(
                "Position {:.1}s / {:.1}s, callback load {:.1}%",
                session.position().as_secs_f64(),
                session.duration().as_secs_f64(),
                session.stream_cpu_load().unwrap_or(0.0) * 100.0
            );
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping playback");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping playback");
        },
    }
}
