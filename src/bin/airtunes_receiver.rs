//! Standalone `AirTunes`/RAOP receiver binary.
//!
//! Starts an `AirPlayReceiver`, advertises it over mDNS, and serves
//! sessions until interrupted.

use airtunes_receiver::{AirPlayReceiver, ReceiverConfig, ReceiverEvent};
use clap::Parser;

/// A pure Rust `AirTunes`/RAOP (`AirPlay` 1) audio receiver.
#[derive(Debug, Parser)]
#[command(name = "airtunes-receiver", version, about)]
struct Args {
    /// Device name advertised to senders
    #[arg(short, long)]
    name: Option<String>,

    /// RTSP listen port
    #[arg(short, long, default_value_t = ReceiverConfig::default().port)]
    port: u16,

    /// Target audio latency, in milliseconds
    #[arg(short, long, default_value_t = ReceiverConfig::default().latency_ms)]
    latency: u32,

    /// Audio output backend to use (passed through to the output sink)
    #[arg(short, long)]
    audio: Option<String>,

    /// Audio output device name
    #[arg(long = "audiodevice", alias = "ad")]
    audio_device: Option<String>,

    /// Run without the interactive startup banner
    #[arg(short, long)]
    daemon: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, before any other code reads the environment.
        unsafe {
            std::env::set_var("RUST_LOG", "airtunes_receiver=info");
        }
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut config = ReceiverConfig::default().port(args.port).latency_ms(args.latency);
    if let Some(name) = args.name {
        config = ReceiverConfig::with_name(name).port(args.port).latency_ms(args.latency);
    }
    if let Some(device) = args.audio_device.or(args.audio) {
        config = config.audio_device(device);
    }

    if !args.daemon {
        println!("Starting {} on port {}", config.name, config.port);
    }

    let mut receiver = AirPlayReceiver::new(config);
    let mut events = receiver.subscribe();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ReceiverEvent::Started { name, port } => {
                    tracing::info!("{} listening on port {}", name, port);
                }
                ReceiverEvent::Stopped => tracing::info!("receiver stopped"),
                ReceiverEvent::ClientConnected { address, .. } => {
                    tracing::info!("client connected from {}", address);
                }
                other => tracing::debug!("{:?}", other),
            }
        }
    });

    receiver.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    receiver.stop().await?;

    Ok(())
}
