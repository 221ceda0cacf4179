use anyhow::{Context, Result};
use clap::Parser;
use loqa_call::{
    CaptureFactory, CaptureKind, Config, DecodeOnlySink, PlaybackSink, Session, SessionEvent,
    SpeakerPlayback,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stream the microphone to a call server and play its audio responses
#[derive(Debug, Parser)]
#[command(name = "loqa-call", version)]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/loqa-call")]
    config: String,

    /// Page origin to derive the websocket URL from (http:// or https://)
    #[arg(long)]
    origin: Option<String>,

    /// Explicit websocket URL (ws:// or wss://)
    #[arg(long)]
    url: Option<String>,

    /// Stream a WAV file instead of the microphone
    #[arg(long)]
    input: Option<PathBuf>,

    /// Decode audio responses without playing them
    #[arg(long)]
    mute: bool,

    /// Archive the call under this directory
    #[arg(long)]
    record: Option<PathBuf>,

    /// Keep receiving when the microphone is unavailable
    #[arg(long)]
    keep_open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut cfg = Config::load(&cli.config)?;
    if let Some(origin) = cli.origin {
        cfg.server.origin = origin;
    }
    if cli.url.is_some() {
        cfg.server.url = cli.url;
    }
    if let Some(record) = &cli.record {
        cfg.session.recordings_path = Some(record.display().to_string());
    }
    if cli.keep_open {
        cfg.session.keep_open_without_capture = true;
    }
    cfg.validate()?;

    let session_config = cfg.session_config()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Call server: {}", session_config.url);

    let capture_kind = match cli.input {
        Some(path) => CaptureKind::File {
            path,
            realtime: true,
        },
        None => CaptureKind::Microphone,
    };
    let capture = CaptureFactory::create(capture_kind, session_config.capture_config());

    let sink: Arc<dyn PlaybackSink> = if cli.mute {
        Arc::new(DecodeOnlySink)
    } else {
        Arc::new(SpeakerPlayback::new())
    };

    let mut session = Session::new(session_config, capture, sink, |text: &str| {
        println!("{}", text);
    });

    if let Some(mut events) = session.events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    SessionEvent::StateChanged(state) => info!("State: {}", state),
                    SessionEvent::PlaybackFailed { index, error } => {
                        warn!("Response #{} not played: {}", index, error)
                    }
                    other => debug!("{:?}", other),
                }
            }
        });
    }

    let shutdown = session.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, hanging up");
            shutdown.shutdown();
        }
    });

    let stats = session.run().await.context("Call session failed")?;

    info!(
        "Session stats: {}",
        serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
    );

    Ok(())
}
