//! facelink-monitor entry point.
//!
//! ```text
//! facelink-monitor watch               Print live tracking values
//! facelink-monitor watch --json        One JSON snapshot per tick
//! facelink-monitor simulate            Serve a synthetic tracking stream
//! facelink-monitor --gen-config        Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use facelink_core::FaceTracker;
use facelink_monitor::config::MonitorConfig;
use facelink_monitor::{simulate, watch};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "facelink-monitor", about = "Face tracking stream monitor")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "facelink-monitor.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a tracking server and print what it sends.
    Watch {
        /// Server host (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Server port (overrides config).
        #[arg(short, long)]
        port: Option<String>,
        /// Print JSON snapshots instead of text.
        #[arg(long)]
        json: bool,
        /// Include non-zero blendshape weights.
        #[arg(short, long)]
        blendshapes: bool,
    },
    /// Run a synthetic tracking server.
    Simulate {
        /// Listen address (overrides config). Example: 0.0.0.0:33433
        #[arg(short, long)]
        bind: Option<String>,
        /// Frames per second (overrides config).
        #[arg(long)]
        fps: Option<u32>,
    },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&MonitorConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = MonitorConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("facelink-monitor v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Watch {
        host: None,
        port: None,
        json: false,
        blendshapes: false,
    }) {
        Command::Watch {
            host,
            port,
            json,
            blendshapes,
        } => {
            if let Some(host) = host {
                config.network.host = host;
            }
            if let Some(port) = port {
                config.network.port = port;
            }
            config.display.json |= json;
            config.display.show_blendshapes |= blendshapes;
            run_watch(config).await
        }
        Command::Simulate { bind, fps } => {
            if let Some(bind) = bind {
                config.simulate.bind = bind;
            }
            if let Some(fps) = fps {
                config.simulate.fps = fps;
            }
            run_simulate(config).await
        }
    }
}

// ── watch ────────────────────────────────────────────────────────

async fn run_watch(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = Arc::new(FaceTracker::with_options(config.client_options()));

    // Connect blocks; keep it off the runtime so Ctrl-C still works.
    let connecting = {
        let tracker = Arc::clone(&tracker);
        let (host, port) = (config.network.host.clone(), config.network.port.clone());
        tokio::task::spawn_blocking(move || tracker.connect(&host, &port))
    };

    tokio::select! {
        joined = connecting => {
            let peer = joined??;
            info!(%peer, "connected");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted while connecting");
            tracker.close();
            return Ok(());
        }
    }

    let mut ticker = tokio::time::interval(config.display.refresh());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tracker.phase().is_disconnected() {
                    warn!("connection lost");
                    break;
                }
                let frame = tracker.snapshot();
                if config.display.json {
                    match watch::format_json(&frame) {
                        Ok(line) => println!("{line}"),
                        Err(e) => error!("snapshot serialization failed: {e}"),
                    }
                } else {
                    println!("{}", watch::format_line(&frame, config.display.show_blendshapes));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, closing");
                break;
            }
        }
    }

    // Dropping the tracker joins its worker thread.
    tracker.close();
    tokio::task::spawn_blocking(move || drop(tracker)).await?;
    Ok(())
}

// ── simulate ─────────────────────────────────────────────────────

async fn run_simulate(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&config.simulate.bind).await?;
    let cancel = CancellationToken::new();

    let server = tokio::spawn(simulate::serve(
        listener,
        config.simulate.fps,
        config.simulate.blendshapes,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, stopping");
    cancel.cancel();
    server.await??;
    Ok(())
}
