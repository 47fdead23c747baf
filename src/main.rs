use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod color;
mod config;
mod display;
mod engine;
mod face;
mod ipc;
mod message;
mod renderer;
mod state;

use config::{Config, FaceShape};
use engine::FallbackHorizon;

#[derive(Parser, Debug)]
#[command(name = "horizon")]
#[command(author, version, about = "Solar watch face with a moving horizon")]
pub struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Face shape: round or rect
    #[arg(short, long)]
    shape: Option<FaceShape>,

    /// Clamp the horizon, shifting the dial by at most this many pixels
    #[arg(long, conflicts_with = "unclamped")]
    clamp_limit: Option<i32>,

    /// Let the horizon leave the screen on extreme days
    #[arg(long)]
    unclamped: bool,

    /// Horizon before the first location fix
    #[arg(long)]
    fallback: Option<FallbackHorizon>,

    /// Transition length in milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Black and white palette
    #[arg(long)]
    mono: bool,

    /// State file path
    #[arg(long)]
    state: Option<std::path::PathBuf>,

    /// Send a command to a running instance and print the reply
    #[arg(long, value_name = "COMMAND")]
    send: Option<String>,

    /// Write a commented default config and exit
    #[arg(long)]
    init_config: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging. The terminal owns stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("horizon=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "horizon", &mut std::io::stdout());
        return Ok(());
    }

    if args.init_config {
        let path = Config::init_default_config()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if let Some(line) = &args.send {
        let response = ipc::send_command(line).await?;
        println!("{}", response);
        return Ok(());
    }

    let config = Config::from_args(&args)?;

    info!(
        "Starting Horizon: {:?} face, {:?} horizon",
        config.face.shape, config.face.horizon
    );

    let (ipc_tx, ipc_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        if let Err(e) = ipc::start_server(ipc_tx).await {
            warn!("IPC server stopped: {:#}", e);
        }
    });

    display::terminal::run(config, args, ipc_rx).await?;

    let _ = std::fs::remove_file(ipc::socket_path());
    Ok(())
}
