use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::animation::Transition;
use crate::engine::Reconfigure;
use crate::face::Face;
use crate::message::{parse_message, Tuple};
use crate::state::BluetoothAlert;
use crate::Args;

/// Commands sent from IPC server to render loop
#[derive(Debug)]
pub enum IpcCommand {
    Set { tuples: Vec<Tuple>, reply: oneshot::Sender<String> },
    Battery { level: u8, reply: oneshot::Sender<String> },
    Link { connected: bool, reply: oneshot::Sender<String> },
    Reload { reply: oneshot::Sender<String> },
    Status { reply: oneshot::Sender<String> },
    Ping { reply: oneshot::Sender<String> },
}

/// What the render loop has to do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcEffect {
    None,
    Redraw,
    Animate(Transition),
    Alert(BluetoothAlert),
}

impl From<Reconfigure> for IpcEffect {
    fn from(outcome: Reconfigure) -> Self {
        match outcome {
            Reconfigure::Snapped => IpcEffect::Redraw,
            Reconfigure::Scheduled(transition) => IpcEffect::Animate(transition),
        }
    }
}

/// Get the socket path for IPC
pub fn socket_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(dir).join("horizon.sock")
    } else {
        PathBuf::from("/tmp/horizon.sock")
    }
}

/// Parse a protocol line into an IpcCommand
fn parse_command(line: &str, reply: oneshot::Sender<String>) -> Result<IpcCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["set", rest @ ..] if !rest.is_empty() => {
            let tuples = parse_message(&rest.join(" "))?;
            Ok(IpcCommand::Set { tuples, reply })
        }
        ["battery", val] => {
            let level: u8 = val.parse().context("Invalid battery level")?;
            Ok(IpcCommand::Battery {
                level: level.min(100),
                reply,
            })
        }
        ["link", "up"] => Ok(IpcCommand::Link { connected: true, reply }),
        ["link", "down"] => Ok(IpcCommand::Link { connected: false, reply }),
        ["reload"] => Ok(IpcCommand::Reload { reply }),
        ["status"] => Ok(IpcCommand::Status { reply }),
        ["ping"] => Ok(IpcCommand::Ping { reply }),
        _ => Err(anyhow::anyhow!("Unknown command: {}", line)),
    }
}

/// Process an IPC command by mutating render loop state
pub fn process_ipc_command(
    cmd: IpcCommand,
    face: &mut Face,
    config: &mut Config,
    args: &Args,
) -> IpcEffect {
    match cmd {
        IpcCommand::Set { tuples, reply } => {
            let effect = match face.apply_message(&tuples) {
                Some(outcome) => IpcEffect::from(outcome),
                None => IpcEffect::Redraw,
            };
            let _ = reply.send(format!("ok: {} field(s)", tuples.len()));
            effect
        }
        IpcCommand::Battery { level, reply } => {
            let changed = face.set_battery(level);
            let _ = reply.send(format!("ok: {}", level));
            if changed {
                IpcEffect::Redraw
            } else {
                IpcEffect::None
            }
        }
        IpcCommand::Link { connected, reply } => {
            let alert = face.set_link(connected);
            let _ = reply.send(format!("ok: {}", if connected { "up" } else { "down" }));
            match alert {
                Some(alert) => IpcEffect::Alert(alert),
                None => IpcEffect::Redraw,
            }
        }
        IpcCommand::Reload { reply } => match Config::from_args(args) {
            Ok(new_config) => {
                face.reload(&new_config);
                *config = new_config;
                let _ = reply.send("ok: reloaded".to_string());
                IpcEffect::Redraw
            }
            Err(e) => {
                let _ = reply.send(format!("err: could not load config: {:#}", e));
                IpcEffect::None
            }
        },
        IpcCommand::Status { reply } => {
            let _ = reply.send(format!("ok: {}", face.status()));
            IpcEffect::None
        }
        IpcCommand::Ping { reply } => {
            let _ = reply.send("ok: pong".to_string());
            IpcEffect::None
        }
    }
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, cmd_tx: mpsc::Sender<IpcCommand>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();
    buf_reader.read_line(&mut line).await?;
    let line = line.trim();

    if line.is_empty() {
        return Ok(());
    }

    let (reply_tx, reply_rx) = oneshot::channel();

    let command = match parse_command(line, reply_tx) {
        Ok(cmd) => cmd,
        Err(e) => {
            writer
                .write_all(format!("err: {}\n", e).as_bytes())
                .await?;
            return Ok(());
        }
    };

    cmd_tx
        .send(command)
        .await
        .map_err(|_| anyhow::anyhow!("Render loop has shut down"))?;

    let response = reply_rx
        .await
        .unwrap_or_else(|_| "err: internal error".to_string());

    writer
        .write_all(format!("{}\n", response).as_bytes())
        .await?;
    Ok(())
}

/// Start the IPC server, listening for commands on a Unix socket
pub async fn start_server(cmd_tx: mpsc::Sender<IpcCommand>) -> Result<()> {
    serve(&socket_path(), cmd_tx).await
}

async fn serve(path: &Path, cmd_tx: mpsc::Sender<IpcCommand>) -> Result<()> {
    // Remove stale socket from previous run
    let _ = std::fs::remove_file(path);

    let listener = UnixListener::bind(path).context("Failed to bind IPC socket")?;

    info!("IPC server listening on {}", path.display());

    loop {
        let (stream, _) = listener.accept().await?;
        let cmd_tx = cmd_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, cmd_tx).await {
                debug!("IPC client error: {}", e);
            }
        });
    }
}

/// Send a command to a running horizon instance (client mode)
pub async fn send_command(line: &str) -> Result<String> {
    send_to(&socket_path(), line).await
}

async fn send_to(path: &Path, line: &str) -> Result<String> {
    let stream = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        UnixStream::connect(path),
    )
    .await
    .context("Connection timed out")?
    .context("Could not connect to horizon. Is it running?")?;

    let (reader, mut writer) = stream.into_split();

    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.shutdown().await?;

    let mut buf_reader = BufReader::new(reader);
    let mut response = String::new();

    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        buf_reader.read_line(&mut response),
    )
    .await
    .context("Response timed out")?
    .context("Failed to read response")?;

    Ok(response.trim().to_string())
}
