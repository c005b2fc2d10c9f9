//! tsyncd - replay driver for the channel synchronization core.
//!
//! Reads server-to-server protocol lines from stdin, applies them to an
//! in-memory network and writes every resulting line to stdout tagged with
//! its destination. Logs go to stderr.

use anyhow::Context as _;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use slircd_tsync::config::{Config, LogFormat};
use slircd_tsync::handlers::{Context, Registry};
use slircd_tsync::message::RawMessage;
use slircd_tsync::send::{Recorder, Sent};
use slircd_tsync::state::Network;
use slircd_tsync::state::network::now;
use slircd_tsync::HandlerError;
use std::sync::Arc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Longest accepted input line, well above the 512-byte protocol limit so
/// oversized bursts reach the handler and get reported there.
const MAX_INPUT_LINE: usize = 8192;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Apply one line under the merge lock and collect what it emitted.
fn process_line(net: &Mutex<Network>, registry: &Registry, line: &str) -> Vec<Sent> {
    let mut out = Recorder::new();
    let result = line
        .parse::<RawMessage>()
        .map_err(HandlerError::from)
        .and_then(|msg| {
            let mut net = net.lock();
            let mut ctx = Context {
                net: &mut net,
                out: &mut out,
                now: now(),
            };
            registry.dispatch(&mut ctx, &msg)
        });

    if let Err(err) = result {
        warn!(code = err.error_code(), error = %err, line = %line, "Dropped line");
    }
    out.take()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load_validated(&config_path)
        .with_context(|| format!("loading {config_path}"))?;

    init_tracing(config.general.log_format);
    info!(
        server = %config.server.name,
        sid = %config.server.sid,
        description = %config.server.description,
        links = config.links.len(),
        "Starting tsyncd"
    );

    let net = Arc::new(Mutex::new(Network::from_config(&config)));
    let registry = Registry::new();

    let mut input = FramedRead::new(
        tokio::io::stdin(),
        LinesCodec::new_with_max_length(MAX_INPUT_LINE),
    );
    let mut output = FramedWrite::new(tokio::io::stdout(), LinesCodec::new());

    while let Some(result) = input.next().await {
        let line = match result {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(max = MAX_INPUT_LINE, "Discarding overlong input line");
                continue;
            }
            Err(LinesCodecError::Io(e)) => {
                error!(error = %e, "Failed to read input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        for sent in process_line(&net, &registry, &line) {
            output.send(sent.to_string()).await?;
        }
    }

    let net = net.lock();
    let (whowas_count, whowas_bytes) = net.whowas.memory_stats();
    info!(
        channels = net.channels.len(),
        clients = net.clients.len(),
        whowas = whowas_count,
        whowas_bytes,
        "Input exhausted, shutting down"
    );
    for (command, count) in registry.command_stats() {
        info!(command, count, "Command usage");
    }
    Ok(())
}
