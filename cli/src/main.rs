// devimote -- command-line remote for Devialet Expert amplifiers.
//
// Usage:
//   devimote status
//   devimote watch --interval-ms 500
//   devimote power
//   devimote mute
//   devimote volume -32.5
//   devimote output Phono
//   devimote output 3
//   devimote channels
//
// Set RUST_LOG=devimote=trace (or pass -vv) to see every datagram.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use devimote::{Amplifier, AmplifierBuilder, COMMAND_PORT, DeviceStatus, Error, STATUS_PORT};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Remote control for Devialet Expert amplifiers on the local network.
#[derive(Parser)]
#[command(name = "devimote", version, about)]
struct Cli {
    /// Local UDP port the amplifier broadcasts status to.
    #[arg(long, default_value_t = STATUS_PORT)]
    status_port: u16,

    /// UDP port the amplifier accepts commands on.
    #[arg(long, default_value_t = COMMAND_PORT)]
    command_port: u16,

    /// How long to wait for a status packet, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for one status packet and print it.
    Status,

    /// Print every status packet until Ctrl-C.
    Watch {
        /// Pause between polls, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Toggle between standby and on.
    Power,

    /// Toggle mute.
    Mute,

    /// Set the volume in dB (capped at -10 dB).
    Volume {
        /// Target level, e.g. -32.5.
        #[arg(allow_negative_numbers = true)]
        db: f64,
    },

    /// Select an input by channel name or slot index.
    Output {
        /// Channel name as shown on the amplifier, or a slot index 0-14.
        channel: String,
    },

    /// List the input channels the amplifier reports.
    Channels,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn create_amplifier(cli: &Cli) -> Result<Amplifier> {
    AmplifierBuilder::new()
        .status_port(cli.status_port)
        .command_port(cli.command_port)
        .receive_timeout(Duration::from_millis(cli.timeout_ms))
        .build()
        .await
        .with_context(|| format!("failed to listen on UDP port {}", cli.status_port))
}

/// Poll until a status packet arrives, tolerating one undecodable packet.
async fn wait_for_status(amp: &mut Amplifier) -> Result<DeviceStatus> {
    for _ in 0..2 {
        match amp.poll().await {
            Ok(status) if status.connected => return Ok(status),
            Ok(_) => bail!("no amplifier answered"),
            Err(Error::MalformedPayload(reason)) => {
                tracing::warn!(%reason, "Ignoring malformed status packet");
            }
            Err(e) => return Err(e).context("failed to read amplifier status"),
        }
    }
    bail!("amplifier keeps sending malformed status packets")
}

fn print_report(status: &DeviceStatus) {
    match status.report() {
        Some(line) => println!("{line}"),
        None => println!("[---] no amplifier"),
    }
}

fn print_outcome(sent: bool, what: &str) {
    if sent {
        println!("{what}");
    } else {
        println!("{what}: nothing sent");
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_status(amp: &mut Amplifier) -> Result<()> {
    let status = wait_for_status(amp).await?;
    print_report(&status);
    Ok(())
}

async fn cmd_watch(amp: &mut Amplifier, interval: Duration) -> Result<()> {
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let mut events = amp.subscribe();
    loop {
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            polled = amp.poll() => polled,
        };

        match polled {
            Ok(status) => print_report(&status),
            Err(Error::MalformedPayload(reason)) => {
                tracing::warn!(%reason, "Ignoring malformed status packet");
            }
            Err(e) => return Err(e).context("failed to read amplifier status"),
        }
        while let Ok(event) = events.try_recv() {
            tracing::info!(?event, "State changed");
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    Ok(())
}

async fn cmd_power(amp: &mut Amplifier) -> Result<()> {
    let status = wait_for_status(amp).await?;
    let what = if status.powered {
        "standby"
    } else {
        "power on (the amplifier takes about 20 seconds to start)"
    };
    let sent = amp.send_toggle_power().await?;
    print_outcome(sent, what);
    Ok(())
}

async fn cmd_mute(amp: &mut Amplifier) -> Result<()> {
    let status = wait_for_status(amp).await?;
    let what = if status.muted { "unmute" } else { "mute" };
    let sent = amp.send_toggle_mute().await?;
    print_outcome(sent, what);
    Ok(())
}

async fn cmd_volume(amp: &mut Amplifier, db: f64) -> Result<()> {
    if db.is_nan() {
        bail!("volume must be a number");
    }
    wait_for_status(amp).await?;
    let sent = amp.send_set_volume(db).await?;
    print_outcome(sent, &format!("volume {:.1}dB", db.min(devimote::VOLUME_CEILING_DB)));
    Ok(())
}

async fn cmd_output(amp: &mut Amplifier, channel: &str) -> Result<()> {
    wait_for_status(amp).await?;
    let sent = match channel.parse::<u8>() {
        Ok(index) => amp.send_set_output(index).await?,
        Err(_) => match amp.send_select_channel(channel).await {
            Err(Error::NoMatchingChannel(name)) => {
                let known: Vec<&str> = amp.channels().iter().map(|(_, n)| n).collect();
                bail!("no channel named {name:?}; known channels: {}", known.join(", "));
            }
            other => other?,
        },
    };
    print_outcome(sent, &format!("output {channel}"));
    Ok(())
}

async fn cmd_channels(amp: &mut Amplifier) -> Result<()> {
    let status = wait_for_status(amp).await?;
    if amp.channels().is_empty() {
        println!("no channels reported");
        return Ok(());
    }
    for (index, name) in amp.channels().iter() {
        let marker = if index == status.active_channel { "*" } else { " " };
        println!("{marker} {index:>2}  {name}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut amp = create_amplifier(&cli).await?;

    match &cli.command {
        Command::Status => cmd_status(&mut amp).await,
        Command::Watch { interval_ms } => {
            cmd_watch(&mut amp, Duration::from_millis(*interval_ms)).await
        }
        Command::Power => cmd_power(&mut amp).await,
        Command::Mute => cmd_mute(&mut amp).await,
        Command::Volume { db } => cmd_volume(&mut amp, *db).await,
        Command::Output { channel } => cmd_output(&mut amp, channel).await,
        Command::Channels => cmd_channels(&mut amp).await,
    }
}
