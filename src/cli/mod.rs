pub mod terminal;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use crate::{
    audio::AudioEngineHandle,
    config::{default_config_path, ConfigStore},
    notify::RandomChooser,
    serial::{self, port_name, SystemSerialTransport},
    session::{Collaborators, SessionController, StopOutcome, SystemClock},
};

use terminal::{DialogPrompt, TerminalAlarm, TerminalDisplay};

#[derive(Debug, Parser)]
#[command(
    name = "pressure-monitor",
    version,
    about = "Log a serial pressure sensor and alarm on over-pressure"
)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a monitoring session (default)
    Monitor(MonitorArgs),
    /// List serial ports visible to this machine
    Ports,
    /// Show the stored settings
    Config,
}

#[derive(Debug, Default, Args)]
pub struct MonitorArgs {
    /// Port id 1-15; saved as the new default
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=15))]
    pub port: Option<u8>,

    /// Alarm threshold in psi; saved as the new default
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Alarm volume between 0 and 1
    #[arg(long)]
    pub volume: Option<f32>,
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match cli.command.unwrap_or(Command::Monitor(MonitorArgs::default())) {
        Command::Monitor(args) => monitor(config_path, args).await,
        Command::Ports => list_ports(),
        Command::Config => show_config(config_path),
    }
}

async fn monitor(config_path: PathBuf, args: MonitorArgs) -> Result<()> {
    let store = Arc::new(ConfigStore::new(config_path)?);
    let audio = Arc::new(AudioEngineHandle::new());
    if let Some(volume) = args.volume {
        if let Err(err) = audio.set_volume(volume) {
            warn!("{err}");
        }
    }

    let controller = SessionController::new(
        store.clone(),
        Collaborators {
            transport: Arc::new(SystemSerialTransport),
            notifier: Arc::new(TerminalAlarm::new(audio.clone())),
            display: Arc::new(TerminalDisplay),
            prompt: Arc::new(DialogPrompt),
            chooser: Arc::new(RandomChooser),
            clock: Arc::new(SystemClock),
        },
    );

    if let Some(port_id) = args.port {
        controller.on_port_changed(port_id).await?;
    }
    if let Some(threshold_psi) = args.threshold {
        controller.on_threshold_changed(threshold_psi).await?;
    }

    let config = store.get();
    controller
        .start(config.port_id, config.threshold_psi)
        .await
        .context("Failed. Check connections and port.")?;

    println!(
        "Monitoring {} (alarm above {} psi). Press Ctrl-C to stop.",
        port_name(config.port_id),
        config.threshold_psi
    );

    loop {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;

        match controller.shutdown().await {
            Ok(StopOutcome::Stopped(readings)) => {
                info!("monitor exiting after {} logged readings", readings.len());
                println!("Stopped. {} readings logged.", readings.len());
                break;
            }
            Ok(StopOutcome::NotRunning) => break,
            Ok(StopOutcome::Cancelled) => {
                println!("Still monitoring. Press Ctrl-C to stop.");
            }
            Err(err) => {
                eprintln!("{err}");
                println!("Still monitoring. Fix the problem and press Ctrl-C to try again.");
            }
        }
    }

    audio.stop();
    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = serial::available_ports().context("failed to enumerate serial ports")?;
    println!("Available serial ports:");
    if ports.is_empty() {
        println!("  (none)");
    }
    for port in ports {
        println!("  {} - {}", port.name, port.kind);
    }
    Ok(())
}

fn show_config(config_path: PathBuf) -> Result<()> {
    let store = ConfigStore::new(config_path)?;
    println!("{}", store.path().display());
    println!("{}", serde_json::to_string_pretty(&store.get())?);
    Ok(())
}
