pub mod alarm;
pub mod audio;
pub mod cli;
pub mod config;
pub mod conversion;
pub mod error;
pub mod export;
pub mod notify;
pub mod sampling;
pub mod serial;
pub mod session;
mod utils;

use clap::Parser;

pub use alarm::{AlarmMonitor, AlarmState};
pub use config::{Config, ConfigStore};
pub use conversion::convert;
pub use error::{ExportError, LinkError, NotificationError, ParseError, SessionError};
pub use sampling::{Reading, SamplingLog};
pub use session::{SessionController, SessionSnapshot, SessionStatus, StopOutcome};

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var, defaults to info)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    log::info!("Pressure monitor starting up...");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::execute(cli))
}
