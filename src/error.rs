use thiserror::Error;

/// A raw sensor line that could not be read as a number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("sample '{0}' is not numeric")]
    NotNumeric(String),

    #[error("sample '{0}' is not a finite number")]
    NonFinite(String),
}

/// Failure to open or configure the serial link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("port id {0} is outside the supported range 1..=15")]
    InvalidPort(u8),

    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial link task failed: {0}")]
    Task(String),
}

/// Failure while writing the exported readings.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode export: {0}")]
    Csv(#[from] csv::Error),

    #[error("export prompt failed: {0}")]
    Prompt(String),

    #[error("unexpected export header '{0}'")]
    Header(String),

    #[error("malformed export record on line {line}: {reason}")]
    Record { line: u64, reason: String },
}

/// The alarm sound could not be started. Audio is best effort.
#[derive(Debug, Clone, Error)]
#[error("alarm sound unavailable: {0}")]
pub struct NotificationError(pub String);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("threshold must be a finite value >= 0, got {0}")]
    InvalidThreshold(f64),

    #[error("port id must be within 1..=15, got {0}")]
    InvalidPort(u8),

    #[error("failed to update configuration: {0:#}")]
    Config(anyhow::Error),
}
