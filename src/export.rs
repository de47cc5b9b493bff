//! Flat CSV export of a session's logged readings.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::sampling::Reading;

pub const EXPORT_HEADER: [&str; 2] = ["Time (min)", "psi"];

/// Default file name offered by the save prompt.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "Pressure Data.csv";

/// An open destination picked by the operator.
pub struct ExportTarget {
    pub sink: Box<dyn Write + Send>,
    /// Remembered as the next default save directory.
    pub directory: Option<PathBuf>,
}

pub enum SaveChoice {
    Save(ExportTarget),
    Discard,
    /// Keep the session running.
    Cancel,
}

/// Asks the operator whether and where to save before a session stops.
pub trait ExportPrompt: Send + Sync {
    fn choose(&self, default_directory: &Path) -> Result<SaveChoice, ExportError>;
}

pub fn write_readings<W: Write>(sink: W, readings: &[Reading]) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(sink);

    writer.write_record(EXPORT_HEADER)?;
    for reading in readings {
        writer.write_record([
            format!("{:.2}", reading.elapsed_minutes),
            format!("{:.1}", reading.psi),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn parse_readings<R: Read>(source: R) -> Result<Vec<Reading>, ExportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = csv_reader.headers()?;
    if headers.iter().ne(EXPORT_HEADER) {
        return Err(ExportError::Header(headers.iter().collect::<Vec<_>>().join(",")));
    }

    let mut readings = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |index: usize| -> Result<f64, ExportError> {
            let raw = record.get(index).ok_or_else(|| ExportError::Record {
                line,
                reason: format!("missing column {}", index + 1),
            })?;
            raw.parse().map_err(|_| ExportError::Record {
                line,
                reason: format!("'{raw}' is not a number"),
            })
        };

        readings.push(Reading {
            elapsed_minutes: field(0)?,
            psi: field(1)?,
        });
    }

    Ok(readings)
}
