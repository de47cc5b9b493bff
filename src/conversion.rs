//! Raw sensor counts to psi.
//!
//! The sensor firmware streams the 10-bit ADC value of a 0-32 psi
//! transducer, one value per line.

use crate::error::ParseError;

const ADC_FULL_SCALE: f64 = 1024.0;
const SENSOR_RANGE_PSI: f64 = 32.0;

/// Unrounded psi for a raw sample. Surrounding whitespace is ignored.
pub fn raw_to_psi(raw: &str) -> Result<f64, ParseError> {
    let trimmed = raw.trim();
    let counts: f64 = trimmed
        .parse()
        .map_err(|_| ParseError::NotNumeric(trimmed.to_string()))?;

    if !counts.is_finite() {
        return Err(ParseError::NonFinite(trimmed.to_string()));
    }

    Ok(counts / ADC_FULL_SCALE * SENSOR_RANGE_PSI)
}

/// Psi for a raw sample, rounded to one decimal place.
pub fn convert(raw: &str) -> Result<f64, ParseError> {
    raw_to_psi(raw).map(|psi| round_to(psi, 1))
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
