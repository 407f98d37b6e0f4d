//! Imaginary frequency check for optimised structures.
//!
//! After a frequency job Gaussian prints a `Low frequencies` summary followed
//! by the harmonic analysis. The first `Frequencies --` line of the last such
//! analysis holds the lowest modes; a negative first value means the structure
//! is a saddle point rather than a minimum.

use crate::explore;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default output file written in the scanned directory
pub const FREQUENCY_RESULTS_FILE: &str = "frequency_results.csv";

#[derive(Error, Debug)]
pub enum FrequencyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Lowest frequencies found in one log.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRecord {
    /// Log path relative to the scanned directory
    pub file: PathBuf,
    /// Text after `Frequencies --`, as printed
    pub raw: String,
    /// Parsed values in cm^-1
    pub values: Vec<f64>,
    /// `true` when the first frequency is imaginary
    pub has_negative: bool,
}

const SEQUENCE: [&str; 3] = ["Diagonal vibrational", "Harmonic", "Frequencies --"];

/// Extracts the first `Frequencies --` line after the last `Low frequencies`.
///
/// Returns `(raw text, values, has_negative)`, or `None` when the markers do
/// not all appear in order.
pub fn parse_frequencies(content: &str) -> Option<(String, Vec<f64>, bool)> {
    let lines: Vec<&str> = content.lines().collect();
    let low = lines.iter().rposition(|line| line.contains("Low frequencies"))?;

    let mut expected = SEQUENCE.iter();
    let mut pattern = expected.next()?;
    for line in &lines[low + 1..] {
        if !line.contains(pattern) {
            continue;
        }
        match expected.next() {
            Some(next) => pattern = next,
            None => {
                let (_, raw) = line.split_once("Frequencies --")?;
                let raw = raw.trim().to_string();
                let values: Vec<f64> = raw
                    .split_whitespace()
                    .filter_map(|v| v.parse().ok())
                    .collect();
                let has_negative = values.first().map_or(false, |&v| v < 0.0);
                return Some((raw, values, has_negative));
            }
        }
    }

    None
}

/// Checks every `.log` below `base`.
pub fn scan_frequencies(base: &Path) -> Result<Vec<FrequencyRecord>, FrequencyError> {
    let mut records = Vec::new();

    for log in explore::files_recursive(base, "log") {
        let content = String::from_utf8_lossy(&fs::read(&log)?).into_owned();
        match parse_frequencies(&content) {
            Some((raw, values, has_negative)) => {
                info!(
                    "{}: {} -> Negatives? {}",
                    log.display(),
                    raw,
                    yes_no(has_negative)
                );
                records.push(FrequencyRecord {
                    file: log.strip_prefix(base).unwrap_or(&log).to_path_buf(),
                    raw,
                    values,
                    has_negative,
                });
            }
            None => debug!("{}: no complete frequency section", log.display()),
        }
    }

    Ok(records)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

/// Writes `Filename, Frequencies, Negatives?` rows.
pub fn write_frequency_csv(path: &Path, records: &[FrequencyRecord]) -> Result<(), FrequencyError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Filename", "Frequencies", "Negatives?"])?;
    for record in records {
        writer.write_record([
            record.file.display().to_string().as_str(),
            record.raw.as_str(),
            yes_no(record.has_negative),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
