//! ESP (Merz-Kollman/CHelpG) charge extraction and statistics.
//!
//! Gaussian prints fitted charges as:
//!
//! ```text
//!  ESP charges:
//!                1
//!      1  C   -0.352541
//!      2  H    0.110833
//!  Sum of ESP charges =   0.00000
//! ```
//!
//! The charges of every log in a directory tree are collected into one CSV
//! with a column per log plus the per-atom mean and standard deviation.

use crate::explore;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default output file written in the base directory
pub const ESP_RESULTS_FILE: &str = "ESP_Charges.csv";

#[derive(Error, Debug)]
pub enum EspError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Charges read from one log.
#[derive(Debug, Clone, PartialEq)]
pub struct EspCharges {
    /// Log path relative to the search base
    pub file: PathBuf,
    /// Charge per atom, in atom order
    pub charges: Vec<f64>,
}

/// Mean and sample standard deviation of one atom's charge across logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomStatistics {
    pub mean: f64,
    pub std_dev: f64,
}

/// Reads the first `ESP charges:` block of a log.
///
/// Returns `None` when the log has no such block. A row whose charge cannot
/// be parsed is recorded as 0.0, which the statistics ignore.
pub fn parse_esp_charges(content: &str, max_atoms: Option<usize>) -> Option<Vec<f64>> {
    let mut lines = content.lines();
    lines.by_ref().find(|line| line.contains("ESP charges:"))?;

    // column header
    lines.next();

    let mut charges = Vec::new();
    for line in lines {
        if line.contains("Sum of ESP charges") {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 || parts[0].parse::<usize>().is_err() {
            break;
        }
        charges.push(parts[2].parse().unwrap_or(0.0));
        if max_atoms.map_or(false, |max| charges.len() >= max) {
            break;
        }
    }

    Some(charges)
}

/// Collects ESP charges from every `.log` in the subdirectories of `base`,
/// `depth + 1` levels deep. Logs without an ESP block are skipped.
pub fn collect_esp_charges(base: &Path, depth: usize, max_atoms: Option<usize>) -> Vec<EspCharges> {
    let mut sets = Vec::new();

    for dir in explore::directories_to_depth(base, depth) {
        for log in explore::files_with_extension(&dir, "log") {
            let content = match fs::read(&log) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Error processing {}: {}", log.display(), e);
                    continue;
                }
            };
            match parse_esp_charges(&content, max_atoms) {
                Some(charges) => {
                    info!("{}: {} ESP charges", log.display(), charges.len());
                    sets.push(EspCharges {
                        file: log.strip_prefix(base).unwrap_or(&log).to_path_buf(),
                        charges,
                    });
                }
                None => debug!("{} has no ESP charges", log.display()),
            }
        }
    }

    sets
}

/// Per-atom statistics over all sets, ignoring zero charges.
///
/// ```
/// use autogauss::esp::{atom_statistics, EspCharges};
/// use std::path::PathBuf;
///
/// let sets = vec![
///     EspCharges { file: PathBuf::from("a.log"), charges: vec![-0.2, 0.1] },
///     EspCharges { file: PathBuf::from("b.log"), charges: vec![-0.4] },
/// ];
/// let stats = atom_statistics(&sets);
/// assert!((stats[0].mean + 0.3).abs() < 1e-12);
/// assert_eq!(stats[1].std_dev, 0.0);
/// ```
pub fn atom_statistics(sets: &[EspCharges]) -> Vec<AtomStatistics> {
    let atoms = sets.iter().map(|s| s.charges.len()).max().unwrap_or(0);

    (0..atoms)
        .map(|i| {
            let values: Vec<f64> = sets
                .iter()
                .filter_map(|s| s.charges.get(i).copied())
                .filter(|&c| c != 0.0)
                .collect();
            statistics(&values)
        })
        .collect()
}

fn statistics(values: &[f64]) -> AtomStatistics {
    if values.is_empty() {
        return AtomStatistics { mean: 0.0, std_dev: 0.0 };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = if values.len() > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    AtomStatistics { mean, std_dev }
}

/// Writes the charge table with one row per atom.
pub fn write_esp_csv(path: &Path, sets: &[EspCharges]) -> Result<(), EspError> {
    let stats = atom_statistics(sets);
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Atom Number".to_string()];
    header.extend(sets.iter().map(|s| s.file.display().to_string()));
    header.push("Mean".to_string());
    header.push("Std Dev".to_string());
    writer.write_record(&header)?;

    for (i, stat) in stats.iter().enumerate() {
        let mut row = vec![(i + 1).to_string()];
        row.extend(
            sets.iter()
                .map(|s| s.charges.get(i).map_or(String::new(), |c| c.to_string())),
        );
        row.push(stat.mean.to_string());
        row.push(stat.std_dev.to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
