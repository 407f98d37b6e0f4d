//! Boltzmann population of conformers from their electronic energies.
//!
//! Energies are read from a plain `name,energy` file in Hartree (the
//! `energies.csv` written by a workflow run has this layout). Populations
//! follow
//!
//! ```text
//! p_i = exp(-ΔE_i / RT) / Σ_j exp(-ΔE_j / RT)
//! ```
//!
//! with ΔE measured from the lowest conformer in kJ/mol.

use nalgebra::DVector;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Gas constant in kJ/(mol·K)
pub const R: f64 = 0.008314;
/// Default temperature in Kelvin (25 °C)
pub const T: f64 = 298.15;
/// Conversion factor from Hartree to kJ/mol
pub const HARTREE_TO_KJ_MOL: f64 = 2625.5;

#[derive(Error, Debug)]
pub enum BoltzmannError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("{0}")]
    InvalidInput(String),
}

/// A named structure and its energy in Hartree.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    pub name: String,
    pub energy: f64,
}

/// Population of one conformer.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    pub name: String,
    /// Energy in Hartree
    pub energy: f64,
    /// Energy above the lowest conformer, kJ/mol
    pub relative_energy: f64,
    /// Fraction between 0 and 1
    pub fraction: f64,
}

/// Parses `name,energy` lines.
///
/// A name seen twice keeps its position but takes the later energy.
pub fn parse_energies(content: &str) -> Result<Vec<Conformer>, BoltzmannError> {
    let mut conformers: Vec<Conformer> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (name, energy) = trimmed.split_once(',').ok_or_else(|| BoltzmannError::Parse {
            line: idx + 1,
            message: format!("expected 'name,energy', got '{}'", trimmed),
        })?;
        let name = name.trim().to_string();
        let energy: f64 = energy.trim().parse().map_err(|_| BoltzmannError::Parse {
            line: idx + 1,
            message: format!("invalid energy '{}'", energy.trim()),
        })?;

        match index.get(&name) {
            Some(&pos) => conformers[pos].energy = energy,
            None => {
                index.insert(name.clone(), conformers.len());
                conformers.push(Conformer { name, energy });
            }
        }
    }

    Ok(conformers)
}

/// Reads and parses an energy file.
pub fn read_energy_file(path: &Path) -> Result<Vec<Conformer>, BoltzmannError> {
    let content = fs::read_to_string(path)?;
    parse_energies(&content)
}

/// Computes populations at `temperature`, most populated first.
///
/// ```
/// use autogauss::boltzmann::{boltzmann_populations, Conformer, T};
///
/// let conformers = vec![
///     Conformer { name: "a".into(), energy: -100.0 },
///     Conformer { name: "b".into(), energy: -100.0 },
/// ];
/// let pops = boltzmann_populations(&conformers, T).unwrap();
/// assert!((pops[0].fraction - 0.5).abs() < 1e-12);
/// ```
pub fn boltzmann_populations(
    conformers: &[Conformer],
    temperature: f64,
) -> Result<Vec<Population>, BoltzmannError> {
    if conformers.is_empty() {
        return Err(BoltzmannError::InvalidInput("no energies given".into()));
    }
    if !(temperature > 0.0) {
        return Err(BoltzmannError::InvalidInput(format!(
            "temperature must be positive, got {}",
            temperature
        )));
    }

    let min_energy = conformers
        .iter()
        .map(|c| c.energy)
        .fold(f64::INFINITY, f64::min);
    let relative = DVector::from_iterator(
        conformers.len(),
        conformers
            .iter()
            .map(|c| (c.energy - min_energy) * HARTREE_TO_KJ_MOL),
    );
    let weights = relative.map(|e| (-e / (R * temperature)).exp());
    let fractions = &weights / weights.sum();

    let mut populations: Vec<Population> = conformers
        .iter()
        .enumerate()
        .map(|(i, c)| Population {
            name: c.name.clone(),
            energy: c.energy,
            relative_energy: relative[i],
            fraction: fractions[i],
        })
        .collect();
    populations.sort_by(|a, b| b.fraction.total_cmp(&a.fraction));
    Ok(populations)
}

/// Renders the tab-separated population table.
pub fn format_population_table(populations: &[Population]) -> String {
    let mut table = String::from("Molecule\tEnergy (Hartree)\tRelative Population (%)\n");
    for pop in populations {
        table.push_str(&format!(
            "{}\t{:.6}\t\t{:.2}\n",
            pop.name,
            pop.energy,
            pop.fraction * 100.0
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_energies_duplicates_and_blanks() {
        let conformers = parse_energies("a,-1.0\n\nb, -2.0\na,-3.0\n").unwrap();
        assert_eq!(
            conformers,
            vec![
                Conformer { name: "a".into(), energy: -3.0 },
                Conformer { name: "b".into(), energy: -2.0 },
            ]
        );
    }

    #[test]
    fn test_parse_energies_reports_line() {
        let err = parse_energies("a,-1.0\nbroken\n").unwrap_err();
        assert!(err.to_string().starts_with("line 2"));
        assert!(parse_energies("a,abc\n").is_err());
    }

    #[test]
    fn test_populations_sorted_and_normalised() {
        // 1 kJ/mol apart
        let gap = 1.0 / HARTREE_TO_KJ_MOL;
        let conformers = vec![
            Conformer { name: "high".into(), energy: -50.0 + gap },
            Conformer { name: "low".into(), energy: -50.0 },
        ];
        let pops = boltzmann_populations(&conformers, T).unwrap();
        assert_eq!(pops[0].name, "low");
        assert_eq!(pops[0].relative_energy, 0.0);
        let total: f64 = pops.iter().map(|p| p.fraction).sum();
        assert!((total - 1.0).abs() < 1e-12);

        let expected_ratio = (-1.0 / (R * T)).exp();
        assert!((pops[1].fraction / pops[0].fraction - expected_ratio).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_input() {
        assert!(boltzmann_populations(&[], T).is_err());
        let one = vec![Conformer { name: "x".into(), energy: -1.0 }];
        assert!(boltzmann_populations(&one, 0.0).is_err());
        assert!(boltzmann_populations(&one, f64::NAN).is_err());
    }

    #[test]
    fn test_table_format() {
        let pops = vec![Population {
            name: "conf1".into(),
            energy: -76.4089533,
            relative_energy: 0.0,
            fraction: 1.0,
        }];
        assert_eq!(
            format_population_table(&pops),
            "Molecule\tEnergy (Hartree)\tRelative Population (%)\nconf1\t-76.408953\t\t100.00\n"
        );
    }
}
