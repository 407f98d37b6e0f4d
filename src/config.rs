//! Configuration structures for multi-step Gaussian workflows.
//!
//! This module defines the [`WorkflowConfig`] that drives the pipeline:
//! resources handed to Gaussian (`%Mem`, `%NProcShared`), the ordered list of
//! calculation stages and their route lines, default charge and multiplicity,
//! the size of the worker pool and the polling cadence used to detect
//! completion.
//!
//! A configuration starts from built-in defaults, is seeded from the INI
//! settings layer with [`WorkflowConfig::from_settings`], and is finally
//! overridden by the workflow file (see [`parser`](crate::parser)).

use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Route lines for the default six-stage absorption/emission sequence.
///
/// 1. Ground-state optimisation and frequencies
/// 2. Vertical excitations
/// 3. State-specific (corrected linear response) solvation of S1
/// 4. S1 optimisation and frequencies
/// 5. Non-equilibrium solvation of the relaxed S1, saved for the next stage
/// 6. Ground state at the S1 geometry with the saved non-equilibrium solvation
pub const DEFAULT_STEP_COMMANDS: [(usize, &str); 6] = [
    (
        1,
        "# Opt Freq B3LYP/6-31+G(d,p) SCRF=(Solvent=Ethanol) Geom=Connectivity",
    ),
    (
        2,
        "# B3LYP/6-31+G(d,p) TD=NStates=6 SCRF=(Solvent=Ethanol) Geom=Check Guess=Read",
    ),
    (
        3,
        "# B3LYP/6-31+G(d,p) TD=(NStates=6,Root=1) Geom=Check Guess=Read SCRF=(Solvent=Ethanol,CorrectedLR)",
    ),
    (
        4,
        "# B3LYP/6-31+G(d,p) TD=(NStates=6,Root=1) SCRF=(Solvent=Ethanol) Geom=Check Guess=Read Opt=CalcFC Freq NoSymm",
    ),
    (
        5,
        "# B3LYP/6-31+G(d,p) TD=(Read,NStates=6,Root=1) Geom=Check Guess=Read SCRF=(Solvent=Ethanol,CorrectedLR,NonEquilibrium=Save) NoSymm",
    ),
    (
        6,
        "# B3LYP/6-31+G(d,p) SCRF=(Solvent=Ethanol,NonEquilibrium=Read) Geom=Check Guess=Read NoSymm",
    ),
];

/// Title card written to every generated input file unless overridden.
pub const DEFAULT_TITLE: &str = "Title Card Required";

/// Main configuration structure for a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Memory handed to Gaussian via `%Mem` (e.g. "16GB")
    pub mem: String,
    /// Processors per calculation via `%NProcShared`
    pub nprocs: u32,
    /// Steps to run for every molecule, in execution order
    pub steps_to_execute: Vec<usize>,
    /// Maximum number of molecules processed at the same time
    pub max_concurrent: usize,
    /// Default molecular charge for sources that do not carry one
    pub charge: i32,
    /// Default spin multiplicity for sources that do not carry one
    pub multiplicity: u32,
    /// Route line for each step number
    pub step_commands: BTreeMap<usize, String>,
    /// Title card written to every input file
    pub title: String,
    /// Gaussian executable, optionally followed by arguments
    pub gaussian_command: String,
    /// Folder scanned for molecule source files
    pub input_dir: PathBuf,
    /// Folder receiving one subfolder per molecule
    pub output_dir: PathBuf,
    /// Extension of generated Gaussian input files (without the dot)
    pub input_extension: String,
    /// Extension of Gaussian log files (without the dot)
    pub output_extension: String,
    /// Delay between two looks at a running calculation's log
    pub poll_interval: Duration,
    /// Give up on a calculation after this long; `None` waits forever
    pub poll_timeout: Option<Duration>,
    /// Skip steps already recorded as finished in each molecule's progress file
    pub restart: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mem: "16GB".to_string(),
            nprocs: 16,
            steps_to_execute: vec![1, 2, 3, 4, 5, 6],
            max_concurrent: 2,
            charge: 0,
            multiplicity: 1,
            step_commands: default_step_commands(),
            title: DEFAULT_TITLE.to_string(),
            gaussian_command: "g16".to_string(),
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            input_extension: "com".to_string(),
            output_extension: "log".to_string(),
            poll_interval: Duration::from_secs(60),
            poll_timeout: None,
            restart: false,
        }
    }
}

impl WorkflowConfig {
    /// Builds a configuration whose defaults come from the loaded settings.
    ///
    /// Values the settings layer does not cover (step list, route lines,
    /// charge, folders) keep their built-in defaults.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mem: settings.general.default_memory.clone(),
            nprocs: settings.general.default_nprocs,
            max_concurrent: settings.workflow.max_concurrent,
            gaussian_command: settings.general.gaussian_command.clone(),
            input_extension: settings.extensions.input.clone(),
            output_extension: settings.extensions.output.clone(),
            poll_interval: Duration::from_secs(settings.workflow.poll_interval),
            ..Self::default()
        }
    }

    /// Route line for `step`, if one is defined.
    pub fn command_for(&self, step: usize) -> Option<&str> {
        self.step_commands.get(&step).map(String::as_str)
    }
}

/// The default step-number → route-line table.
pub fn default_step_commands() -> BTreeMap<usize, String> {
    DEFAULT_STEP_COMMANDS
        .iter()
        .map(|(step, cmd)| (*step, cmd.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_steps() {
        let config = WorkflowConfig::default();
        for step in &config.steps_to_execute {
            assert!(config.command_for(*step).is_some(), "step {} has no route", step);
        }
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_first_step_reads_connectivity() {
        let config = WorkflowConfig::default();
        assert!(config.command_for(1).unwrap().contains("Geom=Connectivity"));
        assert!(config.command_for(6).unwrap().contains("NonEquilibrium=Read"));
    }

    #[test]
    fn test_from_settings_uses_site_defaults() {
        let mut settings = Settings::default();
        settings.general.default_memory = "64GB".to_string();
        settings.general.default_nprocs = 32;
        settings.general.gaussian_command = "g09".to_string();
        settings.workflow.max_concurrent = 4;
        settings.workflow.poll_interval = 5;

        let config = WorkflowConfig::from_settings(&settings);
        assert_eq!(config.mem, "64GB");
        assert_eq!(config.nprocs, 32);
        assert_eq!(config.gaussian_command, "g09");
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.steps_to_execute, vec![1, 2, 3, 4, 5, 6]);
    }
}
