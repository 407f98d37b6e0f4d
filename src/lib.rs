//! AutoGauss - Multi-step Gaussian workflow automation
//!
//! AutoGauss runs a fixed pipeline of Gaussian calculations for every
//! molecule in an input folder and collects results from the logs they
//! produce.
//!
//! # Overview
//!
//! The built-in sequence computes absorption and emission in solvent, for
//! every molecule:
//!
//! 1. ground-state optimisation and frequencies,
//! 2. vertical excitations,
//! 3. state-specific (corrected linear response) solvation of S1,
//! 4. S1 optimisation and frequencies,
//! 5. non-equilibrium solvation of the relaxed S1,
//! 6. ground state at the S1 geometry with that saved solvation.
//!
//! Each stage starts from the previous stage's checkpoint (`Geom=Check
//! Guess=Read`), so only the first stage carries the geometry. Gaussian is
//! driven as a black box: input files are written, `g16 < input > log` is
//! launched in the stage folder, and completion is detected by polling the
//! log for `Normal termination` / `Error termination`.
//!
//! # Features
//!
//! - **Sources**: `.xyz`, `.com`/`.gjf` and `.chk` molecule files
//! - **Concurrency**: several molecules at once on a fixed thread pool
//! - **Failure isolation**: a failed molecule does not stop the others
//! - **Restart**: finished stages are recorded and skipped on rerun
//! - **Analysis tools**: log search, ESP charge statistics, imaginary
//!   frequency check, Boltzmann populations, XYZ to PDB conversion
//!
//! # Quick Start
//!
//! ```no_run
//! use autogauss::config::WorkflowConfig;
//! use autogauss::parser::parse_workflow;
//! use autogauss::pipeline::run_workflow;
//! use autogauss::qm_interface::GaussianInterface;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = parse_workflow(Path::new("workflow.inp"), WorkflowConfig::default())?;
//!     let gaussian = GaussianInterface::new(&config.gaussian_command);
//!     let summary = run_workflow(&config, &gaussian)?;
//!     println!("{} of {} molecules completed", summary.completed, summary.total);
//!     Ok(())
//! }
//! ```
//!
//! # Output Layout
//!
//! ```text
//! output/
//!     workflow_summary.json
//!     energies.csv
//!     <molecule>/
//!         bases/<molecule>.cmxyz
//!         step1/<molecule>.com, .chk, .log
//!         ...
//!         progress.json
//! ```

/// Boltzmann population analysis
pub mod boltzmann;
pub mod config;
/// ESP charge extraction and statistics
pub mod esp;
/// Directory traversal for the analysis tools
pub mod explore;
/// Imaginary frequency check
pub mod frequencies;
pub mod geometry;
/// Built-in help system
pub mod help;
pub mod io;
/// Completion polling of running calculations
pub mod monitor;
/// Per-molecule file naming
pub mod naming;
pub mod parser;
/// XYZ frames into PDB templates
pub mod pdb;
pub mod pipeline;
/// Restart bookkeeping
pub mod progress;
pub mod qm_interface;
/// Log text search
pub mod search;
/// Configuration management system
pub mod settings;
/// Workflow file templates
pub mod template_generator;
/// Workflow validation and guidance
pub mod validation;

pub use config::WorkflowConfig;
pub use geometry::Geometry;
