//! Multi-stage Gaussian workflow driver.
//!
//! Each molecule found in the input directory runs the configured stages in
//! order, every stage in its own `step<N>/` folder:
//!
//! 1. the previous stage's checkpoint is copied in (checkpoint chaining), or
//!    the seed checkpoint for the first stage of a `.chk` source,
//! 2. the input file is written, with the geometry only for the first stage
//!    of a geometry seed (later stages read it with `Geom=Check`),
//! 3. Gaussian is launched and its log polled until it terminates,
//! 4. an error termination stops this molecule; the others carry on.
//!
//! Molecules run concurrently on a fixed-size thread pool of
//! `max_concurrent` workers. When the run ends a `workflow_summary.json` and
//! an `energies.csv` (last SCF energy of every completed molecule, usable
//! with the Boltzmann tool) are written to the output directory.

use crate::config::WorkflowConfig;
use crate::explore;
use crate::io;
use crate::monitor;
use crate::naming::JobNaming;
use crate::parser::ParseError;
use crate::progress::MoleculeProgress;
use crate::qm_interface::{final_scf_energy, LogStatus, QMError, QMInterface, StepInput};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Summary file written in the output directory
pub const SUMMARY_FILE: &str = "workflow_summary.json";
/// Energy table written in the output directory
pub const ENERGIES_FILE: &str = "energies.csv";

/// Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    QM(QMError),
    #[error("step {step} still running after {limit:?}")]
    Timeout { step: usize, limit: Duration },
    #[error("step {step} failed: {message}")]
    ErrorTermination { step: usize, message: String },
    #[error("no route line defined for step {0}")]
    MissingRoute(usize),
    #[error("input directory {0} does not exist")]
    InputDir(PathBuf),
    #[error("progress file error: {0}")]
    Progress(String),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("summary error: {0}")]
    Summary(String),
}

impl From<QMError> for PipelineError {
    fn from(e: QMError) -> Self {
        match e {
            QMError::Io(io) => PipelineError::Io(io),
            other => PipelineError::QM(other),
        }
    }
}

/// How a molecule's run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoleculeOutcome {
    Completed,
    /// `step` is `None` when the molecule failed before any stage started
    Failed { step: Option<usize>, reason: String },
}

/// Result of running one molecule through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoleculeReport {
    pub molecule: String,
    pub source: PathBuf,
    pub outcome: MoleculeOutcome,
    /// Stages run and terminated normally in this invocation
    pub completed_steps: Vec<usize>,
    /// Stages skipped on restart because they had already finished
    pub skipped_steps: Vec<usize>,
    /// Last SCF energy (Hartree) of the last finished stage
    pub final_energy: Option<f64>,
    pub elapsed_seconds: f64,
}

impl MoleculeReport {
    fn new(molecule: &str, source: &Path) -> Self {
        Self {
            molecule: molecule.to_string(),
            source: source.to_path_buf(),
            outcome: MoleculeOutcome::Completed,
            completed_steps: Vec::new(),
            skipped_steps: Vec::new(),
            final_energy: None,
            elapsed_seconds: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == MoleculeOutcome::Completed
    }
}

/// Result of a whole workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub molecules: Vec<MoleculeReport>,
}

impl WorkflowSummary {
    pub fn from_reports(molecules: Vec<MoleculeReport>) -> Self {
        let completed = molecules.iter().filter(|r| r.is_completed()).count();
        Self {
            total: molecules.len(),
            completed,
            failed: molecules.len() - completed,
            molecules,
        }
    }

    /// Writes the summary as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Summary(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Writes `name,energy` for every completed molecule with a known energy.
    pub fn write_energies(&self, path: &Path) -> Result<(), PipelineError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| PipelineError::Summary(e.to_string()))?;
        for report in self.molecules.iter().filter(|r| r.is_completed()) {
            if let Some(energy) = report.final_energy {
                writer
                    .write_record([report.molecule.as_str(), format!("{:.10}", energy).as_str()])
                    .map_err(|e| PipelineError::Summary(e.to_string()))?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

fn molecule_name(source: &Path) -> String {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("molecule")
        .to_string()
}

/// Runs every configured stage for one molecule source.
///
/// Never fails as a whole: any error is recorded in the returned report so
/// that one bad molecule does not stop the others.
pub fn process_molecule(
    source: &Path,
    molecule_dir: &Path,
    config: &WorkflowConfig,
    qm: &dyn QMInterface,
) -> MoleculeReport {
    let started = Instant::now();
    let name = molecule_name(source);
    let mut report = MoleculeReport::new(&name, source);
    let mut current_step = None;

    match run_steps(source, molecule_dir, config, qm, &mut report, &mut current_step) {
        Ok(()) => info!(
            "{}: all steps finished ({} run, {} skipped)",
            name,
            report.completed_steps.len(),
            report.skipped_steps.len()
        ),
        Err(e) => {
            error!("{}: {}", name, e);
            report.outcome = MoleculeOutcome::Failed {
                step: current_step,
                reason: e.to_string(),
            };
        }
    }

    report.elapsed_seconds = started.elapsed().as_secs_f64();
    report
}

fn run_steps(
    source: &Path,
    molecule_dir: &Path,
    config: &WorkflowConfig,
    qm: &dyn QMInterface,
    report: &mut MoleculeReport,
    current_step: &mut Option<usize>,
) -> Result<(), PipelineError> {
    let seed = io::read_seed(source, config.charge, config.multiplicity)?;
    let naming = JobNaming::new(
        molecule_dir,
        &seed.name,
        &config.input_extension,
        &config.output_extension,
    );
    io::write_seed(&seed, &naming)?;

    let progress_path = naming.progress_file();
    let mut progress = if config.restart && progress_path.exists() {
        MoleculeProgress::load(&progress_path).map_err(|e| PipelineError::Progress(e.to_string()))?
    } else {
        MoleculeProgress::new(&seed.name)
    };

    let mut previous: Option<usize> = None;

    for &step in &config.steps_to_execute {
        *current_step = Some(step);
        let route = config
            .command_for(step)
            .ok_or(PipelineError::MissingRoute(step))?;
        let step_dir = naming.step_dir(step);
        let log_path = naming.step_log(step);

        if config.restart
            && progress.is_completed(step)
            && qm.read_status(&log_path)? == LogStatus::NormalTermination
        {
            info!("{}: step {} already finished, skipping", seed.name, step);
            report.skipped_steps.push(step);
            report.final_energy = read_energy(&log_path).or(report.final_energy);
            previous = Some(step);
            continue;
        }

        fs::create_dir_all(&step_dir)?;

        let chk_target = naming.step_chk(step);
        match previous {
            Some(prev) => {
                let prev_chk = naming.step_chk(prev);
                if prev_chk.exists() {
                    fs::copy(&prev_chk, &chk_target)?;
                } else {
                    warn!(
                        "{}: step {} left no checkpoint, step {} starts without one",
                        seed.name, prev, step
                    );
                }
            }
            None if seed.checkpoint.is_some() => {
                fs::copy(naming.seed_chk(), &chk_target)?;
            }
            None => {}
        }

        let input = StepInput {
            chk_name: naming.chk_file_name(),
            mem: config.mem.clone(),
            nprocs: config.nprocs,
            route: route.to_string(),
            title: config.title.clone(),
            charge_mult: seed.charge_mult_line(),
            geometry: if previous.is_none() {
                seed.geometry.clone()
            } else {
                None
            },
        };
        let input_path = naming.step_input(step);
        qm.write_input(&input, &input_path)?;

        info!("{}: running step {}", seed.name, step);
        let mut job = qm.launch(&input_path, &log_path, &step_dir)?;
        let waited = monitor::wait_for_completion(
            qm,
            &log_path,
            job.as_mut(),
            config.poll_interval,
            config.poll_timeout,
        );
        if waited.is_err() {
            // No calculation outlives the molecule it belongs to
            if let Err(e) = job.terminate() {
                warn!("{}: could not stop step {}: {}", seed.name, step, e);
            }
        }
        let status = waited.map_err(|e| match e {
            QMError::Timeout(limit) => PipelineError::Timeout { step, limit },
            other => other.into(),
        })?;

        match status {
            LogStatus::NormalTermination => {
                info!("{}: step {} terminated normally", seed.name, step);
                progress.mark_completed(step);
                progress
                    .save(&progress_path)
                    .map_err(|e| PipelineError::Progress(e.to_string()))?;
                report.completed_steps.push(step);
                report.final_energy = read_energy(&log_path).or(report.final_energy);
            }
            LogStatus::ErrorTermination(message) => {
                return Err(PipelineError::ErrorTermination { step, message });
            }
            other => {
                return Err(PipelineError::ErrorTermination {
                    step,
                    message: format!("unexpected log status {:?}", other),
                });
            }
        }

        previous = Some(step);
    }

    Ok(())
}

fn duplicate_name_report(source: &Path, owner: &Path) -> MoleculeReport {
    let name = molecule_name(source);
    let reason = format!(
        "molecule name '{}' is already used by {}; rename one of the sources",
        name,
        owner.display()
    );
    error!("{}: {}", source.display(), reason);
    let mut report = MoleculeReport::new(&name, source);
    report.outcome = MoleculeOutcome::Failed { step: None, reason };
    report
}

fn read_energy(log_path: &Path) -> Option<f64> {
    let bytes = fs::read(log_path).ok()?;
    final_scf_energy(&String::from_utf8_lossy(&bytes))
}

/// Runs the workflow over every molecule source in `config.input_dir`.
pub fn run_workflow(
    config: &WorkflowConfig,
    qm: &dyn QMInterface,
) -> Result<WorkflowSummary, PipelineError> {
    if !config.input_dir.is_dir() {
        return Err(PipelineError::InputDir(config.input_dir.clone()));
    }
    fs::create_dir_all(&config.output_dir)?;

    let sources = explore::source_files(&config.input_dir);
    info!(
        "Found {} molecule source(s) in {}, running {} at a time",
        sources.len(),
        config.input_dir.display(),
        config.max_concurrent
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_concurrent.max(1))
        .build()
        .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;

    // Molecule folders are named after the source stem; the first source
    // (in sorted order) keeps a name, later ones with the same stem fail.
    let mut owners: HashMap<String, &PathBuf> = HashMap::new();
    let claimed: Vec<(&PathBuf, Option<&PathBuf>)> = sources
        .iter()
        .map(|source| {
            let owner = owners.entry(molecule_name(source)).or_insert(source);
            let clash = (*owner != source).then_some(*owner);
            (source, clash)
        })
        .collect();

    let reports: Vec<MoleculeReport> = pool.install(|| {
        claimed
            .par_iter()
            .map(|&(source, clash)| match clash {
                Some(owner) => duplicate_name_report(source, owner),
                None => {
                    let molecule_dir = config.output_dir.join(molecule_name(source));
                    process_molecule(source, &molecule_dir, config, qm)
                }
            })
            .collect()
    });

    let summary = WorkflowSummary::from_reports(reports);
    summary.save(&config.output_dir.join(SUMMARY_FILE))?;
    summary.write_energies(&config.output_dir.join(ENERGIES_FILE))?;

    info!(
        "Workflow finished: {} completed, {} failed",
        summary.completed, summary.failed
    );
    Ok(summary)
}
