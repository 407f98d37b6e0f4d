//! Workflow configuration validation and user guidance.
//!
//! Validation runs once, after the settings file and the workflow file have
//! been merged and before any molecule is touched, so that a typo in the
//! memory string or a missing route line stops the run immediately instead
//! of failing every molecule one by one.
//!
//! Problems that do not make the run impossible (a later step that would
//! ignore the chained checkpoint, for example) are only reported by
//! [`provide_user_guidance`].

use crate::config::WorkflowConfig;
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::collections::HashSet;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with guidance on how to fix it.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// The step list or a route line is missing or inconsistent
    InvalidSteps,
    /// A resource setting (memory, processors, concurrency) is unusable
    InvalidResources,
    /// A molecular setting (charge, multiplicity) is unusable
    InvalidMolecule,
    /// Polling parameters are unusable
    InvalidPolling,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

lazy_static! {
    static ref MEMORY_RE: Regex = Regex::new(r"(?i)^\d+\s*(kb|mb|gb|tb|kw|mw|gw|tw)$").unwrap();
}

/// Validates a merged workflow configuration.
///
/// # Examples
///
/// ```
/// use autogauss::config::WorkflowConfig;
/// use autogauss::validation::validate_workflow;
///
/// let mut config = WorkflowConfig::default();
/// assert!(validate_workflow(&config).is_ok());
///
/// config.mem = "lots".to_string();
/// assert!(validate_workflow(&config).is_err());
/// ```
pub fn validate_workflow(config: &WorkflowConfig) -> ValidationResult<()> {
    validate_steps(config)?;
    validate_resources(config)?;

    if config.multiplicity < 1 {
        return Err(ValidationError {
            category: ErrorCategory::InvalidMolecule,
            message: "Multiplicity must be at least 1".to_string(),
            suggestion: Some("Use mult = 1 for closed-shell singlets, 2 for doublets".to_string()),
        });
    }

    if config.poll_interval.is_zero() {
        return Err(ValidationError {
            category: ErrorCategory::InvalidPolling,
            message: "poll_interval must be greater than zero".to_string(),
            suggestion: Some(
                "Gaussian jobs take minutes to hours; a poll_interval of 30-60 seconds is plenty"
                    .to_string(),
            ),
        });
    }

    Ok(())
}

fn validate_steps(config: &WorkflowConfig) -> ValidationResult<()> {
    if config.steps_to_execute.is_empty() {
        return Err(ValidationError {
            category: ErrorCategory::InvalidSteps,
            message: "No steps selected for execution".to_string(),
            suggestion: Some("Set 'steps = 1, 2, 3' in the workflow file".to_string()),
        });
    }

    let mut seen = HashSet::new();
    for &step in &config.steps_to_execute {
        if !seen.insert(step) {
            return Err(ValidationError {
                category: ErrorCategory::InvalidSteps,
                message: format!("Step {} is listed more than once", step),
                suggestion: Some("Each step runs in its own step<N> folder; list it once".to_string()),
            });
        }
        if config.command_for(step).is_none() {
            return Err(ValidationError {
                category: ErrorCategory::InvalidSteps,
                message: format!("Step {} has no route line", step),
                suggestion: Some(format!(
                    "Add '{} = # <method>/<basis> ...' to the *STEPS section",
                    step
                )),
            });
        }
    }

    Ok(())
}

fn validate_resources(config: &WorkflowConfig) -> ValidationResult<()> {
    if config.nprocs == 0 {
        return Err(ValidationError {
            category: ErrorCategory::InvalidResources,
            message: "nprocs must be greater than zero".to_string(),
            suggestion: Some("Set nprocs to the number of cores per Gaussian job".to_string()),
        });
    }

    if config.max_concurrent == 0 {
        return Err(ValidationError {
            category: ErrorCategory::InvalidResources,
            message: "max_concurrent must be greater than zero".to_string(),
            suggestion: Some(
                "max_concurrent x nprocs should not exceed the cores of the node".to_string(),
            ),
        });
    }

    if !MEMORY_RE.is_match(config.mem.trim()) {
        return Err(ValidationError {
            category: ErrorCategory::InvalidResources,
            message: format!("Invalid memory specification '{}'", config.mem),
            suggestion: Some(
                "Use an integer followed by KB, MB, GB, TB or KW, MW, GW, TW (e.g. 16GB)"
                    .to_string(),
            ),
        });
    }

    Ok(())
}

fn reads_checkpoint_geometry(route: &str) -> bool {
    let route = route.to_lowercase().replace(' ', "");
    route.contains("geom=check") || route.contains("geom=allcheck") || route.contains("geom=(check")
}

fn reads_checkpoint_guess(route: &str) -> bool {
    let route = route.to_lowercase().replace(' ', "");
    route.contains("guess=read") || route.contains("guess=(read")
}

/// Logs warnings for configurations that will run but probably not as intended.
pub fn provide_user_guidance(config: &WorkflowConfig) {
    let steps = &config.steps_to_execute;

    if steps.windows(2).any(|w| w[0] > w[1]) {
        warn!(
            "Steps {:?} are not in ascending order; checkpoints are chained in the listed order",
            steps
        );
    }

    for (position, &step) in steps.iter().enumerate() {
        let Some(route) = config.command_for(step) else {
            continue;
        };

        if position == 0 {
            if reads_checkpoint_geometry(route) {
                warn!(
                    "Step {} reads its geometry from the checkpoint; only .chk sources will have one",
                    step
                );
            }
            continue;
        }

        if !reads_checkpoint_geometry(route) {
            warn!(
                "Step {} has no Geom=Check; it will start without the geometry of step {}",
                step,
                steps[position - 1]
            );
        }
        if !reads_checkpoint_guess(route) {
            warn!(
                "Step {} has no Guess=Read; the wavefunction of step {} is not reused",
                step,
                steps[position - 1]
            );
        }
    }
}
