//! Workflow file parsing.
//!
//! A workflow file uses the same section-plus-parameters layout as other
//! quantum chemistry drivers: route lines live in a `*STEPS` section
//! terminated by `*`, and everything else is a `key = value` parameter.
//!
//! ```text
//! *STEPS
//! 1 = # Opt Freq B3LYP/6-31+G(d,p) SCRF=(Solvent=Ethanol) Geom=Connectivity
//! 2 = # B3LYP/6-31+G(d,p) TD=NStates=6 SCRF=(Solvent=Ethanol) Geom=Check Guess=Read
//! *
//!
//! # Resources
//! mem = 16GB
//! nprocs = 16
//! steps = 1, 2
//! max_concurrent = 2
//! charge = 0
//! mult = 1
//! gaussian_comm = g16
//! poll_interval = 60
//! ```
//!
//! Outside `*STEPS`, lines starting with `#` are comments. Inside it every
//! route line starts with `#`, so only `N = ...` lines are read there.
//! Parameters not present in the file keep the value of the configuration the
//! file is layered on.

use crate::config::WorkflowConfig;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for parsing operations.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error with descriptive message
    #[error("Parse error: {0}")]
    Parse(String),
    /// The file extension is not a recognised molecule source
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Type alias for parse operation results
pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse a workflow file on top of `base`.
///
/// # Examples
///
/// ```no_run
/// use autogauss::config::WorkflowConfig;
/// use autogauss::parser::parse_workflow;
/// use std::path::Path;
///
/// let config = parse_workflow(Path::new("workflow.inp"), WorkflowConfig::default())?;
/// println!("Running steps {:?}", config.steps_to_execute);
/// # Ok::<(), autogauss::parser::ParseError>(())
/// ```
pub fn parse_workflow(path: &Path, base: WorkflowConfig) -> Result<WorkflowConfig> {
    let content = fs::read_to_string(path)?;
    parse_workflow_str(&content, base)
}

/// Parse workflow file content on top of `base`.
pub fn parse_workflow_str(content: &str, base: WorkflowConfig) -> Result<WorkflowConfig> {
    let mut config = base;
    let mut in_steps = false;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();

        if lower.starts_with("*steps") {
            in_steps = true;
            continue;
        } else if trimmed == "*" {
            in_steps = false;
            continue;
        }

        if in_steps {
            if trimmed.is_empty() {
                continue;
            }
            parse_step_line(trimmed, line_no, &mut config)?;
        } else if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        } else if trimmed.contains('=') {
            parse_parameter(trimmed, line_no, &mut config)?;
        } else {
            warn!("Ignoring unrecognised line {}: {}", line_no, trimmed);
        }
    }

    if in_steps {
        return Err(ParseError::Parse(
            "*STEPS section is not terminated with '*'".into(),
        ));
    }

    Ok(config)
}

/// Parses `N = <route line>` inside `*STEPS`.
fn parse_step_line(line: &str, line_no: usize, config: &mut WorkflowConfig) -> Result<()> {
    let (number, route) = line.split_once('=').ok_or_else(|| {
        ParseError::Parse(format!(
            "Line {}: expected 'N = <route line>' inside *STEPS, got '{}'",
            line_no, line
        ))
    })?;

    let step: usize = number.trim().parse().map_err(|_| {
        ParseError::Parse(format!(
            "Line {}: invalid step number '{}'",
            line_no,
            number.trim()
        ))
    })?;

    let route = route.trim();
    if route.is_empty() {
        return Err(ParseError::Parse(format!(
            "Line {}: step {} has an empty route line",
            line_no, step
        )));
    }

    config.step_commands.insert(step, route.to_string());
    Ok(())
}

fn parse_parameter(line: &str, line_no: usize, config: &mut WorkflowConfig) -> Result<()> {
    let (key, value) = match line.split_once('=') {
        Some((k, v)) => (k.trim().to_lowercase(), v.trim()),
        None => return Ok(()),
    };

    // Strip trailing inline comments from plain values
    let value = match value.find(" #") {
        Some(pos) => value[..pos].trim(),
        None => value,
    };

    match key.as_str() {
        "mem" | "memory" => config.mem = value.to_string(),
        "nprocs" | "nprocshared" => config.nprocs = parse_number(&key, value, line_no)?,
        "steps" => config.steps_to_execute = parse_step_list(value, line_no)?,
        "max_concurrent" | "max_concurrent_molecules" => {
            config.max_concurrent = parse_number(&key, value, line_no)?
        }
        "charge" => config.charge = parse_number(&key, value, line_no)?,
        "mult" | "multiplicity" => config.multiplicity = parse_number(&key, value, line_no)?,
        "title" => config.title = value.to_string(),
        "gaussian_comm" | "gaussian_command" => config.gaussian_command = value.to_string(),
        "input_dir" => config.input_dir = PathBuf::from(value),
        "output_dir" => config.output_dir = PathBuf::from(value),
        "input_ext" => config.input_extension = value.trim_start_matches('.').to_string(),
        "output_ext" => config.output_extension = value.trim_start_matches('.').to_string(),
        "poll_interval" => {
            config.poll_interval = Duration::from_secs(parse_number(&key, value, line_no)?)
        }
        "poll_timeout" => {
            let secs: u64 = parse_number(&key, value, line_no)?;
            config.poll_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        "restart" => config.restart = parse_bool(&key, value, line_no)?,
        _ => warn!("Line {}: unknown parameter '{}' ignored", line_no, key),
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value.parse().map_err(|_| {
        ParseError::Parse(format!(
            "Line {}: invalid value '{}' for {}",
            line_no, value, key
        ))
    })
}

fn parse_bool(key: &str, value: &str, line_no: usize) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ParseError::Parse(format!(
            "Line {}: invalid boolean '{}' for {}",
            line_no, value, key
        ))),
    }
}

/// Parses a step list such as `1, 2, 3`, `1 2 3` or `[1, 2, 3]`.
fn parse_step_list(value: &str, line_no: usize) -> Result<Vec<usize>> {
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| {
                ParseError::Parse(format!("Line {}: invalid step '{}' in steps", line_no, s))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_override_base() {
        let content = "mem = 8GB\nnprocs = 4\nsteps = [1, 2]\ncharge = -1\nmult = 2\npoll_interval = 5\n";
        let config = parse_workflow_str(content, WorkflowConfig::default()).unwrap();
        assert_eq!(config.mem, "8GB");
        assert_eq!(config.nprocs, 4);
        assert_eq!(config.steps_to_execute, vec![1, 2]);
        assert_eq!(config.charge, -1);
        assert_eq!(config.multiplicity, 2);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_concurrent, 2);
    }

    #[test]
    fn test_steps_section_keeps_hash_routes() {
        let content = "*STEPS\n1 = # HF/STO-3G Opt\n7 = # B3LYP/def2SVP Geom=Check Guess=Read\n*\n# comment\nsteps = 1 7\n";
        let config = parse_workflow_str(content, WorkflowConfig::default()).unwrap();
        assert_eq!(config.command_for(1), Some("# HF/STO-3G Opt"));
        assert_eq!(
            config.command_for(7),
            Some("# B3LYP/def2SVP Geom=Check Guess=Read")
        );
        // untouched defaults remain available
        assert!(config.command_for(2).is_some());
        assert_eq!(config.steps_to_execute, vec![1, 7]);
    }

    #[test]
    fn test_poll_timeout_zero_means_none() {
        let config =
            parse_workflow_str("poll_timeout = 0\n", WorkflowConfig::default()).unwrap();
        assert!(config.poll_timeout.is_none());

        let config =
            parse_workflow_str("poll_timeout = 3600\n", WorkflowConfig::default()).unwrap();
        assert_eq!(config.poll_timeout, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_invalid_value_names_key() {
        let err = parse_workflow_str("nprocs = many\n", WorkflowConfig::default()).unwrap_err();
        assert!(err.to_string().contains("nprocs"));
    }

    #[test]
    fn test_unterminated_steps_section() {
        let result = parse_workflow_str("*STEPS\n1 = # HF/STO-3G\n", WorkflowConfig::default());
        assert!(result.is_err());
    }
}
