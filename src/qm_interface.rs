//! Gaussian program interface for the workflow pipeline.
//!
//! Gaussian is treated as a black box. The pipeline only ever:
//!
//! - writes an input file,
//! - launches the program with that file on stdin and the log on stdout,
//! - reads the log back and looks for termination markers.
//!
//! There is no structured protocol with the program; every decision is made
//! from file presence and substring matches in the log.
//!
//! # Interface Design
//!
//! The [`QMInterface`] trait is the seam between the pipeline and the
//! program. [`GaussianInterface`] is the real implementation; tests plug in
//! fakes that write synthetic logs instead of starting a process.
//!
//! ```no_run
//! use autogauss::qm_interface::{GaussianInterface, QMInterface, StepInput};
//! use std::path::Path;
//!
//! let gaussian = GaussianInterface::new("g16");
//! let input = StepInput {
//!     chk_name: "water.chk".to_string(),
//!     mem: "4GB".to_string(),
//!     nprocs: 4,
//!     route: "# HF/STO-3G Opt".to_string(),
//!     title: "water".to_string(),
//!     charge_mult: "0 1".to_string(),
//!     geometry: Some("O 0.0 0.0 0.0\nH 0.0 0.7 0.5\nH 0.0 -0.7 0.5\n".to_string()),
//! };
//! gaussian.write_input(&input, Path::new("step1/water.com"))?;
//! let mut job = gaussian.launch(
//!     Path::new("step1/water.com"),
//!     Path::new("step1/water.log"),
//!     Path::new("step1"),
//! )?;
//! # Ok::<(), autogauss::qm_interface::QMError>(())
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use thiserror::Error;

/// Error type for QM interface operations.
#[derive(Error, Debug)]
pub enum QMError {
    /// File system or I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The program could not be started or controlled
    #[error("QM calculation failed: {0}")]
    Calculation(String),
    /// The calculation did not finish within the allowed time
    #[error("calculation still running after {0:?}")]
    Timeout(Duration),
}

/// Type alias for QM operation results
pub type Result<T> = std::result::Result<T, QMError>;

/// What a Gaussian log says about its calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    /// The log file does not exist yet
    Missing,
    /// The log exists but has no termination line yet
    Running,
    /// The last job in the log ended with `Normal termination`
    NormalTermination,
    /// The last job ended with `Error termination`, or the process died without a marker
    ErrorTermination(String),
}

impl LogStatus {
    /// `true` once the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LogStatus::NormalTermination | LogStatus::ErrorTermination(_)
        )
    }
}

lazy_static! {
    // " Normal termination of Gaussian 16 at Mon Jan  1 00:00:00 2024."
    // " Error termination via Lnk1e in /opt/g16/l9999.exe at ..."
    static ref TERMINATION_RE: Regex =
        Regex::new(r"^\s*(Normal|Error) termination").unwrap();

    // " SCF Done:  E(RB3LYP) =  -76.4089533291     A.U. after   10 cycles"
    static ref SCF_DONE_RE: Regex =
        Regex::new(r"SCF Done:\s+E\([^)]*\)\s*=\s*([-+]?\d+\.\d+(?:[eEdD][-+]?\d+)?)").unwrap();
}

/// Classifies a Gaussian log by its termination markers.
///
/// Multi-job logs (`Opt Freq`, `--Link1--`) contain one termination line
/// per job; the last one decides. Without any termination line the
/// calculation is considered still running.
///
/// ```
/// use autogauss::qm_interface::{inspect_log, LogStatus};
///
/// let log = " Leave Link  101\n Normal termination of Gaussian 16 at Mon.\n";
/// assert_eq!(inspect_log(log), LogStatus::NormalTermination);
/// assert_eq!(inspect_log(" Leave Link  101\n"), LogStatus::Running);
/// ```
pub fn inspect_log(content: &str) -> LogStatus {
    for line in content.lines().rev() {
        if let Some(caps) = TERMINATION_RE.captures(line) {
            return if &caps[1] == "Normal" {
                LogStatus::NormalTermination
            } else {
                LogStatus::ErrorTermination(line.trim().to_string())
            };
        }
    }
    LogStatus::Running
}

/// Returns the last `SCF Done` energy in a log, in Hartree.
pub fn final_scf_energy(content: &str) -> Option<f64> {
    content
        .lines()
        .rev()
        .find_map(|line| SCF_DONE_RE.captures(line))
        .and_then(|caps| caps[1].replace(['D', 'd'], "E").parse().ok())
}

/// Everything needed to render one stage's Gaussian input file.
#[derive(Debug, Clone)]
pub struct StepInput {
    /// Checkpoint file name for `%Chk=`, relative to the step folder
    pub chk_name: String,
    /// `%Mem=` value
    pub mem: String,
    /// `%NProcShared=` value
    pub nprocs: u32,
    /// Route line, including the leading `#`
    pub route: String,
    /// Title card
    pub title: String,
    /// `charge multiplicity`
    pub charge_mult: String,
    /// Geometry block; `None` when the geometry comes from the checkpoint
    pub geometry: Option<String>,
}

impl StepInput {
    /// Renders the input file text.
    ///
    /// ```
    /// use autogauss::qm_interface::StepInput;
    ///
    /// let input = StepInput {
    ///     chk_name: "mol.chk".into(),
    ///     mem: "1GB".into(),
    ///     nprocs: 2,
    ///     route: "# HF/STO-3G Geom=Check Guess=Read".into(),
    ///     title: "Title Card Required".into(),
    ///     charge_mult: "0 1".into(),
    ///     geometry: None,
    /// };
    /// assert_eq!(
    ///     input.render(),
    ///     "%Chk=mol.chk\n%Mem=1GB\n%NProcShared=2\n# HF/STO-3G Geom=Check Guess=Read\n\nTitle Card Required\n\n0 1\n\n"
    /// );
    /// ```
    pub fn render(&self) -> String {
        let mut content = String::new();
        content.push_str(&format!("%Chk={}\n", self.chk_name));
        content.push_str(&format!("%Mem={}\n", self.mem));
        content.push_str(&format!("%NProcShared={}\n", self.nprocs));
        content.push_str(&self.route);
        content.push_str("\n\n");
        content.push_str(&self.title);
        content.push_str("\n\n");
        content.push_str(&self.charge_mult);
        content.push('\n');

        if let Some(geometry) = &self.geometry {
            content.push_str(geometry);
            if !geometry.ends_with('\n') {
                content.push('\n');
            }
        }

        // Gaussian needs a blank line to close the molecule specification
        content.push('\n');
        content
    }
}

/// A calculation that has been started and may still be running.
pub trait RunningCalculation: Send {
    /// Returns `true` once the underlying process has exited. An exited
    /// process is reaped by this call.
    fn has_exited(&mut self) -> Result<bool>;

    /// Stops the calculation and waits for it. Does nothing if it has
    /// already exited.
    fn terminate(&mut self) -> Result<()>;
}

impl RunningCalculation for Child {
    fn has_exited(&mut self) -> Result<bool> {
        Ok(self.try_wait()?.is_some())
    }

    fn terminate(&mut self) -> Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        self.kill()?;
        self.wait()?;
        Ok(())
    }
}

/// Trait that defines how the pipeline talks to the quantum chemistry program.
pub trait QMInterface: Send + Sync {
    /// Writes the input file for one stage.
    fn write_input(&self, input: &StepInput, path: &Path) -> Result<()> {
        fs::write(path, input.render())?;
        Ok(())
    }

    /// Starts the calculation without waiting for it.
    ///
    /// `workdir` becomes the program's working directory, so the relative
    /// `%Chk=` name resolves inside the step folder.
    fn launch(
        &self,
        input_path: &Path,
        output_path: &Path,
        workdir: &Path,
    ) -> Result<Box<dyn RunningCalculation>>;

    /// Reads the current status of a log file.
    fn read_status(&self, output_path: &Path) -> Result<LogStatus> {
        if !output_path.exists() {
            return Ok(LogStatus::Missing);
        }
        // Logs can carry stray non-UTF-8 bytes from basis set or title text
        let bytes = fs::read(output_path)?;
        Ok(inspect_log(&String::from_utf8_lossy(&bytes)))
    }
}

/// Gaussian quantum chemistry program interface.
///
/// ```
/// use autogauss::qm_interface::GaussianInterface;
///
/// let g16 = GaussianInterface::new("g16");
/// let wrapped = GaussianInterface::new("srun --exclusive g16");
/// assert_eq!(wrapped.command, "srun --exclusive g16");
/// ```
pub struct GaussianInterface {
    /// Gaussian command to execute (e.g., "g16", "g09", "srun g16")
    pub command: String,
}

impl GaussianInterface {
    /// Creates a new Gaussian interface.
    pub fn new(command: &str) -> Self {
        Self {
            command: command.trim().to_string(),
        }
    }
}

impl QMInterface for GaussianInterface {
    fn launch(
        &self,
        input_path: &Path,
        output_path: &Path,
        workdir: &Path,
    ) -> Result<Box<dyn RunningCalculation>> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| QMError::Calculation("Gaussian command is empty".into()))?;

        // Equivalent of `g16 < input > output`
        let stdin = File::open(input_path)?;
        let stdout = File::create(output_path)?;

        let child = Command::new(program)
            .args(parts)
            .current_dir(workdir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                QMError::Calculation(format!("failed to start '{}': {}", self.command, e))
            })?;

        Ok(Box::new(child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_termination_line_wins() {
        let opt_freq = " Normal termination of Gaussian 16 at Tue.\n Link1:  Proceeding to internal job step number  2.\n Leave Link  101\n Error termination via Lnk1e in /opt/g16/l502.exe at Tue.\n";
        assert_eq!(
            inspect_log(opt_freq),
            LogStatus::ErrorTermination(
                "Error termination via Lnk1e in /opt/g16/l502.exe at Tue.".to_string()
            )
        );

        let both_ok = " Normal termination of Gaussian 16 at Tue.\n Leave Link  101\n Normal termination of Gaussian 16 at Tue.\n";
        assert_eq!(inspect_log(both_ok), LogStatus::NormalTermination);
    }

    #[test]
    fn test_unfinished_log_is_running() {
        assert_eq!(inspect_log(""), LogStatus::Running);
        assert_eq!(
            inspect_log(" Entering Link 1 = /opt/g16/l1.exe\n Leave Link    1 at Tue\n"),
            LogStatus::Running
        );
        assert!(!LogStatus::Running.is_terminal());
        assert!(LogStatus::NormalTermination.is_terminal());
    }

    #[test]
    fn test_final_scf_energy() {
        let log = " SCF Done:  E(RB3LYP) =  -76.4089533291     A.U. after   10 cycles\n SCF Done:  E(RB3LYP) =  -76.4100000000     A.U. after    6 cycles\n";
        assert_eq!(final_scf_energy(log), Some(-76.41));
        assert_eq!(final_scf_energy("no energies here"), None);
    }

    #[test]
    fn test_render_with_geometry_adds_terminating_blank_line() {
        let input = StepInput {
            chk_name: "w.chk".into(),
            mem: "16GB".into(),
            nprocs: 16,
            route: "# Opt Freq B3LYP/6-31+G(d,p)".into(),
            title: "Title Card Required".into(),
            charge_mult: "0 1".into(),
            geometry: Some("O 0 0 0\nH 0 0 1".into()),
        };
        let text = input.render();
        assert!(text.ends_with("0 1\nO 0 0 0\nH 0 0 1\n\n"));
        assert_eq!(text.matches("0 1\n").count(), 1);
    }

    #[test]
    fn test_read_status_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let g16 = GaussianInterface::new("g16");
        assert_eq!(
            g16.read_status(&dir.path().join("none.log")).unwrap(),
            LogStatus::Missing
        );
    }

    #[test]
    fn test_read_status_tolerates_non_utf8_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("mol.log");
        let mut bytes = b" Title \xe9\xff\n".to_vec();
        bytes.extend_from_slice(b" Normal termination of Gaussian 16\n");
        fs::write(&log, bytes).unwrap();
        let g16 = GaussianInterface::new("g16");
        assert_eq!(g16.read_status(&log).unwrap(), LogStatus::NormalTermination);
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_after_exit_is_a_no_op() {
        let mut child = Command::new("true").spawn().unwrap();
        while !child.has_exited().unwrap() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        child.terminate().unwrap();
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.com");
        fs::write(&input, "").unwrap();
        let blank = GaussianInterface::new("   ");
        let result = blank.launch(&input, &dir.path().join("out.log"), dir.path());
        assert!(matches!(result, Err(QMError::Calculation(_))));
    }
}
