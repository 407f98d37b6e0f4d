//! File naming for one molecule's workflow tree.
//!
//! Every file a molecule produces lives under its own folder, so several
//! molecules can run side by side in the same output directory:
//!
//! ```text
//! output/<name>/
//!     bases/<name>.cmxyz
//!     bases/<name>.chk          (checkpoint sources only)
//!     step1/<name>.com
//!     step1/<name>.chk
//!     step1/<name>.log
//!     step2/...
//!     progress.json
//! ```
//!
//! # Example
//!
//! ```
//! use autogauss::naming::JobNaming;
//! use std::path::Path;
//!
//! let naming = JobNaming::new("output/coumarin", "coumarin", "com", "log");
//! assert_eq!(naming.step_input(2), Path::new("output/coumarin/step2/coumarin.com"));
//! assert_eq!(naming.chk_file_name(), "coumarin.chk");
//! ```

use std::path::PathBuf;

/// Builds every path under a molecule's folder.
#[derive(Debug, Clone)]
pub struct JobNaming {
    molecule_dir: PathBuf,
    name: String,
    input_ext: String,
    output_ext: String,
}

impl JobNaming {
    /// Creates the naming scheme for `name` rooted at `molecule_dir`.
    pub fn new<P: Into<PathBuf>>(molecule_dir: P, name: &str, input_ext: &str, output_ext: &str) -> Self {
        Self {
            molecule_dir: molecule_dir.into(),
            name: name.to_string(),
            input_ext: input_ext.to_string(),
            output_ext: output_ext.to_string(),
        }
    }

    /// Folder holding the seed files
    pub fn bases_dir(&self) -> PathBuf {
        self.molecule_dir.join("bases")
    }

    /// `bases/<name>.cmxyz`
    pub fn seed_cmxyz(&self) -> PathBuf {
        self.bases_dir().join(format!("{}.cmxyz", self.name))
    }

    /// `bases/<name>.chk`
    pub fn seed_chk(&self) -> PathBuf {
        self.bases_dir().join(self.chk_file_name())
    }

    /// `step<N>/`
    pub fn step_dir(&self, step: usize) -> PathBuf {
        self.molecule_dir.join(format!("step{}", step))
    }

    /// `step<N>/<name>.<input_ext>`
    pub fn step_input(&self, step: usize) -> PathBuf {
        self.step_dir(step)
            .join(format!("{}.{}", self.name, self.input_ext))
    }

    /// `step<N>/<name>.chk`
    pub fn step_chk(&self, step: usize) -> PathBuf {
        self.step_dir(step).join(self.chk_file_name())
    }

    /// `step<N>/<name>.<output_ext>`
    pub fn step_log(&self, step: usize) -> PathBuf {
        self.step_dir(step)
            .join(format!("{}.{}", self.name, self.output_ext))
    }

    /// Checkpoint file name as written in `%Chk=`; relative to the step folder
    pub fn chk_file_name(&self) -> String {
        format!("{}.chk", self.name)
    }

    /// `progress.json`
    pub fn progress_file(&self) -> PathBuf {
        self.molecule_dir.join("progress.json")
    }
}
