//! Per-molecule progress record used for restarts.
//!
//! After each stage terminates normally its number is added to
//! `output/<name>/progress.json`. A restarted workflow skips the stages
//! recorded there, as long as the stage log still shows normal termination.
//!
//! ```json
//! {
//!   "molecule": "coumarin",
//!   "completed_steps": [1, 2, 3]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Stages that finished for one molecule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoleculeProgress {
    /// Molecule name
    pub molecule: String,
    /// Stage numbers that terminated normally
    pub completed_steps: BTreeSet<usize>,
}

impl MoleculeProgress {
    /// Creates an empty record for `molecule`.
    pub fn new(molecule: &str) -> Self {
        Self {
            molecule: molecule.to_string(),
            completed_steps: BTreeSet::new(),
        }
    }

    /// Marks `step` as finished.
    pub fn mark_completed(&mut self, step: usize) {
        self.completed_steps.insert(step);
    }

    /// `true` if `step` has been recorded as finished.
    pub fn is_completed(&self, step: usize) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Save progress to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    ///
    /// # Examples
    ///
    /// ```
    /// use autogauss::progress::MoleculeProgress;
    ///
    /// fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let path = std::env::temp_dir().join("autogauss_progress_doc.json");
    ///     let mut progress = MoleculeProgress::new("water");
    ///     progress.mark_completed(1);
    ///     progress.save(&path)?;
    ///
    ///     let loaded = MoleculeProgress::load(&path)?;
    ///     assert!(loaded.is_completed(1));
    ///     std::fs::remove_file(&path)?;
    ///     Ok(())
    /// }
    /// ```
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load progress from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid progress JSON.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let progress: MoleculeProgress = serde_json::from_str(&content)?;
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut progress = MoleculeProgress::new("dye");
        progress.mark_completed(3);
        progress.mark_completed(1);
        progress.mark_completed(3);
        assert_eq!(progress.completed_steps.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert!(progress.is_completed(1));
        assert!(!progress.is_completed(2));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "not json").unwrap();
        assert!(MoleculeProgress::load(&path).is_err());
    }

    #[test]
    fn test_json_layout() {
        let mut progress = MoleculeProgress::new("dye");
        progress.mark_completed(2);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["molecule"], "dye");
        assert_eq!(json["completed_steps"], serde_json::json!([2]));
    }
}
