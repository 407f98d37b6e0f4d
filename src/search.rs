//! Text search across Gaussian logs in a directory tree.
//!
//! For every `.log` file in the searched directories the first line that
//! contains the search text is located, reading either from the top or from
//! the bottom of the file. The value reported is whatever follows the search
//! text on that line.
//!
//! ```
//! use autogauss::search::{search_log, SearchDirection};
//!
//! let log = " SCF Done:  E(RB3LYP) =  -76.40\n SCF Done:  E(RB3LYP) =  -76.41\n";
//! assert_eq!(search_log(log, "E(RB3LYP) =", SearchDirection::End), Some("-76.41".to_string()));
//! assert_eq!(search_log(log, "E(RB3LYP) =", SearchDirection::Beginning), Some("-76.40".to_string()));
//! ```

use crate::explore;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default output file written in the base directory
pub const SEARCH_RESULTS_FILE: &str = "Search_Results.txt";

/// Which end of the log the search starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Beginning,
    End,
}

impl FromStr for SearchDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginning" | "begin" | "start" => Ok(SearchDirection::Beginning),
            "end" => Ok(SearchDirection::End),
            other => Err(format!(
                "invalid search direction '{}', expected 'beginning' or 'end'",
                other
            )),
        }
    }
}

impl fmt::Display for SearchDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SearchDirection::Beginning => write!(f, "beginning"),
            SearchDirection::End => write!(f, "end"),
        }
    }
}

/// Result of searching one log.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Log path relative to the search base
    pub file: PathBuf,
    /// Text following the match, `None` if nothing was found
    pub value: Option<String>,
}

/// Finds `text` in `content` and returns what follows it on the matching line.
///
/// A match with nothing after it counts as not found.
pub fn search_log(content: &str, text: &str, direction: SearchDirection) -> Option<String> {
    let extract = |line: &str| {
        line.split_once(text)
            .map(|(_, rest)| rest.trim().to_string())
    };

    let found = match direction {
        SearchDirection::Beginning => content.lines().find_map(extract),
        SearchDirection::End => content.lines().rev().find_map(extract),
    };

    found.filter(|value| !value.is_empty())
}

/// Searches every `.log` in the subdirectories of `base`, `depth + 1` levels
/// deep. Logs directly in `base` are not searched.
pub fn search_tree(
    base: &Path,
    depth: usize,
    text: &str,
    direction: SearchDirection,
) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    for dir in explore::directories_to_depth(base, depth) {
        let logs = explore::files_with_extension(&dir, "log");
        if logs.is_empty() {
            debug!("{} does not contain log files", dir.display());
            continue;
        }
        info!("Searching in: {}", dir.display());

        for log in logs {
            let content = match fs::read(&log) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Could not read {}: {}", log.display(), e);
                    continue;
                }
            };
            let file = log.strip_prefix(base).unwrap_or(&log).to_path_buf();
            hits.push(SearchHit {
                value: search_log(&content, text, direction),
                file,
            });
        }
    }

    hits
}

/// Writes one line per searched log.
///
/// Found values are written as `<file>,<value>`, misses as
/// `<file> , <text> not found`.
pub fn write_search_results(path: &Path, hits: &[SearchHit], text: &str) -> std::io::Result<()> {
    let mut content = String::new();
    for hit in hits {
        match &hit.value {
            Some(value) => content.push_str(&format!("{},{}\n", hit.file.display(), value)),
            None => content.push_str(&format!("{} , {} not found\n", hit.file.display(), text)),
        }
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("End".parse::<SearchDirection>().unwrap(), SearchDirection::End);
        assert_eq!(
            " beginning ".parse::<SearchDirection>().unwrap(),
            SearchDirection::Beginning
        );
        assert!("middle".parse::<SearchDirection>().is_err());
    }

    #[test]
    fn test_empty_value_is_not_found() {
        assert_eq!(search_log("Dipole moment\n", "Dipole moment", SearchDirection::End), None);
        assert_eq!(search_log("nothing here\n", "Dipole", SearchDirection::End), None);
    }

    #[test]
    fn test_value_follows_first_occurrence_on_line() {
        let line = " Zero-point correction= 0.1 Zero-point correction= 0.2\n";
        assert_eq!(
            search_log(line, "Zero-point correction=", SearchDirection::Beginning),
            Some("0.1 Zero-point correction= 0.2".to_string())
        );
    }

    #[test]
    fn test_search_tree_and_results_file() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("mol1")).unwrap();
        fs::create_dir_all(base.join("mol2/deep")).unwrap();
        fs::write(base.join("mol1/a.log"), " Sum of electronic and thermal Free Energies= -100.5\n").unwrap();
        fs::write(base.join("mol2/b.log"), " nothing\n").unwrap();
        fs::write(base.join("mol2/deep/c.log"), " Sum of electronic and thermal Free Energies= -7.0\n").unwrap();
        fs::write(base.join("stray.log"), " Sum of electronic and thermal Free Energies= -1.0\n").unwrap();

        let text = "Sum of electronic and thermal Free Energies=";
        let hits = search_tree(base, 0, text, SearchDirection::End);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file, Path::new("mol1/a.log"));
        assert_eq!(hits[0].value.as_deref(), Some("-100.5"));
        assert_eq!(hits[1].value, None);

        let out = base.join(SEARCH_RESULTS_FILE);
        write_search_results(&out, &hits, text).unwrap();
        let written = fs::read_to_string(out).unwrap();
        assert_eq!(
            written,
            format!("mol1/a.log,-100.5\nmol2/b.log , {} not found\n", text)
        );

        assert_eq!(search_tree(base, 1, text, SearchDirection::End).len(), 3);
    }
}
