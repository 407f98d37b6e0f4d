//! Directory traversal shared by the analysis tools.
//!
//! All listings are sorted by file name so results (and the CSV files built
//! from them) come out in the same order on every run. Hidden directories
//! such as `.git` are never entered.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('.'))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ext.trim_start_matches('.')))
}

/// Subdirectories of `base` down to `depth + 1` levels below it.
///
/// `base` itself is never listed: a depth of 0 returns its immediate
/// subdirectories, 1 adds theirs, and so on.
pub fn directories_to_depth(base: &Path, depth: usize) -> Vec<PathBuf> {
    WalkDir::new(base)
        .min_depth(1)
        .max_depth(depth + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

/// Regular files directly inside `dir` with extension `ext` (case-insensitive).
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), ext))
        .map(|e| e.into_path())
        .collect()
}

/// Regular files anywhere under `base` with extension `ext`.
pub fn files_recursive(base: &Path, ext: &str) -> Vec<PathBuf> {
    WalkDir::new(base)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), ext))
        .map(|e| e.into_path())
        .collect()
}

/// Regular files directly inside `dir` that have any extension.
///
/// This is how molecule sources are discovered; unsupported extensions are
/// rejected later, per molecule.
pub fn source_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some())
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/deep/deeper")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("a/one.log"), "").unwrap();
        fs::write(root.join("b/two.LOG"), "").unwrap();
        fs::write(root.join("b/deep/deeper/three.log"), "").unwrap();
        fs::write(root.join(".git/hidden.log"), "").unwrap();
        fs::write(root.join("top.log"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("README"), "").unwrap();
        dir
    }

    #[test]
    fn test_directories_to_depth() {
        let dir = tree();
        let root = dir.path();

        assert_eq!(directories_to_depth(root, 0), vec![root.join("a"), root.join("b")]);
        assert_eq!(
            directories_to_depth(root, 1),
            vec![root.join("a"), root.join("b"), root.join("b/deep")]
        );
        assert_eq!(directories_to_depth(root, 5).len(), 4);
        assert!(!directories_to_depth(root, 5).contains(&root.to_path_buf()));
    }

    #[test]
    fn test_files_with_extension_is_flat() {
        let dir = tree();
        assert_eq!(
            files_with_extension(dir.path(), "log"),
            vec![dir.path().join("top.log")]
        );
        assert_eq!(
            files_with_extension(&dir.path().join("b"), ".log"),
            vec![dir.path().join("b/two.LOG")]
        );
    }

    #[test]
    fn test_files_recursive_skips_hidden() {
        let dir = tree();
        let found = files_recursive(dir.path(), "log");
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|p| !p.to_string_lossy().contains(".git")));
    }

    #[test]
    fn test_source_files_need_an_extension() {
        let dir = tree();
        let found = source_files(dir.path());
        assert_eq!(
            found,
            vec![dir.path().join("notes.txt"), dir.path().join("top.log")]
        );
    }
}
