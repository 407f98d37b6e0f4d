//! File I/O for molecule sources, seed files and XYZ geometries.
//!
//! Molecules enter the workflow as `.xyz`, `.com`/`.gjf` or `.chk` files.
//! Each one is turned into a [`MoleculeSeed`] and recorded under the
//! molecule's `bases/` folder as a `.cmxyz` file (a `charge multiplicity`
//! line followed by the geometry block) plus, for checkpoint sources, a copy
//! of the checkpoint itself.

use crate::geometry::{Geometry, MoleculeSeed, SourceFormat};
use crate::naming::JobNaming;
use crate::parser::{ParseError, Result};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Reads a molecule source file into a seed.
///
/// Sources without their own charge and multiplicity (`.xyz`, `.chk`) use
/// `default_charge` and `default_multiplicity`.
///
/// # Errors
///
/// Returns [`ParseError::UnsupportedFormat`] for unknown extensions and
/// [`ParseError::Parse`] for malformed files.
pub fn read_seed(path: &Path, default_charge: i32, default_multiplicity: u32) -> Result<MoleculeSeed> {
    let format = SourceFormat::from_path(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("molecule")
        .to_string();

    let seed = match format {
        SourceFormat::Checkpoint => MoleculeSeed {
            name,
            charge: default_charge,
            multiplicity: default_multiplicity,
            geometry: None,
            checkpoint: Some(path.to_path_buf()),
            format,
        },
        SourceFormat::Xyz => {
            let content = fs::read_to_string(path)?;
            MoleculeSeed {
                name,
                charge: default_charge,
                multiplicity: default_multiplicity,
                geometry: Some(parse_xyz_source(&content)?),
                checkpoint: None,
                format,
            }
        }
        SourceFormat::GaussianInput => {
            let content = fs::read_to_string(path)?;
            let (charge, multiplicity, geometry) = parse_gaussian_input(&content)?;
            MoleculeSeed {
                name,
                charge,
                multiplicity,
                geometry: Some(geometry),
                checkpoint: None,
                format,
            }
        }
    };

    debug!(
        "Read {} ({:?}): charge {}, multiplicity {}, {} atoms",
        path.display(),
        seed.format,
        seed.charge,
        seed.multiplicity,
        seed.atom_count()
    );
    Ok(seed)
}

/// Extracts the geometry block of an XYZ file (everything after the count and comment lines).
pub fn parse_xyz_source(content: &str) -> Result<String> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 3 {
        return Err(ParseError::Parse(
            "Invalid XYZ file: not enough lines".into(),
        ));
    }

    let declared: Option<usize> = lines[0].trim().parse().ok();
    let block = normalise_block(&lines[2..]);
    let found = block.lines().filter(|l| !l.trim().is_empty()).count();

    match declared {
        Some(n) if n != found => warn!(
            "XYZ header declares {} atoms but {} coordinate lines follow",
            n, found
        ),
        None => warn!("XYZ file has no atom count on its first line"),
        _ => {}
    }

    if found == 0 {
        return Err(ParseError::Parse("Invalid XYZ file: no atoms".into()));
    }
    Ok(block)
}

/// Splits a Gaussian input file into charge, multiplicity and the verbatim
/// block that follows the charge/multiplicity line.
///
/// Link0 commands (`%...`), the route section and the title section are
/// skipped; route and title each end at the first blank line.
///
/// ```
/// use autogauss::io::parse_gaussian_input;
///
/// let gjf = "%chk=water.chk\n%mem=1GB\n# HF/STO-3G\n\nwater\n\n0 1\nO 0.0 0.0 0.0\nH 0.0 0.7 0.5\n\n";
/// let (charge, mult, geometry) = parse_gaussian_input(gjf).unwrap();
/// assert_eq!((charge, mult), (0, 1));
/// assert!(geometry.starts_with("O 0.0"));
/// ```
pub fn parse_gaussian_input(content: &str) -> Result<(i32, u32, String)> {
    let lines: Vec<&str> = content.lines().collect();
    let is_blank = |i: usize| lines[i].trim().is_empty();
    let mut i = 0;

    // Link0 section
    while i < lines.len() && (lines[i].trim_start().starts_with('%') || is_blank(i)) {
        i += 1;
    }

    if i >= lines.len() || !lines[i].trim_start().starts_with('#') {
        return Err(ParseError::Parse(
            "Gaussian input has no route section".into(),
        ));
    }

    // Route section, then title section, each closed by a blank line
    for section in ["route", "title"] {
        while i < lines.len() && !is_blank(i) {
            i += 1;
        }
        if i >= lines.len() {
            return Err(ParseError::Parse(format!(
                "Gaussian input ends inside the {} section",
                section
            )));
        }
        i += 1;
    }

    let charge_line = lines
        .get(i)
        .ok_or_else(|| ParseError::Parse("Gaussian input has no charge/multiplicity line".into()))?;
    let (charge, multiplicity) = parse_charge_mult(charge_line)?;

    Ok((charge, multiplicity, normalise_block(&lines[i + 1..])))
}

fn parse_charge_mult(line: &str) -> Result<(i32, u32)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(ParseError::Parse(format!(
            "Invalid charge/multiplicity line: '{}'",
            line.trim()
        )));
    }
    let charge = parts[0]
        .parse()
        .map_err(|_| ParseError::Parse(format!("Invalid charge: '{}'", parts[0])))?;
    let multiplicity = parts[1]
        .parse()
        .map_err(|_| ParseError::Parse(format!("Invalid multiplicity: '{}'", parts[1])))?;
    Ok((charge, multiplicity))
}

/// Joins lines back into a block without trailing blank lines, newline-terminated.
fn normalise_block(lines: &[&str]) -> String {
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |p| p + 1);
    let mut block = lines[..end].join("\n");
    if !block.is_empty() {
        block.push('\n');
    }
    block
}

/// Writes the seed into the molecule's `bases/` folder.
///
/// The `.cmxyz` file always gets the `charge multiplicity` line; checkpoint
/// sources are additionally copied to `bases/<name>.chk`.
pub fn write_seed(seed: &MoleculeSeed, naming: &JobNaming) -> Result<()> {
    fs::create_dir_all(naming.bases_dir())?;

    if let Some(chk) = &seed.checkpoint {
        fs::copy(chk, naming.seed_chk())?;
    }

    let mut content = seed.charge_mult_line();
    content.push('\n');
    if let Some(geometry) = &seed.geometry {
        content.push_str(geometry);
    }
    fs::write(naming.seed_cmxyz(), content)?;
    Ok(())
}

/// Writes a molecular geometry to an XYZ file.
///
/// ```
/// use autogauss::geometry::Geometry;
/// use autogauss::io;
///
/// let geometry = Geometry::new(vec!["C".to_string(), "H".to_string()], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
/// let dir = std::env::temp_dir().join("autogauss_write_xyz_doc.xyz");
/// io::write_xyz(&geometry, &dir, "CH").unwrap();
/// std::fs::remove_file(&dir).unwrap();
/// ```
pub fn write_xyz(geom: &Geometry, path: &Path, comment: &str) -> std::io::Result<()> {
    let mut content = format!("{}\n{}\n", geom.num_atoms, comment);

    for i in 0..geom.num_atoms {
        let coords = geom.get_atom_coords(i);
        content.push_str(&format!(
            "{}  {:.8}  {:.8}  {:.8}\n",
            geom.elements[i], coords[0], coords[1], coords[2]
        ));
    }

    fs::write(path, content)
}

/// Reads every frame of a (multi-frame) XYZ file.
///
/// Frames keep their position in the file: a frame whose coordinates cannot
/// be read is returned as an `Err` in its slot. A line where an atom count
/// is expected but cannot be parsed is skipped with a warning; a final frame
/// with fewer lines than declared is dropped.
pub fn read_xyz_frames(content: &str) -> Vec<Result<Geometry>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut frames = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }

        let num_atoms: usize = match lines[i].trim().parse() {
            Ok(n) => n,
            Err(_) => {
                warn!("Skipping invalid line {} in XYZ file", i + 1);
                i += 1;
                continue;
            }
        };

        let start = i + 2;
        let end = start + num_atoms;
        if end > lines.len() {
            warn!(
                "Frame starting at line {} declares {} atoms but the file ends early; dropped",
                i + 1,
                num_atoms
            );
            break;
        }

        frames.push(parse_atom_lines(&lines[start..end]).map_err(|e| {
            ParseError::Parse(format!("frame starting at line {}: {}", i + 1, e))
        }));
        i = end;
    }

    frames
}

fn parse_atom_lines(lines: &[&str]) -> Result<Geometry> {
    let mut elements = Vec::with_capacity(lines.len());
    let mut coords = Vec::with_capacity(lines.len() * 3);

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(ParseError::Parse(format!(
                "malformed coordinate line '{}'",
                line.trim()
            )));
        }
        elements.push(parts[0].to_string());
        for value in &parts[1..4] {
            coords.push(
                value
                    .parse()
                    .map_err(|_| ParseError::Parse(format!("invalid coordinate '{}'", value)))?,
            );
        }
    }

    let geometry = Geometry::new(elements, coords);
    if !geometry.is_finite() {
        return Err(ParseError::Parse("non-finite coordinate".to_string()));
    }
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WATER_GJF: &str = "%chk=water.chk\n%mem=2GB\n%nprocshared=4\n# opt b3lyp/6-31g(d) geom=connectivity\n\nTitle Card Required\n\n0 1\n O   0.000  0.000  0.117\n H   0.000  0.757 -0.467\n H   0.000 -0.757 -0.467\n\n 1 2 1.0 3 1.0\n 2\n 3\n\n";

    #[test]
    fn test_gaussian_input_keeps_connectivity() {
        let (charge, mult, block) = parse_gaussian_input(WATER_GJF).unwrap();
        assert_eq!(charge, 0);
        assert_eq!(mult, 1);
        assert!(block.starts_with(" O   0.000"));
        assert!(block.contains(" 1 2 1.0 3 1.0"));
        assert!(block.ends_with(" 3\n"));
    }

    #[test]
    fn test_gaussian_input_without_link0() {
        let gjf = "#p hf/sto-3g\n\nanion\n\n-1 2\nO 0 0 0\nH 0 0 1\n";
        let (charge, mult, block) = parse_gaussian_input(gjf).unwrap();
        assert_eq!((charge, mult), (-1, 2));
        assert_eq!(block.lines().count(), 2);
    }

    #[test]
    fn test_gaussian_input_missing_charge_line() {
        let gjf = "# hf/sto-3g\n\ntitle only\n";
        assert!(parse_gaussian_input(gjf).is_err());
    }

    #[test]
    fn test_xyz_source_block() {
        let xyz = "3\nwater\nO 0.0 0.0 0.0\nH 0.0 0.7 0.5\nH 0.0 -0.7 0.5\n\n\n";
        let block = parse_xyz_source(xyz).unwrap();
        assert_eq!(block, "O 0.0 0.0 0.0\nH 0.0 0.7 0.5\nH 0.0 -0.7 0.5\n");
    }

    #[test]
    fn test_read_seed_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mol.mol2");
        fs::write(&path, "whatever").unwrap();
        assert!(matches!(
            read_seed(&path, 0, 1),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_write_seed_for_checkpoint_source() {
        let dir = TempDir::new().unwrap();
        let chk = dir.path().join("dye.chk");
        fs::write(&chk, b"binary checkpoint").unwrap();

        let seed = read_seed(&chk, 1, 2).unwrap();
        assert!(seed.geometry.is_none());

        let naming = JobNaming::new(dir.path().join("out").join("dye"), "dye", "com", "log");
        write_seed(&seed, &naming).unwrap();

        assert_eq!(fs::read_to_string(naming.seed_cmxyz()).unwrap(), "1 2\n");
        assert_eq!(fs::read(naming.seed_chk()).unwrap(), b"binary checkpoint");
    }

    #[test]
    fn test_read_xyz_frames_skips_garbage_and_truncated_frame() {
        let content = "2\nframe 1\nH 0 0 0\nH 0 0 0.74\nnot-a-count\n2\nframe 2\nH 0 0 0\nH 0 0 0.80\n2\ntruncated\nH 0 0 0\n";
        let frames = read_xyz_frames(content);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_ref().unwrap().get_atom_coords(1), [0.0, 0.0, 0.80]);
    }

    #[test]
    fn test_read_xyz_frames_keeps_slot_of_unreadable_frame() {
        let content = "1
ok
O 0 0 0
1
bad
O abc 0 0
1
nan
O NaN 0 0
1
last
O 3 0 0
";
        let frames = read_xyz_frames(content);
        assert_eq!(frames.len(), 4);
        assert!(frames[0].is_ok());
        assert!(matches!(frames[1], Err(ParseError::Parse(_))));
        assert!(frames[2].is_err());
        assert_eq!(frames[3].as_ref().unwrap().get_atom_coords(0), [3.0, 0.0, 0.0]);
    }
}
