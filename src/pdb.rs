//! Inserts XYZ geometries into a template PDB file.
//!
//! The template provides residue names, atom names and connectivity; only
//! the coordinate columns of its `ATOM`/`HETATM` records are replaced. Every
//! frame of a multi-frame XYZ file becomes one `<prefix>_<k>.pdb`.

use crate::geometry::Geometry;
use crate::io::read_xyz_frames;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDB has {pdb} atom records but the geometry has {xyz} atoms")]
    AtomCountMismatch { pdb: usize, xyz: usize },
}

// 0-based columns of x, y and z (PDB columns 31-54)
const COORD_START: usize = 30;
const COORD_END: usize = 54;

fn is_atom_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

/// Replaces the coordinates of every atom record in `pdb` with `geometry`.
///
/// ```
/// use autogauss::geometry::Geometry;
/// use autogauss::pdb::insert_geometry;
///
/// let pdb = "HETATM    1  O   HOH A   1       0.000   0.000   0.000  1.00  0.00           O\nEND\n";
/// let geometry = Geometry::new(vec!["O".into()], vec![1.0, -2.5, 10.25]);
/// let out = insert_geometry(pdb, &geometry).unwrap();
/// assert_eq!(&out[30..54], "   1.000  -2.500  10.250");
/// assert!(out.ends_with("O\nEND\n"));
/// ```
pub fn insert_geometry(pdb: &str, geometry: &Geometry) -> Result<String, PdbError> {
    let atom_records = pdb.lines().filter(|l| is_atom_record(l)).count();
    if atom_records != geometry.num_atoms {
        return Err(PdbError::AtomCountMismatch {
            pdb: atom_records,
            xyz: geometry.num_atoms,
        });
    }

    let mut output = String::with_capacity(pdb.len());
    let mut atom = 0;

    for line in pdb.split_inclusive('\n') {
        if !is_atom_record(line) {
            output.push_str(line);
            continue;
        }

        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];

        let mut chars: Vec<char> = body.chars().collect();
        if chars.len() < COORD_END {
            chars.resize(COORD_END, ' ');
        }
        let [x, y, z] = geometry.get_atom_coords(atom);
        let coords = format!("{:8.3}{:8.3}{:8.3}", x, y, z);
        chars.splice(COORD_START..COORD_END, coords.chars());

        output.extend(chars);
        output.push_str(ending);
        atom += 1;
    }

    Ok(output)
}

/// Writes one PDB per frame of `xyz_path`, using `pdb_path` as the template.
///
/// Frames that cannot be read, or whose atom count does not match the
/// template, are skipped with a warning; their number is not reused.
/// Returns the files written.
pub fn convert_frames(xyz_path: &Path, pdb_path: &Path, prefix: &str) -> Result<Vec<PathBuf>, PdbError> {
    let frames = read_xyz_frames(&fs::read_to_string(xyz_path)?);
    let template = fs::read_to_string(pdb_path)?;
    let mut written = Vec::new();

    for (idx, frame) in frames.iter().enumerate() {
        let k = idx + 1;
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping frame {}: {}", k, e);
                continue;
            }
        };
        match insert_geometry(&template, frame) {
            Ok(content) => {
                let path = PathBuf::from(format!("{}_{}.pdb", prefix, k));
                fs::write(&path, content)?;
                info!("Generated: {}", path.display());
                written.push(path);
            }
            Err(PdbError::AtomCountMismatch { pdb, xyz }) => {
                warn!(
                    "Skipping frame {}: PDB has {} atoms, frame has {}",
                    k, pdb, xyz
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(written)
}
