//! Core geometry and molecule seed data structures.
//!
//! This module provides the fundamental data types passed between the
//! workflow pipeline and the analysis tools:
//!
//! - [`Geometry`]: Molecular structure with element types and Cartesian coordinates
//! - [`MoleculeSeed`]: Everything the first pipeline stage needs to start a molecule
//! - [`SourceFormat`]: The kind of file a molecule was read from
//!
//! Coordinates are kept in Angstroms, exactly as they appear in the source files.

use crate::parser::ParseError;
use nalgebra::DVector;
use std::path::{Path, PathBuf};

/// Represents a molecular geometry with atomic elements and Cartesian coordinates.
///
/// Coordinates are stored flat, in the order [x1, y1, z1, x2, y2, z2, ...],
/// inside a `DVector<f64>`.
///
/// # Examples
///
/// ```
/// use autogauss::geometry::Geometry;
///
/// let elements = vec!["O".to_string(), "H".to_string(), "H".to_string()];
/// let coords = vec![
///     0.0, 0.0, 0.0,
///     0.757, 0.586, 0.0,
///     -0.757, 0.586, 0.0,
/// ];
///
/// let geometry = Geometry::new(elements, coords);
/// assert_eq!(geometry.num_atoms, 3);
/// assert_eq!(geometry.get_atom_coords(1), [0.757, 0.586, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Chemical element symbols for each atom in order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates [x1, y1, z1, x2, y2, z2, ...] in Angstroms
    pub coords: DVector<f64>,
    /// Number of atoms in the molecule
    pub num_atoms: usize,
}

impl Geometry {
    /// Create a new `Geometry` from element list and coordinate vector.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
        }
    }

    /// Get the Cartesian coordinates `[x, y, z]` of a specific atom (zero-based).
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// Returns `true` if every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }
}

/// The kind of file a molecule enters the workflow from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Gaussian checkpoint (`.chk`), copied verbatim and read with `Geom=Check`
    Checkpoint,
    /// Plain XYZ file; charge and multiplicity come from the workflow defaults
    Xyz,
    /// Gaussian input file (`.com` or `.gjf`) carrying its own charge and multiplicity
    GaussianInput,
}

impl SourceFormat {
    /// Determines the source format from a file extension.
    ///
    /// ```
    /// use autogauss::geometry::SourceFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(SourceFormat::from_path(Path::new("a.xyz")).unwrap(), SourceFormat::Xyz);
    /// assert_eq!(SourceFormat::from_path(Path::new("a.gjf")).unwrap(), SourceFormat::GaussianInput);
    /// assert!(SourceFormat::from_path(Path::new("a.mol2")).is_err());
    /// ```
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "chk" => Ok(SourceFormat::Checkpoint),
            "xyz" => Ok(SourceFormat::Xyz),
            "com" | "gjf" => Ok(SourceFormat::GaussianInput),
            _ => Err(ParseError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Starting point for one molecule's pipeline.
///
/// The geometry block is kept as verbatim text rather than as a [`Geometry`]
/// so that anything Gaussian expects after the coordinates (connectivity for
/// `Geom=Connectivity`, ModRedundant lines, ...) reaches the first stage untouched.
#[derive(Debug, Clone)]
pub struct MoleculeSeed {
    /// Molecule name, taken from the source file stem
    pub name: String,
    /// Total molecular charge
    pub charge: i32,
    /// Spin multiplicity (2S+1)
    pub multiplicity: u32,
    /// Geometry block to place after the charge/multiplicity line
    pub geometry: Option<String>,
    /// Checkpoint file the first stage should start from
    pub checkpoint: Option<PathBuf>,
    /// Format of the file this seed was read from
    pub format: SourceFormat,
}

impl MoleculeSeed {
    /// The `charge multiplicity` line Gaussian expects after the title section.
    pub fn charge_mult_line(&self) -> String {
        format!("{} {}", self.charge, self.multiplicity)
    }

    /// Number of non-empty lines in the geometry block that look like atoms.
    pub fn atom_count(&self) -> usize {
        self.geometry
            .as_deref()
            .map(|block| {
                block
                    .lines()
                    .take_while(|l| !l.trim().is_empty())
                    .filter(|l| l.split_whitespace().count() >= 4)
                    .count()
            })
            .unwrap_or(0)
    }
}
