//! Minimal readers deciding whether a ligand structure file can be parsed
//!
//! Only the parts needed to accept or reject an input are read: the header and
//! counts line of an MDL Molfile/SDF record, or the molecule and atom sections of
//! a Tripos MOL2 record. Chemistry is left to the external preparation tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tripos record header, also the record boundary of multi-molecule MOL2 files
pub const MOL2_MOLECULE_TAG: &str = "@<TRIPOS>MOLECULE";
const MOL2_ATOM_TAG: &str = "@<TRIPOS>ATOM";
const MOL2_SECTION_PREFIX: &str = "@<TRIPOS>";

/// Errors raised when a ligand cannot be read
#[derive(Error, Debug)]
pub enum StructureReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read ligand file {}: {reason}", .path.display())]
    Unparseable { path: PathBuf, reason: String },
}

/// Structure formats accepted as ligand input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureFormat {
    Mol2,
    Sdf,
    Mol,
}

impl StructureFormat {
    /// Guess the format from the file extension (case-insensitive)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mol2" => Some(StructureFormat::Mol2),
            "sdf" => Some(StructureFormat::Sdf),
            "mol" => Some(StructureFormat::Mol),
            _ => None,
        }
    }

    fn is_mdl(&self) -> bool {
        matches!(self, StructureFormat::Sdf | StructureFormat::Mol)
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            StructureFormat::Mol2 => "mol2",
            StructureFormat::Sdf => "sdf",
            StructureFormat::Mol => "mol",
        };
        write!(f, "{}", name)
    }
}

/// What was learned about a structure while checking it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureSummary {
    /// Format the file was successfully read as
    pub format: StructureFormat,

    /// Molecule name from the header, possibly empty
    pub name: String,

    pub atom_count: usize,
}

/// Read the first record of a ligand file as Molfile/SDF or MOL2.
///
/// The format implied by the extension is tried first, the other family second,
/// so a mislabeled file is still accepted.
pub fn read_structure<P: AsRef<Path>>(path: P) -> Result<StructureSummary, StructureReadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;

    let mdl_first = StructureFormat::from_path(path).map_or(true, |f| f.is_mdl());
    let mdl_format = match StructureFormat::from_path(path) {
        Some(StructureFormat::Mol) => StructureFormat::Mol,
        _ => StructureFormat::Sdf,
    };

    type Parser = fn(&str) -> Result<(String, usize), String>;
    let attempts: [(StructureFormat, Parser); 2] = if mdl_first {
        [(mdl_format, parse_molfile), (StructureFormat::Mol2, parse_mol2)]
    } else {
        [(StructureFormat::Mol2, parse_mol2), (mdl_format, parse_molfile)]
    };

    let mut reasons = Vec::with_capacity(attempts.len());
    for (format, parse) in attempts {
        match parse(&text) {
            Ok((name, atom_count)) => {
                return Ok(StructureSummary {
                    format,
                    name,
                    atom_count,
                })
            }
            Err(reason) => reasons.push(format!("as {}: {}", format, reason)),
        }
    }

    Err(StructureReadError::Unparseable {
        path: path.to_path_buf(),
        reason: reasons.join("; "),
    })
}

/// Parse the first MDL record, returning its name and atom count
fn parse_molfile(text: &str) -> Result<(String, usize), String> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 4 {
        return Err("missing header block".to_string());
    }

    let name = lines[0].trim().to_string();
    let counts = lines[3];

    if counts.contains("V3000") {
        let atom_count = lines
            .iter()
            .find(|line| line.starts_with("M  V30 COUNTS"))
            .and_then(|line| line.split_whitespace().nth(3))
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| "missing V3000 COUNTS line".to_string())?;
        if atom_count == 0 {
            return Err("no atoms".to_string());
        }
        return Ok((name, atom_count));
    }

    let atom_count = counts
        .get(0..3)
        .and_then(|field| field.trim().parse::<usize>().ok())
        .or_else(|| counts.split_whitespace().next()?.parse().ok())
        .ok_or_else(|| format!("invalid counts line: {}", counts.trim()))?;
    if atom_count == 0 {
        return Err("no atoms".to_string());
    }

    let block_end = 4usize
        .checked_add(atom_count)
        .ok_or_else(|| format!("implausible atom count: {}", atom_count))?;
    let atom_block = lines.get(4..block_end).ok_or_else(|| {
        format!(
            "atom block truncated: expected {} atoms, found {} lines",
            atom_count,
            lines.len() - 4
        )
    })?;

    for (i, line) in atom_block.iter().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let coords_ok = fields.len() >= 4 && fields[..3].iter().all(|v| v.parse::<f64>().is_ok());
        if !coords_ok {
            return Err(format!("invalid atom line {}: {}", i + 5, line.trim()));
        }
    }

    Ok((name, atom_count))
}

/// Parse the first MOL2 molecule, returning its name and atom count
fn parse_mol2(text: &str) -> Result<(String, usize), String> {
    let mut lines = text.lines();

    lines
        .by_ref()
        .find(|line| line.starts_with(MOL2_MOLECULE_TAG))
        .ok_or_else(|| format!("missing {} section", MOL2_MOLECULE_TAG))?;
    let name = lines.next().unwrap_or_default().trim().to_string();

    lines
        .by_ref()
        .find(|line| line.starts_with(MOL2_ATOM_TAG))
        .ok_or_else(|| format!("missing {} section", MOL2_ATOM_TAG))?;

    let mut atom_count = 0;
    for line in lines {
        if line.starts_with(MOL2_SECTION_PREFIX) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let coords_ok = fields.len() >= 6 && fields[2..5].iter().all(|v| v.parse::<f64>().is_ok());
        if !coords_ok {
            return Err(format!("invalid atom line: {}", line.trim()));
        }
        atom_count += 1;
    }

    if atom_count == 0 {
        return Err("no atoms".to_string());
    }

    Ok((name, atom_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const METHANOL_SDF: &str = "\
methanol
  test

  2  1  0  0  0  0  0  0  0  0999 V2000
   -0.3690    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    0.9900    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
M  END
$$$$
";

    const METHANOL_MOL2: &str = "\
@<TRIPOS>MOLECULE
ZINC0001
 2 1 1 0 0
SMALL
NO_CHARGES

@<TRIPOS>ATOM
      1 C1         -0.3690    0.0000    0.0000 C.3     1  LIG1        0.0000
      2 O1          0.9900    0.0000    0.0000 O.3     1  LIG1        0.0000
@<TRIPOS>BOND
     1     1     2    1
";

    #[test]
    fn test_format_from_extension() {
        assert_eq!(StructureFormat::from_path("a.MOL2"), Some(StructureFormat::Mol2));
        assert_eq!(StructureFormat::from_path("a.sdf"), Some(StructureFormat::Sdf));
        assert_eq!(StructureFormat::from_path("a.mol"), Some(StructureFormat::Mol));
        assert_eq!(StructureFormat::from_path("a.pdb"), None);
    }

    #[test]
    fn test_read_sdf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("methanol.sdf");
        fs::write(&path, METHANOL_SDF).unwrap();

        let summary = read_structure(&path).unwrap();
        assert_eq!(summary.format, StructureFormat::Sdf);
        assert_eq!(summary.name, "methanol");
        assert_eq!(summary.atom_count, 2);
    }

    #[test]
    fn test_read_mol2() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ZINC0001.mol2");
        fs::write(&path, METHANOL_MOL2).unwrap();

        let summary = read_structure(&path).unwrap();
        assert_eq!(summary.format, StructureFormat::Mol2);
        assert_eq!(summary.name, "ZINC0001");
        assert_eq!(summary.atom_count, 2);
    }

    #[test]
    fn test_mislabeled_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actually_mol2.sdf");
        fs::write(&path, METHANOL_MOL2).unwrap();

        let summary = read_structure(&path).unwrap();
        assert_eq!(summary.format, StructureFormat::Mol2);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.sdf");
        fs::write(&path, "this is not\na molecule\n").unwrap();

        match read_structure(&path) {
            Err(StructureReadError::Unparseable { path: p, reason }) => {
                assert_eq!(p, path);
                assert!(reason.contains("as sdf"));
                assert!(reason.contains("as mol2"));
            }
            other => panic!("expected Unparseable, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_atom_block() {
        let truncated: String = METHANOL_SDF.lines().take(5).collect::<Vec<_>>().join("\n");
        assert!(parse_molfile(&truncated).is_err());
    }

    #[test]
    fn test_huge_atom_count_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.sdf");
        fs::write(&path, "huge\n\n\n\t\t\t18446744073709551612 0\nM  END\n$$$$\n").unwrap();

        match read_structure(&path) {
            Err(StructureReadError::Unparseable { reason, .. }) => {
                assert!(reason.contains("implausible atom count"));
            }
            other => panic!("expected Unparseable, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_structure(dir.path().join("absent.sdf")),
            Err(StructureReadError::Io(_))
        ));
    }
}
