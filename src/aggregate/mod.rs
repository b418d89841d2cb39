//! Collection and ranking of docking scores from Vina result artifacts

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::discovery::LigandSource;
use crate::layout::RESULT_SUFFIX;

/// Remark carrying the energy of a pose, best pose first
pub const SCORE_MARKER: &str = "REMARK VINA RESULT";

/// Whitespace token index of the energy on a score line
const SCORE_TOKEN: usize = 3;

/// Identifier prefix used by ZINC libraries
pub const DEFAULT_ID_PREFIX: &str = "ZINC";

/// Identifier reported when an artifact names no molecule
pub const UNKNOWN_IDENTIFIER: &str = "Unknown";

/// Errors for a single result artifact
#[derive(Error, Debug)]
pub enum ArtifactParseError {
    #[error("Error reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid energy in {} at line {line}: {text}", .path.display())]
    InvalidScore {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("Could not extract energy from {}", .path.display())]
    MissingScore { path: PathBuf },
}

/// Errors that stop an aggregation
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Best score of one docking result
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactScore {
    pub identifier: String,
    pub path: PathBuf,
    /// Best binding energy in kcal/mol
    pub energy: f64,
}

impl ArtifactScore {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Ordering of the ranked report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankOrder {
    /// Most negative energy (strongest predicted binding) first
    #[default]
    StrongestFirst,

    /// Descending energy, weakest binding first
    WeakestFirst,
}

impl RankOrder {
    fn compare(&self, a: &ArtifactScore, b: &ArtifactScore) -> Ordering {
        let by_energy = match self {
            RankOrder::StrongestFirst => a.energy.total_cmp(&b.energy),
            RankOrder::WeakestFirst => b.energy.total_cmp(&a.energy),
        };
        by_energy.then_with(|| a.file_name().cmp(&b.file_name()))
    }
}

/// Scan one artifact for its first score line and first identifier remark.
/// Reading stops as soon as both are known.
pub fn scan_artifact<P: AsRef<Path>>(
    path: P,
    id_prefix: &str,
) -> Result<ArtifactScore, ArtifactParseError> {
    let path = path.as_ref();
    let read_err = |source| ArtifactParseError::Read {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(read_err)?);

    let mut energy = None;
    let mut identifier = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(read_err)?;

        if energy.is_none() && line.starts_with(SCORE_MARKER) {
            let value = line
                .split_whitespace()
                .nth(SCORE_TOKEN)
                .and_then(|token| token.parse::<f64>().ok())
                .ok_or_else(|| ArtifactParseError::InvalidScore {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    text: line.clone(),
                })?;
            energy = Some(value);
        } else if identifier.is_none() && line.starts_with("REMARK") && line.contains(id_prefix) {
            identifier = line
                .split_whitespace()
                .find(|token| token.starts_with(id_prefix))
                .map(str::to_string);
        }

        if energy.is_some() && identifier.is_some() {
            break;
        }
    }

    let energy = energy.ok_or_else(|| ArtifactParseError::MissingScore {
        path: path.to_path_buf(),
    })?;

    Ok(ArtifactScore {
        identifier: identifier.unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string()),
        path: path.to_path_buf(),
        energy,
    })
}

/// Scores sorted for reporting
#[derive(Debug, Clone, Default)]
pub struct RankedReport {
    pub entries: Vec<ArtifactScore>,

    /// Artifacts that were found but could not be scored
    pub excluded: usize,
}

/// Column names of the CSV report
pub const REPORT_HEADER: [&str; 3] = [
    "Molecule Name",
    "PDBQT File",
    "Binding Energy (kcal/mol)",
];

#[derive(Serialize)]
struct ReportRow<'a> {
    identifier: &'a str,
    file: String,
    energy: f64,
}

impl RankedReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the three-column CSV report
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), AggregateError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(REPORT_HEADER)?;
        for entry in &self.entries {
            writer.serialize(ReportRow {
                identifier: &entry.identifier,
                file: entry.file_name(),
                energy: entry.energy,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Collects and ranks every result artifact under a directory
#[derive(Debug, Clone)]
pub struct Aggregator {
    id_prefix: String,
    order: RankOrder,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            order: RankOrder::default(),
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn with_order(mut self, order: RankOrder) -> Self {
        self.order = order;
        self
    }

    /// Scan every `*_out.pdbqt` under `output_dir` and sort the scores.
    /// Unreadable or unscored artifacts are logged and left out.
    pub fn collect<P: AsRef<Path>>(&self, output_dir: P) -> RankedReport {
        let artifacts: Vec<PathBuf> = LigandSource::new(output_dir, &[RESULT_SUFFIX])
            .iter()
            .map(|record| record.path)
            .collect();

        let scanned: Vec<Result<ArtifactScore, ArtifactParseError>> = artifacts
            .par_iter()
            .map(|path| scan_artifact(path, &self.id_prefix))
            .collect();

        let mut report = RankedReport::default();
        for result in scanned {
            match result {
                Ok(score) => report.entries.push(score),
                Err(e) => {
                    warn!("{}", e);
                    report.excluded += 1;
                }
            }
        }

        report.entries.sort_by(|a, b| self.order.compare(a, b));
        report
    }

    /// Collect, rank and write the CSV report
    pub fn aggregate<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        output_dir: P,
        csv_path: Q,
    ) -> Result<RankedReport, AggregateError> {
        let report = self.collect(output_dir);
        report.write_csv(&csv_path)?;
        info!(
            "Results saved to {}. Total ligands processed: {}.",
            csv_path.as_ref().display(),
            report.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::fs;
    use tempfile::tempdir;

    fn vina_output(energy: &str, name: Option<&str>) -> String {
        let mut text = String::from("MODEL 1\n");
        text.push_str(&format!(
            "REMARK VINA RESULT:    {}      0.000      0.000\n",
            energy
        ));
        if let Some(name) = name {
            text.push_str(&format!("REMARK  Name = {}\n", name));
        }
        text.push_str("ATOM      1  C   LIG     1       0.000   0.000   0.000  0.00  0.00    +0.000 C\n");
        text.push_str("ENDMDL\nMODEL 2\nREMARK VINA RESULT:    -1.000      2.000      3.000\nENDMDL\n");
        text
    }

    #[test]
    fn test_scan_first_score_and_identifier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lig_out.pdbqt");
        fs::write(&path, vina_output("-8.250", Some("ZINC000012345"))).unwrap();

        let score = scan_artifact(&path, DEFAULT_ID_PREFIX).unwrap();
        assert_approx_eq!(score.energy, -8.25);
        assert_eq!(score.identifier, "ZINC000012345");
        assert_eq!(score.file_name(), "lig_out.pdbqt");
    }

    #[test]
    fn test_scan_without_identifier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anon_out.pdbqt");
        fs::write(&path, vina_output("-6.1", None)).unwrap();

        let score = scan_artifact(&path, DEFAULT_ID_PREFIX).unwrap();
        assert_eq!(score.identifier, UNKNOWN_IDENTIFIER);
        assert_approx_eq!(score.energy, -6.1);
    }

    #[test]
    fn test_scan_missing_score() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty_out.pdbqt");
        fs::write(&path, "REMARK  Name = ZINC1\nENDMDL\n").unwrap();

        assert!(matches!(
            scan_artifact(&path, DEFAULT_ID_PREFIX),
            Err(ArtifactParseError::MissingScore { .. })
        ));
    }

    #[test]
    fn test_scan_bad_score_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad_out.pdbqt");
        fs::write(&path, "REMARK VINA RESULT: n/a\n").unwrap();

        match scan_artifact(&path, DEFAULT_ID_PREFIX) {
            Err(ArtifactParseError::InvalidScore { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected InvalidScore, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_identifier_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chembl_out.pdbqt");
        fs::write(&path, vina_output("-5.0", Some("CHEMBL25"))).unwrap();

        let score = scan_artifact(&path, "CHEMBL").unwrap();
        assert_eq!(score.identifier, "CHEMBL25");
        let default = scan_artifact(&path, DEFAULT_ID_PREFIX).unwrap();
        assert_eq!(default.identifier, UNKNOWN_IDENTIFIER);
    }

    #[test]
    fn test_weakest_first_order() {
        let dir = tempdir().unwrap();
        for (name, energy) in [("a", "-9.1"), ("b", "-5.3"), ("c", "-7.8")] {
            fs::write(
                dir.path().join(format!("{}_out.pdbqt", name)),
                vina_output(energy, None),
            )
            .unwrap();
        }

        let report = Aggregator::new()
            .with_order(RankOrder::WeakestFirst)
            .collect(dir.path());
        let energies: Vec<f64> = report.entries.iter().map(|e| e.energy).collect();
        assert_eq!(energies, vec![-5.3, -7.8, -9.1]);
    }

    #[test]
    fn test_ties_broken_by_file_name() {
        let dir = tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            fs::write(
                dir.path().join(format!("{}_out.pdbqt", name)),
                vina_output("-7.0", None),
            )
            .unwrap();
        }

        let report = Aggregator::new().collect(dir.path());
        let names: Vec<String> = report.entries.iter().map(|e| e.file_name()).collect();
        assert_eq!(names, vec!["alpha_out.pdbqt", "mid_out.pdbqt", "zeta_out.pdbqt"]);
    }
}
