//! Deterministic artifact naming inside the output directory

use std::path::{Path, PathBuf};

use crate::discovery::LigandRecord;

/// File name of the prepared receptor
pub const RECEPTOR_ARTIFACT: &str = "receptor.pdbqt";

/// Suffix of docking result artifacts, also what the aggregator looks for
pub const RESULT_SUFFIX: &str = "_out.pdbqt";

const PREPARED_SUFFIX: &str = ".pdbqt";
const INTERMEDIATE_SUFFIX: &str = ".pdb";

/// Name of the optional run summary
pub const SUMMARY_FILE: &str = "batch_summary.json";

/// Maps ligand base names to artifact paths. Every path is a pure function of
/// the base name and the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    output_dir: PathBuf,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn receptor(&self) -> PathBuf {
        self.output_dir.join(RECEPTOR_ARTIFACT)
    }

    /// Docking-ready ligand (PDBQT)
    pub fn prepared_ligand(&self, base_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", base_name, PREPARED_SUFFIX))
    }

    /// Transient 3D structure handed from the geometry tool to the converter
    pub fn intermediate(&self, base_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", base_name, INTERMEDIATE_SUFFIX))
    }

    /// Docking result; its presence marks the ligand as done
    pub fn result(&self, base_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", base_name, RESULT_SUFFIX))
    }

    pub fn summary(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE)
    }

    /// Artifact of another role that a ligand named `base_name` would write over.
    ///
    /// A ligand called `receptor` would replace the shared receptor, and one
    /// ending in `_out` would produce the result artifact of its namesake
    /// without the suffix.
    pub fn artifact_clash(&self, base_name: &str) -> Option<PathBuf> {
        let prepared = self.prepared_ligand(base_name);
        if prepared == self.receptor() {
            return Some(prepared);
        }
        let prepared_name = format!("{}{}", base_name, PREPARED_SUFFIX);
        if prepared_name.ends_with(RESULT_SUFFIX) {
            return Some(prepared);
        }
        None
    }
}

/// Decides whether a ligand needs no further work
pub trait CompletionCheck {
    fn is_complete(&self, ligand: &LigandRecord) -> bool;
}

/// Completion derived from the filesystem: a ligand is done when its result
/// artifact exists. Contents are not validated.
#[derive(Debug, Clone)]
pub struct ResultFileExists {
    layout: OutputLayout,
}

impl ResultFileExists {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }
}

impl CompletionCheck for ResultFileExists {
    fn is_complete(&self, ligand: &LigandRecord) -> bool {
        self.layout.result(&ligand.base_name).exists()
    }
}
