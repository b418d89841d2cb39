//! Conversion of receptor and ligand structures into docking-ready PDBQT

use log::{debug, info, warn};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ToolPaths;
use crate::external::{ExternalTool, ToolError};
use crate::structure::{read_structure, StructureReadError};

/// Errors that can occur while preparing a structure
#[derive(Error, Debug)]
pub enum PrepareError {
    #[error(transparent)]
    Structure(#[from] StructureReadError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Produces docking-ready artifacts from raw structures
pub trait StructurePreparer {
    /// Convert the receptor once per batch
    fn prepare_receptor(&self, input: &Path, output: &Path) -> Result<(), PrepareError>;

    /// Convert one ligand, going through `intermediate` as a temporary 3D structure
    fn prepare_ligand(
        &self,
        input: &Path,
        intermediate: &Path,
        output: &Path,
    ) -> Result<(), PrepareError>;
}

/// Preparation through external programs: a geometry tool that protonates,
/// embeds and minimizes the ligand, then the MGLTools converters.
#[derive(Debug, Clone)]
pub struct ExternalPreparer {
    receptor_converter: ExternalTool,
    geometry: ExternalTool,
    ligand_converter: ExternalTool,
    search_path: Vec<PathBuf>,
}

impl ExternalPreparer {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            receptor_converter: tools.receptor_converter.clone(),
            geometry: tools.geometry.clone(),
            ligand_converter: tools.ligand_converter.clone(),
            search_path: tools.search_path.clone(),
        }
    }
}

impl StructurePreparer for ExternalPreparer {
    fn prepare_receptor(&self, input: &Path, output: &Path) -> Result<(), PrepareError> {
        info!("Preparing receptor {} -> {}", input.display(), output.display());
        self.receptor_converter.run(
            [OsStr::new("-r"), input.as_os_str(), OsStr::new("-o"), output.as_os_str()],
            &self.search_path,
        )?;
        Ok(())
    }

    fn prepare_ligand(
        &self,
        input: &Path,
        intermediate: &Path,
        output: &Path,
    ) -> Result<(), PrepareError> {
        let summary = read_structure(input)?;
        debug!(
            "Read {} as {} ({} atoms)",
            input.display(),
            summary.format,
            summary.atom_count
        );

        let intermediate = ScopedFile::new(intermediate);

        // Hydrogens, 3D embedding and force-field minimization
        self.geometry.run(
            [
                input.as_os_str(),
                OsStr::new("-O"),
                intermediate.path().as_os_str(),
                OsStr::new("-h"),
                OsStr::new("--gen3d"),
            ],
            &self.search_path,
        )?;

        self.ligand_converter.run(
            [
                OsStr::new("-l"),
                intermediate.path().as_os_str(),
                OsStr::new("-o"),
                output.as_os_str(),
            ],
            &self.search_path,
        )?;

        Ok(())
    }
}

/// A file removed when the guard goes out of scope
struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
