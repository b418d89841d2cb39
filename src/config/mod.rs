//! Docking parameters and pipeline configuration

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::discovery::{DiscoveryMode, DEFAULT_LIGAND_EXTENSIONS};
use crate::external::ExternalTool;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {key} at line {line}: {value}")]
    InvalidValue {
        key: String,
        value: String,
        line: usize,
    },
}

/// Fixed record handed to the docking engine for every ligand of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockingConfig {
    /// Center of the search box (x, y, z) in Angstroms
    pub center: Vector3<f64>,

    /// Size of the search box (x, y, z) in Angstroms
    pub size: Vector3<f64>,

    /// Exhaustiveness of the global search
    pub exhaustiveness: u32,

    /// Maximum number of binding modes to write
    pub num_modes: u32,

    /// Maximum energy difference between the best and worst mode (kcal/mol)
    pub energy_range: f64,

    /// Number of CPUs the engine may use internally
    pub cpu: usize,

    /// Grid spacing in Angstroms
    pub spacing: f64,
}

impl Default for DockingConfig {
    fn default() -> Self {
        Self {
            center: Vector3::new(108.555, 108.554, 117.948),
            size: Vector3::new(24.0, 20.0, 12.0),
            exhaustiveness: 8,
            num_modes: 9,
            energy_range: 3.0,
            cpu: 10,
            spacing: 1.0,
        }
    }
}

impl DockingConfig {
    /// Load a Vina-style `key = value` configuration file on top of the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_vina_config(&contents)
    }

    /// Parse a Vina-style configuration. Keys that are not docking parameters
    /// (receptor, ligand, out, ...) are ignored, missing keys keep their defaults.
    pub fn from_vina_config(config_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (idx, line) in config_str.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let invalid = || ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                line: idx + 1,
            };

            match key {
                "center_x" => config.center.x = value.parse().map_err(|_| invalid())?,
                "center_y" => config.center.y = value.parse().map_err(|_| invalid())?,
                "center_z" => config.center.z = value.parse().map_err(|_| invalid())?,
                "size_x" => config.size.x = value.parse().map_err(|_| invalid())?,
                "size_y" => config.size.y = value.parse().map_err(|_| invalid())?,
                "size_z" => config.size.z = value.parse().map_err(|_| invalid())?,
                "exhaustiveness" => config.exhaustiveness = value.parse().map_err(|_| invalid())?,
                "num_modes" => config.num_modes = value.parse().map_err(|_| invalid())?,
                "energy_range" => config.energy_range = value.parse().map_err(|_| invalid())?,
                "cpu" => config.cpu = value.parse().map_err(|_| invalid())?,
                "spacing" => config.spacing = value.parse().map_err(|_| invalid())?,
                _ => {} // Ignore other keys
            }
        }

        Ok(config)
    }
}

/// External programs used by the pipeline
#[derive(Debug, Clone)]
pub struct ToolPaths {
    /// Receptor to PDBQT converter (MGLTools `prepare_receptor4.py`)
    pub receptor_converter: ExternalTool,

    /// Adds hydrogens, embeds and minimizes a 3D conformer, writes PDB
    pub geometry: ExternalTool,

    /// Ligand PDB to PDBQT converter (MGLTools `prepare_ligand4.py`)
    pub ligand_converter: ExternalTool,

    /// The docking engine
    pub vina: ExternalTool,

    /// Directories appended to `PATH` for every child process
    pub search_path: Vec<PathBuf>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            receptor_converter: ExternalTool::new("prepare_receptor4.py"),
            geometry: ExternalTool::new("obabel"),
            ligand_converter: ExternalTool::new("prepare_ligand4.py"),
            vina: ExternalTool::new("vina"),
            search_path: Vec::new(),
        }
    }
}

/// Everything a batch docking run needs
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory searched recursively for ligands
    pub ligand_dir: PathBuf,

    /// Receptor structure (PDB)
    pub receptor: PathBuf,

    /// Directory receiving every artifact of the run
    pub output_dir: PathBuf,

    /// File name suffixes recognized as ligand structures
    pub extensions: Vec<String>,

    pub discovery: DiscoveryMode,

    pub tools: ToolPaths,

    pub docking: DockingConfig,

    /// Write `batch_summary.json` into the output directory after the run
    pub write_summary: bool,
}

impl PipelineConfig {
    pub fn new(
        ligand_dir: impl Into<PathBuf>,
        receptor: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ligand_dir: ligand_dir.into(),
            receptor: receptor.into(),
            output_dir: output_dir.into(),
            extensions: DEFAULT_LIGAND_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            discovery: DiscoveryMode::default(),
            tools: ToolPaths::default(),
            docking: DockingConfig::default(),
            write_summary: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_box() {
        let config = DockingConfig::default();
        assert_eq!(config.center, Vector3::new(108.555, 108.554, 117.948));
        assert_eq!(config.size, Vector3::new(24.0, 20.0, 12.0));
        assert_eq!(config.exhaustiveness, 8);
        assert_eq!(config.num_modes, 9);
        assert_eq!(config.cpu, 10);
    }

    #[test]
    fn test_vina_config_overrides() {
        let text = "\
# search box
receptor = receptor.pdbqt
center_x = 1.5
center_y = -2
center_z = 3.25
size_x = 10
exhaustiveness = 32
spacing = 0.375
";
        let config = DockingConfig::from_vina_config(text).unwrap();
        assert_eq!(config.center, Vector3::new(1.5, -2.0, 3.25));
        assert_eq!(config.size, Vector3::new(10.0, 20.0, 12.0));
        assert_eq!(config.exhaustiveness, 32);
        assert_eq!(config.spacing, 0.375);
        assert_eq!(config.num_modes, 9);
    }

    #[test]
    fn test_vina_config_rejects_bad_number() {
        let err = DockingConfig::from_vina_config("center_x = 1.0\ncpu = many\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, line, .. } => {
                assert_eq!(key, "cpu");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::new("ligands", "receptor.pdb", "out");
        assert_eq!(config.extensions, vec![".mol2", ".sdf"]);
        assert_eq!(config.discovery, DiscoveryMode::Rescan);
        assert!(!config.write_summary);
    }
}
