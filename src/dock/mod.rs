//! Invocation of the external docking engine

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::DockingConfig;
use crate::external::{ExternalTool, ToolError};

/// Docks one prepared ligand against the prepared receptor
pub trait DockingEngine {
    fn dock(
        &self,
        receptor: &Path,
        ligand: &Path,
        output: &Path,
        config: &DockingConfig,
    ) -> Result<(), ToolError>;
}

/// AutoDock Vina run as a child process
#[derive(Debug, Clone)]
pub struct VinaInvoker {
    vina: ExternalTool,
    search_path: Vec<PathBuf>,
}

impl VinaInvoker {
    pub fn new(vina: ExternalTool, search_path: Vec<PathBuf>) -> Self {
        Self { vina, search_path }
    }
}

impl DockingEngine for VinaInvoker {
    fn dock(
        &self,
        receptor: &Path,
        ligand: &Path,
        output: &Path,
        config: &DockingConfig,
    ) -> Result<(), ToolError> {
        self.vina
            .run(vina_args(receptor, ligand, output, config), &self.search_path)
    }
}

/// Command-line arguments for one Vina run
pub fn vina_args(
    receptor: &Path,
    ligand: &Path,
    output: &Path,
    config: &DockingConfig,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--receptor".into(),
        receptor.into(),
        "--ligand".into(),
        ligand.into(),
        "--out".into(),
        output.into(),
    ];

    let numeric = [
        ("--center_x", config.center.x.to_string()),
        ("--center_y", config.center.y.to_string()),
        ("--center_z", config.center.z.to_string()),
        ("--size_x", config.size.x.to_string()),
        ("--size_y", config.size.y.to_string()),
        ("--size_z", config.size.z.to_string()),
        ("--exhaustiveness", config.exhaustiveness.to_string()),
        ("--num_modes", config.num_modes.to_string()),
        ("--energy_range", config.energy_range.to_string()),
        ("--cpu", config.cpu.to_string()),
        ("--spacing", config.spacing.to_string()),
    ];
    for (flag, value) in numeric {
        args.push(flag.into());
        args.push(value.into());
    }

    args
}
