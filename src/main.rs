//! Main executable for vina-batch

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use nalgebra::Vector3;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use vina_batch::aggregate::{Aggregator, RankOrder, DEFAULT_ID_PREFIX};
use vina_batch::batch::run_pipeline;
use vina_batch::config::{DockingConfig, PipelineConfig};
use vina_batch::discovery::DiscoveryMode;
use vina_batch::external::ExternalTool;
use vina_batch::split::MoleculeSplitter;

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "vina-batch",
    version = vina_batch::VERSION,
    about = "Resumable batch docking with AutoDock Vina"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare and dock every ligand under a directory
    Dock {
        /// Directory searched recursively for ligand files
        #[clap(long, value_parser)]
        ligands: Option<PathBuf>,

        /// Receptor PDB file
        #[clap(long, value_parser)]
        receptor: Option<PathBuf>,

        /// Directory for prepared structures and docking results
        #[clap(long, short, value_parser)]
        out: Option<PathBuf>,

        /// Vina configuration file (center_x = ..., size_x = ..., ...)
        #[clap(long, short, value_parser)]
        config: Option<PathBuf>,

        /// Center of the search box (x,y,z)
        #[clap(long, value_parser, value_delimiter = ',')]
        center: Option<Vec<f64>>,

        /// Size of the search box (x,y,z)
        #[clap(long, value_parser, value_delimiter = ',')]
        size: Option<Vec<f64>>,

        /// Exhaustiveness of the search
        #[clap(long)]
        exhaustiveness: Option<u32>,

        /// Number of binding modes to generate
        #[clap(long)]
        num_modes: Option<u32>,

        /// Energy range for output poses (kcal/mol)
        #[clap(long)]
        energy_range: Option<f64>,

        /// CPUs used by each Vina run
        #[clap(long)]
        cpu: Option<usize>,

        /// Grid spacing (Angstrom)
        #[clap(long)]
        spacing: Option<f64>,

        /// Ligand file suffix to look for (repeatable, default .mol2 and .sdf)
        #[clap(long = "extension")]
        extensions: Vec<String>,

        /// Walk the ligand directory once and keep the list in memory
        #[clap(long)]
        buffered: bool,

        /// Write batch_summary.json with failed ligands into the output directory
        #[clap(long)]
        summary: bool,

        /// Receptor converter command
        #[clap(long, default_value = "prepare_receptor4.py")]
        receptor_converter: ExternalTool,

        /// Ligand converter command
        #[clap(long, default_value = "prepare_ligand4.py")]
        ligand_converter: ExternalTool,

        /// Hydrogenation and 3D embedding command
        #[clap(long, default_value = "obabel")]
        geometry: ExternalTool,

        /// Docking engine command
        #[clap(long, default_value = "vina")]
        vina: ExternalTool,

        /// Extra directory appended to PATH for the external tools (repeatable)
        #[clap(long = "tool-path", value_parser)]
        tool_paths: Vec<PathBuf>,
    },

    /// Rank docking results into a CSV report
    Aggregate {
        /// Directory containing *_out.pdbqt files
        #[clap(long, value_parser)]
        dir: Option<PathBuf>,

        /// CSV file to write
        #[clap(long, short, value_parser)]
        report: Option<PathBuf>,

        /// Prefix of molecule identifiers in result remarks
        #[clap(long, default_value = DEFAULT_ID_PREFIX)]
        id_prefix: String,

        /// List the weakest binders (highest energy) first
        #[clap(long)]
        weakest_first: bool,
    },

    /// Split a multi-molecule MOL2 file into one file per molecule
    Split {
        /// Combined MOL2 file
        #[clap(value_parser)]
        input: Option<PathBuf>,

        /// Prefix of the identifier line naming each molecule
        #[clap(long, default_value = DEFAULT_ID_PREFIX)]
        id_prefix: String,
    },
}

fn main() -> Result<()> {
    // Initialize logger, progress lines are logged at info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dock {
            ligands,
            receptor,
            out,
            config,
            center,
            size,
            exhaustiveness,
            num_modes,
            energy_range,
            cpu,
            spacing,
            extensions,
            buffered,
            summary,
            receptor_converter,
            ligand_converter,
            geometry,
            vina,
            tool_paths,
        } => {
            let ligand_dir = path_or_prompt(
                ligands,
                "Enter the directory containing ligand files (searches recursively): ",
            )?;
            let receptor = path_or_prompt(receptor, "Enter the path to the receptor PDB file: ")?;
            let output_dir = path_or_prompt(out, "Enter the directory to save docking results: ")?;

            if !ligand_dir.is_dir() {
                bail!("Ligand directory not found: {}", ligand_dir.display());
            }

            let mut docking = match config {
                Some(path) => DockingConfig::load(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
                None => DockingConfig::default(),
            };

            if let Some(c) = center {
                docking.center = vector3(&c, "center")?;
            }
            if let Some(s) = size {
                docking.size = vector3(&s, "size")?;
            }
            if let Some(v) = exhaustiveness {
                docking.exhaustiveness = v;
            }
            if let Some(v) = num_modes {
                docking.num_modes = v;
            }
            if let Some(v) = energy_range {
                docking.energy_range = v;
            }
            if let Some(v) = cpu {
                docking.cpu = v;
            }
            if let Some(v) = spacing {
                docking.spacing = v;
            }

            info!(
                "Search box center: ({}, {}, {})",
                docking.center.x, docking.center.y, docking.center.z
            );
            info!(
                "Search box size: ({}, {}, {})",
                docking.size.x, docking.size.y, docking.size.z
            );

            let mut pipeline = PipelineConfig::new(ligand_dir, receptor, output_dir);
            if !extensions.is_empty() {
                pipeline.extensions = extensions;
            }
            if buffered {
                pipeline.discovery = DiscoveryMode::Buffered;
            }
            pipeline.write_summary = summary;
            pipeline.docking = docking;
            pipeline.tools.receptor_converter = receptor_converter;
            pipeline.tools.ligand_converter = ligand_converter;
            pipeline.tools.geometry = geometry;
            pipeline.tools.vina = vina;
            pipeline.tools.search_path = tool_paths;

            let summary = run_pipeline(&pipeline).context("Batch docking aborted")?;
            if summary.failed > 0 {
                error!(
                    "{} ligands failed; rerun to retry them once the cause is fixed",
                    summary.failed
                );
            }
        }

        Commands::Aggregate {
            dir,
            report,
            id_prefix,
            weakest_first,
        } => {
            let dir = path_or_prompt(dir, "Enter the directory containing docking output files: ")?;
            let report = path_or_prompt(report, "Enter the path for the CSV output file: ")?;

            let order = if weakest_first {
                RankOrder::WeakestFirst
            } else {
                RankOrder::StrongestFirst
            };

            Aggregator::new()
                .with_id_prefix(id_prefix)
                .with_order(order)
                .aggregate(&dir, &report)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
        }

        Commands::Split { input, id_prefix } => {
            let input = path_or_prompt(input, "Enter the path to the combined .mol2 file: ")?;
            let is_mol2 = input
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("mol2"));
            if !input.is_file() || !is_mol2 {
                bail!("Invalid file path. Please provide a valid .mol2 file.");
            }

            MoleculeSplitter::new()
                .with_id_prefix(id_prefix)
                .split(&input)
                .with_context(|| format!("Failed to split {}", input.display()))?;
        }
    }

    Ok(())
}

/// Use the given path or ask for one on stdin
fn path_or_prompt(value: Option<PathBuf>, prompt: &str) -> Result<PathBuf> {
    if let Some(path) = value {
        return Ok(path);
    }

    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        bail!("No path given");
    }
    Ok(PathBuf::from(line))
}

fn vector3(values: &[f64], name: &str) -> Result<Vector3<f64>> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => bail!("--{} needs exactly three comma separated values", name),
    }
}
