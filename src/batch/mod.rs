//! Resumable, failure-isolating batch docking driver
//!
//! Every discovered ligand ends in exactly one terminal state:
//!
//! - `Skipped`: its result artifact already exists, nothing is run
//! - `Docked`: prepared and docked in this run
//! - `Failed`: preparation or docking raised an error; the batch continues
//!
//! Completion is never recorded anywhere but in the output directory, so
//! restarting a killed run picks up exactly the ligands without results.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{DockingConfig, PipelineConfig};
use crate::discovery::{DiscoveryMode, LigandRecord, LigandSource};
use crate::dock::{DockingEngine, VinaInvoker};
use crate::external::ToolError;
use crate::layout::{CompletionCheck, OutputLayout, ResultFileExists};
use crate::prepare::{ExternalPreparer, PrepareError, StructurePreparer};
use crate::structure::StructureReadError;

/// Errors that abort a whole batch
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Receptor preparation failed for {}: {source}", .path.display())]
    ReceptorPreparation {
        path: PathBuf,
        #[source]
        source: PrepareError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize batch summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Why a single ligand could not be docked
#[derive(Error, Debug)]
pub enum ItemFailure {
    #[error(transparent)]
    StructureRead(#[from] StructureReadError),

    #[error(transparent)]
    ExternalTool(#[from] ToolError),

    /// The ligand's artifacts would overwrite the receptor or another result
    #[error(
        "Ligand {} would overwrite {}; rename the file",
        .ligand.display(),
        .artifact.display()
    )]
    ArtifactClash { ligand: PathBuf, artifact: PathBuf },
}

impl From<PrepareError> for ItemFailure {
    fn from(err: PrepareError) -> Self {
        match err {
            PrepareError::Structure(e) => ItemFailure::StructureRead(e),
            PrepareError::Tool(e) => ItemFailure::ExternalTool(e),
        }
    }
}

/// Terminal state of one ligand
#[derive(Debug)]
pub enum ItemOutcome {
    Skipped,
    Docked,
    Failed(ItemFailure),
}

/// Running counters of a batch. `total` is `None` when the item count was
/// not computed up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: Option<usize>,
}

impl BatchProgress {
    pub fn new(total: Option<usize>) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    pub fn remaining(&self) -> Option<usize> {
        self.total.map(|total| total.saturating_sub(self.completed))
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.total, self.remaining()) {
            (Some(total), Some(remaining)) => write!(
                f,
                "{}/{} completed, {} remaining",
                self.completed, total, remaining
            ),
            _ => write!(f, "{}/unknown completed, unknown remaining", self.completed),
        }
    }
}

/// A ligand that ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub path: PathBuf,
    pub error: String,
}

/// Totals of one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub skipped: usize,
    pub docked: usize,
    pub failed: usize,
    pub progress: BatchProgress,

    /// Failed ligands with their errors. Empty when the driver was told not to
    /// keep them, `failed` still counts every failure.
    pub failures: Vec<FailedItem>,
}

impl BatchSummary {
    /// Items that have a result artifact after the run
    pub fn completed(&self) -> usize {
        self.skipped + self.docked
    }

    /// Items that were attempted in this run
    pub fn attempted(&self) -> usize {
        self.docked + self.failed
    }

    /// Write the summary as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), BatchError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Drives preparation and docking over a stream of ligands, one at a time
pub struct BatchDriver<'a, P, D, C> {
    preparer: &'a P,
    engine: &'a D,
    completion: &'a C,
    layout: &'a OutputLayout,
    config: &'a DockingConfig,
    keep_failures: bool,
}

impl<'a, P, D, C> BatchDriver<'a, P, D, C>
where
    P: StructurePreparer,
    D: DockingEngine,
    C: CompletionCheck,
{
    pub fn new(
        preparer: &'a P,
        engine: &'a D,
        completion: &'a C,
        layout: &'a OutputLayout,
        config: &'a DockingConfig,
    ) -> Self {
        Self {
            preparer,
            engine,
            completion,
            layout,
            config,
            keep_failures: true,
        }
    }

    /// Whether `BatchSummary::failures` lists each failed ligand. The list
    /// grows with the number of failures, so long streamed runs that never
    /// write a summary can turn it off.
    pub fn with_failure_list(mut self, keep: bool) -> Self {
        self.keep_failures = keep;
        self
    }

    /// Bring one ligand to a terminal state
    pub fn process(&self, ligand: &LigandRecord) -> ItemOutcome {
        if self.completion.is_complete(ligand) {
            return ItemOutcome::Skipped;
        }

        match self.prepare_and_dock(ligand) {
            Ok(()) => ItemOutcome::Docked,
            Err(e) => ItemOutcome::Failed(e),
        }
    }

    fn prepare_and_dock(&self, ligand: &LigandRecord) -> Result<(), ItemFailure> {
        if let Some(artifact) = self.layout.artifact_clash(&ligand.base_name) {
            return Err(ItemFailure::ArtifactClash {
                ligand: ligand.path.clone(),
                artifact,
            });
        }

        let prepared = self.layout.prepared_ligand(&ligand.base_name);
        let intermediate = self.layout.intermediate(&ligand.base_name);
        let output = self.layout.result(&ligand.base_name);

        self.preparer
            .prepare_ligand(&ligand.path, &intermediate, &prepared)?;
        self.engine
            .dock(&self.layout.receptor(), &prepared, &output, self.config)?;
        Ok(())
    }

    /// Process every ligand in iteration order. Per-item failures are logged
    /// and collected, they never stop the loop.
    pub fn run<I>(&self, ligands: I, total: Option<usize>) -> BatchSummary
    where
        I: IntoIterator<Item = LigandRecord>,
    {
        let mut summary = BatchSummary {
            progress: BatchProgress::new(total),
            ..BatchSummary::default()
        };

        for ligand in ligands {
            match self.process(&ligand) {
                ItemOutcome::Skipped => {
                    summary.skipped += 1;
                    summary.progress.completed += 1;
                    info!(
                        "Skipping {}: result already present ({}).",
                        ligand.path.display(),
                        summary.progress
                    );
                }
                ItemOutcome::Docked => {
                    summary.docked += 1;
                    summary.progress.completed += 1;
                    info!(
                        "Docking complete for {} ({}).",
                        ligand.path.display(),
                        summary.progress
                    );
                }
                ItemOutcome::Failed(e) => {
                    summary.failed += 1;
                    error!("Error processing {}: {}", ligand.path.display(), e);
                    info!("Progress: {}.", summary.progress);
                    if self.keep_failures {
                        summary.failures.push(FailedItem {
                            path: ligand.path.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            "Batch finished: {} docked, {} skipped, {} failed.",
            summary.docked, summary.skipped, summary.failed
        );
        summary
    }
}

/// Prepare the shared receptor unless its artifact already exists
pub fn ensure_receptor<P: StructurePreparer>(
    preparer: &P,
    receptor: &Path,
    layout: &OutputLayout,
) -> Result<PathBuf, BatchError> {
    let prepared = layout.receptor();
    if prepared.exists() {
        info!("Reusing prepared receptor {}", prepared.display());
        return Ok(prepared);
    }

    preparer
        .prepare_receptor(receptor, &prepared)
        .map_err(|source| BatchError::ReceptorPreparation {
            path: receptor.to_path_buf(),
            source,
        })?;
    Ok(prepared)
}

/// Run the full pipeline with the external tools named in `config`
pub fn run_pipeline(config: &PipelineConfig) -> Result<BatchSummary, BatchError> {
    let preparer = ExternalPreparer::new(&config.tools);
    let engine = VinaInvoker::new(config.tools.vina.clone(), config.tools.search_path.clone());
    run_pipeline_with(config, &preparer, &engine)
}

/// Run the full pipeline with caller-supplied preparation and docking
pub fn run_pipeline_with<P, D>(
    config: &PipelineConfig,
    preparer: &P,
    engine: &D,
) -> Result<BatchSummary, BatchError>
where
    P: StructurePreparer,
    D: DockingEngine,
{
    std::fs::create_dir_all(&config.output_dir)?;
    let layout = OutputLayout::new(&config.output_dir);

    ensure_receptor(preparer, &config.receptor, &layout)?;

    let source = LigandSource::new(&config.ligand_dir, &config.extensions);
    let completion = ResultFileExists::new(layout.clone());
    let driver = BatchDriver::new(preparer, engine, &completion, &layout, &config.docking)
        .with_failure_list(config.write_summary);

    let summary = match config.discovery {
        DiscoveryMode::Rescan => {
            let total = source.count();
            info!("Found {} ligand files.", total);
            driver.run(source.iter(), Some(total))
        }
        DiscoveryMode::Buffered => {
            let ligands: Vec<LigandRecord> = source.iter().collect();
            info!("Found {} ligand files.", ligands.len());
            let total = ligands.len();
            driver.run(ligands, Some(total))
        }
    };

    if summary.progress.total == Some(0) {
        warn!("No ligand files found under {}", config.ligand_dir.display());
    }

    if config.write_summary {
        let path = layout.summary();
        summary.write_json(&path)?;
        info!("Batch summary written to {}", path.display());
    }

    Ok(summary)
}
