//! vina-batch: resumable batch docking around AutoDock Vina
//!
//! Ligands found under a directory are prepared and docked one by one against a
//! shared receptor. A ligand counts as done once its result artifact exists, so
//! interrupted runs resume where they stopped. Results are then ranked into a
//! CSV report.

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod discovery;
pub mod dock;
pub mod external;
pub mod layout;
pub mod prepare;
pub mod split;
pub mod structure;

// Re-export commonly used types and functions
pub use aggregate::{Aggregator, RankOrder, RankedReport};
pub use batch::{run_pipeline, BatchDriver, BatchSummary, ItemOutcome};
pub use config::{DockingConfig, PipelineConfig};
pub use discovery::{LigandRecord, LigandSource};
pub use layout::OutputLayout;
pub use split::MoleculeSplitter;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
