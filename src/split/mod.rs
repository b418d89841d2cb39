//! Splitting multi-molecule MOL2 files into one file per molecule

use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aggregate::DEFAULT_ID_PREFIX;
use crate::structure::MOL2_MOLECULE_TAG;

/// Errors that can occur while splitting
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input file: {}", .0.display())]
    InvalidInput(PathBuf),
}

/// Outcome of one split
#[derive(Debug, Clone, Default)]
pub struct SplitSummary {
    pub output_dir: PathBuf,

    /// Written files in input order
    pub written: Vec<PathBuf>,

    /// Lines at the end of the input that belonged to no identified record
    pub dropped_lines: usize,

    /// Identifiers that cannot be used as a file name; their records are skipped
    pub rejected: Vec<String>,
}

/// Streams a multi-record file and writes every identified record on its own
#[derive(Debug, Clone)]
pub struct MoleculeSplitter {
    record_tag: String,
    id_prefix: String,
    extension: String,
}

impl Default for MoleculeSplitter {
    fn default() -> Self {
        Self {
            record_tag: MOL2_MOLECULE_TAG.to_string(),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            extension: "mol2".to_string(),
        }
    }
}

impl MoleculeSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Directory receiving the records of `input`: `<stem>_split` beside it
    pub fn output_dir_for(input: &Path) -> Result<PathBuf, SplitError> {
        let stem = input
            .file_stem()
            .ok_or_else(|| SplitError::InvalidInput(input.to_path_buf()))?;
        let mut name = stem.to_os_string();
        name.push("_split");
        Ok(input.with_file_name(name))
    }

    /// Split `input` into `output_dir_for(input)`
    pub fn split<P: AsRef<Path>>(&self, input: P) -> Result<SplitSummary, SplitError> {
        let input = input.as_ref();
        let output_dir = Self::output_dir_for(input)?;
        self.split_into(input, &output_dir)
    }

    /// Split `input` into `output_dir`, holding one record in memory at a time.
    ///
    /// A record without an identifier is not written on its own; its lines are
    /// carried into the next record. Lines are copied byte for byte.
    pub fn split_into(&self, input: &Path, output_dir: &Path) -> Result<SplitSummary, SplitError> {
        let mut reader = BufReader::new(File::open(input)?);
        std::fs::create_dir_all(output_dir)?;

        let mut summary = SplitSummary {
            output_dir: output_dir.to_path_buf(),
            ..SplitSummary::default()
        };
        let mut record: Vec<Vec<u8>> = Vec::new();
        let mut identifier: Option<String> = None;
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }

            if line.starts_with(self.record_tag.as_bytes()) && !record.is_empty() {
                if let Some(id) = identifier.take() {
                    self.emit(output_dir, id, &record, &mut summary)?;
                    record.clear();
                }
            }

            if identifier.is_none() && line.starts_with(self.id_prefix.as_bytes()) {
                identifier = Some(String::from_utf8_lossy(&line).trim().to_string());
            }
            record.push(line.clone());
        }

        match identifier {
            Some(id) if !record.is_empty() => {
                self.emit(output_dir, id, &record, &mut summary)?;
            }
            _ if !record.is_empty() => {
                warn!(
                    "Dropping {} trailing lines of {} without a {} identifier",
                    record.len(),
                    input.display(),
                    self.id_prefix
                );
                summary.dropped_lines = record.len();
            }
            _ => {}
        }

        info!(
            "Splitting completed. {} files saved in '{}'.",
            summary.written.len(),
            output_dir.display()
        );
        Ok(summary)
    }

    fn emit(
        &self,
        output_dir: &Path,
        id: String,
        lines: &[Vec<u8>],
        summary: &mut SplitSummary,
    ) -> Result<(), SplitError> {
        if !is_plain_file_stem(&id) {
            warn!("Skipping record '{}': identifier is not a usable file name", id);
            summary.rejected.push(id);
            return Ok(());
        }
        summary.written.push(self.flush(output_dir, &id, lines)?);
        Ok(())
    }

    fn flush(&self, output_dir: &Path, id: &str, lines: &[Vec<u8>]) -> Result<PathBuf, SplitError> {
        let path = output_dir.join(format!("{}.{}", id, self.extension));
        let mut file = File::create(&path)?;
        for line in lines {
            file.write_all(line)?;
        }
        Ok(path)
    }
}

/// A name that stays a single entry inside the output directory
fn is_plain_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}
