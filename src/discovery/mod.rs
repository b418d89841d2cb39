//! Lazy discovery of ligand files under a directory tree

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::ReadDir;
use std::path::{Path, PathBuf};

use crate::structure::StructureFormat;

/// File name suffixes treated as ligand structures unless configured otherwise
pub const DEFAULT_LIGAND_EXTENSIONS: &[&str] = &[".mol2", ".sdf"];

/// How the batch obtains its total item count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiscoveryMode {
    /// Walk the tree once to count and again to process. Memory stays bounded
    /// at the price of scanning the directory twice.
    #[default]
    Rescan,

    /// Walk once and keep every path in memory. Suited to small ligand sets.
    Buffered,
}

/// A ligand file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigandRecord {
    /// Source file, the identity of the record
    pub path: PathBuf,

    /// File name without the recognized extension
    pub base_name: String,

    /// Structure format implied by the extension, if it is a known one
    pub format: Option<StructureFormat>,
}

impl LigandRecord {
    /// Build a record for `path` if its file name ends with one of `extensions`
    pub fn from_path<S: AsRef<str>>(path: &Path, extensions: &[S]) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let suffix_len = extensions.iter().find_map(|ext| {
            let ext: &str = ext.as_ref();
            (file_name.len() > ext.len() && file_name.ends_with(ext)).then_some(ext.len())
        })?;

        Some(Self {
            path: path.to_path_buf(),
            base_name: file_name[..file_name.len() - suffix_len].to_string(),
            format: StructureFormat::from_path(path),
        })
    }
}

/// A restartable description of where ligands live. Every call to [`LigandSource::iter`]
/// starts a fresh walk, nothing is cached between walks.
#[derive(Debug, Clone)]
pub struct LigandSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl LigandSource {
    pub fn new<P: AsRef<Path>, S: AsRef<str>>(root: P, extensions: &[S]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: extensions.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Source using [`DEFAULT_LIGAND_EXTENSIONS`]
    pub fn with_default_extensions<P: AsRef<Path>>(root: P) -> Self {
        Self::new(root, DEFAULT_LIGAND_EXTENSIONS)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a new lazy walk over the tree
    pub fn iter(&self) -> LigandWalker {
        LigandWalker::new(&self.root, self.extensions.clone())
    }

    /// Count matching files with a full walk of its own
    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

/// Depth-first directory walk yielding ligand records in filesystem order
pub struct LigandWalker {
    extensions: Vec<String>,
    pending_dirs: Vec<PathBuf>,
    current: Option<ReadDir>,
}

impl LigandWalker {
    fn new(root: &Path, extensions: Vec<String>) -> Self {
        Self {
            extensions,
            pending_dirs: vec![root.to_path_buf()],
            current: None,
        }
    }
}

impl Iterator for LigandWalker {
    type Item = LigandRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next_entry = match self.current.as_mut() {
                Some(entries) => entries.next(),
                None => {
                    let dir = self.pending_dirs.pop()?;
                    match dir.read_dir() {
                        Ok(entries) => self.current = Some(entries),
                        Err(e) => warn!("Skipping unreadable directory {}: {}", dir.display(), e),
                    }
                    continue;
                }
            };

            let entry = match next_entry {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
                None => {
                    self.current = None;
                    continue;
                }
            };

            let path = entry.path();
            match entry.file_type() {
                Ok(ty) if ty.is_dir() => self.pending_dirs.push(path),
                Ok(_) => {
                    if let Some(record) = LigandRecord::from_path(&path, &self.extensions) {
                        debug!("Discovered ligand {}", record.path.display());
                        return Some(record);
                    }
                }
                Err(e) => warn!("Cannot stat {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_record_strips_matched_extension() {
        let record =
            LigandRecord::from_path(Path::new("/data/set/ZINC0001.mol2"), DEFAULT_LIGAND_EXTENSIONS)
                .unwrap();
        assert_eq!(record.base_name, "ZINC0001");
        assert_eq!(record.format, Some(StructureFormat::Mol2));

        assert!(
            LigandRecord::from_path(Path::new("notes.txt"), DEFAULT_LIGAND_EXTENSIONS).is_none()
        );
        assert!(LigandRecord::from_path(Path::new(".sdf"), DEFAULT_LIGAND_EXTENSIONS).is_none());
    }

    #[test]
    fn test_walk_is_recursive_and_filtered() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("top.sdf"), "").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();
        fs::write(nested.join("deep.mol2"), "").unwrap();
        fs::write(dir.path().join("a").join("mid.mol2"), "").unwrap();

        let source = LigandSource::with_default_extensions(dir.path());
        let names: BTreeSet<_> = source.iter().map(|r| r.base_name).collect();
        let expected: BTreeSet<_> = ["deep", "mid", "top"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
        assert_eq!(source.count(), 3);
    }

    #[test]
    fn test_walk_restarts_from_scratch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.sdf"), "").unwrap();

        let source = LigandSource::with_default_extensions(dir.path());
        assert_eq!(source.count(), 1);

        fs::write(dir.path().join("two.sdf"), "").unwrap();
        assert_eq!(source.iter().count(), 2);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = tempdir().unwrap();
        let source = LigandSource::with_default_extensions(dir.path().join("absent"));
        assert_eq!(source.count(), 0);
    }

    #[test]
    fn test_custom_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lig_out.pdbqt"), "").unwrap();
        fs::write(dir.path().join("lig.pdbqt"), "").unwrap();

        let source = LigandSource::new(dir.path(), &["_out.pdbqt"]);
        let records: Vec<_> = source.iter().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].base_name, "lig");
        assert_eq!(records[0].format, None);
    }
}
