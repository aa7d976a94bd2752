use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::generate::engine::{RunStats, ShardSpec};
use crate::generate::stable::HashMode;
use crate::output::OutputFormat;
use crate::schema::{TableId, TargetTable};

/// The factgen.manifest.json file structure.
///
/// Every generation run records the file it wrote, with enough of the run
/// configuration to regenerate it byte for byte. Runs into the same output
/// directory share one manifest; a rerun of the same table and shard
/// replaces its entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// factgen version that last wrote this manifest.
    pub factgen_version: String,
    pub files: Vec<ManifestEntry>,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name, relative to the manifest's directory.
    pub file: String,
    pub table: TargetTable,
    pub scale: u32,
    pub hash_mode: HashMode,
    pub format: OutputFormat,
    pub shard: ShardSpec,
    /// Row-count overrides in effect. BTreeMap for deterministic JSON ordering.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub row_overrides: BTreeMap<TableId, u64>,
    pub stats: RunStats,
    /// Rows written to this file.
    pub rows: u64,
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
    pub created_at: String,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            factgen_version: env!("CARGO_PKG_VERSION").to_string(),
            files: Vec::new(),
        }
    }

    /// Add an entry, replacing any earlier entry for the same file.
    pub fn upsert(&mut self, entry: ManifestEntry) {
        self.factgen_version = env!("CARGO_PKG_VERSION").to_string();
        match self.files.iter_mut().find(|e| e.file == entry.file) {
            Some(existing) => *existing = entry,
            None => self.files.push(entry),
        }
        self.files.sort_by(|a, b| a.file.cmp(&b.file));
    }

    pub fn entry(&self, file: &str) -> Option<&ManifestEntry> {
        self.files.iter().find(|e| e.file == file)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
