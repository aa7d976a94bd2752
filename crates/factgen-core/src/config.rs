//! # Configuration File Parser
//!
//! Reads and parses `factgen.toml`, the optional configuration file that
//! supplies defaults for `factgen generate` without CLI flags. Supports:
//!
//! - `[generate]`: scale factor, table, hash mode, output format and directory
//! - `[shard]`: default shard split (`parallel`, `child`)
//! - `[rows]`: per-table live row-count overrides, keyed by table name
//!
//! CLI flags (and their `FACTGEN_*` environment variables) win over the
//! file; the file wins over built-in defaults.
//!
//! Example `factgen.toml`:
//!
//! ```toml
//! [generate]
//! scale = 10
//! table = "store_returns"
//! hash = "legacy"
//! format = "dat"
//! output_dir = "./data"
//!
//! [shard]
//! parallel = 8
//! child = 3
//!
//! [rows]
//! item = 600
//! store_sales = 50000
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{FactGenError, Result};
use crate::generate::engine::ShardSpec;
use crate::generate::stable::HashMode;
use crate::output::OutputFormat;
use crate::schema::{TableId, TargetTable};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "factgen.toml";

/// Top-level factgen.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FactGenConfig {
    pub generate: GenerateConfig,
    pub shard: ShardConfig,
    /// Live row-count overrides, keyed by table name.
    pub rows: BTreeMap<String, u64>,

    /// Absolute path to the directory containing factgen.toml.
    ///
    /// Populated by `read_config()` so a relative `output_dir` resolves
    /// against the config file's location, not the CWD.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

/// Default generation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub scale: Option<u32>,
    /// `store_sales` or `store_returns`.
    pub table: Option<String>,
    /// `legacy` or `wide`.
    pub hash: Option<String>,
    /// `dat` or `jsonl`.
    pub format: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Default shard split.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    pub parallel: Option<u32>,
    pub child: Option<u32>,
}

/// Read and parse a factgen.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or validated.
pub fn read_config(dir: &Path) -> Result<Option<FactGenConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| FactGenError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: FactGenConfig = toml::from_str(&content).map_err(|e| FactGenError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;

    config.config_dir = Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));
    config.validate()?;

    Ok(Some(config))
}

impl FactGenConfig {
    pub fn target_table(&self) -> Result<Option<TargetTable>> {
        self.generate.table.as_deref().map(str::parse).transpose()
    }

    pub fn hash_mode(&self) -> Result<Option<HashMode>> {
        self.generate.hash.as_deref().map(str::parse).transpose()
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.generate.format.as_deref().map(str::parse).transpose()
    }

    /// `output_dir`, resolved against the config file's directory.
    pub fn output_dir(&self) -> Option<PathBuf> {
        let dir = self.generate.output_dir.as_ref()?;
        Some(match &self.config_dir {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.clone(),
        })
    }

    /// The shards `[shard]` selects, if `parallel` is set. Without `child`
    /// that is every child of the split.
    pub fn shards(&self) -> Result<Option<Vec<ShardSpec>>> {
        match (self.shard.parallel, self.shard.child) {
            (None, None) => Ok(None),
            (None, Some(child)) => Err(FactGenError::Config {
                message: format!(
                    "[shard] child = {} is set without parallel. \
                     Add parallel = N or remove the child setting.",
                    child
                ),
            }),
            (Some(parallel), child) => ShardSpec::plan(parallel, child).map(Some),
        }
    }

    /// Typed `[rows]` overrides.
    pub fn row_overrides(&self) -> Result<BTreeMap<TableId, u64>> {
        self.rows
            .iter()
            .map(|(name, rows)| {
                let table = name.parse::<TableId>().map_err(|_| FactGenError::Config {
                    message: format!("[rows] references unknown table '{}'", name),
                })?;
                Ok((table, *rows))
            })
            .collect()
    }

    /// Validate semantic constraints that serde cannot enforce.
    ///
    /// Call this immediately after parsing, so a bad value fails before any
    /// generation work starts.
    pub fn validate(&self) -> Result<()> {
        if let Some(scale) = self.generate.scale {
            if scale == 0 {
                return Err(FactGenError::InvalidScale { scale });
            }
        }
        self.target_table()?;
        self.hash_mode()?;
        self.output_format()?;
        self.shards()?;
        self.row_overrides()?;
        Ok(())
    }
}
