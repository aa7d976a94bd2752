pub mod generate;
pub mod info;
pub mod validate;
pub mod verify;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use factgen_core::config::{read_config, FactGenConfig};
use factgen_core::generate::stable::HashMode;
use factgen_core::generate::Environment;
use factgen_core::metadata::Parameters;
use factgen_core::schema::{TableId, TargetTable};

use crate::args::DatasetArgs;

/// Scale, hash mode and row overrides after applying precedence:
/// CLI flag (or its FACTGEN_* variable) > factgen.toml > default.
pub struct Dataset {
    pub scale: u32,
    pub hash_mode: HashMode,
    pub row_overrides: BTreeMap<TableId, u64>,
}

impl Dataset {
    pub fn resolve(args: &DatasetArgs, config: Option<&FactGenConfig>) -> Result<Self> {
        let scale = match (args.scale, config.and_then(|c| c.generate.scale)) {
            (Some(scale), _) | (None, Some(scale)) => scale,
            (None, None) => 1,
        };

        let hash_mode = match args.hash {
            Some(hash) => hash.into(),
            None => config
                .map(|c| c.hash_mode())
                .transpose()?
                .flatten()
                .unwrap_or_default(),
        };

        // factgen.toml [rows] as base, CLI --rows on top
        let mut row_overrides = config
            .map(|c| c.row_overrides())
            .transpose()?
            .unwrap_or_default();
        row_overrides.extend(args.parse_table_rows()?);

        Ok(Self {
            scale,
            hash_mode,
            row_overrides,
        })
    }

    pub fn environment(&self, table: TargetTable) -> Result<Environment> {
        let params = Parameters::new(self.scale, table, self.hash_mode)?;
        Environment::standard(params, &self.row_overrides)
            .context("Failed to set up the generation environment")
    }
}

/// Load the optional factgen.toml from the working directory.
pub fn load_config() -> Result<Option<FactGenConfig>> {
    Ok(read_config(Path::new("."))?)
}
