//! # Row Sinks
//!
//! Generators hand finished rows to a [`RowSink`]. The two file writers
//! ([`dat::DatWriter`], [`json::JsonlWriter`]) stream rows as they arrive;
//! [`MemorySink`] collects them for tests and random-access validation.

pub mod dat;
pub mod fields;
pub mod json;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FactGenError, Result};
use crate::generate::engine::{generate_shard, RunStats, ShardSpec};
use crate::generate::store_returns::ReturnRecord;
use crate::generate::store_sales::SalesRecord;
use crate::generate::Environment;
use crate::schema::TargetTable;

/// Receives generated rows.
pub trait RowSink: Send {
    fn emit_sale(&mut self, row: &SalesRecord) -> Result<()>;

    fn emit_return(&mut self, row: &ReturnRecord) -> Result<()>;

    /// Flush buffered output. Called once after the last row.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every emitted row in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub sales: Vec<SalesRecord>,
    pub returns: Vec<ReturnRecord>,
}

impl RowSink for MemorySink {
    fn emit_sale(&mut self, row: &SalesRecord) -> Result<()> {
        self.sales.push(row.clone());
        Ok(())
    }

    fn emit_return(&mut self, row: &ReturnRecord) -> Result<()> {
        self.returns.push(row.clone());
        Ok(())
    }
}

/// File format of generated tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pipe-delimited with a trailing delimiter, NULL as an empty field.
    #[default]
    Dat,
    /// One JSON object per line.
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Dat => "dat",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FactGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dat" => Ok(OutputFormat::Dat),
            "jsonl" | "json" => Ok(OutputFormat::Jsonl),
            other => Err(FactGenError::Config {
                message: format!("unknown output format '{}', expected 'dat' or 'jsonl'", other),
            }),
        }
    }
}

/// `<table>.<ext>` for a whole table, `<table>_<child>_<parallel>.<ext>`
/// for one shard.
pub fn file_name(table: TargetTable, format: OutputFormat, shard: ShardSpec) -> String {
    if shard.is_single() {
        format!("{}.{}", table, format.extension())
    } else {
        format!(
            "{}_{}_{}.{}",
            table,
            shard.child,
            shard.parallel,
            format.extension()
        )
    }
}

/// Generate one shard of `env`'s table into `dir`.
///
/// Rows are written to a hidden `.<name>.tmp` file that is renamed into
/// place once the shard is complete. On error the temporary file is removed
/// and any earlier file of the same name is left as it was.
pub fn write_shard_file(
    env: &Environment,
    dir: &Path,
    format: OutputFormat,
    shard: ShardSpec,
    progress_callback: Option<&dyn Fn(u64, u64)>,
) -> Result<(PathBuf, RunStats)> {
    std::fs::create_dir_all(dir).map_err(|e| FactGenError::Output {
        message: format!("creating output directory {}", dir.display()),
        source: e,
    })?;
    let name = file_name(env.params.table, format, shard);
    let path = dir.join(&name);
    let tmp_path = dir.join(format!(".{}.tmp", name));

    let written = open_sink(&tmp_path, format).and_then(|mut sink| {
        let stats = generate_shard(env, shard, sink.as_mut(), progress_callback)?;
        sink.finish()?;
        Ok(stats)
    });
    let stats = match written {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
                tracing::warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
            }
            return Err(e);
        }
    };

    std::fs::rename(&tmp_path, &path).map_err(|e| FactGenError::Output {
        message: format!("renaming {} → {}", tmp_path.display(), path.display()),
        source: e,
    })?;
    Ok((path, stats))
}

fn open_sink(path: &Path, format: OutputFormat) -> Result<Box<dyn RowSink>> {
    let file = File::create(path).map_err(|e| FactGenError::Output {
        message: format!("creating {}", path.display()),
        source: e,
    })?;
    let writer = BufWriter::new(file);
    Ok(match format {
        OutputFormat::Dat => Box::new(dat::DatWriter::new(writer)),
        OutputFormat::Jsonl => Box::new(json::JsonlWriter::new(writer)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::stable::HashMode;
    use crate::metadata::Parameters;
    use crate::schema::TableId;
    use std::collections::BTreeMap;

    #[test]
    fn test_file_names() {
        assert_eq!(
            file_name(TargetTable::StoreSales, OutputFormat::Dat, ShardSpec::single()),
            "store_sales.dat"
        );
        assert_eq!(
            file_name(
                TargetTable::StoreReturns,
                OutputFormat::Jsonl,
                ShardSpec::new(4, 2).unwrap()
            ),
            "store_returns_2_4.jsonl"
        );
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("DAT".parse::<OutputFormat>().unwrap(), OutputFormat::Dat);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    fn env(orders: u64, stores: u64) -> Environment {
        let params = Parameters::new(1, TargetTable::StoreSales, HashMode::Legacy).unwrap();
        let mut rows = BTreeMap::new();
        rows.insert(TableId::StoreSales, orders);
        rows.insert(TableId::Item, 600);
        rows.insert(TableId::Store, stores);
        Environment::standard(params, &rows).unwrap()
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_shard_file_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out");
        let shard = ShardSpec::new(2, 1).unwrap();
        let (path, stats) =
            write_shard_file(&env(100, 12), &nested, OutputFormat::Dat, shard, None).unwrap();
        assert_eq!(path, nested.join("store_sales_1_2.dat"));
        assert_eq!(stats.orders, 50);
        let lines = std::fs::read_to_string(&path).unwrap().lines().count() as u64;
        assert_eq!(lines, stats.sales);
        assert_eq!(names(&nested), vec!["store_sales_1_2.dat"]);
    }

    #[test]
    fn test_failed_shard_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        // no stores to draw a store key from
        let err = write_shard_file(
            &env(100, 0),
            dir.path(),
            OutputFormat::Dat,
            ShardSpec::single(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, FactGenError::EmptyDimension { .. }));
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn test_failed_shard_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("store_sales.dat");
        std::fs::write(&previous, "earlier run\n").unwrap();
        write_shard_file(
            &env(100, 0),
            dir.path(),
            OutputFormat::Dat,
            ShardSpec::single(),
            None,
        )
        .unwrap_err();
        assert_eq!(std::fs::read_to_string(&previous).unwrap(), "earlier run\n");
        assert_eq!(names(dir.path()), vec!["store_sales.dat"]);
    }
}
