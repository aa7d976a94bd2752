use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use factgen_core::generate::stable::HashMode;
use factgen_core::output::OutputFormat;
use factgen_core::schema::{TableId, TargetTable};

#[derive(Parser, Debug)]
#[command(
    name = "factgen",
    about = "Generate deterministic, shard-independent store sales and returns data",
    version,
    after_help = "Examples:\n  factgen generate --scale 1 --table store_sales --output ./data\n  factgen generate --scale 10 --table store_returns --parallel 8 --jobs 4\n  factgen generate --parallel 8 --child 3      # one shard only\n  factgen validate --table store_sales 1 500 12345\n  factgen verify ./data\n  factgen info --scale 100"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a store_sales or store_returns table (or one shard of it)
    Generate(GenerateArgs),

    /// Regenerate single rows by random access and print them
    Validate(ValidateArgs),

    /// Check generated sales and returns files against each other
    Verify(VerifyArgs),

    /// Show live row counts at a scale factor
    Info(InfoArgs),
}

/// Settings that decide what the generated data looks like.
#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// Scale factor (roughly gigabytes of raw data)
    #[arg(short, long, env = "FACTGEN_SCALE")]
    pub scale: Option<u32>,

    /// Hash mode for the deterministic field generator
    #[arg(long, env = "FACTGEN_HASH")]
    pub hash: Option<HashArg>,

    /// Per-table live row-count overrides (e.g., item=600,store_sales=5000)
    #[arg(long = "rows", value_delimiter = ',')]
    pub table_rows: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Table to generate (store_sales or store_returns)
    #[arg(short, long, env = "FACTGEN_TABLE")]
    pub table: Option<String>,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output directory
    #[arg(short, long, env = "FACTGEN_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, env = "FACTGEN_FORMAT")]
    pub format: Option<FormatArg>,

    /// Split the table into this many shards
    #[arg(long, env = "FACTGEN_PARALLEL")]
    pub parallel: Option<u32>,

    /// Generate only this shard (1-based); all shards when omitted
    #[arg(long, env = "FACTGEN_CHILD")]
    pub child: Option<u32>,

    /// Shards to generate concurrently
    #[arg(short, long, default_value = "1", env = "FACTGEN_JOBS")]
    pub jobs: usize,

    /// Don't write or update factgen.manifest.json
    #[arg(long)]
    pub no_manifest: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Table the rows belong to
    #[arg(short, long, default_value = "store_sales", env = "FACTGEN_TABLE")]
    pub table: String,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output format for the printed rows
    #[arg(long, default_value = "dat")]
    pub format: FormatArg,

    /// Order numbers to regenerate (1-based)
    #[arg(required = true)]
    pub orders: Vec<u64>,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Directory holding the generated .dat files
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Output format for the report
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HashArg {
    Legacy,
    Wide,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Dat,
    Jsonl,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Text,
    Table,
    Json,
}

impl From<HashArg> for HashMode {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Legacy => HashMode::Legacy,
            HashArg::Wide => HashMode::Wide,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Dat => OutputFormat::Dat,
            FormatArg::Jsonl => OutputFormat::Jsonl,
        }
    }
}

/// Parse a table name given on the command line.
pub fn parse_target(name: &str) -> Result<TargetTable> {
    name.parse::<TargetTable>()
        .with_context(|| format!("Invalid --table '{}'", name))
}

impl DatasetArgs {
    /// Parse row overrides like "item=600,store_sales=5000".
    /// Returns a BTreeMap for deterministic manifest serialization.
    pub fn parse_table_rows(&self) -> Result<BTreeMap<TableId, u64>> {
        let mut map = BTreeMap::new();
        for entry in &self.table_rows {
            let (table, count) = entry
                .split_once('=')
                .with_context(|| format!("Expected TABLE=ROWS in --rows, got '{}'", entry))?;
            let table = table
                .parse::<TableId>()
                .with_context(|| format!("Invalid table in --rows entry '{}'", entry))?;
            let count = count
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid row count in --rows entry '{}'", entry))?;
            map.insert(table, count);
        }
        Ok(map)
    }
}
