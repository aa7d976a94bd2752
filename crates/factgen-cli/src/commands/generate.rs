use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use factgen_core::generate::engine::{RunStats, ShardSpec};
use factgen_core::generate::Environment;
use factgen_core::manifest;
use factgen_core::manifest::types::ManifestEntry;
use factgen_core::output::{write_shard_file, OutputFormat};
use factgen_core::schema::TargetTable;

use super::{load_config, Dataset};
use crate::args::{parse_target, GenerateArgs};

/// What one shard wrote.
struct ShardOutcome {
    shard: ShardSpec,
    path: PathBuf,
    stats: RunStats,
}

impl ShardOutcome {
    /// Rows in the written file: sales lines or returns, per table.
    fn rows(&self, table: TargetTable) -> u64 {
        match table {
            TargetTable::StoreSales => self.stats.sales,
            TargetTable::StoreReturns => self.stats.returns,
        }
    }
}

pub async fn run(args: &GenerateArgs) -> Result<()> {
    // Load optional factgen.toml config
    let config = load_config()?;
    let config = config.as_ref();

    let table = match (&args.table, config.map(|c| c.target_table()).transpose()?.flatten()) {
        (Some(name), _) => parse_target(name)?,
        (None, Some(table)) => table,
        (None, None) => TargetTable::StoreSales,
    };
    let dataset = Dataset::resolve(&args.dataset, config)?;
    let format: OutputFormat = match args.format {
        Some(format) => format.into(),
        None => config
            .map(|c| c.output_format())
            .transpose()?
            .flatten()
            .unwrap_or_default(),
    };
    let output_dir = args
        .output
        .clone()
        .or_else(|| config.and_then(|c| c.output_dir()))
        .unwrap_or_else(|| PathBuf::from("."));

    let shards = match (args.parallel, args.child) {
        (Some(parallel), child) => ShardSpec::plan(parallel, child)?,
        (None, Some(child)) => match config.and_then(|c| c.shard.parallel) {
            Some(parallel) => ShardSpec::plan(parallel, Some(child))?,
            None => bail!("--child {} needs --parallel (or [shard] parallel in factgen.toml)", child),
        },
        (None, None) => config
            .map(|c| c.shards())
            .transpose()?
            .flatten()
            .unwrap_or_else(|| vec![ShardSpec::single()]),
    };
    if args.jobs == 0 {
        bail!("--jobs must be at least 1");
    }
    for shard in &shards {
        shard.ensure_shardable(table.table_id())?;
    }

    let env = dataset.environment(table)?;
    let total_orders = env.order_count()?;
    eprintln!(
        "Generating {} at scale {} ({} hash, {} orders, {} shard{}) → {}",
        table,
        dataset.scale,
        dataset.hash_mode,
        total_orders,
        shards.len(),
        if shards.len() == 1 { "" } else { "s" },
        output_dir.display(),
    );

    let outcomes = run_shards(&env, format, &output_dir, &shards, args.jobs).await?;

    let mut totals = RunStats::default();
    for outcome in &outcomes {
        totals.merge(outcome.stats);
    }

    if !args.no_manifest {
        record_manifest(&output_dir, &env, format, &dataset, &outcomes)?;
    }

    print_summary(table, &outcomes);
    eprintln!(
        "\n✓ Generated {} orders: {} sales lines, {} returns ({:.2}% returned)",
        totals.orders,
        totals.sales,
        totals.returns,
        totals.return_ratio() * 100.0,
    );
    Ok(())
}

/// Run every shard on the blocking pool, at most `jobs` at a time.
async fn run_shards(
    env: &Environment,
    format: OutputFormat,
    output_dir: &Path,
    shards: &[ShardSpec],
    jobs: usize,
) -> Result<Vec<ShardOutcome>> {
    let bars = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{prefix}] {bar:40.cyan/dim} {pos}/{len} orders ({eta})")
        .context("Invalid progress bar template")?
        .progress_chars("█▓░");

    let total_orders = env.order_count()?;
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();

    for &shard in shards {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("Shard scheduler closed")?;

        let orders = shard.orders(total_orders);
        let bar = bars.add(ProgressBar::new(orders.end - orders.start));
        bar.set_style(style.clone());
        bar.set_prefix(format!("{}/{}", shard.child, shard.parallel));

        let env = env.clone();
        let dir = output_dir.to_path_buf();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let (path, stats) = write_shard_file(
                &env,
                &dir,
                format,
                shard,
                Some(&|current: u64, _total: u64| bar.set_position(current)),
            )?;
            bar.finish();
            Ok::<_, anyhow::Error>(ShardOutcome { shard, path, stats })
        });
    }

    let mut outcomes = Vec::with_capacity(shards.len());
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.context("Shard worker panicked")??;
        outcomes.push(outcome);
    }
    outcomes.sort_by_key(|o| o.shard.child);
    Ok(outcomes)
}

/// Hash every written file and upsert it into the directory's manifest.
fn record_manifest(
    output_dir: &Path,
    env: &Environment,
    format: OutputFormat,
    dataset: &Dataset,
    outcomes: &[ShardOutcome],
) -> Result<()> {
    let path = output_dir.join(manifest::MANIFEST_FILE_NAME);
    let mut manifest = manifest::read_or_new(&path)?;
    let created_at = chrono::Utc::now().to_rfc3339();

    for outcome in outcomes {
        let (sha256, bytes) = manifest::hash_file(&outcome.path)?;
        let file = outcome
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Output path {} has no file name", outcome.path.display()))?;
        manifest.upsert(ManifestEntry {
            file,
            table: env.params.table,
            scale: dataset.scale,
            hash_mode: dataset.hash_mode,
            format,
            shard: outcome.shard,
            row_overrides: dataset.row_overrides.clone(),
            stats: outcome.stats,
            rows: outcome.rows(env.params.table),
            bytes,
            sha256,
            created_at: created_at.clone(),
        });
    }

    manifest::write_manifest(&manifest, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!("Updated {}", path.display());
    Ok(())
}

fn print_summary(table: TargetTable, outcomes: &[ShardOutcome]) {
    let mut t = ComfyTable::new();
    t.set_header(vec!["Shard", "File", "Orders", "Rows"]);
    for outcome in outcomes {
        t.add_row(vec![
            Cell::new(format!("{}/{}", outcome.shard.child, outcome.shard.parallel)),
            Cell::new(outcome.path.display()),
            Cell::new(outcome.stats.orders),
            Cell::new(outcome.rows(table)),
        ]);
    }
    eprintln!("{}", t);
}
