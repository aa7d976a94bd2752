use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FactGenError, Result};
use crate::generate::store_sales::StoreSalesGenerator;
use crate::generate::Environment;
use crate::output::RowSink;
use crate::schema::TableId;

/// Progress reporting batch size, in orders.
const PROGRESS_BATCH_SIZE: u64 = 1_000;

/// One child of a sharded run: `child` of `parallel`, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    pub parallel: u32,
    pub child: u32,
}

impl ShardSpec {
    pub fn new(parallel: u32, child: u32) -> Result<Self> {
        if parallel == 0 || child == 0 || child > parallel {
            return Err(FactGenError::InvalidShard { child, parallel });
        }
        Ok(Self { parallel, child })
    }

    /// The whole table as one shard.
    pub fn single() -> Self {
        Self {
            parallel: 1,
            child: 1,
        }
    }

    pub fn is_single(&self) -> bool {
        self.parallel == 1
    }

    /// Order indexes owned by this child, as a half-open 1-based range.
    ///
    /// Ranges are contiguous and cover `1..=total`; the first
    /// `total % parallel` children take one extra order.
    pub fn orders(&self, total: u64) -> Range<u64> {
        let parallel = u64::from(self.parallel);
        let before = u64::from(self.child - 1);
        let base = total / parallel;
        let extra = total % parallel;
        let first = 1 + before * base + before.min(extra);
        let len = base + u64::from(before < extra);
        first..first + len
    }

    /// Fail if `table` can only be generated whole and this is a real split.
    pub fn ensure_shardable(&self, table: TableId) -> Result<()> {
        if self.is_single() || table.supports_sharding() {
            return Ok(());
        }
        Err(FactGenError::Config {
            message: format!(
                "{} cannot be split into shards (child {} of {})",
                table, self.child, self.parallel
            ),
        })
    }

    /// The shards a run writes: child `child` of `parallel` when given,
    /// otherwise every child in order.
    pub fn plan(parallel: u32, child: Option<u32>) -> Result<Vec<ShardSpec>> {
        if parallel == 0 {
            return Err(FactGenError::InvalidShard {
                child: child.unwrap_or(0),
                parallel,
            });
        }
        if parallel == 1 && child.unwrap_or(1) == 1 {
            return Ok(vec![ShardSpec::single()]);
        }
        match child {
            Some(child) => Ok(vec![ShardSpec::new(parallel, child)?]),
            None => (1..=parallel).map(|c| ShardSpec::new(parallel, c)).collect(),
        }
    }
}

/// Counts from a generation run. Lines and returns are counted whether or
/// not they were emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub orders: u64,
    pub sales: u64,
    pub returns: u64,
}

impl RunStats {
    pub fn merge(&mut self, other: RunStats) {
        self.orders += other.orders;
        self.sales += other.sales;
        self.returns += other.returns;
    }

    /// Returned lines per sold line.
    pub fn return_ratio(&self) -> f64 {
        if self.sales == 0 {
            0.0
        } else {
            self.returns as f64 / self.sales as f64
        }
    }
}

/// Generate orders `orders` (half-open, 1-based) into `sink`.
///
/// The cursor is seeked to the first order, so the output is identical to
/// the same orders of a run that started at order 1.
pub fn generate_range(
    env: &Environment,
    orders: Range<u64>,
    sink: &mut dyn RowSink,
    progress_callback: Option<&dyn Fn(u64, u64)>,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    if orders.is_empty() {
        debug!("Empty order range, nothing to generate");
        return Ok(stats);
    }
    let total = orders.end - orders.start;
    debug!(
        "Generating {} orders {}..{} at scale {}",
        env.params.table, orders.start, orders.end, env.params.scale
    );

    let mut generator = StoreSalesGenerator::new(env.clone());
    generator.seek(orders.start)?;
    for index in orders {
        let summary = generator.generate_order(index, sink)?;
        stats.orders += 1;
        stats.sales += u64::from(summary.lines);
        stats.returns += u64::from(summary.returns);

        if let Some(cb) = progress_callback {
            if stats.orders % PROGRESS_BATCH_SIZE == 0 || stats.orders == total {
                cb(stats.orders, total);
            }
        }
    }

    info!(
        "Generated {} orders: {} sales lines, {} returns",
        stats.orders, stats.sales, stats.returns
    );
    Ok(stats)
}

/// Generate the orders owned by one shard.
pub fn generate_shard(
    env: &Environment,
    shard: ShardSpec,
    sink: &mut dyn RowSink,
    progress_callback: Option<&dyn Fn(u64, u64)>,
) -> Result<RunStats> {
    shard.ensure_shardable(env.params.table.table_id())?;
    let orders = shard.orders(env.order_count()?);
    debug!(
        "Shard {}/{} owns orders {}..{}",
        shard.child, shard.parallel, orders.start, orders.end
    );
    generate_range(env, orders, sink, progress_callback)
}
