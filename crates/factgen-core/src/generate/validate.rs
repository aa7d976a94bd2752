//! # Random-Access Row Validation
//!
//! Rebuilds one line item of one order without generating the orders before
//! it: seek the date cursor, run the master phase, pick a line with a keyed
//! draw, replay the earlier lines of that order without emitting, then emit
//! the chosen line.

use tracing::debug;

use crate::error::{FactGenError, Result};
use crate::generate::store_sales::{
    LineOutcome, StoreSalesGenerator, MAX_LINES_PER_ORDER, MIN_LINES_PER_ORDER,
};
use crate::generate::Environment;
use crate::output::RowSink;
use crate::schema::{ColumnId, TableId};

/// Line of order `row_index` that validation rebuilds (1-based).
pub fn target_line(env: &Environment, row_index: u64) -> Result<u32> {
    let scale = env.scale();
    let line_count = env.rng.uniform_int(
        TableId::StoreSales,
        scale,
        row_index,
        MIN_LINES_PER_ORDER,
        MAX_LINES_PER_ORDER,
        ColumnId::SsTicketNumber.seed(),
    )?;
    let line = env.rng.uniform_int(
        TableId::StoreSales,
        scale,
        row_index,
        1,
        line_count,
        ColumnId::SsPricingQuantity.seed(),
    )?;
    Ok(line as u32)
}

/// Emit the validation line of order `row_index` to `sink` and return it.
pub fn validate_row(
    env: &Environment,
    row_index: u64,
    sink: &mut dyn RowSink,
) -> Result<LineOutcome> {
    let total = env.order_count()?;
    if row_index == 0 || row_index > total {
        return Err(FactGenError::RowOutOfRange {
            table: env.params.table.to_string(),
            row: row_index,
            total,
        });
    }

    let mut generator = StoreSalesGenerator::new(env.clone());
    generator.seek(row_index)?;
    generator.master(row_index)?;
    let line = target_line(env, row_index)?;
    debug!(
        "Validating {} order {} line {}",
        env.params.table, row_index, line
    );
    for _ in 1..line {
        generator.detail(sink, false)?;
    }
    generator.detail(sink, true)
}
