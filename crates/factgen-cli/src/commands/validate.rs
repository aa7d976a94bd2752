use std::io::{self, BufWriter};

use anyhow::{Context, Result};

use factgen_core::generate::validate::{target_line, validate_row};
use factgen_core::output::dat::DatWriter;
use factgen_core::output::json::JsonlWriter;
use factgen_core::output::{OutputFormat, RowSink};
use factgen_core::schema::TargetTable;

use super::{load_config, Dataset};
use crate::args::{parse_target, ValidateArgs};

/// Regenerate one line of each requested order and print it to stdout.
///
/// For store_returns an order's chosen line may not have been returned;
/// that is reported on stderr and nothing is printed for it.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let config = load_config()?;
    let table = parse_target(&args.table)?;
    let dataset = Dataset::resolve(&args.dataset, config.as_ref())?;
    let env = dataset.environment(table)?;

    let stdout = BufWriter::new(io::stdout());
    let mut sink: Box<dyn RowSink> = match OutputFormat::from(args.format) {
        OutputFormat::Dat => Box::new(DatWriter::new(stdout)),
        OutputFormat::Jsonl => Box::new(JsonlWriter::new(stdout)),
    };

    for &order in &args.orders {
        let outcome = validate_row(&env, order, sink.as_mut())
            .with_context(|| format!("Failed to validate {} order {}", table, order))?;
        if table == TargetTable::StoreReturns && outcome.ret.is_none() {
            eprintln!(
                "order {} line {} (item {}): not returned",
                order,
                target_line(&env, order)?,
                outcome.sale.item_sk
            );
        }
    }
    sink.finish()?;
    Ok(())
}
