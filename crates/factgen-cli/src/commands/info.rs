use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};
use serde::Serialize;

use factgen_core::generate::calendar::{sales_end, sales_start};
use factgen_core::metadata::{MetadataProvider, ScaledRowCounts};
use factgen_core::schema::{TableId, TargetTable};

use super::{load_config, Dataset};
use crate::args::{InfoArgs, ReportFormat};

#[derive(Serialize)]
struct TableInfo {
    table: TableId,
    id: u64,
    rows: u64,
    overridden: bool,
    generated: bool,
}

/// Show the live row count of every known table at the requested scale.
pub fn run(args: &InfoArgs) -> Result<()> {
    let config = load_config()?;
    let dataset = Dataset::resolve(&args.dataset, config.as_ref())?;
    let counts = ScaledRowCounts::new(dataset.scale).with_overrides(&dataset.row_overrides);

    let mut tables = Vec::with_capacity(TableId::ALL.len());
    for table in TableId::ALL {
        tables.push(TableInfo {
            table,
            id: table.id(),
            rows: counts.live_row_count(table)?,
            overridden: dataset.row_overrides.contains_key(&table),
            generated: TargetTable::try_from(table).is_ok(),
        });
    }

    match args.format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
        ReportFormat::Text | ReportFormat::Table => {
            println!(
                "Scale: {}  Hash: {}  Sales calendar: {} .. {}",
                dataset.scale,
                dataset.hash_mode,
                sales_start(),
                sales_end()
            );
            println!();

            let mut t = ComfyTable::new();
            t.set_header(vec!["Table", "Id", "Rows", "Kind"]);
            for info in &tables {
                let mut rows = info.rows.to_string();
                if info.overridden {
                    rows.push_str(" *");
                }
                let kind = match (info.generated, info.table.is_fact()) {
                    (true, _) => "fact (generated)",
                    (false, true) => "fact",
                    (false, false) => "dimension",
                };
                t.add_row(vec![
                    Cell::new(info.table),
                    Cell::new(info.id),
                    Cell::new(rows),
                    Cell::new(kind),
                ]);
            }
            println!("{}", t);
            if !dataset.row_overrides.is_empty() {
                println!("* overridden");
            }
        }
    }

    Ok(())
}
