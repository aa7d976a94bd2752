use std::io::Write;

use serde_json::{Map, Value};

use crate::error::{FactGenError, Result};
use crate::generate::store_returns::ReturnRecord;
use crate::generate::store_sales::SalesRecord;
use crate::output::fields::{return_fields, sale_fields, Field};
use crate::output::RowSink;

/// Write generated rows as JSON Lines, one object per row.
///
/// Keys are the printed column names, in print order. NULL keys become
/// `null`; money is a string with two decimals so no precision is lost to
/// floating point.
pub struct JsonlWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_object<'a>(
        &mut self,
        fields: impl Iterator<Item = &'a (&'static str, Field)>,
    ) -> Result<()> {
        let object: Map<String, Value> = fields
            .map(|(name, field)| (name.to_string(), json_value(field)))
            .collect();
        serde_json::to_writer(&mut self.writer, &object).map_err(|e| FactGenError::Output {
            message: "serializing jsonl row".to_string(),
            source: e.into(),
        })?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| FactGenError::Output {
                message: "writing jsonl row".to_string(),
                source: e,
            })
    }
}

fn json_value(field: &Field) -> Value {
    match field {
        Field::Key(Some(key)) => Value::from(*key),
        Field::Key(None) => Value::Null,
        Field::Int(value) => Value::from(*value),
        Field::Money(_) => Value::String(field.to_string()),
    }
}

impl<W: Write + Send> RowSink for JsonlWriter<W> {
    fn emit_sale(&mut self, row: &SalesRecord) -> Result<()> {
        self.write_object(sale_fields(row).iter())
    }

    fn emit_return(&mut self, row: &ReturnRecord) -> Result<()> {
        self.write_object(return_fields(row).iter())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| FactGenError::Output {
            message: "flushing jsonl output".to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::stable::HashMode;
    use crate::generate::store_sales::StoreSalesGenerator;
    use crate::generate::Environment;
    use crate::metadata::Parameters;
    use crate::output::dat::{split_line, DatWriter};
    use crate::schema::columns::STORE_RETURNS_COLUMNS;
    use crate::schema::{TableId, TargetTable};
    use std::collections::BTreeMap;

    fn env() -> Environment {
        let params = Parameters::new(1, TargetTable::StoreReturns, HashMode::Legacy).unwrap();
        let mut rows = BTreeMap::new();
        rows.insert(TableId::StoreSales, 500);
        rows.insert(TableId::Item, 600);
        Environment::standard(params, &rows).unwrap()
    }

    #[test]
    fn test_jsonl_matches_dat_values() {
        let mut json = JsonlWriter::new(Vec::new());
        let mut dat = DatWriter::new(Vec::new());
        let mut a = StoreSalesGenerator::new(env());
        let mut b = StoreSalesGenerator::new(env());
        for order in 1..=40 {
            a.generate_order(order, &mut json).unwrap();
            b.generate_order(order, &mut dat).unwrap();
        }
        let json = String::from_utf8(json.into_inner()).unwrap();
        let dat = String::from_utf8(dat.into_inner()).unwrap();
        assert!(json.lines().count() > 0);
        assert_eq!(json.lines().count(), dat.lines().count());

        for (j, d) in json.lines().zip(dat.lines()) {
            let object: Value = serde_json::from_str(j).unwrap();
            let fields = split_line(d).unwrap();
            for (name, text) in STORE_RETURNS_COLUMNS.iter().zip(fields) {
                let rendered = match &object[*name] {
                    Value::Null => String::new(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                assert_eq!(rendered, text, "column {}", name);
            }
        }
    }

    #[test]
    fn test_keys_follow_column_order() {
        let mut json = JsonlWriter::new(Vec::new());
        let mut generator = StoreSalesGenerator::new(env());
        for order in 1..=40 {
            generator.generate_order(order, &mut json).unwrap();
        }
        let json = String::from_utf8(json.into_inner()).unwrap();
        let first = json.lines().next().unwrap();
        let object: Value = serde_json::from_str(first).unwrap();
        let keys: Vec<&str> = object.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, STORE_RETURNS_COLUMNS.to_vec());
    }
}
