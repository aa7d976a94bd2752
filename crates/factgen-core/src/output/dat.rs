use std::io::Write;

use crate::error::{FactGenError, Result};
use crate::generate::store_returns::ReturnRecord;
use crate::generate::store_sales::SalesRecord;
use crate::output::fields::{return_fields, sale_fields, Field};
use crate::output::RowSink;

pub const DELIMITER: char = '|';

/// Write generated rows as pipe-delimited `.dat` lines.
///
/// Every field, including the last, is followed by the delimiter. NULL keys
/// print as empty fields; money always prints with two decimals.
pub struct DatWriter<W: Write> {
    writer: W,
    line: String,
}

impl<W: Write> DatWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line: String::with_capacity(256),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_fields<'a>(&mut self, fields: impl Iterator<Item = &'a Field>) -> Result<()> {
        use std::fmt::Write as _;

        self.line.clear();
        for field in fields {
            // writing into a String cannot fail
            let _ = write!(self.line, "{}{}", field, DELIMITER);
        }
        self.line.push('\n');
        self.writer
            .write_all(self.line.as_bytes())
            .map_err(|e| FactGenError::Output {
                message: "writing dat row".to_string(),
                source: e,
            })
    }
}

impl<W: Write + Send> RowSink for DatWriter<W> {
    fn emit_sale(&mut self, row: &SalesRecord) -> Result<()> {
        let fields = sale_fields(row);
        self.write_fields(fields.iter().map(|(_, field)| field))
    }

    fn emit_return(&mut self, row: &ReturnRecord) -> Result<()> {
        let fields = return_fields(row);
        self.write_fields(fields.iter().map(|(_, field)| field))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| FactGenError::Output {
            message: "flushing dat output".to_string(),
            source: e,
        })
    }
}

/// Split a `.dat` line into its fields, dropping the trailing delimiter.
/// Returns `None` when the line does not end with the delimiter.
pub fn split_line(line: &str) -> Option<Vec<&str>> {
    let body = line.trim_end_matches(['\r', '\n']).strip_suffix(DELIMITER)?;
    Some(body.split(DELIMITER).collect())
}
