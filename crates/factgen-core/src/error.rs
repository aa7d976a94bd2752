//! # Error Types
//!
//! Defines `FactGenError`, the unified error enum for every failure mode in
//! the generation pipeline. Variants carry the table, column and row index
//! involved so a failing shard can be reproduced with `factgen validate`
//! without digging through logs.
//!
//! Nothing here is retryable: every draw is a pure function of its key, so
//! the same inputs fail the same way until the inputs or the code change.

use thiserror::Error;

/// All errors that can occur in factgen operations.
#[derive(Error, Debug)]
pub enum FactGenError {
    #[error("Unknown table '{name}'.\n  Known fact tables: {known}")]
    UnknownTable { name: String, known: String },

    #[error("Table '{name}' is recognised but not generated by factgen.\n  Supported: store_sales, store_returns")]
    UnsupportedTable { name: String },

    #[error("Invalid scale factor {scale}: scale must be at least 1")]
    InvalidScale { scale: u32 },

    #[error("Invalid shard: child {child} of {parallel}\n  --child must be between 1 and --parallel")]
    InvalidShard { child: u32, parallel: u32 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Range violation drawing {table}.{column} at row {index}: max {max} is below min {min}")]
    RangeViolation {
        table: String,
        column: String,
        index: u64,
        min: i64,
        max: i64,
    },

    #[error("Foreign key {column} at row {index} references {table}, which has no live rows")]
    EmptyDimension {
        table: String,
        column: String,
        index: u64,
    },

    #[error("Row {row} is outside {table} (1..={total}) at this scale")]
    RowOutOfRange { table: String, row: u64, total: u64 },

    #[error("Row {index} of {table} precedes the date cursor window starting at row {window_start}\n  Generators only move forward; seek a fresh generator for earlier rows")]
    CursorRegression {
        table: String,
        index: u64,
        window_start: u64,
    },

    #[error("Row {index} of {table} lies past the sales calendar ending {last_date}")]
    CalendarExhausted {
        table: String,
        index: u64,
        last_date: String,
    },

    #[error("Generator phase error: {message}")]
    Phase { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest error: {message}")]
    Manifest { message: String },

    #[error("Malformed {file} line {line}: {message}")]
    MalformedRow {
        file: String,
        line: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, FactGenError>;
