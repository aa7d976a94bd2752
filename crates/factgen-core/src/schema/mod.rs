//! # Table and Column Identifiers
//!
//! Stable numeric identities for benchmark tables and store-channel columns.
//! Both feed the deterministic hash, so they are part of the output format.

pub mod columns;
pub mod tables;

pub use columns::ColumnId;
pub use tables::{TableId, TargetTable};
