pub mod config;
pub mod error;
pub mod generate;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod schema;
pub mod verify;

// Re-export key types for convenience
pub use error::{FactGenError, Result};
pub use generate::engine::{generate_range, generate_shard, RunStats, ShardSpec};
pub use generate::stable::HashMode;
pub use generate::Environment;
pub use metadata::Parameters;
pub use schema::{TableId, TargetTable};
