//! # Parameters and Row Counts
//!
//! [`Parameters`] carries the scalar run configuration every draw needs
//! (scale, target table, hash mode). [`MetadataProvider`] answers "how many
//! live rows does this dimension have at this scale", which bounds every
//! foreign key. Both are read-only for the whole run and shared by all
//! workers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FactGenError, Result};
use crate::generate::stable::HashMode;
use crate::schema::{TableId, TargetTable};

/// Orders generated per scale unit for store_sales.
pub const STORE_SALES_ORDERS_PER_SCALE: u64 = 240_000;

/// Scalar configuration of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub scale: u32,
    pub table: TargetTable,
    pub hash_mode: HashMode,
}

impl Parameters {
    pub fn new(scale: u32, table: TargetTable, hash_mode: HashMode) -> Result<Self> {
        if scale == 0 {
            return Err(FactGenError::InvalidScale { scale });
        }
        Ok(Self {
            scale,
            table,
            hash_mode,
        })
    }
}

/// Source of per-table live row counts.
pub trait MetadataProvider: Send + Sync {
    /// Rows a foreign key into `table` may reference (`1..=count`).
    fn live_row_count(&self, table: TableId) -> Result<u64>;
}

/// How a table's size grows with the scale factor.
#[derive(Debug, Clone, Copy)]
enum Growth {
    /// Same size at every scale.
    Fixed(u64),
    /// Rows per scale unit.
    Linear(u64),
    /// Published counts at scale 1, 10, 100 and 1000, interpolated linearly
    /// in between and held flat past the last point.
    Points([u64; 4]),
}

const SCALE_POINTS: [u64; 4] = [1, 10, 100, 1000];

fn growth(table: TableId) -> Growth {
    match table {
        TableId::Date => Growth::Fixed(73_049),
        TableId::Time => Growth::Fixed(86_400),
        TableId::CustomerDemographics => Growth::Fixed(1_920_800),
        TableId::HouseholdDemographics => Growth::Fixed(7_200),
        TableId::IncomeBand => Growth::Fixed(20),
        TableId::ShipMode => Growth::Fixed(20),
        TableId::Store => Growth::Points([12, 102, 402, 1_002]),
        TableId::Customer => Growth::Points([100_000, 500_000, 2_000_000, 12_000_000]),
        TableId::CustomerAddress => Growth::Points([50_000, 250_000, 1_000_000, 6_000_000]),
        TableId::Item => Growth::Points([18_000, 102_000, 204_000, 300_000]),
        TableId::Promotion => Growth::Points([300, 500, 1_000, 1_500]),
        TableId::Reason => Growth::Points([35, 45, 55, 65]),
        TableId::Warehouse => Growth::Points([5, 10, 15, 20]),
        TableId::CallCenter => Growth::Points([6, 24, 30, 42]),
        TableId::CatalogPage => Growth::Points([11_718, 12_000, 20_400, 30_000]),
        TableId::WebPage => Growth::Points([60, 200, 2_040, 3_000]),
        TableId::WebSite => Growth::Points([30, 42, 24, 54]),
        TableId::StoreSales => Growth::Linear(STORE_SALES_ORDERS_PER_SCALE),
        TableId::StoreReturns => Growth::Linear(STORE_SALES_ORDERS_PER_SCALE),
        TableId::CatalogSales => Growth::Linear(160_000),
        TableId::CatalogReturns => Growth::Linear(160_000),
        TableId::WebSales => Growth::Linear(60_000),
        TableId::WebReturns => Growth::Linear(60_000),
        TableId::Inventory => Growth::Linear(11_745_000),
    }
}

fn interpolate(points: &[u64; 4], scale: u64) -> u64 {
    if scale <= SCALE_POINTS[0] {
        return points[0];
    }
    for w in 0..SCALE_POINTS.len() - 1 {
        let (lo, hi) = (SCALE_POINTS[w], SCALE_POINTS[w + 1]);
        if scale <= hi {
            let (a, b) = (points[w] as i128, points[w + 1] as i128);
            let t = (scale - lo) as i128;
            let width = (hi - lo) as i128;
            return (a + (b - a) * t / width) as u64;
        }
    }
    points[3]
}

/// Default row counts, derived from the scale factor with optional
/// per-table overrides (from `[rows]` in factgen.toml).
#[derive(Debug, Clone)]
pub struct ScaledRowCounts {
    scale: u32,
    overrides: BTreeMap<TableId, u64>,
}

impl ScaledRowCounts {
    pub fn new(scale: u32) -> Self {
        Self {
            scale,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, table: TableId, rows: u64) -> Self {
        self.overrides.insert(table, rows);
        self
    }

    pub fn with_overrides(mut self, overrides: &BTreeMap<TableId, u64>) -> Self {
        self.overrides
            .extend(overrides.iter().map(|(t, rows)| (*t, *rows)));
        self
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl MetadataProvider for ScaledRowCounts {
    fn live_row_count(&self, table: TableId) -> Result<u64> {
        if let Some(rows) = self.overrides.get(&table) {
            return Ok(*rows);
        }
        let scale = u64::from(self.scale);
        Ok(match growth(table) {
            Growth::Fixed(rows) => rows,
            Growth::Linear(per_unit) => per_unit * scale,
            Growth::Points(points) => interpolate(&points, scale),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_points() {
        let sf1 = ScaledRowCounts::new(1);
        assert_eq!(sf1.live_row_count(TableId::Store).unwrap(), 12);
        assert_eq!(sf1.live_row_count(TableId::Item).unwrap(), 18_000);
        assert_eq!(sf1.live_row_count(TableId::Date).unwrap(), 73_049);
        assert_eq!(sf1.live_row_count(TableId::StoreSales).unwrap(), 240_000);

        let sf100 = ScaledRowCounts::new(100);
        assert_eq!(sf100.live_row_count(TableId::Customer).unwrap(), 2_000_000);
        assert_eq!(sf100.live_row_count(TableId::Date).unwrap(), 73_049);
        assert_eq!(sf100.live_row_count(TableId::StoreSales).unwrap(), 24_000_000);
    }

    #[test]
    fn test_interpolation_between_points() {
        let sf55 = ScaledRowCounts::new(55);
        // halfway between 102 (sf10) and 402 (sf100)
        assert_eq!(sf55.live_row_count(TableId::Store).unwrap(), 252);

        let sf5000 = ScaledRowCounts::new(5_000);
        assert_eq!(sf5000.live_row_count(TableId::Store).unwrap(), 1_002);
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert(TableId::Item, 600);
        let meta = ScaledRowCounts::new(10).with_overrides(&overrides);
        assert_eq!(meta.live_row_count(TableId::Item).unwrap(), 600);
        assert_eq!(meta.live_row_count(TableId::Store).unwrap(), 102);
    }

    #[test]
    fn test_parameters_reject_zero_scale() {
        let err = Parameters::new(0, TargetTable::StoreSales, HashMode::Legacy).unwrap_err();
        assert!(matches!(err, FactGenError::InvalidScale { scale: 0 }));
    }
}
