//! # Slowly-Changing Item Dimension
//!
//! The item dimension stores several time-versioned rows per business key.
//! A sale references the business key's version that was current on the sale
//! date. The permutation walks business keys; this module maps a business
//! key plus a date to the surrogate row.
//!
//! Layout used by [`RevisionedItems`]: surrogate rows come in blocks of six
//! holding three business keys with one, two and three revisions. Rows past
//! the last full block are single-revision keys.

use chrono::NaiveDate;

use crate::error::{FactGenError, Result};
use crate::metadata::MetadataProvider;
use crate::schema::TableId;

/// Maps a business key and a date to the surrogate key valid on that date.
pub trait ScdResolver: Send + Sync {
    /// Number of business keys (the permutation size).
    fn id_count(&self) -> u64;

    fn resolve_as_of(&self, logical_id: u64, date: NaiveDate) -> Result<u64>;
}

const ROWS_PER_BLOCK: u64 = 6;
const IDS_PER_BLOCK: u64 = 3;

fn boundary(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// Fixed revision layout over the item dimension's live rows.
#[derive(Debug, Clone, Copy)]
pub struct RevisionedItems {
    rows: u64,
    split_two: NaiveDate,
    split_three: (NaiveDate, NaiveDate),
}

impl RevisionedItems {
    pub fn new(rows: u64) -> Self {
        Self {
            rows,
            split_two: boundary(2000, 1, 1),
            split_three: (boundary(1999, 1, 1), boundary(2001, 1, 1)),
        }
    }

    pub fn from_metadata(metadata: &dyn MetadataProvider) -> Result<Self> {
        Ok(Self::new(metadata.live_row_count(TableId::Item)?))
    }

    fn full_blocks(&self) -> u64 {
        self.rows / ROWS_PER_BLOCK
    }

    /// Surrogate rows (first row, revision count) of a business key.
    fn versions(&self, logical_id: u64) -> Option<(u64, u64)> {
        if logical_id == 0 || logical_id > self.id_count() {
            return None;
        }
        let blocked_ids = self.full_blocks() * IDS_PER_BLOCK;
        if logical_id > blocked_ids {
            let tail = logical_id - blocked_ids;
            return Some((self.full_blocks() * ROWS_PER_BLOCK + tail, 1));
        }
        let block = (logical_id - 1) / IDS_PER_BLOCK;
        let base = block * ROWS_PER_BLOCK;
        Some(match (logical_id - 1) % IDS_PER_BLOCK {
            0 => (base + 1, 1),
            1 => (base + 2, 2),
            _ => (base + 4, 3),
        })
    }
}

impl ScdResolver for RevisionedItems {
    fn id_count(&self) -> u64 {
        self.full_blocks() * IDS_PER_BLOCK + self.rows % ROWS_PER_BLOCK
    }

    fn resolve_as_of(&self, logical_id: u64, date: NaiveDate) -> Result<u64> {
        let (first, revisions) =
            self.versions(logical_id)
                .ok_or_else(|| FactGenError::RowOutOfRange {
                    table: "item business key".to_string(),
                    row: logical_id,
                    total: self.id_count(),
                })?;
        let revision = match revisions {
            1 => 0,
            2 => u64::from(date >= self.split_two),
            _ => {
                let (early, late) = self.split_three;
                if date < early {
                    0
                } else if date < late {
                    1
                } else {
                    2
                }
            }
        };
        Ok(first + revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_id_count() {
        assert_eq!(RevisionedItems::new(18_000).id_count(), 9_000);
        assert_eq!(RevisionedItems::new(8).id_count(), 5);
        assert_eq!(RevisionedItems::new(0).id_count(), 0);
    }

    #[test]
    fn test_revision_selection() {
        let items = RevisionedItems::new(12);
        // block 0: id 1 -> row 1; id 2 -> rows 2..=3; id 3 -> rows 4..=6
        assert_eq!(items.resolve_as_of(1, d(1998, 5, 1)).unwrap(), 1);
        assert_eq!(items.resolve_as_of(2, d(1999, 12, 31)).unwrap(), 2);
        assert_eq!(items.resolve_as_of(2, d(2000, 1, 1)).unwrap(), 3);
        assert_eq!(items.resolve_as_of(3, d(1998, 12, 31)).unwrap(), 4);
        assert_eq!(items.resolve_as_of(3, d(2000, 6, 1)).unwrap(), 5);
        assert_eq!(items.resolve_as_of(3, d(2002, 1, 1)).unwrap(), 6);
        // block 1 starts at row 7
        assert_eq!(items.resolve_as_of(4, d(2002, 1, 1)).unwrap(), 7);
    }

    #[test]
    fn test_tail_rows_are_single_revision() {
        let items = RevisionedItems::new(8);
        assert_eq!(items.resolve_as_of(4, d(2001, 1, 1)).unwrap(), 7);
        assert_eq!(items.resolve_as_of(5, d(1998, 1, 1)).unwrap(), 8);
    }

    #[test]
    fn test_every_resolution_is_a_live_row() {
        let items = RevisionedItems::new(601);
        for id in 1..=items.id_count() {
            for date in [d(1998, 1, 2), d(1999, 6, 1), d(2000, 6, 1), d(2002, 12, 31)] {
                let sk = items.resolve_as_of(id, date).unwrap();
                assert!((1..=601).contains(&sk));
            }
        }
    }

    #[test]
    fn test_unknown_business_key() {
        let items = RevisionedItems::new(6);
        assert!(items.resolve_as_of(0, d(2000, 1, 1)).is_err());
        assert!(items.resolve_as_of(4, d(2000, 1, 1)).is_err());
    }
}
