//! # Date Scaling and the Generator Cursor
//!
//! Orders are spread over the sales calendar with a skew (weekends and the
//! November–December season get more orders). The allotment is expressed as
//! cumulative row boundaries, so the date of any order index can be found
//! without walking earlier orders, and a worker starting mid-table lands on
//! exactly the cursor a sequential run would have reached.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

use crate::error::{FactGenError, Result};
use crate::metadata::MetadataProvider;
use crate::schema::TableId;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// Calendar date of date dimension row 1.
pub fn date_dim_start() -> NaiveDate {
    ymd(1900, 1, 2)
}

/// Calendar date of a date dimension surrogate key (row number).
pub fn date_for_key(date_sk: u64) -> Option<NaiveDate> {
    let offset = i64::try_from(date_sk.checked_sub(1)?).ok()?;
    date_dim_start().checked_add_signed(Duration::try_days(offset)?)
}

/// First day of the sales calendar.
pub fn sales_start() -> NaiveDate {
    ymd(1998, 1, 2)
}

/// Last day of the sales calendar.
pub fn sales_end() -> NaiveDate {
    ymd(2002, 12, 31)
}

/// The current simulated date and the order indexes allotted to it.
///
/// `first_index > last_index` means the date received no orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorCursor {
    pub date: NaiveDate,
    pub first_index: u64,
    pub last_index: u64,
}

impl GeneratorCursor {
    pub fn contains(&self, index: u64) -> bool {
        (self.first_index..=self.last_index).contains(&index)
    }

    /// Step forward one date at a time until `index` falls inside the
    /// current allotment. Returns the number of dates stepped over.
    pub fn advance_to<S: DateScaling + ?Sized>(
        &mut self,
        table: TableId,
        index: u64,
        scaling: &S,
    ) -> Result<u32> {
        if index < self.first_index {
            return Err(FactGenError::CursorRegression {
                table: table.to_string(),
                index,
                window_start: self.first_index,
            });
        }
        let mut steps = 0;
        while index > self.last_index {
            let next = self
                .date
                .succ_opt()
                .filter(|d| *d <= scaling.last_date())
                .ok_or_else(|| FactGenError::CalendarExhausted {
                    table: table.to_string(),
                    index,
                    last_date: scaling.last_date().to_string(),
                })?;
            let rows = scaling.rows_for_date(table, next)?;
            self.date = next;
            self.first_index = self.last_index + 1;
            self.last_index += rows;
            steps += 1;
        }
        if steps > 0 {
            debug!(
                "{} cursor moved {} day(s) to {} (rows {}..={})",
                table, steps, self.date, self.first_index, self.last_index
            );
        }
        Ok(steps)
    }
}

/// Distributes a table's rows over calendar dates.
pub trait DateScaling: Send + Sync {
    fn first_date(&self) -> NaiveDate;

    fn last_date(&self) -> NaiveDate;

    /// Rows allotted to one date (zero outside the calendar).
    fn rows_for_date(&self, table: TableId, date: NaiveDate) -> Result<u64>;

    /// Cursor positioned on the first date.
    fn start(&self, table: TableId) -> Result<GeneratorCursor> {
        let date = self.first_date();
        Ok(GeneratorCursor {
            date,
            first_index: 1,
            last_index: self.rows_for_date(table, date)?,
        })
    }

    /// Cursor a sequential run would hold when generating row `target`.
    fn seek(&self, table: TableId, target: u64) -> Result<GeneratorCursor> {
        let mut cursor = self.start(table)?;
        cursor.advance_to(table, target, self)?;
        Ok(cursor)
    }
}

fn day_weight(date: NaiveDate) -> u64 {
    let weekday = match date.weekday() {
        Weekday::Sat => 6,
        Weekday::Fri | Weekday::Sun => 5,
        _ => 4,
    };
    let season = match date.month() {
        11 => 3,
        12 => 4,
        _ => 2,
    };
    weekday * season
}

/// Skewed calendar allotment with exact integer totals.
///
/// Date `d` ends at row `⌊total · W(d) / W⌋`, where `W(d)` is the running
/// weight through `d`. Consecutive boundaries give each date's allotment and
/// the last boundary is exactly `total`.
pub struct CalendarScaling {
    metadata: Arc<dyn MetadataProvider>,
    first: NaiveDate,
    cumulative: Vec<u64>,
}

impl CalendarScaling {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self::with_range(metadata, sales_start(), sales_end())
    }

    pub fn with_range(metadata: Arc<dyn MetadataProvider>, first: NaiveDate, last: NaiveDate) -> Self {
        let mut cumulative = Vec::new();
        let mut running = 0u64;
        for date in first.iter_days().take_while(|d| *d <= last) {
            running += day_weight(date);
            cumulative.push(running);
        }
        Self {
            metadata,
            first,
            cumulative,
        }
    }

    fn day_offset(&self, date: NaiveDate) -> Option<usize> {
        let offset = usize::try_from((date - self.first).num_days()).ok()?;
        (offset < self.cumulative.len()).then_some(offset)
    }

    /// Last row allotted through day `offset`.
    fn boundary(&self, total: u64, offset: usize) -> u64 {
        let weight_total = self.cumulative.last().copied().unwrap_or(1);
        ((total as u128 * self.cumulative[offset] as u128) / weight_total as u128) as u64
    }
}

impl DateScaling for CalendarScaling {
    fn first_date(&self) -> NaiveDate {
        self.first
    }

    fn last_date(&self) -> NaiveDate {
        let days = self.cumulative.len().saturating_sub(1) as i64;
        self.first + Duration::days(days)
    }

    fn rows_for_date(&self, table: TableId, date: NaiveDate) -> Result<u64> {
        let Some(offset) = self.day_offset(date) else {
            return Ok(0);
        };
        let total = self.metadata.live_row_count(table)?;
        let end = self.boundary(total, offset);
        let start = if offset == 0 {
            0
        } else {
            self.boundary(total, offset - 1)
        };
        Ok(end - start)
    }

    fn seek(&self, table: TableId, target: u64) -> Result<GeneratorCursor> {
        let total = self.metadata.live_row_count(table)?;
        if target == 0 {
            return Err(FactGenError::CursorRegression {
                table: table.to_string(),
                index: 0,
                window_start: 1,
            });
        }
        if target > total || self.cumulative.is_empty() {
            return Err(FactGenError::CalendarExhausted {
                table: table.to_string(),
                index: target,
                last_date: self.last_date().to_string(),
            });
        }
        // first day whose boundary reaches the target
        let (mut lo, mut hi) = (0, self.cumulative.len() - 1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.boundary(total, mid) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let offset = lo;
        let first_index = if offset == 0 {
            1
        } else {
            self.boundary(total, offset - 1) + 1
        };
        Ok(GeneratorCursor {
            date: self.first + Duration::days(offset as i64),
            first_index,
            last_index: self.boundary(total, offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ScaledRowCounts;

    fn scaling(orders: u64) -> CalendarScaling {
        let meta = ScaledRowCounts::new(1).with_override(TableId::StoreSales, orders);
        CalendarScaling::new(Arc::new(meta))
    }

    /// Three orders a day, seeked by walking the calendar.
    struct FlatScaling;

    impl DateScaling for FlatScaling {
        fn first_date(&self) -> NaiveDate {
            sales_start()
        }

        fn last_date(&self) -> NaiveDate {
            ymd(1998, 1, 31)
        }

        fn rows_for_date(&self, _table: TableId, date: NaiveDate) -> Result<u64> {
            Ok(if date <= self.last_date() { 3 } else { 0 })
        }
    }

    #[test]
    fn test_default_seek_walks_calendar() {
        let cursor = FlatScaling.seek(TableId::StoreSales, 7).unwrap();
        assert_eq!(cursor.date, ymd(1998, 1, 4));
        assert_eq!((cursor.first_index, cursor.last_index), (7, 9));

        let dyn_scaling: &dyn DateScaling = &FlatScaling;
        assert_eq!(dyn_scaling.seek(TableId::StoreSales, 7).unwrap(), cursor);

        let err = FlatScaling.seek(TableId::StoreSales, 94).unwrap_err();
        assert!(matches!(err, FactGenError::CalendarExhausted { .. }));
    }

    #[test]
    fn test_date_keys() {
        assert_eq!(date_for_key(1), Some(ymd(1900, 1, 2)));
        assert_eq!(date_for_key(36_159), Some(ymd(1999, 1, 1)));
        assert_eq!(date_for_key(35_795), Some(sales_start()));
        assert_eq!(date_for_key(0), None);
    }

    #[test]
    fn test_allotments_sum_to_total() {
        let s = scaling(100_000);
        let sum: u64 = s
            .first_date()
            .iter_days()
            .take_while(|d| *d <= s.last_date())
            .map(|d| s.rows_for_date(TableId::StoreSales, d).unwrap())
            .sum();
        assert_eq!(sum, 100_000);
    }

    #[test]
    fn test_season_skew() {
        let s = scaling(1_000_000);
        let june = s.rows_for_date(TableId::StoreSales, ymd(2000, 6, 14)).unwrap();
        let december = s.rows_for_date(TableId::StoreSales, ymd(2000, 12, 13)).unwrap();
        assert!(december > june, "december {} vs june {}", december, june);
    }

    #[test]
    fn test_seek_matches_sequential_advance() {
        let s = scaling(5_000);
        let mut cursor = s.start(TableId::StoreSales).unwrap();
        for index in 1..=5_000 {
            cursor.advance_to(TableId::StoreSales, index, &s).unwrap();
            assert_eq!(s.seek(TableId::StoreSales, index).unwrap(), cursor, "row {}", index);
        }
    }

    #[test]
    fn test_sparse_calendar_skips_empty_days() {
        // fewer orders than days: many dates get nothing
        let s = scaling(100);
        let mut cursor = s.start(TableId::StoreSales).unwrap();
        let mut total_steps = 0;
        for index in 1..=100 {
            total_steps += cursor.advance_to(TableId::StoreSales, index, &s).unwrap();
            assert!(cursor.contains(index));
        }
        assert!(total_steps > 100);
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let s = scaling(5_000);
        let mut cursor = s.seek(TableId::StoreSales, 4_000).unwrap();
        let err = cursor
            .advance_to(TableId::StoreSales, cursor.first_index - 1, &s)
            .unwrap_err();
        assert!(matches!(err, FactGenError::CursorRegression { .. }));
    }

    #[test]
    fn test_past_calendar_end() {
        let s = scaling(5_000);
        let mut cursor = s.seek(TableId::StoreSales, 5_000).unwrap();
        assert_eq!(cursor.date, s.last_date());
        let err = cursor.advance_to(TableId::StoreSales, 5_001, &s).unwrap_err();
        assert!(matches!(err, FactGenError::CalendarExhausted { .. }));
        assert!(s.seek(TableId::StoreSales, 5_001).is_err());
    }
}
