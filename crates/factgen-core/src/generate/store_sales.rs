//! # store_sales Row Generator
//!
//! An order is built in two phases. The master phase draws everything the
//! line items share (store, time, date, customer and its demographics, line
//! count, starting item position) from the order index. The detail phase
//! builds one line item per call: it walks the item permutation, resolves
//! the item version valid on the sale date, prices the line and decides
//! whether the line is returned.
//!
//! Returns are always computed, whichever table is being written, so that
//! separate store_sales and store_returns runs agree row for row. The active
//! table only decides which record reaches the sink.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::trace;

use crate::error::{FactGenError, Result};
use crate::generate::calendar::{date_for_key, GeneratorCursor};
use crate::generate::key::CompositeKey;
use crate::generate::pricing::{PricingContext, SalePricing};
use crate::generate::store_returns::{make_return, ReturnRecord};
use crate::generate::Environment;
use crate::output::RowSink;
use crate::schema::{ColumnId, TableId, TargetTable};

/// Percentage of orders with no known customer.
pub const CUSTOMER_NULL_PERCENT: u32 = 5;
pub const MIN_LINES_PER_ORDER: i64 = 8;
pub const MAX_LINES_PER_ORDER: i64 = 16;

/// Attributes shared by every line of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesOrder {
    pub ticket_number: u64,
    /// Date the calendar cursor assigned to this order index.
    pub calendar_date: NaiveDate,
    pub sold_date_sk: u64,
    pub sold_time_sk: u64,
    pub store_sk: u64,
    pub customer_sk: Option<u64>,
    pub cdemo_sk: u64,
    pub hdemo_sk: u64,
    pub addr_sk: u64,
    pub line_count: u32,
    /// Item permutation position before the first line.
    pub start_position: u64,
}

/// Attributes specific to one line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesLineItem {
    pub line: u32,
    pub position: u64,
    pub item_sk: u64,
    pub promo_sk: u64,
    pub key: CompositeKey,
    pub pricing: SalePricing,
}

/// One printed store_sales row, columns in print order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
    pub sold_date_sk: u64,
    pub sold_time_sk: u64,
    pub item_sk: u64,
    pub customer_sk: Option<u64>,
    pub cdemo_sk: u64,
    pub hdemo_sk: u64,
    pub addr_sk: u64,
    pub store_sk: u64,
    pub promo_sk: u64,
    pub ticket_number: u64,
    #[serde(flatten)]
    pub pricing: SalePricing,
}

impl SalesRecord {
    pub fn new(order: &SalesOrder, line: &SalesLineItem) -> Self {
        Self {
            sold_date_sk: order.sold_date_sk,
            sold_time_sk: order.sold_time_sk,
            item_sk: line.item_sk,
            customer_sk: order.customer_sk,
            cdemo_sk: order.cdemo_sk,
            hdemo_sk: order.hdemo_sk,
            addr_sk: order.addr_sk,
            store_sk: order.store_sk,
            promo_sk: line.promo_sk,
            ticket_number: order.ticket_number,
            pricing: line.pricing.clone(),
        }
    }

    pub fn key(&self) -> CompositeKey {
        CompositeKey::derive(self.ticket_number, Some(self.item_sk))
    }
}

/// Everything one detail step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub sale: SalesRecord,
    pub ret: Option<ReturnRecord>,
}

/// Where the generator is within an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPhase {
    /// Ready for a master step.
    OrderStart,
    /// Next detail step builds line `line` of `of`.
    LineItem { line: u32, of: u32 },
    /// Every line of the current order has been built.
    OrderEnd,
}

/// Lines and returns produced for one order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSummary {
    pub lines: u32,
    pub returns: u32,
}

/// Per-worker generator. Holds the date cursor, the item position and the
/// phase; everything else is read from the shared [`Environment`].
pub struct StoreSalesGenerator {
    env: Environment,
    cursor: Option<GeneratorCursor>,
    position: u64,
    order: Option<SalesOrder>,
    phase: OrderPhase,
}

impl StoreSalesGenerator {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            cursor: None,
            position: 0,
            order: None,
            phase: OrderPhase::OrderStart,
        }
    }

    pub fn phase(&self) -> OrderPhase {
        self.phase
    }

    /// Position the date cursor for order `index` without visiting the
    /// orders before it.
    pub fn seek(&mut self, index: u64) -> Result<()> {
        self.cursor = Some(self.env.dates.seek(TableId::StoreSales, index)?);
        self.order = None;
        self.phase = OrderPhase::OrderStart;
        Ok(())
    }

    /// Master phase for order `index`.
    pub fn master(&mut self, index: u64) -> Result<&SalesOrder> {
        if let OrderPhase::LineItem { line, of } = self.phase {
            return Err(FactGenError::Phase {
                message: format!(
                    "order {} started while line {} of {} of the previous order was pending",
                    index, line, of
                ),
            });
        }

        let env = &self.env;
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => self.cursor.insert(env.dates.start(TableId::StoreSales)?),
        };
        cursor.advance_to(TableId::StoreSales, index, env.dates.as_ref())?;
        let calendar_date = cursor.date;

        let scale = env.scale();
        let metadata = env.metadata.as_ref();
        let fk = |column: ColumnId, target: TableId| {
            env.rng
                .foreign_key(column, target, scale, index, column.seed(), metadata)
        };

        let customer_sk = if env.rng.is_null(
            TableId::StoreSales,
            scale,
            index,
            ColumnId::SsSoldCustomerSk,
            CUSTOMER_NULL_PERCENT,
        ) {
            None
        } else {
            Some(fk(ColumnId::SsSoldCustomerSk, TableId::Customer)?)
        };

        let line_count = env.rng.uniform_int(
            TableId::StoreSales,
            scale,
            index,
            MIN_LINES_PER_ORDER,
            MAX_LINES_PER_ORDER,
            ColumnId::SsTicketNumber.seed(),
        )? as u32;
        let id_count = env.items.id_count();
        let start_position = env.rng.uniform_int(
            TableId::StoreSales,
            scale,
            index,
            1,
            i64::try_from(id_count).unwrap_or(i64::MAX),
            ColumnId::SsSoldItemSk.seed(),
        )? as u64;

        let order = SalesOrder {
            ticket_number: index,
            calendar_date,
            sold_date_sk: fk(ColumnId::SsSoldDateSk, TableId::Date)?,
            sold_time_sk: fk(ColumnId::SsSoldTimeSk, TableId::Time)?,
            store_sk: fk(ColumnId::SsSoldStoreSk, TableId::Store)?,
            customer_sk,
            cdemo_sk: fk(ColumnId::SsSoldCdemoSk, TableId::CustomerDemographics)?,
            hdemo_sk: fk(ColumnId::SsSoldHdemoSk, TableId::HouseholdDemographics)?,
            addr_sk: fk(ColumnId::SsSoldAddrSk, TableId::CustomerAddress)?,
            line_count,
            start_position,
        };
        trace!(
            "order {} on {}: {} lines from item position {}",
            index,
            calendar_date,
            line_count,
            start_position
        );

        self.position = start_position;
        self.phase = OrderPhase::LineItem {
            line: 1,
            of: line_count,
        };
        Ok(self.order.insert(order))
    }

    /// Detail phase: build the next line of the current order. Records reach
    /// the sink only when `emit` is set, and only for the active table.
    pub fn detail(&mut self, sink: &mut dyn RowSink, emit: bool) -> Result<LineOutcome> {
        let (line, of) = match self.phase {
            OrderPhase::LineItem { line, of } => (line, of),
            other => {
                return Err(FactGenError::Phase {
                    message: format!("line item requested in phase {:?}", other),
                })
            }
        };
        let order = self.order.as_ref().ok_or_else(|| FactGenError::Phase {
            message: "line item requested before any order".to_string(),
        })?;
        let env = &self.env;
        let scale = env.scale();

        let id_count = env.permutation.len();
        self.position = if self.position >= id_count {
            1
        } else {
            self.position + 1
        };
        let logical_id =
            env.permutation
                .entry_at(self.position)
                .ok_or_else(|| FactGenError::RowOutOfRange {
                    table: "item permutation".to_string(),
                    row: self.position,
                    total: id_count,
                })?;
        let sold_on = date_for_key(order.sold_date_sk).ok_or_else(|| {
            FactGenError::RowOutOfRange {
                table: TableId::Date.to_string(),
                row: order.sold_date_sk,
                total: env.metadata.live_row_count(TableId::Date).unwrap_or_default(),
            }
        })?;
        let item_sk = env.items.resolve_as_of(logical_id, sold_on)?;

        let promo_sk = env.rng.foreign_key(
            ColumnId::SsSoldPromoSk,
            TableId::Promotion,
            scale,
            order.ticket_number.wrapping_mul(1_000).wrapping_add(self.position),
            ColumnId::SsSoldPromoSk.seed(),
            env.metadata.as_ref(),
        )?;

        let key = CompositeKey::derive(order.ticket_number, Some(item_sk));
        let pricing = env.pricing.sale_pricing(&PricingContext {
            rng: env.rng,
            table: TableId::StoreSales,
            scale,
            index: key.value(),
        })?;

        let item = SalesLineItem {
            line,
            position: self.position,
            item_sk,
            promo_sk,
            key,
            pricing,
        };
        let sale = SalesRecord::new(order, &item);

        let ret = if env
            .rng
            .ten_percent_flag(TableId::StoreSales, scale, key.value())
        {
            Some(make_return(env, &sale)?)
        } else {
            None
        };

        if emit {
            match env.params.table {
                TargetTable::StoreSales => sink.emit_sale(&sale)?,
                TargetTable::StoreReturns => {
                    if let Some(ret) = &ret {
                        sink.emit_return(ret)?;
                    }
                }
            }
        }

        self.phase = if line >= of {
            OrderPhase::OrderEnd
        } else {
            OrderPhase::LineItem { line: line + 1, of }
        };
        Ok(LineOutcome { sale, ret })
    }

    /// Master plus every line of order `index`, emitting to `sink`.
    pub fn generate_order(&mut self, index: u64, sink: &mut dyn RowSink) -> Result<OrderSummary> {
        let lines = self.master(index)?.line_count;
        let mut summary = OrderSummary::default();
        for _ in 0..lines {
            let outcome = self.detail(sink, true)?;
            summary.lines += 1;
            summary.returns += u32::from(outcome.ret.is_some());
        }
        self.phase = OrderPhase::OrderStart;
        Ok(summary)
    }
}
