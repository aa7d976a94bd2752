//! # store_returns Generator
//!
//! A return is a pure function of the sale it comes from. Identity and the
//! sale's pricing are copied; every other column is drawn with the sale's
//! composite key as the row index, so the same sale always yields the same
//! return no matter which run or worker rebuilt it.

use serde::Serialize;

use crate::error::Result;
use crate::generate::key::CompositeKey;
use crate::generate::pricing::{PricingContext, ReturnPricing, SalePricing};
use crate::generate::store_sales::SalesRecord;
use crate::generate::Environment;
use crate::schema::{ColumnId, TableId};

/// Draws below this (out of 1..=100) keep the sale's customer.
pub const SAME_CUSTOMER_THRESHOLD: i64 = 80;

/// Seconds of day for 08:00:00, when stores open.
pub const STORE_OPENS: i64 = 8 * 3_600;
/// Last second of day before 17:00:00, when stores close.
pub const STORE_LAST_SECOND: i64 = 17 * 3_600 - 1;

/// One printed store_returns row, columns in print order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnRecord {
    pub returned_date_sk: u64,
    /// Seconds of day.
    pub return_time_sk: u64,
    pub item_sk: u64,
    pub customer_sk: Option<u64>,
    pub cdemo_sk: u64,
    pub hdemo_sk: u64,
    pub addr_sk: u64,
    pub store_sk: u64,
    pub reason_sk: u64,
    pub ticket_number: u64,
    #[serde(flatten)]
    pub pricing: ReturnPricing,
    /// The originating sale's pricing, as sold.
    #[serde(skip)]
    pub sale_pricing: SalePricing,
}

impl ReturnRecord {
    pub fn key(&self) -> CompositeKey {
        CompositeKey::derive(self.ticket_number, Some(self.item_sk))
    }
}

/// Build the return of `sale`.
pub fn make_return(env: &Environment, sale: &SalesRecord) -> Result<ReturnRecord> {
    let key = sale.key().value();
    let scale = env.scale();
    let metadata = env.metadata.as_ref();
    let fk = |column: ColumnId, target: TableId, index: u64| {
        env.rng
            .foreign_key(column, target, scale, index, column.seed(), metadata)
    };

    let customer_sk = match sale.customer_sk {
        None => None,
        Some(customer) => {
            let same = env.rng.uniform_int(
                TableId::StoreReturns,
                scale,
                key,
                1,
                100,
                ColumnId::SrTicketNumber.seed(),
            )? < SAME_CUSTOMER_THRESHOLD;
            if same {
                Some(customer)
            } else {
                Some(fk(ColumnId::SrCustomerSk, TableId::Customer, key)?)
            }
        }
    };

    let return_time_sk = env.rng.uniform_int(
        TableId::StoreReturns,
        scale,
        key,
        STORE_OPENS,
        STORE_LAST_SECOND,
        ColumnId::SrReturnedTimeSk.seed(),
    )? as u64;
    let quantity = env.rng.uniform_int(
        TableId::StoreReturns,
        scale,
        key,
        1,
        sale.pricing.quantity,
        ColumnId::SrPricing.seed(),
    )?;
    let pricing = env.pricing.return_pricing(
        &PricingContext {
            rng: env.rng,
            table: TableId::StoreReturns,
            scale,
            index: key,
        },
        &sale.pricing,
        quantity,
    )?;

    let ret = ReturnRecord {
        returned_date_sk: fk(
            ColumnId::SrReturnedDateSk,
            TableId::Date,
            key.wrapping_add(sale.sold_date_sk),
        )?,
        return_time_sk,
        item_sk: sale.item_sk,
        customer_sk,
        cdemo_sk: fk(ColumnId::SrCdemoSk, TableId::CustomerDemographics, key)?,
        hdemo_sk: fk(ColumnId::SrHdemoSk, TableId::HouseholdDemographics, key)?,
        addr_sk: fk(ColumnId::SrAddrSk, TableId::CustomerAddress, key)?,
        store_sk: fk(ColumnId::SrStoreSk, TableId::Store, key)?,
        reason_sk: fk(ColumnId::SrReasonSk, TableId::Reason, key)?,
        ticket_number: sale.ticket_number,
        pricing,
        sale_pricing: sale.pricing.clone(),
    };
    debug_assert!(
        sale.customer_sk.is_some() || ret.customer_sk.is_none(),
        "NULL sale customer must yield a NULL return customer"
    );
    Ok(ret)
}
