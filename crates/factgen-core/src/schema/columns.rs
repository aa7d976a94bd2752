//! Column identifiers for the store channel.
//!
//! Each column doubles as the seed discriminator of the stable draws that
//! produce it, so the numbering is part of the output format.

use std::fmt;

/// A column of store_sales or store_returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ColumnId {
    SrReturnedDateSk = 275,
    SrReturnedTimeSk = 276,
    SrItemSk = 277,
    SrCustomerSk = 278,
    SrCdemoSk = 279,
    SrHdemoSk = 280,
    SrAddrSk = 281,
    SrStoreSk = 282,
    SrReasonSk = 283,
    SrTicketNumber = 284,
    SrPricing = 285,

    SsSoldDateSk = 298,
    SsSoldTimeSk = 299,
    SsSoldItemSk = 300,
    SsSoldCustomerSk = 301,
    SsSoldCdemoSk = 302,
    SsSoldHdemoSk = 303,
    SsSoldAddrSk = 304,
    SsSoldStoreSk = 305,
    SsSoldPromoSk = 306,
    SsTicketNumber = 307,
    SsPricingQuantity = 308,
    SsPricing = 309,
}

impl ColumnId {
    pub fn seed(self) -> u64 {
        self as u32 as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnId::SrReturnedDateSk => "sr_returned_date_sk",
            ColumnId::SrReturnedTimeSk => "sr_return_time_sk",
            ColumnId::SrItemSk => "sr_item_sk",
            ColumnId::SrCustomerSk => "sr_customer_sk",
            ColumnId::SrCdemoSk => "sr_cdemo_sk",
            ColumnId::SrHdemoSk => "sr_hdemo_sk",
            ColumnId::SrAddrSk => "sr_addr_sk",
            ColumnId::SrStoreSk => "sr_store_sk",
            ColumnId::SrReasonSk => "sr_reason_sk",
            ColumnId::SrTicketNumber => "sr_ticket_number",
            ColumnId::SrPricing => "sr_pricing",
            ColumnId::SsSoldDateSk => "ss_sold_date_sk",
            ColumnId::SsSoldTimeSk => "ss_sold_time_sk",
            ColumnId::SsSoldItemSk => "ss_item_sk",
            ColumnId::SsSoldCustomerSk => "ss_customer_sk",
            ColumnId::SsSoldCdemoSk => "ss_cdemo_sk",
            ColumnId::SsSoldHdemoSk => "ss_hdemo_sk",
            ColumnId::SsSoldAddrSk => "ss_addr_sk",
            ColumnId::SsSoldStoreSk => "ss_store_sk",
            ColumnId::SsSoldPromoSk => "ss_promo_sk",
            ColumnId::SsTicketNumber => "ss_ticket_number",
            ColumnId::SsPricingQuantity => "ss_quantity",
            ColumnId::SsPricing => "ss_pricing",
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column order of a printed store_sales row.
pub const STORE_SALES_COLUMNS: [&str; 23] = [
    "ss_sold_date_sk",
    "ss_sold_time_sk",
    "ss_item_sk",
    "ss_customer_sk",
    "ss_cdemo_sk",
    "ss_hdemo_sk",
    "ss_addr_sk",
    "ss_store_sk",
    "ss_promo_sk",
    "ss_ticket_number",
    "ss_quantity",
    "ss_wholesale_cost",
    "ss_list_price",
    "ss_sales_price",
    "ss_ext_discount_amt",
    "ss_ext_sales_price",
    "ss_ext_wholesale_cost",
    "ss_ext_list_price",
    "ss_ext_tax",
    "ss_coupon_amt",
    "ss_net_paid",
    "ss_net_paid_inc_tax",
    "ss_net_profit",
];

/// Column order of a printed store_returns row.
pub const STORE_RETURNS_COLUMNS: [&str; 20] = [
    "sr_returned_date_sk",
    "sr_return_time_sk",
    "sr_item_sk",
    "sr_customer_sk",
    "sr_cdemo_sk",
    "sr_hdemo_sk",
    "sr_addr_sk",
    "sr_store_sk",
    "sr_reason_sk",
    "sr_ticket_number",
    "sr_return_quantity",
    "sr_return_amt",
    "sr_return_tax",
    "sr_return_amt_inc_tax",
    "sr_fee",
    "sr_return_ship_cost",
    "sr_refunded_cash",
    "sr_reversed_charge",
    "sr_store_credit",
    "sr_net_loss",
];

/// Positions used when reading printed rows back (see `verify`).
pub mod positions {
    pub const SS_ITEM_SK: usize = 2;
    pub const SS_CUSTOMER_SK: usize = 3;
    pub const SS_TICKET_NUMBER: usize = 9;
    pub const SS_QUANTITY: usize = 10;

    pub const SR_ITEM_SK: usize = 2;
    pub const SR_CUSTOMER_SK: usize = 3;
    pub const SR_TICKET_NUMBER: usize = 9;
    pub const SR_RETURN_QUANTITY: usize = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_match_column_lists() {
        assert_eq!(STORE_SALES_COLUMNS[positions::SS_ITEM_SK], "ss_item_sk");
        assert_eq!(STORE_SALES_COLUMNS[positions::SS_CUSTOMER_SK], "ss_customer_sk");
        assert_eq!(STORE_SALES_COLUMNS[positions::SS_TICKET_NUMBER], "ss_ticket_number");
        assert_eq!(STORE_SALES_COLUMNS[positions::SS_QUANTITY], "ss_quantity");
        assert_eq!(STORE_RETURNS_COLUMNS[positions::SR_ITEM_SK], "sr_item_sk");
        assert_eq!(STORE_RETURNS_COLUMNS[positions::SR_CUSTOMER_SK], "sr_customer_sk");
        assert_eq!(STORE_RETURNS_COLUMNS[positions::SR_TICKET_NUMBER], "sr_ticket_number");
        assert_eq!(
            STORE_RETURNS_COLUMNS[positions::SR_RETURN_QUANTITY],
            "sr_return_quantity"
        );
    }

    #[test]
    fn test_seeds_are_distinct() {
        let all = [
            ColumnId::SrReturnedDateSk,
            ColumnId::SrReturnedTimeSk,
            ColumnId::SrItemSk,
            ColumnId::SrCustomerSk,
            ColumnId::SrCdemoSk,
            ColumnId::SrHdemoSk,
            ColumnId::SrAddrSk,
            ColumnId::SrStoreSk,
            ColumnId::SrReasonSk,
            ColumnId::SrTicketNumber,
            ColumnId::SrPricing,
            ColumnId::SsSoldDateSk,
            ColumnId::SsSoldTimeSk,
            ColumnId::SsSoldItemSk,
            ColumnId::SsSoldCustomerSk,
            ColumnId::SsSoldCdemoSk,
            ColumnId::SsSoldHdemoSk,
            ColumnId::SsSoldAddrSk,
            ColumnId::SsSoldStoreSk,
            ColumnId::SsSoldPromoSk,
            ColumnId::SsTicketNumber,
            ColumnId::SsPricingQuantity,
            ColumnId::SsPricing,
        ];
        let seeds: std::collections::HashSet<u64> = all.iter().map(|c| c.seed()).collect();
        assert_eq!(seeds.len(), all.len());
    }
}
