//! Printable column values of a record, in print order. Both writers format
//! from these so the two formats always carry the same values.

use rust_decimal::Decimal;

use crate::generate::store_returns::ReturnRecord;
use crate::generate::store_sales::SalesRecord;
use crate::schema::columns::{STORE_RETURNS_COLUMNS, STORE_SALES_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Surrogate key; `None` prints as NULL.
    Key(Option<u64>),
    Int(i64),
    Money(Decimal),
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Key(Some(key)) => write!(f, "{}", key),
            Field::Key(None) => Ok(()),
            Field::Int(value) => write!(f, "{}", value),
            Field::Money(value) => write!(f, "{:.2}", value),
        }
    }
}

fn key(value: u64) -> Field {
    Field::Key(Some(value))
}

pub fn sale_fields(row: &SalesRecord) -> [(&'static str, Field); 23] {
    let p = &row.pricing;
    let values = [
        key(row.sold_date_sk),
        key(row.sold_time_sk),
        key(row.item_sk),
        Field::Key(row.customer_sk),
        key(row.cdemo_sk),
        key(row.hdemo_sk),
        key(row.addr_sk),
        key(row.store_sk),
        key(row.promo_sk),
        key(row.ticket_number),
        Field::Int(p.quantity),
        Field::Money(p.wholesale_cost),
        Field::Money(p.list_price),
        Field::Money(p.sales_price),
        Field::Money(p.ext_discount_amt),
        Field::Money(p.ext_sales_price),
        Field::Money(p.ext_wholesale_cost),
        Field::Money(p.ext_list_price),
        Field::Money(p.ext_tax),
        Field::Money(p.coupon_amt),
        Field::Money(p.net_paid),
        Field::Money(p.net_paid_inc_tax),
        Field::Money(p.net_profit),
    ];
    std::array::from_fn(|i| (STORE_SALES_COLUMNS[i], values[i]))
}

pub fn return_fields(row: &ReturnRecord) -> [(&'static str, Field); 20] {
    let p = &row.pricing;
    let values = [
        key(row.returned_date_sk),
        key(row.return_time_sk),
        key(row.item_sk),
        Field::Key(row.customer_sk),
        key(row.cdemo_sk),
        key(row.hdemo_sk),
        key(row.addr_sk),
        key(row.store_sk),
        key(row.reason_sk),
        key(row.ticket_number),
        Field::Int(p.quantity),
        Field::Money(p.return_amt),
        Field::Money(p.return_tax),
        Field::Money(p.return_amt_inc_tax),
        Field::Money(p.fee),
        Field::Money(p.return_ship_cost),
        Field::Money(p.refunded_cash),
        Field::Money(p.reversed_charge),
        Field::Money(p.store_credit),
        Field::Money(p.net_loss),
    ];
    std::array::from_fn(|i| (STORE_RETURNS_COLUMNS[i], values[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Key(Some(42)).to_string(), "42");
        assert_eq!(Field::Key(None).to_string(), "");
        assert_eq!(Field::Int(-3).to_string(), "-3");
        assert_eq!(Field::Money(Decimal::ZERO).to_string(), "0.00");
        assert_eq!(Field::Money(Decimal::new(1_205, 2)).to_string(), "12.05");
        assert_eq!(Field::Money(Decimal::new(-7, 1)).to_string(), "-0.70");
    }
}
