//! # Pricing
//!
//! Fills the monetary block of a sale line and of its return. Every amount
//! is derived from draws keyed by the line's composite key, so a line's
//! prices do not depend on which worker produced it.
//!
//! Money is `rust_decimal::Decimal` with two decimal places; extended
//! amounts are unit amounts times quantity, rounded half-away-from-zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::Result;
use crate::generate::stable::StableRng;
use crate::schema::{ColumnId, TableId};

/// Largest quantity sold on one line.
pub const MAX_SALE_QUANTITY: i64 = 100;

/// Inputs of one pricing computation.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext {
    pub rng: StableRng,
    pub table: TableId,
    pub scale: u32,
    /// Composite key of the line.
    pub index: u64,
}

impl PricingContext {
    fn cents(&self, slot: Slot, min: i64, max: i64) -> Result<Decimal> {
        Ok(Decimal::new(self.int(slot, min, max)?, 2))
    }

    fn int(&self, slot: Slot, min: i64, max: i64) -> Result<i64> {
        self.rng
            .uniform_int(self.table, self.scale, self.index, min, max, slot.seed())
    }

    fn flag(&self, slot: Slot, percentage: u32) -> bool {
        self.rng
            .percentage_flag(self.table, self.scale, self.index, percentage, slot.seed())
    }
}

/// Independent draw slots. Sale slots sit under the ss_pricing column seed,
/// return slots under sr_pricing.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Quantity,
    WholesaleCost,
    Markup,
    Discount,
    TaxRate,
    HasCoupon,
    CouponShare,
    Fee,
    ShipShare,
    CashShare,
    ChargeShare,
}

impl Slot {
    fn seed(self) -> u64 {
        let (column, slot) = match self {
            Slot::Quantity => (ColumnId::SsPricing, 0),
            Slot::WholesaleCost => (ColumnId::SsPricing, 1),
            Slot::Markup => (ColumnId::SsPricing, 2),
            Slot::Discount => (ColumnId::SsPricing, 3),
            Slot::TaxRate => (ColumnId::SsPricing, 4),
            Slot::HasCoupon => (ColumnId::SsPricing, 5),
            Slot::CouponShare => (ColumnId::SsPricing, 6),
            Slot::Fee => (ColumnId::SrPricing, 0),
            Slot::ShipShare => (ColumnId::SrPricing, 1),
            Slot::CashShare => (ColumnId::SrPricing, 2),
            Slot::ChargeShare => (ColumnId::SrPricing, 3),
        };
        column.seed() * 100 + slot
    }
}

/// Monetary block of a sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalePricing {
    pub quantity: i64,
    pub wholesale_cost: Decimal,
    pub list_price: Decimal,
    pub sales_price: Decimal,
    pub ext_discount_amt: Decimal,
    pub ext_sales_price: Decimal,
    pub ext_wholesale_cost: Decimal,
    pub ext_list_price: Decimal,
    pub ext_tax: Decimal,
    pub coupon_amt: Decimal,
    pub net_paid: Decimal,
    pub net_paid_inc_tax: Decimal,
    pub net_profit: Decimal,
    /// Not printed; carried so a return can tax its refund at the same rate.
    #[serde(skip)]
    pub tax_rate: Decimal,
}

/// Monetary block of a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnPricing {
    pub quantity: i64,
    pub return_amt: Decimal,
    pub return_tax: Decimal,
    pub return_amt_inc_tax: Decimal,
    pub fee: Decimal,
    pub return_ship_cost: Decimal,
    pub refunded_cash: Decimal,
    pub reversed_charge: Decimal,
    pub store_credit: Decimal,
    pub net_loss: Decimal,
}

pub trait PricingService: Send + Sync {
    fn sale_pricing(&self, ctx: &PricingContext) -> Result<SalePricing>;

    /// Price the return of `quantity` units of `sale`.
    fn return_pricing(
        &self,
        ctx: &PricingContext,
        sale: &SalePricing,
        quantity: i64,
    ) -> Result<ReturnPricing>;
}

fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent(points: i64) -> Decimal {
    Decimal::new(points, 2)
}

/// Default pricing: costs, markups and shares drawn from the stable RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct StablePricing;

impl PricingService for StablePricing {
    fn sale_pricing(&self, ctx: &PricingContext) -> Result<SalePricing> {
        let quantity = ctx.int(Slot::Quantity, 1, MAX_SALE_QUANTITY)?;
        let qty = Decimal::from(quantity);

        let wholesale_cost = ctx.cents(Slot::WholesaleCost, 100, 10_000)?;
        let markup = percent(ctx.int(Slot::Markup, 0, 200)?);
        let list_price = money(wholesale_cost * (Decimal::ONE + markup));
        let discount = percent(ctx.int(Slot::Discount, 0, 100)?);
        let sales_price = money(list_price * (Decimal::ONE - discount));

        let ext_list_price = list_price * qty;
        let ext_sales_price = sales_price * qty;
        let ext_wholesale_cost = wholesale_cost * qty;
        let ext_discount_amt = ext_list_price - ext_sales_price;

        let coupon_amt = if ctx.flag(Slot::HasCoupon, 20) {
            money(ext_sales_price * percent(ctx.int(Slot::CouponShare, 1, 100)?))
        } else {
            Decimal::ZERO
        };
        let net_paid = ext_sales_price - coupon_amt;

        let tax_rate = Decimal::new(ctx.int(Slot::TaxRate, 0, 900)?, 4);
        let ext_tax = money(net_paid * tax_rate);

        Ok(SalePricing {
            quantity,
            wholesale_cost,
            list_price,
            sales_price,
            ext_discount_amt,
            ext_sales_price,
            ext_wholesale_cost,
            ext_list_price,
            ext_tax,
            coupon_amt,
            net_paid,
            net_paid_inc_tax: net_paid + ext_tax,
            net_profit: net_paid - ext_wholesale_cost,
            tax_rate,
        })
    }

    fn return_pricing(
        &self,
        ctx: &PricingContext,
        sale: &SalePricing,
        quantity: i64,
    ) -> Result<ReturnPricing> {
        let qty = Decimal::from(quantity);
        let return_amt = sale.sales_price * qty;
        let return_tax = money(return_amt * sale.tax_rate);
        let return_amt_inc_tax = return_amt + return_tax;

        let fee = ctx.cents(Slot::Fee, 50, 10_000)?;
        let return_ship_cost = money(
            sale.list_price * qty * percent(ctx.int(Slot::ShipShare, 0, 50)?),
        );

        // the refund is split three ways and always sums to the taxed amount
        let refunded_cash = money(return_amt_inc_tax * percent(ctx.int(Slot::CashShare, 0, 100)?));
        let remaining = return_amt_inc_tax - refunded_cash;
        let reversed_charge = money(remaining * percent(ctx.int(Slot::ChargeShare, 0, 100)?));
        let store_credit = remaining - reversed_charge;

        Ok(ReturnPricing {
            quantity,
            return_amt,
            return_tax,
            return_amt_inc_tax,
            fee,
            return_ship_cost,
            refunded_cash,
            reversed_charge,
            store_credit,
            net_loss: return_tax + fee + return_ship_cost,
        })
    }
}
