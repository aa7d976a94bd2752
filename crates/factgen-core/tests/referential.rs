//! Referential properties of generated sales and returns.

use std::collections::BTreeMap;
use std::io::Cursor;

use factgen_core::generate::store_sales::{
    StoreSalesGenerator, CUSTOMER_NULL_PERCENT, MAX_LINES_PER_ORDER, MIN_LINES_PER_ORDER,
};
use factgen_core::generate::stable::HashMode;
use factgen_core::generate::validate::validate_row;
use factgen_core::generate::Environment;
use factgen_core::metadata::{MetadataProvider, Parameters};
use factgen_core::output::MemorySink;
use factgen_core::schema::{ColumnId, TableId, TargetTable};
use factgen_core::verify::IntegrityChecker;
use factgen_testutil::{env_with_orders, render_orders, small_env, SMALL_ORDERS};

#[test]
fn test_first_order_at_scale_one_is_reproducible() {
    let params = Parameters::new(1, TargetTable::StoreSales, HashMode::Legacy).unwrap();
    let env = Environment::standard(params, &BTreeMap::new()).unwrap();
    assert_eq!(env.order_count().unwrap(), 240_000);

    let mut generator = StoreSalesGenerator::new(env.clone());
    let order = generator.master(1).unwrap().clone();
    assert_eq!(order.ticket_number, 1);
    assert!((MIN_LINES_PER_ORDER..=MAX_LINES_PER_ORDER).contains(&i64::from(order.line_count)));

    let again = StoreSalesGenerator::new(env.clone()).master(1).unwrap().clone();
    assert_eq!(order, again);

    let first = render_orders(&env, 1..51);
    assert_eq!(first, render_orders(&env, 1..51));
    assert_eq!(
        render_orders(&env, 1..2).lines().count(),
        order.line_count as usize
    );
}

#[test]
fn test_null_customer_propagates_to_returns() {
    let env = small_env(TargetTable::StoreReturns, HashMode::Legacy);
    let mut generator = StoreSalesGenerator::new(env);
    let mut sink = MemorySink::default();
    let (mut null_returns, mut known_returns) = (0, 0);

    for order in 1..=SMALL_ORDERS {
        let lines = generator.master(order).unwrap().line_count;
        for _ in 0..lines {
            let outcome = generator.detail(&mut sink, false).unwrap();
            let Some(ret) = outcome.ret else { continue };
            match outcome.sale.customer_sk {
                None => {
                    assert_eq!(ret.customer_sk, None, "order {}", order);
                    null_returns += 1;
                }
                Some(_) => {
                    assert!(ret.customer_sk.is_some(), "order {}", order);
                    known_returns += 1;
                }
            }
        }
    }
    assert!(sink.returns.is_empty());
    assert!(null_returns > 0, "no NULL-customer sale was returned");
    assert!(known_returns > null_returns);
}

#[test]
fn test_order_42_customer_carries_into_returns() {
    let params = Parameters::new(1, TargetTable::StoreReturns, HashMode::Legacy).unwrap();
    let env = Environment::standard(params, &BTreeMap::new()).unwrap();
    let null_customer = env.rng.is_null(
        TableId::StoreSales,
        1,
        42,
        ColumnId::SsSoldCustomerSk,
        CUSTOMER_NULL_PERCENT,
    );

    let mut generator = StoreSalesGenerator::new(env.clone());
    generator.seek(42).unwrap();
    let order = generator.master(42).unwrap().clone();
    assert_eq!(order.customer_sk.is_none(), null_customer);

    let mut sink = MemorySink::default();
    let mut returns = Vec::new();
    for _ in 0..order.line_count {
        let outcome = generator.detail(&mut sink, false).unwrap();
        assert_eq!(outcome.sale.customer_sk, order.customer_sk);
        if let Some(ret) = outcome.ret {
            assert_eq!(ret.customer_sk.is_none(), null_customer);
            returns.push(ret);
        }
    }

    let mut validated = MemorySink::default();
    validate_row(&env, 42, &mut validated).unwrap();
    for ret in &validated.returns {
        assert!(returns.contains(ret));
        assert_eq!(ret.customer_sk.is_none(), null_customer);
    }
}

#[test]
fn test_foreign_keys_within_dimension_bounds() {
    let env = small_env(TargetTable::StoreReturns, HashMode::Wide);
    let count = |table| env.metadata.live_row_count(table).unwrap();
    let within = |key: u64, table| (1..=count(table)).contains(&key);

    let mut generator = StoreSalesGenerator::new(env.clone());
    let mut sink = MemorySink::default();
    for order in 1..=300 {
        let lines = generator.master(order).unwrap().line_count;
        for _ in 0..lines {
            let outcome = generator.detail(&mut sink, false).unwrap();
            let sale = &outcome.sale;
            assert_eq!(sale.ticket_number, order);
            assert!(within(sale.sold_date_sk, TableId::Date));
            assert!(within(sale.sold_time_sk, TableId::Time));
            assert!(within(sale.item_sk, TableId::Item));
            assert!(within(sale.store_sk, TableId::Store));
            assert!(within(sale.promo_sk, TableId::Promotion));
            assert!(within(sale.cdemo_sk, TableId::CustomerDemographics));
            assert!(within(sale.hdemo_sk, TableId::HouseholdDemographics));
            assert!(within(sale.addr_sk, TableId::CustomerAddress));
            if let Some(customer) = sale.customer_sk {
                assert!(within(customer, TableId::Customer));
            }

            if let Some(ret) = &outcome.ret {
                assert_eq!(ret.ticket_number, sale.ticket_number);
                assert_eq!(ret.item_sk, sale.item_sk);
                assert!((1..=sale.pricing.quantity).contains(&ret.pricing.quantity));
                assert!(within(ret.returned_date_sk, TableId::Date));
                assert!(within(ret.reason_sk, TableId::Reason));
                assert!(within(ret.store_sk, TableId::Store));
            }
        }
    }
}

#[test]
fn test_generated_files_pass_integrity_check() {
    let sales = render_orders(
        &env_with_orders(TargetTable::StoreSales, HashMode::Legacy, 3_000),
        1..3_001,
    );
    let returns = render_orders(
        &env_with_orders(TargetTable::StoreReturns, HashMode::Legacy, 3_000),
        1..3_001,
    );

    let mut checker = IntegrityChecker::new();
    checker.load_sales(Cursor::new(sales), "store_sales.dat").unwrap();
    checker.check_returns(Cursor::new(returns), "store_returns.dat").unwrap();
    let report = checker.finish();

    assert!(report.is_clean(), "{}", report.summary());
    assert_eq!(report.matched, report.total_returns);
    assert_eq!(report.sales_with_returns, report.total_returns);
    assert_eq!(report.returns_per_returned_sale(), 1.0);
    let ratio = report.return_ratio();
    assert!((0.05..0.15).contains(&ratio), "ratio {}", ratio);
}
