//! Random-access validation rebuilds exactly the row sequential generation
//! produced for the same order and line.

use factgen_core::generate::stable::HashMode;
use factgen_core::generate::store_sales::StoreSalesGenerator;
use factgen_core::generate::validate::{target_line, validate_row};
use factgen_core::generate::Environment;
use factgen_core::output::dat::DatWriter;
use factgen_core::output::MemorySink;
use factgen_core::schema::TargetTable;
use factgen_core::FactGenError;
use factgen_testutil::{env_with_orders, render_orders, small_env};

fn validated_dat(env: &Environment, order: u64) -> String {
    let mut writer = DatWriter::new(Vec::new());
    validate_row(env, order, &mut writer).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

#[test]
fn test_validate_matches_sequential_generation() {
    let env = env_with_orders(TargetTable::StoreSales, HashMode::Legacy, 20_000);

    // Sequential run from order 1 up to and including 12345
    let mut generator = StoreSalesGenerator::new(env.clone());
    let mut discard = MemorySink::default();
    for order in 1..12_345 {
        generator.generate_order(order, &mut discard).unwrap();
        discard.sales.clear();
    }
    let mut writer = DatWriter::new(Vec::new());
    generator.generate_order(12_345, &mut writer).unwrap();
    let sequential = String::from_utf8(writer.into_inner()).unwrap();

    let line = target_line(&env, 12_345).unwrap() as usize;
    let expected = sequential.lines().nth(line - 1).unwrap();
    let validated = validated_dat(&env, 12_345);
    assert_eq!(validated.trim_end(), expected);
}

#[test]
fn test_validate_agrees_with_fresh_ranges() {
    for hash_mode in [HashMode::Legacy, HashMode::Wide] {
        let env = small_env(TargetTable::StoreSales, hash_mode);
        for order in [1, 2, 17, 333, 1_000, 1_999, 2_000] {
            let order_rows = render_orders(&env, order..order + 1);
            let line = target_line(&env, order).unwrap() as usize;
            let validated = validated_dat(&env, order);
            assert_eq!(
                validated.trim_end(),
                order_rows.lines().nth(line - 1).unwrap(),
                "order {} ({})",
                order,
                hash_mode
            );
        }
    }
}

#[test]
fn test_validated_return_is_one_of_the_orders_returns() {
    let env = small_env(TargetTable::StoreReturns, HashMode::Legacy);
    let mut returned = 0;
    for order in 1..=400 {
        let order_rows = render_orders(&env, order..order + 1);
        let validated = validated_dat(&env, order);
        if validated.is_empty() {
            continue;
        }
        returned += 1;
        assert!(
            order_rows.lines().any(|l| l == validated.trim_end()),
            "order {}",
            order
        );
    }
    assert!(returned > 0);
}

#[test]
fn test_validate_out_of_range() {
    let env = small_env(TargetTable::StoreSales, HashMode::Legacy);
    let mut sink = MemorySink::default();
    for order in [0, 2_001] {
        let err = validate_row(&env, order, &mut sink).unwrap_err();
        assert!(matches!(err, FactGenError::RowOutOfRange { .. }), "{}", err);
    }
    assert!(sink.sales.is_empty());
}
