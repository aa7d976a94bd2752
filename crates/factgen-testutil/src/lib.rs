use std::collections::BTreeMap;

use factgen_core::generate::engine::{generate_range, ShardSpec};
use factgen_core::generate::stable::HashMode;
use factgen_core::generate::store_sales::StoreSalesGenerator;
use factgen_core::generate::Environment;
use factgen_core::metadata::Parameters;
use factgen_core::output::dat::DatWriter;
use factgen_core::output::MemorySink;
use factgen_core::schema::{TableId, TargetTable};

/// Orders in the small fixture.
pub const SMALL_ORDERS: u64 = 2_000;

/// Items in the small fixture. A few hundred keeps every item block and
/// revision in play while orders still draw distinct items.
pub const SMALL_ITEMS: u64 = 600;

/// Row overrides for a fixture of `orders` orders over `SMALL_ITEMS` items.
pub fn fixture_rows(orders: u64) -> BTreeMap<TableId, u64> {
    let mut rows = BTreeMap::new();
    rows.insert(TableId::StoreSales, orders);
    rows.insert(TableId::Item, SMALL_ITEMS);
    rows
}

/// A scale-1 environment with `orders` orders.
pub fn env_with_orders(table: TargetTable, hash_mode: HashMode, orders: u64) -> Environment {
    let params = Parameters::new(1, table, hash_mode).expect("scale 1 is valid");
    Environment::standard(params, &fixture_rows(orders)).expect("fixture environment")
}

/// An environment at `scale` with `orders` orders. Every dimension keeps
/// its size for that scale.
pub fn env_at_scale(scale: u32, table: TargetTable, hash_mode: HashMode, orders: u64) -> Environment {
    let params = Parameters::new(scale, table, hash_mode).expect("scale is valid");
    let mut rows = BTreeMap::new();
    rows.insert(TableId::StoreSales, orders);
    Environment::standard(params, &rows).expect("scaled environment")
}

/// A scale-1 environment with [`SMALL_ORDERS`] orders.
pub fn small_env(table: TargetTable, hash_mode: HashMode) -> Environment {
    env_with_orders(table, hash_mode, SMALL_ORDERS)
}

/// Render a whole shard as dat text.
pub fn render_shard(env: &Environment, shard: ShardSpec) -> String {
    let total = env.order_count().expect("order count");
    render_orders(env, shard.orders(total))
}

/// Render orders `orders` (half-open, 1-based) as dat text.
pub fn render_orders(env: &Environment, orders: std::ops::Range<u64>) -> String {
    let mut writer = DatWriter::new(Vec::new());
    generate_range(env, orders, &mut writer, None).expect("generation succeeds");
    String::from_utf8(writer.into_inner()).expect("dat output is UTF-8")
}

/// Render orders `orders` as dat text the way a run starting at order 1
/// reaches them: every earlier order is generated and thrown away.
pub fn render_sequential(env: &Environment, orders: std::ops::Range<u64>) -> String {
    let mut generator = StoreSalesGenerator::new(env.clone());
    let mut discard = MemorySink::default();
    for order in 1..orders.start {
        generator
            .generate_order(order, &mut discard)
            .expect("generation succeeds");
        discard.sales.clear();
        discard.returns.clear();
    }
    let mut writer = DatWriter::new(Vec::new());
    for order in orders {
        generator
            .generate_order(order, &mut writer)
            .expect("generation succeeds");
    }
    String::from_utf8(writer.into_inner()).expect("dat output is UTF-8")
}
