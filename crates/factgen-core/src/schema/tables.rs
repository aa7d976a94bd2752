use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FactGenError;

/// Benchmark tables, numbered the way the reference generator numbers them.
///
/// The discriminant is part of every stable draw's key, so these values are
/// fixed for the lifetime of the output format. Never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum TableId {
    CallCenter = 0,
    CatalogPage = 1,
    CatalogReturns = 2,
    CatalogSales = 3,
    Customer = 4,
    CustomerAddress = 5,
    CustomerDemographics = 6,
    Date = 7,
    HouseholdDemographics = 8,
    IncomeBand = 9,
    Inventory = 10,
    Item = 11,
    Promotion = 12,
    Reason = 13,
    ShipMode = 14,
    Store = 15,
    StoreReturns = 16,
    StoreSales = 17,
    Time = 18,
    Warehouse = 19,
    WebPage = 20,
    WebReturns = 21,
    WebSales = 22,
    WebSite = 23,
}

impl TableId {
    pub const ALL: [TableId; 24] = [
        TableId::CallCenter,
        TableId::CatalogPage,
        TableId::CatalogReturns,
        TableId::CatalogSales,
        TableId::Customer,
        TableId::CustomerAddress,
        TableId::CustomerDemographics,
        TableId::Date,
        TableId::HouseholdDemographics,
        TableId::IncomeBand,
        TableId::Inventory,
        TableId::Item,
        TableId::Promotion,
        TableId::Reason,
        TableId::ShipMode,
        TableId::Store,
        TableId::StoreReturns,
        TableId::StoreSales,
        TableId::Time,
        TableId::Warehouse,
        TableId::WebPage,
        TableId::WebReturns,
        TableId::WebSales,
        TableId::WebSite,
    ];

    /// Numeric id fed into the stable hash.
    pub fn id(self) -> u64 {
        self as u32 as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            TableId::CallCenter => "call_center",
            TableId::CatalogPage => "catalog_page",
            TableId::CatalogReturns => "catalog_returns",
            TableId::CatalogSales => "catalog_sales",
            TableId::Customer => "customer",
            TableId::CustomerAddress => "customer_address",
            TableId::CustomerDemographics => "customer_demographics",
            TableId::Date => "date_dim",
            TableId::HouseholdDemographics => "household_demographics",
            TableId::IncomeBand => "income_band",
            TableId::Inventory => "inventory",
            TableId::Item => "item",
            TableId::Promotion => "promotion",
            TableId::Reason => "reason",
            TableId::ShipMode => "ship_mode",
            TableId::Store => "store",
            TableId::StoreReturns => "store_returns",
            TableId::StoreSales => "store_sales",
            TableId::Time => "time_dim",
            TableId::Warehouse => "warehouse",
            TableId::WebPage => "web_page",
            TableId::WebReturns => "web_returns",
            TableId::WebSales => "web_sales",
            TableId::WebSite => "web_site",
        }
    }

    pub fn is_fact(self) -> bool {
        matches!(
            self,
            TableId::CatalogReturns
                | TableId::CatalogSales
                | TableId::Inventory
                | TableId::StoreReturns
                | TableId::StoreSales
                | TableId::WebReturns
                | TableId::WebSales
        )
    }

    /// Whether a run may be split into independent shards for this table.
    pub fn supports_sharding(self) -> bool {
        self.is_fact() || self == TableId::Item
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableId {
    type Err = FactGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TableId::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted || (wanted == "date" && *t == TableId::Date))
            .ok_or_else(|| FactGenError::UnknownTable {
                name: s.to_string(),
                known: TableId::ALL
                    .iter()
                    .filter(|t| t.is_fact())
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// The table a run materializes. Only the store channel is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTable {
    StoreSales,
    StoreReturns,
}

impl TargetTable {
    pub fn table_id(self) -> TableId {
        match self {
            TargetTable::StoreSales => TableId::StoreSales,
            TargetTable::StoreReturns => TableId::StoreReturns,
        }
    }
}

impl fmt::Display for TargetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.table_id().fmt(f)
    }
}

impl TryFrom<TableId> for TargetTable {
    type Error = FactGenError;

    fn try_from(table: TableId) -> Result<Self, Self::Error> {
        match table {
            TableId::StoreSales => Ok(TargetTable::StoreSales),
            TableId::StoreReturns => Ok(TargetTable::StoreReturns),
            other => Err(FactGenError::UnsupportedTable {
                name: other.name().to_string(),
            }),
        }
    }
}

impl FromStr for TargetTable {
    type Err = FactGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<TableId>()?.try_into()
    }
}
