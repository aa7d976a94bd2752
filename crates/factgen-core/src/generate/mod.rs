pub mod calendar;
pub mod engine;
pub mod key;
pub mod permutation;
pub mod pricing;
pub mod scd;
pub mod stable;
pub mod store_returns;
pub mod store_sales;
pub mod validate;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::metadata::{MetadataProvider, Parameters, ScaledRowCounts};
use crate::schema::TableId;
use calendar::{CalendarScaling, DateScaling};
use permutation::{Permutation, STORE_SALES_PERMUTATION_SEED};
use pricing::{PricingService, StablePricing};
use scd::{RevisionedItems, ScdResolver};
use stable::StableRng;

/// Everything a generator reads but never writes.
///
/// Cloning is cheap (reference counts only); every worker clones one
/// environment and builds its own [`store_sales::StoreSalesGenerator`]
/// around it.
#[derive(Clone)]
pub struct Environment {
    pub params: Parameters,
    pub rng: StableRng,
    pub metadata: Arc<dyn MetadataProvider>,
    pub items: Arc<dyn ScdResolver>,
    pub dates: Arc<dyn DateScaling>,
    pub pricing: Arc<dyn PricingService>,
    pub permutation: Arc<Permutation>,
}

impl Environment {
    /// Assemble an environment from explicit collaborators. The item
    /// permutation is built here, sized by the resolver's business keys.
    pub fn new(
        params: Parameters,
        metadata: Arc<dyn MetadataProvider>,
        items: Arc<dyn ScdResolver>,
        dates: Arc<dyn DateScaling>,
        pricing: Arc<dyn PricingService>,
    ) -> Self {
        let permutation = Arc::new(Permutation::build(
            items.id_count(),
            STORE_SALES_PERMUTATION_SEED,
        ));
        debug!(
            "Built item permutation over {} business keys",
            permutation.len()
        );
        Self {
            rng: StableRng::new(params.hash_mode),
            params,
            metadata,
            items,
            dates,
            pricing,
            permutation,
        }
    }

    /// The default collaborators at the parameters' scale, with optional
    /// per-table row-count overrides.
    pub fn standard(params: Parameters, overrides: &BTreeMap<TableId, u64>) -> Result<Self> {
        let metadata: Arc<dyn MetadataProvider> =
            Arc::new(ScaledRowCounts::new(params.scale).with_overrides(overrides));
        let items = Arc::new(RevisionedItems::from_metadata(metadata.as_ref())?);
        let dates = Arc::new(CalendarScaling::new(Arc::clone(&metadata)));
        Ok(Self::new(
            params,
            metadata,
            items,
            dates,
            Arc::new(StablePricing),
        ))
    }

    /// Orders in the store_sales table at this scale.
    pub fn order_count(&self) -> Result<u64> {
        self.metadata.live_row_count(TableId::StoreSales)
    }

    pub fn scale(&self) -> u32 {
        self.params.scale
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("params", &self.params)
            .field("item_keys", &self.permutation.len())
            .finish_non_exhaustive()
    }
}
