use std::fmt;

use serde::{Deserialize, Serialize};

/// Slots reserved for the item part of a composite key.
const ITEM_SLOTS: u64 = 100_000;

/// Item part used when the line's item key is NULL.
pub const NULL_ITEM_SENTINEL: u64 = 99_999;

/// `order · 100000 + item_part`: the shared index of every draw made for one
/// line item, on both the sale and the return side.
///
/// Item keys that agree modulo 100 000 within one order collide; items are
/// unique within an order by construction, so this needs an item dimension
/// of more than 100 000 rows and an unlucky permutation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(u64);

impl CompositeKey {
    pub fn derive(order_id: u64, item_key: Option<u64>) -> Self {
        let item_part = match item_key {
            Some(item) => item % ITEM_SLOTS,
            None => NULL_ITEM_SENTINEL,
        };
        CompositeKey(order_id.wrapping_mul(ITEM_SLOTS).wrapping_add(item_part))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive() {
        assert_eq!(CompositeKey::derive(7, Some(1234)).value(), 701_234);
        assert_eq!(CompositeKey::derive(7, Some(101_234)).value(), 701_234);
        assert_eq!(CompositeKey::derive(7, None).value(), 799_999);
        assert_eq!(CompositeKey::derive(0, Some(5)).value(), 5);
    }

    #[test]
    fn test_distinct_items_in_one_order() {
        let keys: std::collections::HashSet<_> = (1..=16)
            .map(|item| CompositeKey::derive(42, Some(item * 37)))
            .collect();
        assert_eq!(keys.len(), 16);
    }
}
