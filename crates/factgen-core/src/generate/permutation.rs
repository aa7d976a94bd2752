//! # Item Permutation
//!
//! Line items of one order walk a contiguous window of a fixed permutation
//! of the item business keys, which keeps items unique within an order.
//! The permutation is built once per run from a constant seed and shared
//! read-only by every worker.
//!
//! The shuffle uses `rand`'s `StdRng`, whose stream is only guaranteed
//! within one `rand` release. Upgrading `rand` can change item assignment.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seed of the store_sales item permutation.
pub const STORE_SALES_PERMUTATION_SEED: u64 = 0x5353_5045_524D;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    entries: Vec<u64>,
}

impl Permutation {
    /// Shuffle of `1..=size`.
    pub fn build(size: u64, seed: u64) -> Self {
        let mut entries: Vec<u64> = (1..=size).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        entries.shuffle(&mut rng);
        Self { entries }
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a 1-based position.
    pub fn entry_at(&self, position: u64) -> Option<u64> {
        let slot = usize::try_from(position.checked_sub(1)?).ok()?;
        self.entries.get(slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_a_permutation() {
        let p = Permutation::build(1_000, 7);
        let mut seen: Vec<u64> = (1..=p.len()).filter_map(|i| p.entry_at(i)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=1_000).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_permutation() {
        assert_eq!(Permutation::build(500, 42), Permutation::build(500, 42));
        assert_ne!(Permutation::build(500, 42), Permutation::build(500, 43));
    }

    #[test]
    fn test_positions_are_one_based() {
        let p = Permutation::build(3, 1);
        assert!(p.entry_at(0).is_none());
        assert!(p.entry_at(3).is_some());
        assert!(p.entry_at(4).is_none());
    }

    #[test]
    fn test_empty() {
        let p = Permutation::build(0, 1);
        assert!(p.is_empty());
        assert!(p.entry_at(1).is_none());
    }
}
