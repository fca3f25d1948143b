use crate::{
    error::GachaError,
    pool::{
        Pool,
        PoolItem,
        Rarity,
    },
};
use rand::{
    Rng,
    seq::IndexedRandom,
};

/// Integer drop weights per rarity, indexed by declaration order. Order is
/// not magnitude: Mythical sits last in the walk but carries the smallest
/// weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightTable([u32; Rarity::ALL.len()]);

impl WeightTable {
    pub const fn new(weights: [u32; Rarity::ALL.len()]) -> Self {
        Self(weights)
    }

    pub fn weight(&self, rarity: Rarity) -> u32 {
        self.0[rarity as usize]
    }

    pub fn set_weight(&mut self, rarity: Rarity, weight: u32) {
        self.0[rarity as usize] = weight;
    }

    pub fn entries(&self) -> impl Iterator<Item = (Rarity, u32)> + '_ {
        Rarity::ALL.into_iter().map(|rarity| (rarity, self.weight(rarity)))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|w| u64::from(*w)).sum()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        // Reference odds: Common 52, Uncommon 28, Rare 12, Legendary 7, Mythical 1.
        Self([52, 28, 12, 7, 1])
    }
}

/// Draw one rarity in proportion to its weight.
///
/// A degenerate table (empty or all-zero) is a build-time misconfiguration,
/// so it fails loudly instead of defaulting to some tier.
pub fn sample_rarity<R: Rng + ?Sized>(
    rng: &mut R,
    table: &WeightTable,
) -> Result<Rarity, GachaError> {
    let total = table.total();
    if total == 0 {
        return Err(GachaError::DegenerateWeights);
    }
    let mut remainder = rng.random_range(0..total);
    let mut last_positive = None;
    for (rarity, weight) in table.entries() {
        if weight == 0 {
            continue;
        }
        if remainder < u64::from(weight) {
            return Ok(rarity);
        }
        remainder -= u64::from(weight);
        last_positive = Some(rarity);
    }
    last_positive.ok_or(GachaError::DegenerateWeights)
}

/// Pick one item of the sampled rarity uniformly. A legitimately sparse
/// tier falls back to the whole pool; only a fully empty pool fails.
pub fn sample_item<'p, R: Rng + ?Sized>(
    rng: &mut R,
    pool: &'p Pool,
    rarity: Rarity,
) -> Result<&'p PoolItem, GachaError> {
    let tier = pool.tier(rarity);
    if let Some(item) = tier.choose(rng) {
        return Ok(item);
    }
    pool.items().choose(rng).ok_or(GachaError::PoolUnavailable)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::pool::fallback_items;
    use proptest::prelude::*;
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    #[test]
    fn sample_rarity__empty_table_fails_with_degenerate_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = WeightTable::new([0, 0, 0, 0, 0]);

        let actual = sample_rarity(&mut rng, &table);

        assert_eq!(actual, Err(GachaError::DegenerateWeights));
    }

    #[test]
    fn sample_rarity__single_positive_weight_always_wins() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut table = WeightTable::new([0, 0, 0, 0, 0]);
        table.set_weight(Rarity::Legendary, 3);

        for _ in 0..100 {
            assert_eq!(sample_rarity(&mut rng, &table), Ok(Rarity::Legendary));
        }
    }

    #[test]
    fn sample_rarity__approximates_reference_odds_over_many_draws() {
        // given
        let mut rng = StdRng::seed_from_u64(42);
        let table = WeightTable::default();
        let draws = 10_000u32;

        // when
        let mut counts = [0u32; Rarity::ALL.len()];
        for _ in 0..draws {
            let rarity = sample_rarity(&mut rng, &table).unwrap();
            counts[rarity as usize] += 1;
        }

        // then: each observed share within 3 sigma of its weight share
        let total = table.total() as f64;
        for (rarity, weight) in table.entries() {
            let p = f64::from(weight) / total;
            let expected = p * f64::from(draws);
            let sigma = (f64::from(draws) * p * (1.0 - p)).sqrt();
            let observed = f64::from(counts[rarity as usize]);
            assert!(
                (observed - expected).abs() <= 3.0 * sigma,
                "{rarity}: observed {observed}, expected {expected} +/- {}",
                3.0 * sigma
            );
        }
    }

    #[test]
    fn sample_item__sparse_tier_falls_back_to_whole_pool() {
        // given: no Uncommon items at all
        let items: Vec<_> = fallback_items()
            .into_iter()
            .filter(|i| i.rarity != Rarity::Uncommon)
            .collect();
        let pool = Pool::new(items, false);
        let mut rng = StdRng::seed_from_u64(3);

        // when
        let item = sample_item(&mut rng, &pool, Rarity::Uncommon).unwrap();

        // then
        assert!(pool.items().contains(item));
    }

    #[test]
    fn sample_item__empty_pool_is_unavailable() {
        let pool = Pool::new(Vec::new(), false);
        let mut rng = StdRng::seed_from_u64(4);

        let actual = sample_item(&mut rng, &pool, Rarity::Common);

        assert_eq!(actual.unwrap_err(), GachaError::PoolUnavailable);
    }

    proptest! {
        #[test]
        fn sample_rarity__any_positive_table_returns_a_positively_weighted_tier(
            weights in prop::array::uniform5(0u32..1_000),
            seed in any::<u64>(),
        ) {
            prop_assume!(weights.iter().any(|w| *w > 0));
            let table = WeightTable::new(weights);
            let mut rng = StdRng::seed_from_u64(seed);

            let rarity = sample_rarity(&mut rng, &table).unwrap();

            prop_assert!(table.weight(rarity) > 0);
        }
    }
}
