//! Weighted selection over a group's `ad_weights`.

use adrotate_core::{AdWeights, EntityId, GroupType};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Orders group members by weight. The random source is owned so a seeded
/// generator gives reproducible rotations.
#[derive(Debug, Clone)]
pub struct WeightedSelector<R: Rng = StdRng> {
    rng: R,
}

impl WeightedSelector<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Seeded when a seed is configured, otherwise from OS entropy.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> WeightedSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// One weighted draw. `None` when the total weight is below 1.
    ///
    /// Draws `r` in `[1, total]` and walks the entries in order, subtracting
    /// each weight; the entry that takes `r` to zero or below is the pick.
    /// Zero-weight entries can never take `r` to zero, so they are never drawn.
    pub fn pick(&mut self, entries: &[(EntityId, u32)]) -> Option<usize> {
        let max: u64 = entries.iter().map(|(_, w)| u64::from(*w)).sum();
        if max < 1 {
            return None;
        }
        let mut r = self.rng.gen_range(1..=max) as i64;
        for (index, (_, weight)) in entries.iter().enumerate() {
            r -= i64::from(*weight);
            if r <= 0 {
                return Some(index);
            }
        }
        None
    }

    /// Weighted draw without replacement, proportional at every step to the
    /// remaining weight. Stops once the remaining weight is below 1. Drawn ids
    /// for which `is_live` is false are dropped from the order.
    pub fn shuffle_ads<F>(&mut self, weights: &AdWeights, mut is_live: F) -> Vec<EntityId>
    where
        F: FnMut(EntityId) -> bool,
    {
        let mut remaining: Vec<(EntityId, u32)> = weights.iter().collect();
        let mut order = Vec::with_capacity(remaining.len());

        while let Some(index) = self.pick(&remaining) {
            let (id, _) = remaining.remove(index);
            if is_live(id) {
                order.push(id);
            } else {
                debug!(ad_id = id, "stale weight entry skipped");
            }
        }
        order
    }

    /// Weight descending, with each run of equal weights shuffled. Zero-weight
    /// members are kept at the end.
    pub fn shuffle_ordered_ads<F>(&mut self, weights: &AdWeights, mut is_live: F) -> Vec<EntityId>
    where
        F: FnMut(EntityId) -> bool,
    {
        let mut sorted: Vec<(EntityId, u32)> = weights.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        let mut order = Vec::with_capacity(sorted.len());
        for run in sorted.chunk_by_weight() {
            let mut ids: Vec<EntityId> = run.iter().map(|(id, _)| *id).collect();
            if ids.len() > 1 {
                ids.shuffle(&mut self.rng);
            }
            order.extend(ids);
        }

        order.retain(|id| {
            let live = is_live(*id);
            if !live {
                debug!(ad_id = *id, "stale weight entry skipped");
            }
            live
        });
        order
    }

    /// Member order for a group type. Extension types rotate like `default`.
    pub fn select<F>(&mut self, group_type: &GroupType, weights: &AdWeights, is_live: F) -> Vec<EntityId>
    where
        F: FnMut(EntityId) -> bool,
    {
        match group_type {
            GroupType::Ordered => self.shuffle_ordered_ads(weights, is_live),
            GroupType::Default => self.shuffle_ads(weights, is_live),
            GroupType::Other(tag) => {
                debug!(group_type = %tag, "no selector for group type, using weighted random");
                self.shuffle_ads(weights, is_live)
            }
        }
    }
}

/// Splits a weight-sorted slice into maximal runs of equal weight.
trait ChunkByWeight {
    fn chunk_by_weight(&self) -> Vec<&[(EntityId, u32)]>;
}

impl ChunkByWeight for [(EntityId, u32)] {
    fn chunk_by_weight(&self) -> Vec<&[(EntityId, u32)]> {
        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..=self.len() {
            if i == self.len() || self[i].1 != self[start].1 {
                runs.push(&self[start..i]);
                start = i;
            }
        }
        runs
    }
}
