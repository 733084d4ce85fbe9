//! Proof-of-work retarget and block-trust (C8).
//!
//! Mirrors the teacher's windowed difficulty cache — a rolling buffer of
//! recent block timing fed into a weighted-average retarget — but swaps
//! Monero's 720-block LWMA window for the much smaller 8-block weighted
//! average this chain's retarget rule uses.

use std::collections::VecDeque;

use chain_constants::pow::{retarget_weight, POW_ADJUST_COUNT, POW_ADJUST_DEBOUNCE, POW_BITS_LOWER, POW_BITS_UPPER};
use chain_constants::block::BLOCK_TARGET_SPACING;
use chain_types::ProofAlgo;
use primitive_types::U256;

use crate::index::ChainIndex;

/// A rolling window of the prior same-algorithm blocks' `(timestamp,
/// bits)`, oldest first, used to compute the next block's `bits`.
///
/// Holds at most `POW_ADJUST_COUNT + 1` entries — enough to derive
/// [`POW_ADJUST_COUNT`] inter-block spacings.
#[derive(Debug, Clone, Default)]
pub struct DifficultyCache {
    window: VecDeque<(u32, u32)>,
}

impl DifficultyCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self { window: VecDeque::with_capacity(POW_ADJUST_COUNT + 1) }
    }

    /// Seeds the cache from an existing ancestor chain, oldest first.
    /// Only the last `POW_ADJUST_COUNT + 1` pairs matter.
    #[must_use]
    pub fn from_history(history: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut cache = Self::new();
        for (timestamp, bits) in history {
            cache.push(timestamp, bits);
        }
        cache
    }

    /// Records a newly connected same-algo block, dropping the oldest
    /// entry once the window is full.
    pub fn push(&mut self, timestamp: u32, bits: u32) {
        self.window.push_back((timestamp, bits));
        while self.window.len() > POW_ADJUST_COUNT + 1 {
            self.window.pop_front();
        }
    }

    /// Removes the most recently pushed entry (used when popping blocks
    /// off the main chain during a reorg).
    pub fn pop(&mut self) {
        self.window.pop_back();
    }

    /// The `bits` the next same-algo block must satisfy, given
    /// `initial_bits` (the network's genesis preset, used verbatim
    /// until the window has at least two entries to derive a spacing
    /// from).
    ///
    /// Retarget rule (§4.8): weighted average spacing across the prior
    /// [`POW_ADJUST_COUNT`] blocks, weights `2^(7..0)` favoring the most
    /// recent spacing. More than `debounce` seconds above target nudges
    /// `bits` down (easier); more than `debounce` below nudges it up
    /// (harder). Bounded to `[`[`POW_BITS_LOWER`]`, `[`POW_BITS_UPPER`]`]`.
    #[must_use]
    pub fn next_bits(&self, initial_bits: u32) -> u32 {
        if self.window.len() < 2 {
            return initial_bits;
        }

        let pairs: Vec<(u32, u32)> = self.window.iter().copied().collect();
        let current_bits = pairs[pairs.len() - 1].1;
        let spacing_count = (pairs.len() - 1).min(POW_ADJUST_COUNT);

        let mut weighted_sum: u128 = 0;
        let mut weight_total: u128 = 0;
        for blocks_ago in 0..spacing_count {
            let newer = pairs.len() - 1 - blocks_ago;
            let older = newer - 1;
            let spacing = u128::from(pairs[newer].0.saturating_sub(pairs[older].0));
            let weight = u128::from(retarget_weight(blocks_ago));
            weighted_sum += spacing * weight;
            weight_total += weight;
        }
        let avg_spacing = weighted_sum / weight_total.max(1);

        let target = u128::from(BLOCK_TARGET_SPACING.as_secs());
        let debounce = u128::from(POW_ADJUST_DEBOUNCE);

        if avg_spacing > target + debounce && current_bits > POW_BITS_LOWER {
            current_bits - 1
        } else if avg_spacing < target.saturating_sub(debounce) && current_bits < POW_BITS_UPPER {
            current_bits + 1
        } else {
            current_bits
        }
    }

    /// The most recently pushed block's timestamp, if any.
    #[must_use]
    pub fn top_timestamp(&self) -> Option<u32> {
        self.window.back().map(|(timestamp, _)| *timestamp)
    }
}

/// A block's contribution to cumulative chain trust (§4.8).
///
/// - Origin, vacant, or any block with no proof algorithm (`None`):
///   zero — these blocks carry no PoW/DPoS weight of their own.
/// - A proof-of-work block: `1 << bits`.
/// - A non-PoW (DPoS) block: the last PoW ancestor's `bits`, weighted by
///   the delegate round's agreement weight.
///
/// Accumulated as [`U256`] (the data model's `chain_trust: u256`) rather
/// than a machine word: §4.8 allows `bits` up to 200, well past what a
/// `u128` shift can hold without saturating.
#[must_use]
pub fn block_trust(proof_algo: Option<ProofAlgo>, bits: u32, agreement_weight: u64) -> U256 {
    match proof_algo {
        None => U256::zero(),
        Some(ProofAlgo::ProofOfWork) => U256::one() << bits.min(255),
        Some(ProofAlgo::Delegate) => U256::from(agreement_weight) << bits.min(255),
    }
}

/// Resolves the `bits` a non-PoW block's trust should be weighted
/// against: the last proof-of-work ancestor's recorded `proof_bits`,
/// walking back from `prev_hash` through `index`.
#[must_use]
pub fn dpos_trust_bits(index: &ChainIndex, prev_hash: chain_types::Hash256, fallback_initial_bits: u32) -> u32 {
    index.last_pow_bits(prev_hash).unwrap_or(fallback_initial_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_returns_initial_bits() {
        let cache = DifficultyCache::new();
        assert_eq!(cache.next_bits(32), 32);
    }

    #[test]
    fn slow_blocks_lower_bits() {
        let mut cache = DifficultyCache::new();
        let mut timestamp = 0_u32;
        for _ in 0..=chain_constants::pow::POW_ADJUST_COUNT {
            cache.push(timestamp, 40);
            timestamp += 200; // far slower than the 45s target
        }
        assert_eq!(cache.next_bits(40), 39);
    }

    #[test]
    fn fast_blocks_raise_bits() {
        let mut cache = DifficultyCache::new();
        let mut timestamp = 0_u32;
        for _ in 0..=chain_constants::pow::POW_ADJUST_COUNT {
            cache.push(timestamp, 40);
            timestamp += 5; // far faster than the 45s target
        }
        assert_eq!(cache.next_bits(40), 41);
    }

    #[test]
    fn in_band_spacing_holds_bits_steady() {
        let mut cache = DifficultyCache::new();
        let mut timestamp = 0_u32;
        for _ in 0..=chain_constants::pow::POW_ADJUST_COUNT {
            cache.push(timestamp, 40);
            timestamp += 45;
        }
        assert_eq!(cache.next_bits(40), 40);
    }

    #[test]
    fn block_trust_zero_for_origin_like_blocks() {
        assert_eq!(block_trust(None, 32, 1), U256::zero());
    }

    #[test]
    fn block_trust_pow_is_power_of_two() {
        assert_eq!(block_trust(Some(ProofAlgo::ProofOfWork), 5, 1), U256::from(32));
    }

    #[test]
    fn block_trust_delegate_scales_by_weight() {
        assert_eq!(block_trust(Some(ProofAlgo::Delegate), 3, 4), U256::from(32));
    }

    #[test]
    fn block_trust_pow_does_not_saturate_at_high_bits() {
        let low = block_trust(Some(ProofAlgo::ProofOfWork), 127, 1);
        let high = block_trust(Some(ProofAlgo::ProofOfWork), 200, 1);
        assert!(high > low);
        assert_eq!(high, U256::one() << 200);
    }
}
