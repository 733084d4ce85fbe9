//! In-memory block index and fork set (C6).
//!
//! A writer lock covers the whole `hash -> BlockIndex` map; each fork's
//! tip sits behind its own lock so a reader following one fork never
//! blocks a writer extending another.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chain_types::{BlockIndex, Destination, Fork, ForkProfile, HeightEntry, Hash256};

use crate::error::ContextError;

/// The chain's in-memory index: every accepted block across every live
/// fork, plus each fork's current tip and per-height candidate buckets.
#[derive(Default)]
pub struct ChainIndex {
    blocks: RwLock<HashMap<Hash256, BlockIndex>>,
    forks: RwLock<HashMap<Hash256, Arc<RwLock<Fork>>>>,
    profiles: RwLock<HashMap<Hash256, ForkProfile>>,
    /// `origin_hash -> height -> { block_hash -> (timestamp, mint_dest, ref_block_hash) }`.
    height_buckets: RwLock<HashMap<Hash256, BTreeMap<u32, HashMap<Hash256, HeightEntry>>>>,
}

impl ChainIndex {
    /// A fresh, empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a block's index entry and its height bucket
    /// slot in one step.
    pub fn insert_block(&self, index: BlockIndex) {
        let entry = HeightEntry {
            timestamp: index.timestamp,
            mint_dest: Destination::Null,
            ref_block_hash: index.hash,
        };
        self.height_buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(index.origin)
            .or_default()
            .entry(index.height)
            .or_default()
            .insert(index.hash, entry);
        self.blocks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index.hash, index);
    }

    /// Records the full height-bucket entry for a block (timestamp,
    /// mint destination, and the block it is keyed under), overwriting
    /// the placeholder [`insert_block`] leaves behind.
    pub fn record_height_entry(&self, origin: Hash256, height: u32, block_hash: Hash256, entry: HeightEntry) {
        self.height_buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(origin)
            .or_default()
            .entry(height)
            .or_default()
            .insert(block_hash, entry);
    }

    /// Looks up a block's index entry by hash.
    #[must_use]
    pub fn block(&self, hash: Hash256) -> Option<BlockIndex> {
        self.blocks.read().unwrap_or_else(PoisonError::into_inner).get(&hash).copied()
    }

    /// Sets a block's `next` pointer (called once its successor is
    /// accepted).
    ///
    /// # Errors
    /// [`ContextError::UnknownBlock`] if `hash` is not indexed.
    pub fn set_next(&self, hash: Hash256, next: Hash256) -> Result<(), ContextError> {
        let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
        let index = blocks.get_mut(&hash).ok_or(ContextError::UnknownBlock(hash))?;
        index.next = Some(next);
        Ok(())
    }

    /// Registers a new fork (its origin block's own fork, or a forked-off
    /// child) with the given static profile and initial tip.
    pub fn register_fork(&self, origin: Hash256, profile: ForkProfile, tip: Hash256) {
        self.profiles.write().unwrap_or_else(PoisonError::into_inner).insert(origin, profile);
        self.forks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(origin, Arc::new(RwLock::new(Fork { origin_hash: origin, tip })));
    }

    /// Returns the fork's lock handle, for callers that need to hold it
    /// across a tip-update sequence (§4.10's "fork write-lock").
    ///
    /// # Errors
    /// [`ContextError::UnknownFork`] if `origin` has no registered fork.
    pub fn fork_handle(&self, origin: Hash256) -> Result<Arc<RwLock<Fork>>, ContextError> {
        self.forks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&origin)
            .cloned()
            .ok_or(ContextError::UnknownFork(origin))
    }

    /// The fork's static policy profile.
    ///
    /// # Errors
    /// [`ContextError::UnknownFork`] if `origin` has no registered fork.
    pub fn fork_profile(&self, origin: Hash256) -> Result<ForkProfile, ContextError> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&origin)
            .cloned()
            .ok_or(ContextError::UnknownFork(origin))
    }

    /// The fork's current tip hash.
    ///
    /// # Errors
    /// [`ContextError::UnknownFork`] if `origin` has no registered fork.
    pub fn fork_tip(&self, origin: Hash256) -> Result<Hash256, ContextError> {
        Ok(self.fork_handle(origin)?.read().unwrap_or_else(PoisonError::into_inner).tip)
    }

    /// Updates a fork's tip, taking the fork's own write-lock rather than
    /// the whole-index lock.
    ///
    /// # Errors
    /// [`ContextError::UnknownFork`] if `origin` has no registered fork.
    pub fn set_fork_tip(&self, origin: Hash256, tip: Hash256) -> Result<(), ContextError> {
        self.fork_handle(origin)?.write().unwrap_or_else(PoisonError::into_inner).tip = tip;
        Ok(())
    }

    /// Every candidate block recorded at `height` on `origin`'s chain,
    /// used to enumerate competing blocks and reject same-delegate
    /// repeats (§4.6).
    #[must_use]
    pub fn candidates_at_height(&self, origin: Hash256, height: u32) -> Vec<(Hash256, HeightEntry)> {
        self.height_buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&origin)
            .and_then(|by_height| by_height.get(&height))
            .map(|bucket| bucket.iter().map(|(hash, entry)| (*hash, *entry)).collect())
            .unwrap_or_default()
    }

    /// Walks `tip` and `candidate` back along `prev` in lockstep,
    /// stepping whichever side has the later (or equal) timestamp,
    /// until the two meet.
    ///
    /// Returns `(fork_point, path_from_fork_to_candidate)`: the meeting
    /// block, and the candidate-side blocks from just after it up to
    /// (and including) `candidate`, oldest first.
    ///
    /// # Errors
    /// [`ContextError::UnknownBlock`] if either side visits an unindexed
    /// hash, or [`ContextError::NoForkPoint`] if a side runs past its
    /// chain's genesis (`prev == None`) before the two meet.
    pub fn branch_walk(&self, tip: Hash256, candidate: Hash256) -> Result<(Hash256, Vec<Hash256>), ContextError> {
        let blocks = self.blocks.read().unwrap_or_else(PoisonError::into_inner);
        let mut a = tip;
        let mut b = candidate;
        let mut candidate_path = vec![b];

        while a != b {
            let index_a = blocks.get(&a).ok_or(ContextError::UnknownBlock(a))?;
            let index_b = blocks.get(&b).ok_or(ContextError::UnknownBlock(b))?;
            if index_a.timestamp >= index_b.timestamp {
                a = index_a.prev.ok_or(ContextError::NoForkPoint { tip, candidate })?;
            } else {
                b = index_b.prev.ok_or(ContextError::NoForkPoint { tip, candidate })?;
                candidate_path.push(b);
            }
        }

        candidate_path.pop();
        candidate_path.reverse();
        Ok((a, candidate_path))
    }

    /// Walks `hash` back along `prev` until it finds a
    /// [`chain_types::ProofAlgo::ProofOfWork`] block, returning that
    /// ancestor's recorded `proof_bits` (used by
    /// [`crate::difficulty::block_trust`] for non-PoW blocks, §4.8).
    #[must_use]
    pub fn last_pow_bits(&self, mut hash: Hash256) -> Option<u32> {
        let blocks = self.blocks.read().unwrap_or_else(PoisonError::into_inner);
        loop {
            let index = blocks.get(&hash)?;
            if index.proof_algo == chain_types::ProofAlgo::ProofOfWork {
                return Some(index.proof_bits);
            }
            hash = index.prev?;
        }
    }
}

#[cfg(test)]
mod tests {
    use chain_types::{BlockType, MintType, ProofAlgo};

    use super::*;

    fn block_at(hash: Hash256, prev: Option<Hash256>, height: u32, timestamp: u32) -> BlockIndex {
        BlockIndex {
            hash,
            prev,
            next: None,
            origin: Hash256::ZERO,
            file: 0,
            offset: 0,
            height,
            version: 1,
            block_type: BlockType::Primary,
            mint_type: MintType::ProofOfWorkMint,
            mint_txid: Hash256::ZERO,
            timestamp,
            money_supply: 0,
            chain_trust: primitive_types::U256::zero(),
            rand_beacon: 0,
            proof_algo: ProofAlgo::ProofOfWork,
            proof_bits: 32,
        }
    }

    #[test]
    fn branch_walk_finds_common_ancestor() {
        let index = ChainIndex::new();
        let genesis = Hash256::hash(b"genesis");
        let a1 = Hash256::hash(b"a1");
        let a2 = Hash256::hash(b"a2");
        let b1 = Hash256::hash(b"b1");

        index.insert_block(block_at(genesis, None, 0, 0));
        index.insert_block(block_at(a1, Some(genesis), 1, 10));
        index.insert_block(block_at(a2, Some(a1), 2, 20));
        index.insert_block(block_at(b1, Some(genesis), 1, 11));

        let (fork_point, path) = index.branch_walk(a2, b1).unwrap();
        assert_eq!(fork_point, genesis);
        assert_eq!(path, vec![b1]);
    }

    #[test]
    fn branch_walk_same_tip_yields_empty_path() {
        let index = ChainIndex::new();
        let genesis = Hash256::hash(b"genesis");
        index.insert_block(block_at(genesis, None, 0, 0));

        let (fork_point, path) = index.branch_walk(genesis, genesis).unwrap();
        assert_eq!(fork_point, genesis);
        assert!(path.is_empty());
    }

    #[test]
    fn fork_tip_updates_independently_of_block_map() {
        let index = ChainIndex::new();
        let origin = Hash256::hash(b"origin");
        let tip = Hash256::hash(b"tip");
        index.register_fork(origin, sample_profile(), origin);
        index.set_fork_tip(origin, tip).unwrap();
        assert_eq!(index.fork_tip(origin).unwrap(), tip);
    }

    fn sample_profile() -> ForkProfile {
        ForkProfile {
            name: "main".to_owned(),
            symbol: "MAIN".to_owned(),
            initial_supply: 0,
            mint_reward: 0,
            halve_cycle: 0,
            min_tx_fee: 0,
            isolated: false,
            private: false,
            enclosed: false,
            owner: Destination::Null,
            parent_fork: None,
            join_height: None,
        }
    }
}
