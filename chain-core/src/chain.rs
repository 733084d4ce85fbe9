//! Composition root (§4.12): wires the block file store (C4), the KV
//! store (C5), the in-memory index/fork-set/retarget state (C6/C8/C9)
//! and the validator (C11) into one synchronous façade.
//!
//! Every public operation here corresponds to one row of the spec's
//! operation table. None of them hold a lock across the call: `ChainKv`
//! serializes its own transactions, `ChainIndex` guards its maps
//! internally, and `FileStore` mutexes its own writer — `Chain` itself
//! carries no additional synchronization, so the whole façade is as
//! cheap to share behind an `Arc` as those three already are.

use std::path::Path;

use chain_constants::{money::MIN_ENROLL_AMOUNT, pow::POW_ADJUST_COUNT};
use chain_context::{ChainIndex, ContextError, DifficultyCache};
use chain_kv::{tables::TxLocation, ChainKv, Config, FilePos, FileStore, KvError};
use chain_types::{
    Block, BlockIndex, BlockType, Destination, Encode, ForkProfile, Hash256, MintType, OutPoint, PrivateKey, ProofAlgo,
    SigVerifyResult, TemplateId, TemplateKind, TemplateKindTag, Transaction, TxOut, TxType,
};

use crate::{
    error::ChainError,
    params::ChainParams,
    template::{self, TemplateRegistry},
    view::BlockView,
};

/// A read-through [`TemplateRegistry`] for validation paths that must
/// resolve a destination's template but must not persist a new
/// registration themselves — that happens exactly once, in
/// [`BlockView::commit`]'s overlay, when the block carrying the
/// first-sight transaction is actually committed.
struct ReadRegistry<'a, 'txn> {
    kv: &'a ChainKv,
    rtxn: &'a heed::RoTxn<'txn>,
}

impl TemplateRegistry for ReadRegistry<'_, '_> {
    fn lookup(&self, id: TemplateId) -> Result<Option<TemplateKind>, ChainError> {
        Ok(self.kv.template.get(self.rtxn, &id)?)
    }

    fn register(&mut self, _id: TemplateId, _kind: TemplateKind) {}
}

/// What an external miner needs to try proof-of-work candidates for the
/// current tip: the fixed `{algo, bits, mint_dest}` prefix
/// [`chain_rules::pow`] expects at the front of `proof_bytes`, plus
/// enough ancestor context to report progress.
#[derive(Debug, Clone)]
pub struct WorkTemplate {
    /// The `algo‖bits‖mint_dest` prefix the miner's own `proof_bytes`
    /// must start with; anything appended after it is free nonce space.
    pub work_header_bytes: Vec<u8>,
    pub prev_height: u32,
    pub prev_hash: Hash256,
    pub prev_time: u32,
    pub algo: u8,
    pub bits: u32,
}

fn now_unix() -> u32 {
    let secs = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map_or(0, |d| d.as_secs());
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// The chain-state core: one KV environment, one block file store, and
/// the in-memory index rebuilt from them at [`Chain::initialize`].
pub struct Chain {
    kv: ChainKv,
    files: FileStore,
    index: ChainIndex,
    params: ChainParams,
}

impl Chain {
    /// Opens (or creates) the store at `data_dir` and rebuilds the
    /// in-memory index and fork set from it. Does not create a genesis
    /// block itself — a fresh store starts with an empty index, and the
    /// caller installs the chain's own genesis via
    /// [`Chain::draft_genesis_block`] and [`Chain::add_new_block`] (S1).
    ///
    /// # Errors
    /// Propagates any KV or file-store error opening the underlying
    /// storage.
    pub fn initialize(data_dir: impl AsRef<Path>, params: ChainParams) -> Result<Self, ChainError> {
        let data_dir = data_dir.as_ref();
        let kv = ChainKv::open(&Config::new(data_dir.join("kv")))?;
        let files = FileStore::open(data_dir.join("blocks"))?;
        let index = ChainIndex::new();

        let chain = Self { kv, files, index, params };
        chain.rebuild_index()?;
        Ok(chain)
    }

    /// Replays every persisted block outline and fork registration back
    /// into the freshly created [`ChainIndex`] (spec's startup recovery,
    /// §7). The per-height candidate buckets are seeded with the same
    /// `Destination::Null` placeholder [`ChainIndex::insert_block`]
    /// itself uses — accurate mint destinations there only matter to the
    /// DPoS same-delegate repeat check, and v1's context-free block gate
    /// (`version == 1` ⇒ `BlockType::Primary` only) never exercises it.
    fn rebuild_index(&self) -> Result<(), ChainError> {
        let rtxn = self.kv.read_txn()?;

        for row in self.kv.block_outline.iter(&rtxn)? {
            let (_, block_index) = row?;
            self.index.insert_block(block_index);
        }

        for row in self.kv.fork_context.iter(&rtxn)? {
            let (origin, profile) = row?;
            let tip = self.kv.fork.get(&rtxn, &origin)?.map_or(origin, |fork| fork.tip);
            self.index.register_fork(origin, profile, tip);
        }

        Ok(())
    }

    /// Drafts the unsigned genesis block for `params`: its mint pays
    /// `params.genesis_mint_destination()` the configured initial
    /// supply, self-establishing that template via the leading-template
    /// convention ([`crate::template`]). The caller signs
    /// `block.header_bytes()` with the owner key before handing the
    /// block to [`Chain::add_new_block`].
    #[must_use]
    pub fn draft_genesis_block(params: &ChainParams) -> Block {
        let mint_tx = Transaction {
            version: 1,
            tx_type: TxType::Genesis,
            timestamp: params.genesis.genesis_timestamp,
            lock_until: 0,
            inputs: vec![],
            send_to: params.genesis_mint_destination(),
            amount: params.genesis.initial_supply,
            fee: 0,
            data: template::encode_leading_template(&params.genesis_mint_template()),
            sig: vec![],
        };
        let mut block = Block {
            version: 1,
            block_type: BlockType::Genesis,
            timestamp: params.genesis.genesis_timestamp,
            prev_hash: Hash256::ZERO,
            tx_merkle_root: Hash256::ZERO,
            proof_bytes: Vec::new(),
            mint_tx,
            vtx: Vec::new(),
            sig: Vec::new(),
        };
        block.tx_merkle_root = block.compute_tx_merkle_root();
        block
    }

    /// Ingests a block: the genesis of a new fork, or the next block of
    /// an already-registered one.
    ///
    /// # Errors
    /// [`ChainError::AlreadyHave`] if already indexed; [`ChainError::MissingPrev`]
    /// if `block.prev_hash` isn't indexed; any context-free/context-dependent
    /// validator rejection; any KV or file-store error.
    pub fn add_new_block(&self, block: Block) -> Result<(), ChainError> {
        if block.block_type == BlockType::Genesis {
            return self.accept_genesis(block);
        }

        let prev_hash = block.prev_hash;
        let prev = self.index.block(prev_hash).ok_or(ChainError::MissingPrev(prev_hash))?;
        let height = prev.height + 1;
        let new_hash = block.block_hash(height);
        if self.index.block(new_hash).is_some() {
            return Err(ChainError::AlreadyHave(new_hash));
        }

        let mint_template = {
            let rtxn = self.kv.read_txn()?;
            let mut registry = ReadRegistry { kv: &self.kv, rtxn: &rtxn };
            template::resolve_send_to_template(&mut registry, block.mint_tx.send_to, &block.mint_tx.data)?
        };

        chain_rules::check_block_context_free(&block, now_unix(), mint_template.as_ref())?;

        let retarget = self.difficulty_cache_for(prev_hash);
        chain_rules::check_pow(&block, &prev, &retarget)?;

        let pos = self.files.write_block(&block)?;
        let bits = retarget.next_bits(prev.proof_bits);
        let trust = prev.chain_trust + chain_context::block_trust(Some(ProofAlgo::ProofOfWork), bits, 1);
        let mint_type = match mint_template.as_ref().map(TemplateKind::tag) {
            Some(TemplateKindTag::ProofOfWorkMint) => MintType::ProofOfWorkMint,
            Some(TemplateKindTag::DelegateMint) => MintType::DelegateMint,
            _ => MintType::None,
        };

        let block_index = BlockIndex {
            hash: new_hash,
            prev: Some(prev_hash),
            next: None,
            origin: prev.origin,
            file: pos.file_no,
            offset: pos.offset,
            height,
            version: block.version,
            block_type: block.block_type,
            mint_type,
            mint_txid: block.mint_tx.txid(),
            timestamp: block.timestamp,
            money_supply: prev.money_supply + i128::from(block.mint_tx.amount),
            chain_trust: trust,
            rand_beacon: 0,
            proof_algo: ProofAlgo::ProofOfWork,
            proof_bits: bits,
        };

        self.index.insert_block(block_index);
        self.index.record_height_entry(
            block_index.origin,
            height,
            new_hash,
            chain_types::HeightEntry { timestamp: block.timestamp, mint_dest: block.mint_tx.send_to, ref_block_hash: new_hash },
        );
        self.index.set_next(prev_hash, new_hash)?;

        self.persist_block_outline(&block_index)?;
        if let Some(updated_prev) = self.index.block(prev_hash) {
            self.persist_block_outline(&updated_prev)?;
        }

        let current_tip = self.index.fork_tip(block_index.origin)?;
        let current_tip_trust = self.index.block(current_tip).map_or(primitive_types::U256::zero(), |idx| idx.chain_trust);
        if block_index.chain_trust > current_tip_trust {
            let view = BlockView::build(&self.kv, &self.files, &self.index, block_index.origin, current_tip, new_hash, MIN_ENROLL_AMOUNT)?;
            view.commit(&self.kv, &self.index)?;
        }

        Ok(())
    }

    /// The genesis path: no `prev` to validate against, so `block`
    /// establishes its own fork rather than extending one. Bypasses
    /// [`chain_rules::check_block_context_free`] entirely (it rejects
    /// anything but `Primary` in v1) in favor of the narrower set of
    /// checks a trust-anchor block actually needs.
    fn accept_genesis(&self, block: Block) -> Result<(), ChainError> {
        let new_hash = block.block_hash(0);
        if self.index.block(new_hash).is_some() {
            return Err(ChainError::AlreadyHave(new_hash));
        }
        if block.mint_tx.send_to != self.params.genesis_mint_destination() || !block.vtx.is_empty() {
            return Err(ChainError::BadGenesis);
        }
        chain_rules::check_tx_context_free(&block.mint_tx)?;
        if block.tx_merkle_root != block.compute_tx_merkle_root() {
            return Err(ChainError::BadGenesis);
        }

        let mint_template = self.params.genesis_mint_template();
        let sig_result = block.mint_tx.send_to.verify_tx_signature(&block.header_bytes(), Some(&mint_template), &block.sig, 0);
        if !matches!(sig_result, SigVerifyResult::OkComplete) {
            return Err(chain_rules::BlockError::BadBlockSignature.into());
        }

        let pos = self.files.write_block(&block)?;
        let profile = ForkProfile {
            name: self.params.genesis.name.to_owned(),
            symbol: self.params.genesis.symbol.to_owned(),
            initial_supply: i128::from(self.params.genesis.initial_supply),
            mint_reward: self.params.genesis.initial_mint_reward,
            halve_cycle: 0,
            min_tx_fee: self.params.genesis.min_tx_fee,
            isolated: false,
            private: false,
            enclosed: false,
            owner: Destination::PubKey(self.params.owner_pubkey),
            parent_fork: None,
            join_height: None,
        };
        let block_index = BlockIndex {
            hash: new_hash,
            prev: None,
            next: None,
            origin: new_hash,
            file: pos.file_no,
            offset: pos.offset,
            height: 0,
            version: block.version,
            block_type: block.block_type,
            mint_type: MintType::DelegateMint,
            mint_txid: block.mint_tx.txid(),
            timestamp: block.timestamp,
            money_supply: i128::from(block.mint_tx.amount),
            chain_trust: primitive_types::U256::zero(),
            rand_beacon: 0,
            proof_algo: ProofAlgo::ProofOfWork,
            proof_bits: self.params.genesis.initial_bits,
        };

        let (mint_outpoint, mint_out) = crate::utxo::apply_mint_tx(&block.mint_tx, 0);

        let mut wtxn = self.kv.write_txn()?;
        self.kv.block_outline.put(&mut wtxn, &new_hash, &block_index)?;
        self.kv.unspent.put(&mut wtxn, &chain_kv::tables::UnspentKey { fork: new_hash, outpoint: mint_outpoint }, &mint_out)?;
        self.kv.tx_index.put(
            &mut wtxn,
            &block.mint_tx.txid(),
            &TxLocation { fork_hash: new_hash, block_height: 0, file: pos.file_no, offset: pos.offset },
        )?;
        self.kv.template.put(&mut wtxn, &mint_template.template_id(), &mint_template)?;
        self.kv.fork.put(&mut wtxn, &new_hash, &chain_types::Fork { origin_hash: new_hash, tip: new_hash })?;
        self.kv.fork_context.put(&mut wtxn, &new_hash, &profile)?;
        wtxn.commit().map_err(KvError::from)?;
        self.kv.sync()?;

        self.index.insert_block(block_index);
        self.index.register_fork(new_hash, profile, new_hash);
        self.index.record_height_entry(
            new_hash,
            0,
            new_hash,
            chain_types::HeightEntry { timestamp: block.timestamp, mint_dest: block.mint_tx.send_to, ref_block_hash: new_hash },
        );

        tracing::info!(hash = ?new_hash, "accepted genesis block, registered new fork");
        Ok(())
    }

    fn persist_block_outline(&self, block_index: &BlockIndex) -> Result<(), ChainError> {
        let mut wtxn = self.kv.write_txn()?;
        self.kv.block_outline.put(&mut wtxn, &block_index.hash, block_index)?;
        wtxn.commit().map_err(KvError::from)?;
        Ok(())
    }

    /// Seeds a [`DifficultyCache`] from `prev_hash`'s own
    /// proof-of-work ancestry (up to [`POW_ADJUST_COUNT`] `+ 1` of
    /// them), recomputed from the index on every call rather than kept
    /// as a field — the index's `prev` chain is always authoritative,
    /// including immediately after a reorg, and a recompute over at
    /// most nine ancestors is cheap next to a disk read.
    fn difficulty_cache_for(&self, prev_hash: Hash256) -> DifficultyCache {
        let mut history = Vec::with_capacity(POW_ADJUST_COUNT + 1);
        let mut cursor = Some(prev_hash);
        while let Some(hash) = cursor {
            let Some(block_index) = self.index.block(hash) else { break };
            if block_index.proof_algo == ProofAlgo::ProofOfWork {
                history.push((block_index.timestamp, block_index.proof_bits));
            }
            if history.len() >= POW_ADJUST_COUNT + 1 {
                break;
            }
            cursor = block_index.prev;
        }
        history.reverse();
        DifficultyCache::from_history(history)
    }

    /// Validates `tx` context-free and reports the result; carries no
    /// mempool of its own (out of scope per the spec's non-goals —
    /// mempool admission policy beyond this check is an external
    /// collaborator's concern).
    ///
    /// # Errors
    /// Any [`chain_rules::TxError`].
    pub fn add_new_tx(&self, tx: &Transaction) -> Result<(), ChainError> {
        chain_rules::check_tx_context_free(tx)?;
        Ok(())
    }

    /// # Errors
    /// Any file-store error reading an indexed block's bytes.
    pub fn get_block(&self, hash: Hash256) -> Result<Option<Block>, ChainError> {
        let Some(block_index) = self.index.block(hash) else { return Ok(None) };
        Ok(Some(self.files.read_block(FilePos { file_no: block_index.file, offset: block_index.offset })?))
    }

    /// # Errors
    /// Any KV or file-store error.
    pub fn get_tx(&self, txid: Hash256) -> Result<Option<(Transaction, TxLocation)>, ChainError> {
        let rtxn = self.kv.read_txn()?;
        let Some(location) = self.kv.tx_index.get(&rtxn, &txid)? else { return Ok(None) };
        let tx = self.files.read_tx(FilePos { file_no: location.file, offset: location.offset })?;
        Ok(Some((tx, location)))
    }

    /// The tip index of the fork rooted at `origin`.
    ///
    /// # Errors
    /// [`ContextError::UnknownFork`]/[`ContextError::UnknownBlock`] if `origin`
    /// isn't a registered fork or its recorded tip isn't indexed.
    pub fn retrieve_fork(&self, origin: Hash256) -> Result<BlockIndex, ChainError> {
        let tip = self.index.fork_tip(origin)?;
        self.index.block(tip).ok_or_else(|| ContextError::UnknownBlock(tip).into())
    }

    /// Every registered fork's origin hash and static profile.
    ///
    /// # Errors
    /// Any KV error.
    pub fn list_forks(&self) -> Result<Vec<(Hash256, ForkProfile)>, ChainError> {
        let rtxn = self.kv.read_txn()?;
        self.kv.fork_context.iter(&rtxn)?.map(|row| row.map_err(ChainError::from)).collect()
    }

    /// Up to `max` unspent outputs on `fork` owned by `dest`, in table
    /// key order.
    ///
    /// # Errors
    /// Any KV error.
    pub fn get_unspent(&self, fork: Hash256, dest: Destination, max: usize) -> Result<Vec<(OutPoint, TxOut)>, ChainError> {
        let rtxn = self.kv.read_txn()?;
        let mut out = Vec::new();
        for row in self.kv.unspent.iter(&rtxn)? {
            let (key, value) = row?;
            if key.fork == fork && value.dest == dest {
                out.push((key.outpoint, value));
                if out.len() >= max {
                    break;
                }
            }
        }
        Ok(out)
    }

    /// The proof-of-work prefix an external miner searches candidate
    /// `proof_bytes` against, for the next block on `fork`'s tip minted
    /// by `mint_template` (one of `ProofOfWorkMint`/`DelegateMint`).
    ///
    /// # Errors
    /// [`ChainError::NotAMintTemplate`] if `mint_template` isn't a
    /// block-signing kind; any index/KV error.
    pub fn get_work(&self, fork: Hash256, mint_template: &TemplateKind) -> Result<WorkTemplate, ChainError> {
        if !matches!(mint_template.tag(), TemplateKindTag::ProofOfWorkMint | TemplateKindTag::DelegateMint) {
            return Err(ChainError::NotAMintTemplate);
        }
        let prev_hash = self.index.fork_tip(fork)?;
        let prev = self.index.block(prev_hash).ok_or(ContextError::UnknownBlock(prev_hash))?;
        let retarget = self.difficulty_cache_for(prev_hash);
        let bits = retarget.next_bits(prev.proof_bits);

        let mut work_header_bytes = Vec::new();
        0_u8.encode(&mut work_header_bytes);
        bits.encode(&mut work_header_bytes);
        Destination::Template(mint_template.template_id()).encode(&mut work_header_bytes);

        Ok(WorkTemplate { work_header_bytes, prev_height: prev.height, prev_hash, prev_time: prev.timestamp, algo: 0, bits })
    }

    /// Assembles and ingests the next block on `fork`'s tip from a
    /// solved `proof_bytes` ([`WorkTemplate::work_header_bytes`] plus
    /// whatever nonce padding satisfied the target), minted by
    /// `mint_template` and signed by `mint_key`.
    ///
    /// # Errors
    /// As [`Chain::get_work`], plus anything [`Chain::add_new_block`]
    /// can return for the assembled block.
    pub fn submit_work(
        &self,
        fork: Hash256,
        proof_bytes: Vec<u8>,
        mint_template: TemplateKind,
        mint_key: &PrivateKey,
    ) -> Result<(), ChainError> {
        let tx_type = match mint_template.tag() {
            TemplateKindTag::ProofOfWorkMint => TxType::Work,
            TemplateKindTag::DelegateMint => TxType::Stake,
            _ => return Err(ChainError::NotAMintTemplate),
        };
        let prev_hash = self.index.fork_tip(fork)?;
        let prev = self.index.block(prev_hash).ok_or(ContextError::UnknownBlock(prev_hash))?;
        let height = prev.height + 1;
        let reward = chain_context::mint_reward(u64::from(height));
        let timestamp = now_unix();

        let mint_tx = Transaction {
            version: 1,
            tx_type,
            timestamp,
            lock_until: 0,
            inputs: Vec::new(),
            send_to: Destination::Template(mint_template.template_id()),
            amount: reward,
            fee: 0,
            data: template::encode_leading_template(&mint_template),
            sig: Vec::new(),
        };

        let mut block = Block {
            version: 1,
            block_type: BlockType::Primary,
            timestamp,
            prev_hash,
            tx_merkle_root: Hash256::ZERO,
            proof_bytes,
            mint_tx,
            vtx: Vec::new(),
            sig: Vec::new(),
        };
        block.tx_merkle_root = block.compute_tx_merkle_root();
        block.sig = mint_key.sign(&block.header_bytes());

        self.add_new_block(block)
    }

    /// The `bits` the next block on top of `prev_hash` must satisfy, and
    /// the mint reward it's entitled to.
    ///
    /// # Errors
    /// [`ContextError::UnknownBlock`] if `prev_hash` isn't indexed.
    pub fn get_proof_of_work_target(&self, prev_hash: Hash256) -> Result<(u32, i64), ChainError> {
        let prev = self.index.block(prev_hash).ok_or(ContextError::UnknownBlock(prev_hash))?;
        let retarget = self.difficulty_cache_for(prev_hash);
        Ok((retarget.next_bits(prev.proof_bits), chain_context::mint_reward(u64::from(prev.height + 1))))
    }

    /// Whether `ref_hash` is an indexed block on the fork rooted at
    /// `genesis`.
    #[must_use]
    pub fn verify_ref_block(&self, genesis: Hash256, ref_hash: Hash256) -> bool {
        self.index.block(ref_hash).is_some_and(|idx| idx.origin == genesis)
    }
}

#[cfg(test)]
mod tests {
    use chain_types::PrivateKey;
    use rand_core::OsRng;

    use super::*;

    fn owner_key() -> PrivateKey {
        PrivateKey::generate(&mut OsRng)
    }

    fn open_chain() -> (tempfile::TempDir, Chain, PrivateKey) {
        let dir = tempfile::tempdir().unwrap();
        let key = owner_key();
        let params = ChainParams::testnet(key.public_key());
        let chain = Chain::initialize(dir.path(), params).unwrap();
        (dir, chain, key)
    }

    fn signed_genesis(chain: &Chain, key: &PrivateKey) -> Block {
        let mut block = Chain::draft_genesis_block(&chain.params);
        block.sig = key.sign(&block.header_bytes());
        block
    }

    #[test]
    fn genesis_round_trips() {
        let (_dir, chain, key) = open_chain();
        let genesis = signed_genesis(&chain, &key);
        let hash = genesis.block_hash(0);

        chain.add_new_block(genesis.clone()).unwrap();

        let fetched = chain.get_block(hash).unwrap().unwrap();
        assert_eq!(fetched.to_bytes(), genesis.to_bytes());

        let forks = chain.list_forks().unwrap();
        assert_eq!(forks.len(), 1);
        assert_eq!(forks[0].0, hash);
    }

    #[test]
    fn duplicate_genesis_is_rejected() {
        let (_dir, chain, key) = open_chain();
        let genesis = signed_genesis(&chain, &key);
        chain.add_new_block(genesis.clone()).unwrap();
        assert!(matches!(chain.add_new_block(genesis), Err(ChainError::AlreadyHave(_))));
    }

    #[test]
    fn reopening_recovers_the_fork() {
        let dir = tempfile::tempdir().unwrap();
        let key = owner_key();
        let params = ChainParams::testnet(key.public_key());
        let hash = {
            let chain = Chain::initialize(dir.path(), params).unwrap();
            let genesis = signed_genesis(&chain, &key);
            let hash = genesis.block_hash(0);
            chain.add_new_block(genesis).unwrap();
            hash
        };

        let reopened = Chain::initialize(dir.path(), params).unwrap();
        assert_eq!(reopened.retrieve_fork(hash).unwrap().hash, hash);
        assert!(reopened.get_block(hash).unwrap().is_some());
    }

    #[test]
    fn get_work_rejects_a_non_mint_template() {
        let (_dir, chain, key) = open_chain();
        let genesis = signed_genesis(&chain, &key);
        let origin = genesis.block_hash(0);
        chain.add_new_block(genesis).unwrap();

        let not_mint = TemplateKind::Vote { delegate: Hash256::hash(b"delegate") };
        assert!(matches!(chain.get_work(origin, &not_mint), Err(ChainError::NotAMintTemplate)));
    }
}
