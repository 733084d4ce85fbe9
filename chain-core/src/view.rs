//! BlockView / commit engine (C10).
//!
//! A [`BlockView`] is built once per chain-tip update: [`BlockView::build`]
//! branch-walks from the active tip to a candidate tip, replays every
//! block being dropped (`RemoveBlock`) and every block being newly
//! connected (`AddBlock`) against an in-memory overlay, and
//! [`BlockView::commit`] then writes every accumulated delta through a
//! single `ChainKv` write transaction — the point at which a candidate
//! stops being merely "indexed" and becomes "committed" (§4.10's state
//! machine).

use std::collections::HashMap;

use chain_context::{delegate, ChainIndex, ContextError};
use chain_kv::{
    tables::{DelegateKey, EnrollKey, InviteKey, InviteRecord, TxLocation, UnspentKey},
    ChainKv, FilePos, FileStore,
};
use chain_types::{Block, BlockIndex, BlockType, Destination, Fork, Hash256, OutPoint, TemplateId, TemplateKind, TxOut, TxType};

use crate::{
    error::ChainError,
    template::{self, TemplateRegistry},
    utxo,
};

/// A [`TemplateRegistry`] reading through to `kv`'s persisted table and
/// buffering first-sight registrations in a [`BlockView`]'s own overlay,
/// so a candidate branch can establish and immediately reference a
/// template within the same still-uncommitted view.
struct ViewRegistry<'a, 'txn> {
    kv: &'a ChainKv,
    rtxn: &'a heed::RoTxn<'txn>,
    pending: &'a mut HashMap<TemplateId, TemplateKind>,
}

impl TemplateRegistry for ViewRegistry<'_, '_> {
    fn lookup(&self, id: TemplateId) -> Result<Option<TemplateKind>, ChainError> {
        if let Some(kind) = self.pending.get(&id) {
            return Ok(Some(kind.clone()));
        }
        Ok(self.kv.template.get(self.rtxn, &id)?)
    }

    fn register(&mut self, id: TemplateId, kind: TemplateKind) {
        self.pending.insert(id, kind);
    }
}

fn resolve_tx_vote_effect(
    registry: &mut impl TemplateRegistry,
    tx: &chain_types::Transaction,
    spent_outputs: &[TxOut],
    location: FilePos,
) -> Result<delegate::TxVoteEffect, ChainError> {
    let dest_in = spent_outputs.first().map_or(Destination::Null, |out| out.dest);
    let (dest_in_template, send_to_template) = template::resolve_tx_templates(registry, tx, dest_in)?;

    let dest_in_delegate = dest_in_template.as_ref().and_then(chain_types::TemplateKind::as_delegate);
    let dest_out_delegate = send_to_template.as_ref().and_then(chain_types::TemplateKind::as_delegate);

    let anchor_height = if tx.tx_type == TxType::Cert && tx.data.len() >= 4 {
        Some(u32::from_le_bytes(tx.data[..4].try_into().expect("checked length above")))
    } else {
        None
    };

    Ok(delegate::TxVoteEffect {
        dest_out_delegate,
        dest_in_delegate,
        amount: tx.amount,
        fee: tx.fee,
        is_cert: tx.tx_type == TxType::Cert,
        anchor_height,
        location: (location.file_no, location.offset),
    })
}

/// Resolves the `TxOut` a still-indexed, but possibly already-spent,
/// `outpoint` originally produced — by consulting the live unspent row
/// first, and otherwise re-deriving it from the producing transaction
/// (recursing through its own inputs if it isn't a mint). This is how
/// [`BlockView::remove_block`] restores coins a later, now-reverted
/// block consumed, without a separate undo log: the UTXO apply
/// functions in [`crate::utxo`] are pure, so replaying a producing
/// transaction's own resolution is exactly as good as having journaled
/// its output.
fn resolve_original_output(
    kv: &ChainKv,
    files: &FileStore,
    rtxn: &heed::RoTxn<'_>,
    fork: Hash256,
    outpoint: OutPoint,
) -> Result<TxOut, ChainError> {
    if let Some(existing) = kv.unspent.get(rtxn, &UnspentKey { fork, outpoint })? {
        return Ok(existing);
    }

    let location = kv.tx_index.get_required(rtxn, &outpoint.txid)?;
    let tx = files.read_tx(FilePos { file_no: location.file, offset: location.offset })?;

    if tx.tx_type.is_mint() {
        let (_, out) = utxo::apply_mint_tx(&tx, location.block_height);
        Ok(out)
    } else {
        let spent_outputs = utxo::spent_outpoints(&tx)
            .into_iter()
            .map(|op| resolve_original_output(kv, files, rtxn, fork, op))
            .collect::<Result<Vec<_>, _>>()?;
        utxo::apply_tx(&tx, &spent_outputs)
            .into_iter()
            .find(|(op, _)| *op == outpoint)
            .map(|(_, out)| out)
            .ok_or(ChainError::MissingPrev(outpoint.txid))
    }
}

/// An in-progress chain-tip update: the overlay of every UTXO, tx-index,
/// delegate-balance and invite-graph delta a branch walk's `RemoveBlock`/
/// `AddBlock` sequence has produced so far, not yet written to `ChainKv`.
pub struct BlockView<'v> {
    kv: &'v ChainKv,
    files: &'v FileStore,
    fork: Hash256,
    new_tip: Hash256,
    utxo_overlay: HashMap<OutPoint, Option<TxOut>>,
    tx_overlay: HashMap<Hash256, Option<TxLocation>>,
    delegate_snapshots: Vec<(Hash256, HashMap<Hash256, i64>)>,
    enrollments: Vec<(u32, Hash256, u32, u64)>,
    invites: Vec<(InviteKey, InviteRecord)>,
    template_registrations: HashMap<TemplateId, TemplateKind>,
    removed_blocks: Vec<Block>,
    added_blocks: Vec<Block>,
}

impl<'v> BlockView<'v> {
    /// Branch-walks `index` from `current_tip` to `new_tip`, replaying
    /// every dropped block (newest-first) and every newly connected
    /// block (oldest-first) against a fresh overlay.
    ///
    /// # Errors
    /// [`ContextError::UnknownBlock`]/[`ContextError::NoForkPoint`] if
    /// the branch walk can't complete; any KV/file-store error surfacing
    /// from a block or transaction read along the way; a delegate
    /// transition or template-resolution error from a connected block.
    pub fn build(
        kv: &'v ChainKv,
        files: &'v FileStore,
        index: &ChainIndex,
        fork: Hash256,
        current_tip: Hash256,
        new_tip: Hash256,
        min_enroll_amount: i64,
    ) -> Result<Self, ChainError> {
        let (fork_point, added_path) = index.branch_walk(current_tip, new_tip)?;

        let mut removed_path = Vec::new();
        let mut cursor = current_tip;
        while cursor != fork_point {
            let block_index = index.block(cursor).ok_or(ContextError::UnknownBlock(cursor))?;
            removed_path.push(block_index);
            cursor = block_index.prev.ok_or(ContextError::NoForkPoint { tip: current_tip, candidate: new_tip })?;
        }

        let mut view = Self {
            kv,
            files,
            fork,
            new_tip,
            utxo_overlay: HashMap::new(),
            tx_overlay: HashMap::new(),
            delegate_snapshots: Vec::new(),
            enrollments: Vec::new(),
            invites: Vec::new(),
            template_registrations: HashMap::new(),
            removed_blocks: Vec::new(),
            added_blocks: Vec::new(),
        };

        let rtxn = kv.read_txn()?;
        for block_index in removed_path {
            let block = files.read_block(FilePos { file_no: block_index.file, offset: block_index.offset })?;
            view.remove_block(&rtxn, &block, &block_index)?;
            view.removed_blocks.push(block);
        }

        for hash in added_path {
            let block_index = index.block(hash).ok_or(ContextError::UnknownBlock(hash))?;
            let block = files.read_block(FilePos { file_no: block_index.file, offset: block_index.offset })?;
            view.add_block(&rtxn, &block, &block_index, min_enroll_amount)?;
            view.added_blocks.push(block);
        }

        Ok(view)
    }

    fn read_unspent(&self, rtxn: &heed::RoTxn<'_>, outpoint: OutPoint) -> Result<Option<TxOut>, ChainError> {
        if let Some(overlaid) = self.utxo_overlay.get(&outpoint) {
            return Ok(overlaid.clone());
        }
        Ok(self.kv.unspent.get(rtxn, &UnspentKey { fork: self.fork, outpoint })?)
    }

    fn load_balances(&self, rtxn: &heed::RoTxn<'_>, block_hash: Hash256) -> Result<HashMap<Hash256, i64>, ChainError> {
        if let Some((_, balances)) = self.delegate_snapshots.iter().rev().find(|(hash, _)| *hash == block_hash) {
            return Ok(balances.clone());
        }
        let mut balances = HashMap::new();
        for row in self.kv.delegate.iter(rtxn)? {
            let (key, votes) = row?;
            if key.block_hash == block_hash {
                balances.insert(key.delegate, votes);
            }
        }
        Ok(balances)
    }

    /// Reverts one block: restores every output its transactions spent,
    /// tombstones every output it produced, and drops its transactions'
    /// index entries. Delegate snapshots for reverted blocks are left
    /// in place (harmless, unreferenced once the fork tip moves past
    /// them) rather than explicitly deleted — §4.10 only asks that
    /// *added* blocks get a persisted snapshot.
    fn remove_block(&mut self, rtxn: &heed::RoTxn<'_>, block: &Block, block_index: &BlockIndex) -> Result<(), ChainError> {
        if block.block_type == BlockType::Vacant {
            return Ok(());
        }

        for tx in std::iter::once(&block.mint_tx).chain(block.vtx.iter()).rev() {
            for outpoint in utxo::spent_outpoints(tx) {
                let restored = resolve_original_output(self.kv, self.files, rtxn, self.fork, outpoint)?;
                self.utxo_overlay.insert(outpoint, Some(restored));
            }
            let produced = if tx.tx_type.is_mint() {
                vec![utxo::apply_mint_tx(tx, block_index.height).0]
            } else {
                let spent = self.resolve_spent(rtxn, tx)?;
                utxo::apply_tx(tx, &spent).into_iter().map(|(op, _)| op).collect()
            };
            for outpoint in produced {
                self.utxo_overlay.insert(outpoint, None);
            }
            self.tx_overlay.insert(tx.txid(), None);
        }
        Ok(())
    }

    fn resolve_spent(&self, rtxn: &heed::RoTxn<'_>, tx: &chain_types::Transaction) -> Result<Vec<TxOut>, ChainError> {
        utxo::spent_outpoints(tx)
            .into_iter()
            .map(|op| self.read_unspent(rtxn, op)?.ok_or(ChainError::MissingPrev(op.txid)))
            .collect()
    }

    /// Connects one block: checks each ordinary transaction against its
    /// resolved spent outputs (chain-core's own PoW/DPoS/origin checks
    /// for the block itself already ran before the caller built this
    /// view), applies mint/ordinary transactions' UTXO deltas, records
    /// their tx-index locations, folds their resolved vote effects into
    /// a fresh delegate snapshot, and (on a private fork) extends the
    /// address-invite graph for any first-seen payee.
    fn add_block(
        &mut self,
        rtxn: &heed::RoTxn<'_>,
        block: &Block,
        block_index: &BlockIndex,
        min_enroll_amount: i64,
    ) -> Result<(), ChainError> {
        if block.block_type == BlockType::Vacant {
            return Ok(());
        }

        let offsets = block.tx_offsets();
        let mut mint_effect = None;
        let mut tx_effects = Vec::with_capacity(block.vtx.len());

        let mint_location =
            FilePos { file_no: block_index.file, offset: block_index.offset + offsets[0] };
        let (mint_outpoint, mint_out) = utxo::apply_mint_tx(&block.mint_tx, block_index.height);
        self.utxo_overlay.insert(mint_outpoint, Some(mint_out));
        self.tx_overlay.insert(
            block.mint_tx.txid(),
            Some(TxLocation {
                fork_hash: self.fork,
                block_height: block_index.height,
                file: mint_location.file_no,
                offset: mint_location.offset,
            }),
        );
        if let Destination::Template(_) = block.mint_tx.send_to {
            let mut registry = ViewRegistry { kv: self.kv, rtxn, pending: &mut self.template_registrations };
            let send_to_template = template::resolve_send_to_template(&mut registry, block.mint_tx.send_to, &block.mint_tx.data)?;
            if let Some(template) = send_to_template {
                if let Some(d) = template.as_delegate() {
                    mint_effect = Some((d, block.mint_tx.amount));
                }
            }
        }

        for (i, tx) in block.vtx.iter().enumerate() {
            let location = FilePos { file_no: block_index.file, offset: block_index.offset + offsets[i + 1] };
            let spent = self.resolve_spent(rtxn, tx)?;

            let dest_in = spent.first().map_or(Destination::Null, |out| out.dest);
            let mut registry = ViewRegistry { kv: self.kv, rtxn, pending: &mut self.template_registrations };
            let dest_in_template = template::resolve_dest_in_template(&mut registry, dest_in)?;
            chain_rules::check_tx_in_context(tx, &spent, dest_in_template.as_ref(), u64::from(block_index.height))?;

            for outpoint in utxo::spent_outpoints(tx) {
                self.utxo_overlay.insert(outpoint, None);
            }
            for (outpoint, out) in utxo::apply_tx(tx, &spent) {
                self.utxo_overlay.insert(outpoint, Some(out));
            }
            self.tx_overlay.insert(
                tx.txid(),
                Some(TxLocation {
                    fork_hash: self.fork,
                    block_height: block_index.height,
                    file: location.file_no,
                    offset: location.offset,
                }),
            );

            let mut registry = ViewRegistry { kv: self.kv, rtxn, pending: &mut self.template_registrations };
            tx_effects.push(resolve_tx_vote_effect(&mut registry, tx, &spent, location)?);

            self.record_invite(rtxn, tx, &spent)?;
        }

        let prev_balances = match block_index.prev {
            Some(prev) => self.load_balances(rtxn, prev)?,
            None => HashMap::new(),
        };
        let transition = delegate::apply_block(&prev_balances, mint_effect, &tx_effects, min_enroll_amount)?;
        self.delegate_snapshots.push((block_index.hash, transition.balances));
        self.enrollments.extend(transition.enrollments);

        Ok(())
    }

    /// Records a first-receipt invite edge when `tx` pays a previously
    /// unseen plain-key address at least `INVITE_MIN_AMOUNT` (spec's
    /// address-invite graph, §4.5/glossary). Non-`PubKey` payees and
    /// amounts under the threshold are out of scope for this edge.
    fn record_invite(
        &mut self,
        rtxn: &heed::RoTxn<'_>,
        tx: &chain_types::Transaction,
        spent: &[TxOut],
    ) -> Result<(), ChainError> {
        let Destination::PubKey(addr) = tx.send_to else { return Ok(()) };
        if tx.amount < chain_constants::money::INVITE_MIN_AMOUNT {
            return Ok(());
        }
        let key = InviteKey { fork: self.fork, addr };
        if self.kv.address_invite.contains(rtxn, &key)? || self.invites.iter().any(|(k, _)| *k == key) {
            return Ok(());
        }
        let inviter = match spent.first().map(|out| out.dest) {
            Some(Destination::PubKey(pubkey)) => pubkey,
            _ => addr,
        };
        self.invites.push((key, InviteRecord { inviter, invite_txid: tx.txid() }));
        Ok(())
    }

    /// Writes every accumulated delta through one `ChainKv` write
    /// transaction, updates the fork's tip, and flushes the environment.
    ///
    /// # Errors
    /// Propagates any KV error; [`ContextError::UnknownFork`] if `fork`
    /// isn't registered in `index`.
    pub fn commit(self, kv: &ChainKv, index: &ChainIndex) -> Result<(), ChainError> {
        let mut wtxn = kv.write_txn()?;

        for (outpoint, value) in &self.utxo_overlay {
            let key = UnspentKey { fork: self.fork, outpoint: *outpoint };
            match value {
                Some(out) => kv.unspent.put(&mut wtxn, &key, out)?,
                None => {
                    kv.unspent.delete(&mut wtxn, &key)?;
                }
            }
        }

        for (txid, location) in &self.tx_overlay {
            match location {
                Some(loc) => kv.tx_index.put(&mut wtxn, txid, loc)?,
                None => {
                    kv.tx_index.delete(&mut wtxn, txid)?;
                }
            }
        }

        for (block_hash, balances) in &self.delegate_snapshots {
            for (delegate, votes) in balances {
                kv.delegate.put(&mut wtxn, &DelegateKey { block_hash: *block_hash, delegate: *delegate }, votes)?;
            }
        }

        for (height, delegate, file, offset) in &self.enrollments {
            kv.enroll.put(
                &mut wtxn,
                &EnrollKey { height: *height, delegate: *delegate },
                &chain_types::EnrollRecord { file: *file, offset: *offset },
            )?;
        }

        for (key, record) in &self.invites {
            kv.address_invite.put(&mut wtxn, key, record)?;
        }

        for (id, kind) in &self.template_registrations {
            kv.template.put(&mut wtxn, id, kind)?;
        }

        kv.fork.put(&mut wtxn, &self.fork, &Fork { origin_hash: self.fork, tip: self.new_tip })?;

        wtxn.commit().map_err(chain_kv::KvError::from)?;
        kv.sync()?;
        index.set_fork_tip(self.fork, self.new_tip)?;

        tracing::info!(
            fork = ?self.fork,
            new_tip = ?self.new_tip,
            removed = self.removed_blocks.len(),
            added = self.added_blocks.len(),
            "committed fork tip update"
        );
        Ok(())
    }
}
