//! Context-free block checks (spec §4.11).

use std::collections::HashSet;

use chain_constants::block::MAX_CLOCK_DRIFT;
use chain_types::{Block, BlockType, Destination, SigVerifyResult, TemplateKind};

use crate::{error::BlockError, tx::check_tx_context_free};

/// Runs every context-free check on `block`, given the wall clock `now`
/// and the parsed destination/template backing its mint transaction's
/// `send_to` (the caller already owns the template decode, since only it
/// knows which template registry entry `send_to` resolves to).
///
/// # Errors
/// The first check that fails, per [`BlockError`].
pub fn check_block_context_free(
    block: &Block,
    now: u32,
    mint_template: Option<&TemplateKind>,
) -> Result<(), BlockError> {
    check_type(block)?;
    check_timestamp(block, now)?;
    check_mint_tx(block)?;
    check_merkle_root(block)?;
    check_no_duplicate_txids(block)?;
    check_embedded_txs(block)?;
    check_block_signature(block, mint_template)?;
    Ok(())
}

fn check_type(block: &Block) -> Result<(), BlockError> {
    if block.version == 1 && block.block_type != BlockType::Primary {
        Err(BlockError::IllegalType(block.block_type))
    } else {
        Ok(())
    }
}

fn check_timestamp(block: &Block, now: u32) -> Result<(), BlockError> {
    #[allow(clippy::cast_possible_truncation)]
    let max_drift = MAX_CLOCK_DRIFT.as_secs() as u32;
    if block.timestamp > now.saturating_add(max_drift) {
        Err(BlockError::TimestampTooFarAhead { timestamp: block.timestamp, now, max_drift })
    } else {
        Ok(())
    }
}

fn check_mint_tx(block: &Block) -> Result<(), BlockError> {
    check_tx_context_free(&block.mint_tx).map_err(BlockError::InvalidMintTx)
}

fn check_merkle_root(block: &Block) -> Result<(), BlockError> {
    if block.tx_merkle_root == block.compute_tx_merkle_root() {
        Ok(())
    } else {
        Err(BlockError::MerkleMismatch)
    }
}

fn check_no_duplicate_txids(block: &Block) -> Result<(), BlockError> {
    let mut seen = HashSet::with_capacity(1 + block.vtx.len());
    seen.insert(block.mint_tx.txid());
    for tx in &block.vtx {
        if !seen.insert(tx.txid()) {
            return Err(BlockError::DuplicateTxid);
        }
    }
    Ok(())
}

fn check_embedded_txs(block: &Block) -> Result<(), BlockError> {
    for (index, tx) in block.vtx.iter().enumerate() {
        check_tx_context_free(tx).map_err(|source| BlockError::InvalidTx { index, source })?;
    }
    Ok(())
}

fn check_block_signature(block: &Block, mint_template: Option<&TemplateKind>) -> Result<(), BlockError> {
    // fork_height is meaningless here: the only templates a mint `send_to`
    // resolves to are ProofOfWorkMint/DelegateMint, neither height-gated.
    let result = block
        .mint_tx
        .send_to
        .verify_tx_signature(&block.header_bytes(), mint_template, &block.sig, 0);
    if matches!(result, SigVerifyResult::OkComplete) {
        Ok(())
    } else {
        Err(BlockError::BadBlockSignature)
    }
}

#[cfg(test)]
mod tests {
    use chain_types::{Hash256, PrivateKey, Transaction, TxType};
    use rand_core::OsRng;

    use super::*;

    fn signed_block(key: &PrivateKey, now: u32) -> Block {
        let mint_tx = Transaction {
            version: 1,
            tx_type: TxType::Work,
            timestamp: now,
            lock_until: 0,
            inputs: vec![],
            send_to: Destination::PubKey(key.public_key()),
            amount: 5_000,
            fee: 0,
            data: vec![],
            sig: vec![],
        };
        let mut block = Block {
            version: 1,
            block_type: BlockType::Primary,
            timestamp: now,
            prev_hash: Hash256::hash(b"parent"),
            tx_merkle_root: Hash256::ZERO,
            proof_bytes: vec![0; 46],
            mint_tx,
            vtx: vec![],
            sig: vec![],
        };
        block.tx_merkle_root = block.compute_tx_merkle_root();
        block.sig = key.sign(&block.header_bytes());
        block
    }

    #[test]
    fn well_formed_primary_block_passes() {
        let key = PrivateKey::generate(&mut OsRng);
        let block = signed_block(&key, 1_700_000_000);
        assert!(check_block_context_free(&block, 1_700_000_000, None).is_ok());
    }

    #[test]
    fn timestamp_far_in_future_is_rejected() {
        let key = PrivateKey::generate(&mut OsRng);
        let block = signed_block(&key, 2_000_000_000);
        assert_eq!(
            check_block_context_free(&block, 1_700_000_000, None),
            Err(BlockError::TimestampTooFarAhead {
                timestamp: 2_000_000_000,
                now: 1_700_000_000,
                max_drift: 600,
            })
        );
    }

    #[test]
    fn tampered_merkle_root_is_rejected() {
        let key = PrivateKey::generate(&mut OsRng);
        let mut block = signed_block(&key, 1_700_000_000);
        block.tx_merkle_root = Hash256::hash(b"tampered");
        assert_eq!(check_block_context_free(&block, 1_700_000_000, None), Err(BlockError::MerkleMismatch));
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let key = PrivateKey::generate(&mut OsRng);
        let mut block = signed_block(&key, 1_700_000_000);
        block.sig = vec![0; 64];
        assert_eq!(check_block_context_free(&block, 1_700_000_000, None), Err(BlockError::BadBlockSignature));
    }

    #[test]
    fn subsidiary_block_rejected_in_v1() {
        let key = PrivateKey::generate(&mut OsRng);
        let mut block = signed_block(&key, 1_700_000_000);
        block.block_type = BlockType::Subsidiary;
        assert_eq!(
            check_block_context_free(&block, 1_700_000_000, None),
            Err(BlockError::IllegalType(BlockType::Subsidiary))
        );
    }
}
