//! Context-dependent proof-of-work check (spec §4.8/§4.11).
//!
//! `proof_bytes` for a proof-of-work block carries `algo:u8, bits:u32,
//! mint_dest:Destination` ahead of any algorithm-specific padding; the
//! 46-byte floor spec'd for `proof_bytes` is enforced independently of
//! that parse.

use chain_context::DifficultyCache;
use chain_types::{codec::Decode, Block, BlockIndex, Destination};

use crate::error::PowError;

const MIN_PROOF_LEN: usize = 46;

struct ParsedProof {
    bits: u32,
    mint_dest: Destination,
}

fn parse_proof(proof_bytes: &[u8]) -> Result<ParsedProof, PowError> {
    let mut buf = proof_bytes;
    let _algo = u8::decode(&mut buf).map_err(|_| PowError::UnparseableProof)?;
    let bits = u32::decode(&mut buf).map_err(|_| PowError::UnparseableProof)?;
    let mint_dest = Destination::decode(&mut buf).map_err(|_| PowError::UnparseableProof)?;
    Ok(ParsedProof { bits, mint_dest })
}

/// `target(bits) = (~0u256) >> bits`, as a big-endian byte array so it can
/// be compared against [`chain_cryptonight::pow_hash`]'s output with a
/// plain lexicographic `<=` (arrays of `u8` already order this way).
#[must_use]
fn target_from_bits(bits: u32) -> [u8; 32] {
    let bits = bits.min(256) as usize;
    let mut target = [0xFF_u8; 32];
    let zero_bytes = bits / 8;
    let partial_bits = bits % 8;
    for byte in target.iter_mut().take(zero_bytes) {
        *byte = 0;
    }
    if zero_bytes < 32 {
        target[zero_bytes] = 0xFF_u8.checked_shr(partial_bits as u32).unwrap_or(0);
    }
    target
}

/// Checks `block`'s proof-of-work against `prev`'s retarget window.
///
/// `retarget` is the difficulty cache populated from the prior
/// [`chain_constants::pow::POW_ADJUST_COUNT`] same-algo ancestors of
/// `prev`; the caller (chain-core) owns assembling it since that history
/// lives in [`chain_context::ChainIndex`], not here.
///
/// # Errors
/// The first check that fails, per [`PowError`].
pub fn check_pow(block: &Block, prev: &BlockIndex, retarget: &DifficultyCache) -> Result<(), PowError> {
    if block.proof_bytes.len() < MIN_PROOF_LEN {
        return Err(PowError::ProofTooShort(block.proof_bytes.len()));
    }
    if block.timestamp < prev.timestamp {
        return Err(PowError::NonMonotonicTimestamp { timestamp: block.timestamp, prev_timestamp: prev.timestamp });
    }

    let proof = parse_proof(&block.proof_bytes)?;

    let expected_bits = retarget.next_bits(prev.proof_bits);
    if proof.bits != expected_bits {
        return Err(PowError::BitsMismatch { proof_bits: proof.bits, expected_bits });
    }

    if proof.mint_dest != block.mint_tx.send_to {
        return Err(PowError::MintDestMismatch);
    }

    let hash = chain_cryptonight::pow_hash(&block.header_bytes());
    let target = target_from_bits(proof.bits);
    if hash <= target {
        Ok(())
    } else {
        Err(PowError::TargetNotMet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_zero_bits_is_all_ones() {
        assert_eq!(target_from_bits(0), [0xFF; 32]);
    }

    #[test]
    fn target_shrinks_as_bits_grow() {
        let loose = target_from_bits(8);
        let tight = target_from_bits(200);
        assert!(tight < loose);
    }

    #[test]
    fn target_full_byte_boundary() {
        let mut expected = [0xFF_u8; 32];
        expected[0] = 0;
        assert_eq!(target_from_bits(8), expected);
    }

    #[test]
    fn short_proof_is_rejected() {
        let block = sample_block(vec![0; 10]);
        let prev = sample_prev();
        let retarget = DifficultyCache::new();
        assert_eq!(check_pow(&block, &prev, &retarget), Err(PowError::ProofTooShort(10)));
    }

    fn sample_prev() -> BlockIndex {
        BlockIndex {
            hash: chain_types::Hash256::ZERO,
            prev: None,
            next: None,
            origin: chain_types::Hash256::ZERO,
            file: 0,
            offset: 0,
            height: 0,
            version: 1,
            block_type: chain_types::BlockType::Genesis,
            mint_type: chain_types::MintType::ProofOfWorkMint,
            mint_txid: chain_types::Hash256::ZERO,
            timestamp: 1_700_000_000,
            money_supply: 0,
            chain_trust: primitive_types::U256::zero(),
            rand_beacon: 0,
            proof_algo: chain_types::ProofAlgo::ProofOfWork,
            proof_bits: 32,
        }
    }

    fn sample_block(proof_bytes: Vec<u8>) -> Block {
        use chain_types::{Destination, Transaction, TxType};

        let mint_tx = Transaction {
            version: 1,
            tx_type: TxType::Work,
            timestamp: 1_700_000_010,
            lock_until: 0,
            inputs: vec![],
            send_to: Destination::PubKey(chain_types::Hash256::hash(b"miner")),
            amount: 5_000,
            fee: 0,
            data: vec![],
            sig: vec![],
        };
        let mut block = Block {
            version: 1,
            block_type: chain_types::BlockType::Primary,
            timestamp: 1_700_000_010,
            prev_hash: chain_types::Hash256::ZERO,
            tx_merkle_root: chain_types::Hash256::ZERO,
            proof_bytes,
            mint_tx,
            vtx: vec![],
            sig: vec![],
        };
        block.tx_merkle_root = block.compute_tx_merkle_root();
        block
    }
}
