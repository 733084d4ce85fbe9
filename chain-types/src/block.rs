//! Block, fork and index data model (C2/C3/C6/C9).

use crate::{
    codec::{decode_bytes, decode_string, decode_vec, encode_bytes, encode_string, encode_vec, CodecError, Decode, Encode},
    destination::Destination,
    hash::Hash256,
    tx::Transaction,
};

/// `type:u16` discriminant on [`Block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u16)]
pub enum BlockType {
    /// The single height-0 block of a brand-new fork's origin chain.
    Genesis = 0,
    /// The block that splits a new fork off an existing one.
    Origin = 1,
    /// An ordinary proof-of-work or delegate-mint block.
    Primary = 2,
    /// A subsidiary chain's block (no independent mint reward schedule).
    Subsidiary = 3,
    /// A block extending an enclosed/private fork.
    Extended = 4,
    /// A block with no mint transaction (delegate round with no winner).
    Vacant = 5,
}

impl BlockType {
    const fn from_u16(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Self::Genesis),
            1 => Some(Self::Origin),
            2 => Some(Self::Primary),
            3 => Some(Self::Subsidiary),
            4 => Some(Self::Extended),
            5 => Some(Self::Vacant),
            _ => None,
        }
    }
}

/// A block, per the data model's
/// `version, type, timestamp, prev_hash, tx_merkle_root, proof_bytes,
/// mint_tx, vtx, sig` field set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub version: u16,
    pub block_type: BlockType,
    pub timestamp: u32,
    pub prev_hash: Hash256,
    pub tx_merkle_root: Hash256,
    pub proof_bytes: Vec<u8>,
    /// Conceptually position 0 of the tx list; stored separately since
    /// mint transactions have no `inputs`/`sig` and are parsed once per
    /// block rather than once per tx during common-path validation.
    pub mint_tx: Transaction,
    pub vtx: Vec<Transaction>,
    pub sig: Vec<u8>,
}

impl Block {
    /// Encodes the header: every field except `vtx` and `sig`. This is
    /// the preimage hashed into `block_hash` and the message
    /// [`Destination::verify_tx_signature`] checks `sig` against for
    /// mint-kind destinations.
    #[must_use]
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.version.encode(&mut out);
        (self.block_type as u16).encode(&mut out);
        self.timestamp.encode(&mut out);
        self.prev_hash.encode(&mut out);
        self.tx_merkle_root.encode(&mut out);
        encode_bytes(&self.proof_bytes, &mut out);
        self.mint_tx.encode(&mut out);
        out
    }

    /// The merkle root over `[mint_txid, ...vtx_txids]`.
    #[must_use]
    pub fn compute_tx_merkle_root(&self) -> Hash256 {
        let mut leaves = Vec::with_capacity(1 + self.vtx.len());
        leaves.push(self.mint_tx.txid());
        leaves.extend(self.vtx.iter().map(Transaction::txid));
        crate::hash::merkle_root(&leaves)
    }

    /// `block_hash = (height<<32) | lower224(H(header))`. The caller
    /// supplies `height` since it is derived from the connecting point
    /// in the index, not recoverable from the header alone.
    #[must_use]
    pub fn block_hash(&self, height: u32) -> Hash256 {
        let digest = Hash256::hash(&self.header_bytes());
        let mut out = digest;
        out.0[..4].copy_from_slice(&height.to_be_bytes());
        out
    }

    /// Byte offsets of `mint_tx` and each `vtx` entry within this
    /// block's own [`Encode::to_bytes`] record, in `[mint_tx, vtx[0],
    /// vtx[1], ...]` order.
    ///
    /// Lets a caller address an individual transaction inside an
    /// already-written block record (a `(file_no, block_offset +
    /// tx_offset)` pair for [`crate::tx::TxIn`] lookups) without a
    /// second, duplicate on-disk copy of the transaction.
    #[must_use]
    pub fn tx_offsets(&self) -> Vec<u64> {
        let mint_offset = self.header_bytes().len() - self.mint_tx.to_bytes().len();
        let mut offsets = Vec::with_capacity(1 + self.vtx.len());
        #[allow(clippy::cast_possible_truncation)]
        offsets.push(mint_offset as u64);
        // header_bytes() ++ vtx's own u32 count prefix ++ each vtx tx back-to-back.
        let mut cursor = self.header_bytes().len() + 4;
        for tx in &self.vtx {
            #[allow(clippy::cast_possible_truncation)]
            offsets.push(cursor as u64);
            cursor += tx.to_bytes().len();
        }
        offsets
    }
}

impl Encode for Block {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header_bytes());
        encode_vec(&self.vtx, out);
        encode_bytes(&self.sig, out);
    }
}

impl Decode for Block {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let version = u16::decode(buf)?;
        let tag = u16::decode(buf)?;
        let block_type = BlockType::from_u16(tag).ok_or(CodecError::InvalidTag(tag))?;
        let timestamp = u32::decode(buf)?;
        let prev_hash = Hash256::decode(buf)?;
        let tx_merkle_root = Hash256::decode(buf)?;
        let proof_bytes = decode_bytes(buf)?;
        let mint_tx = Transaction::decode(buf)?;
        let vtx: Vec<Transaction> = decode_vec(buf)?;
        let sig = decode_bytes(buf)?;
        Ok(Self {
            version,
            block_type,
            timestamp,
            prev_hash,
            tx_merkle_root,
            proof_bytes,
            mint_tx,
            vtx,
            sig,
        })
    }
}

/// The PoW/delegate algorithm tag carried in [`BlockIndex::proof_algo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ProofAlgo {
    /// `PoWHash`, CryptoNight.
    ProofOfWork = 0,
    /// Delegate-signed, no hash-target check.
    Delegate = 1,
}

/// An in-memory DAG node. One per accepted block, regardless of which
/// fork it belongs to; `origin` points to the chain-genesis of its fork.
///
/// `prev`/`next`/`origin` are stored as hashes rather than pointers —
/// the index is a hash-keyed map, not an arena of owned nodes, so a
/// [`BlockIndex`] never borrows another one directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIndex {
    pub hash: Hash256,
    pub prev: Option<Hash256>,
    pub next: Option<Hash256>,
    pub origin: Hash256,
    pub file: u32,
    pub offset: u64,
    pub height: u32,
    pub version: u16,
    pub block_type: BlockType,
    pub mint_type: MintType,
    pub mint_txid: Hash256,
    pub timestamp: u32,
    pub money_supply: i128,
    /// Cumulative proof-of-work/delegate trust along the `prev` chain,
    /// prefix-accumulated as a 256-bit accumulator so a run of
    /// high-`bits` blocks (§4.8 allows `bits` up to 200) can never wrap
    /// or saturate the monotonic-trust tiebreaker (invariant 2).
    pub chain_trust: primitive_types::U256,
    pub rand_beacon: u64,
    pub proof_algo: ProofAlgo,
    pub proof_bits: u32,
}

/// Which mint kind produced a block's mint transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintType {
    ProofOfWorkMint,
    DelegateMint,
    /// A [`BlockType::Vacant`] block, no mint transaction at all.
    None,
}

impl Encode for MintType {
    fn encode(&self, out: &mut Vec<u8>) {
        let tag: u8 = match self {
            Self::ProofOfWorkMint => 0,
            Self::DelegateMint => 1,
            Self::None => 2,
        };
        tag.encode(out);
    }
}

impl Decode for MintType {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(match u8::decode(buf)? {
            0 => Self::ProofOfWorkMint,
            1 => Self::DelegateMint,
            2 => Self::None,
            other => return Err(CodecError::InvalidTag(u16::from(other))),
        })
    }
}

impl Encode for ProofAlgo {
    fn encode(&self, out: &mut Vec<u8>) {
        let tag: u8 = match self {
            Self::ProofOfWork => 0,
            Self::Delegate => 1,
        };
        tag.encode(out);
    }
}

impl Decode for ProofAlgo {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(match u8::decode(buf)? {
            0 => Self::ProofOfWork,
            1 => Self::Delegate,
            other => return Err(CodecError::InvalidTag(u16::from(other))),
        })
    }
}

impl Encode for BlockType {
    fn encode(&self, out: &mut Vec<u8>) {
        (*self as u16).encode(out);
    }
}

impl Decode for BlockType {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let tag = u16::decode(buf)?;
        Self::from_u16(tag).ok_or(CodecError::InvalidTag(tag))
    }
}

impl Encode for BlockIndex {
    fn encode(&self, out: &mut Vec<u8>) {
        self.hash.encode(out);
        self.prev.encode(out);
        self.next.encode(out);
        self.origin.encode(out);
        self.file.encode(out);
        self.offset.encode(out);
        self.height.encode(out);
        self.version.encode(out);
        self.block_type.encode(out);
        self.mint_type.encode(out);
        self.mint_txid.encode(out);
        self.timestamp.encode(out);
        self.money_supply.encode(out);
        self.chain_trust.encode(out);
        self.rand_beacon.encode(out);
        self.proof_algo.encode(out);
        self.proof_bits.encode(out);
    }
}

impl Decode for BlockIndex {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            hash: Hash256::decode(buf)?,
            prev: Option::decode(buf)?,
            next: Option::decode(buf)?,
            origin: Hash256::decode(buf)?,
            file: u32::decode(buf)?,
            offset: u64::decode(buf)?,
            height: u32::decode(buf)?,
            version: u16::decode(buf)?,
            block_type: BlockType::decode(buf)?,
            mint_type: MintType::decode(buf)?,
            mint_txid: Hash256::decode(buf)?,
            timestamp: u32::decode(buf)?,
            money_supply: i128::decode(buf)?,
            chain_trust: primitive_types::U256::decode(buf)?,
            rand_beacon: u64::decode(buf)?,
            proof_algo: ProofAlgo::decode(buf)?,
            proof_bits: u32::decode(buf)?,
        })
    }
}

/// A fork's static identity and policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ForkProfile {
    pub name: String,
    pub symbol: String,
    pub initial_supply: i128,
    pub mint_reward: i64,
    pub halve_cycle: u32,
    pub min_tx_fee: i64,
    pub isolated: bool,
    pub private: bool,
    pub enclosed: bool,
    pub owner: Destination,
    pub parent_fork: Option<Hash256>,
    pub join_height: Option<u32>,
}

impl Encode for ForkProfile {
    fn encode(&self, out: &mut Vec<u8>) {
        encode_string(&self.name, out);
        encode_string(&self.symbol, out);
        self.initial_supply.encode(out);
        self.mint_reward.encode(out);
        self.halve_cycle.encode(out);
        self.min_tx_fee.encode(out);
        self.isolated.encode(out);
        self.private.encode(out);
        self.enclosed.encode(out);
        self.owner.encode(out);
        self.parent_fork.encode(out);
        self.join_height.encode(out);
    }
}

impl Decode for ForkProfile {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            name: decode_string(buf)?,
            symbol: decode_string(buf)?,
            initial_supply: i128::decode(buf)?,
            mint_reward: i64::decode(buf)?,
            halve_cycle: u32::decode(buf)?,
            min_tx_fee: i64::decode(buf)?,
            isolated: bool::decode(buf)?,
            private: bool::decode(buf)?,
            enclosed: bool::decode(buf)?,
            owner: Destination::decode(buf)?,
            parent_fork: Option::decode(buf)?,
            join_height: Option::decode(buf)?,
        })
    }
}

/// A live fork: its origin, policy profile, and current tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fork {
    pub origin_hash: Hash256,
    pub tip: Hash256,
}

impl Encode for Fork {
    fn encode(&self, out: &mut Vec<u8>) {
        self.origin_hash.encode(out);
        self.tip.encode(out);
    }
}

impl Decode for Fork {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            origin_hash: Hash256::decode(buf)?,
            tip: Hash256::decode(buf)?,
        })
    }
}

/// `(enroll-height, delegate_dest) -> (file, offset)`, pointing at the
/// certificate transaction backing a delegate's enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnrollRecord {
    pub file: u32,
    pub offset: u64,
}

impl Encode for EnrollRecord {
    fn encode(&self, out: &mut Vec<u8>) {
        self.file.encode(out);
        self.offset.encode(out);
    }
}

impl Decode for EnrollRecord {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            file: u32::decode(buf)?,
            offset: u64::decode(buf)?,
        })
    }
}

/// One entry of a fork's per-height index: `block_hash -> (timestamp,
/// mint_dest, ref_block_hash)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HeightEntry {
    pub timestamp: u32,
    pub mint_dest: Destination,
    pub ref_block_hash: Hash256,
}

impl Encode for HeightEntry {
    fn encode(&self, out: &mut Vec<u8>) {
        self.timestamp.encode(out);
        self.mint_dest.encode(out);
        self.ref_block_hash.encode(out);
    }
}

impl Decode for HeightEntry {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            timestamp: u32::decode(buf)?,
            mint_dest: Destination::decode(buf)?,
            ref_block_hash: Hash256::decode(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{TxIn, TxType};

    fn sample_mint() -> Transaction {
        Transaction {
            version: 1,
            tx_type: TxType::Work,
            timestamp: 1_700_000_000,
            lock_until: 0,
            inputs: vec![],
            send_to: Destination::PubKey(Hash256::hash(b"miner")),
            amount: 5_000,
            fee: 0,
            data: vec![],
            sig: vec![],
        }
    }

    fn sample_block() -> Block {
        let mint_tx = sample_mint();
        let vtx = vec![Transaction {
            version: 1,
            tx_type: TxType::Token,
            timestamp: 1_700_000_001,
            lock_until: 0,
            inputs: vec![TxIn { prev_hash: Hash256::hash(b"prev"), prev_index: 0 }],
            send_to: Destination::PubKey(Hash256::hash(b"payee")),
            amount: 100,
            fee: 1,
            data: vec![],
            sig: vec![1, 2, 3],
        }];
        let mut block = Block {
            version: 1,
            block_type: BlockType::Primary,
            timestamp: 1_700_000_002,
            prev_hash: Hash256::hash(b"parent"),
            tx_merkle_root: Hash256::ZERO,
            proof_bytes: vec![7, 7],
            mint_tx,
            vtx,
            sig: vec![9],
        };
        block.tx_merkle_root = block.compute_tx_merkle_root();
        block
    }

    #[test]
    fn codec_round_trip() {
        let block = sample_block();
        let bytes = block.to_bytes();
        assert_eq!(Block::decode_exact(&bytes).unwrap(), block);
    }

    #[test]
    fn block_hash_embeds_height() {
        let block = sample_block();
        let hash = block.block_hash(42);
        assert_eq!(&hash.0[..4], &42_u32.to_be_bytes());
    }

    #[test]
    fn tx_offsets_address_each_transaction_in_place() {
        let block = sample_block();
        let bytes = block.to_bytes();
        let offsets = block.tx_offsets();
        assert_eq!(offsets.len(), 1 + block.vtx.len());

        let mint_slice = &bytes[offsets[0] as usize..];
        assert_eq!(Transaction::decode(&mut { mint_slice }).unwrap(), block.mint_tx);

        let vtx_slice = &bytes[offsets[1] as usize..];
        assert_eq!(Transaction::decode(&mut { vtx_slice }).unwrap(), block.vtx[0]);
    }

    #[test]
    fn merkle_root_covers_mint_and_vtx() {
        let block = sample_block();
        let expected = crate::hash::merkle_root(&[block.mint_tx.txid(), block.vtx[0].txid()]);
        assert_eq!(block.compute_tx_merkle_root(), expected);
    }
}
