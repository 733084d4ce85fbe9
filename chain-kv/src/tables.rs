//! The chain's KV tables (C5).

use chain_types::{
    BlockIndex, CodecError, Decode, Encode, EnrollRecord, Fork, ForkProfile, Hash256, OutPoint, TemplateId, TemplateKind, TxOut,
};

use crate::table::{table, Table};

/// `(fork_hash, block_height, file, offset)` locating a transaction's
/// owning block and its position in the block file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxLocation {
    pub fork_hash: Hash256,
    pub block_height: u32,
    pub file: u32,
    pub offset: u64,
}

impl Encode for TxLocation {
    fn encode(&self, out: &mut Vec<u8>) {
        self.fork_hash.encode(out);
        self.block_height.encode(out);
        self.file.encode(out);
        self.offset.encode(out);
    }
}

impl Decode for TxLocation {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            fork_hash: Hash256::decode(buf)?,
            block_height: u32::decode(buf)?,
            file: u32::decode(buf)?,
            offset: u64::decode(buf)?,
        })
    }
}

/// `(inviter, invite_txid)`: the first-receipt record recording who
/// vouched an address into a private fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteRecord {
    pub inviter: Hash256,
    pub invite_txid: Hash256,
}

impl Encode for InviteRecord {
    fn encode(&self, out: &mut Vec<u8>) {
        self.inviter.encode(out);
        self.invite_txid.encode(out);
    }
}

impl Decode for InviteRecord {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            inviter: Hash256::decode(buf)?,
            invite_txid: Hash256::decode(buf)?,
        })
    }
}

/// `(fork origin, outpoint)`, the key of the per-fork unspent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnspentKey {
    pub fork: Hash256,
    pub outpoint: OutPoint,
}

impl Encode for UnspentKey {
    fn encode(&self, out: &mut Vec<u8>) {
        self.fork.encode(out);
        self.outpoint.encode(out);
    }
}

impl Decode for UnspentKey {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            fork: Hash256::decode(buf)?,
            outpoint: OutPoint::decode(buf)?,
        })
    }
}

/// `(block hash, delegate dest)`, the key of the per-tip delegate vote
/// tally table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DelegateKey {
    pub block_hash: Hash256,
    pub delegate: Hash256,
}

impl Encode for DelegateKey {
    fn encode(&self, out: &mut Vec<u8>) {
        self.block_hash.encode(out);
        self.delegate.encode(out);
    }
}

impl Decode for DelegateKey {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            block_hash: Hash256::decode(buf)?,
            delegate: Hash256::decode(buf)?,
        })
    }
}

/// `(enroll height, delegate dest)`, the key of the enrollment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnrollKey {
    pub height: u32,
    pub delegate: Hash256,
}

impl Encode for EnrollKey {
    fn encode(&self, out: &mut Vec<u8>) {
        self.height.encode(out);
        self.delegate.encode(out);
    }
}

impl Decode for EnrollKey {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            height: u32::decode(buf)?,
            delegate: Hash256::decode(buf)?,
        })
    }
}

/// `(fork origin, invited address)`, the key of a private fork's
/// first-receipt invite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InviteKey {
    pub fork: Hash256,
    pub addr: Hash256,
}

impl Encode for InviteKey {
    fn encode(&self, out: &mut Vec<u8>) {
        self.fork.encode(out);
        self.addr.encode(out);
    }
}

impl Decode for InviteKey {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            fork: Hash256::decode(buf)?,
            addr: Hash256::decode(buf)?,
        })
    }
}

table! {
    /// `block_hash -> BlockIndex`: the in-memory index's durable backing.
    BlockOutline, Hash256, BlockIndex
}

table! {
    /// `txid -> (file, offset)`: where to find a transaction's owning
    /// block in the block file store.
    TxIndex, Hash256, TxLocation
}

table! {
    /// `(fork, outpoint) -> txout`: the UTXO set, partitioned per fork.
    Unspent, UnspentKey, TxOut
}

table! {
    /// `origin_hash -> Fork`: each live fork's current tip.
    ForkTable, Hash256, Fork
}

table! {
    /// `origin_hash -> ForkProfile`: each fork's static policy profile.
    ForkContext, Hash256, ForkProfile
}

table! {
    /// `(block_hash, delegate) -> votes`: per-tip delegate vote tally.
    Delegate, DelegateKey, i64
}

table! {
    /// `(height, delegate) -> EnrollRecord`: delegate certificate
    /// locations by enrollment height.
    Enroll, EnrollKey, EnrollRecord
}

table! {
    /// `(fork, addr) -> InviteRecord`: a private fork's first-receipt
    /// invite graph.
    AddressInvite, InviteKey, InviteRecord
}

table! {
    /// `template_id -> TemplateKind`: the canonical params behind every
    /// template destination ever established, keyed by the id a
    /// `Destination::Template` itself carries. Populated once, on the
    /// transaction that first spends or pays to a given id (see
    /// `chain_core::template`), and looked up by id from then on —
    /// never re-transmitted per-transaction.
    Template, TemplateId, TemplateKind
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspent_key_codec_round_trip() {
        let key = UnspentKey {
            fork: Hash256::hash(b"fork"),
            outpoint: OutPoint { txid: Hash256::hash(b"tx"), index: 1 },
        };
        assert_eq!(UnspentKey::decode_exact(&key.to_bytes()).unwrap(), key);
    }

    #[test]
    fn enroll_key_orders_by_height_first() {
        let a = EnrollKey { height: 1, delegate: Hash256::hash(b"z") };
        let b = EnrollKey { height: 2, delegate: Hash256::hash(b"a") };
        assert!(a < b);
    }
}
