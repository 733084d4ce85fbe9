//! 256-bit opaque identifiers: transaction ids, block ids, template ids.

use std::fmt;

use sha3::{Digest, Sha3_256};

use crate::codec::{CodecError, Decode, Encode};

/// A 256-bit hash, used for tx/block identity, template ids and signature
/// messages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The all-zero hash, used as `Destination::Null`'s payload and as a
    /// sentinel "no parent" marker.
    pub const ZERO: Self = Self([0; 32]);

    /// `H(bytes)`: the collision-resistant hash used for tx and block
    /// identity and for signature messages.
    #[must_use]
    pub fn hash(bytes: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// `H(a‖b)`, the pairwise step of the block's tx-id merkle tree.
    #[must_use]
    pub fn hash_pair(a: Self, b: Self) -> Self {
        let mut buf = [0_u8; 64];
        buf[..32].copy_from_slice(&a.0);
        buf[32..].copy_from_slice(&b.0);
        Self::hash(&buf)
    }

    /// Renders the lowercase hex form.
    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parses the lowercase (or uppercase) hex form.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidTag`] if `s` isn't 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(s).map_err(|_| CodecError::InvalidTag(0))?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| CodecError::InvalidTag(0))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Encode for Hash256 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl Decode for Hash256 {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        if buf.len() < 32 {
            return Err(CodecError::Truncated);
        }
        let (head, tail) = buf.split_at(32);
        *buf = tail;
        Ok(Self(head.try_into().expect("checked length above")))
    }
}

/// Merkle root over `[mint_txid, ...vtx_txids]`, pairwise `H(a‖b)`, the
/// odd leaf duplicated when the level has an odd count.
#[must_use]
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return Hash256::ZERO;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().expect("non-empty checked above"));
        }
        level = level
            .chunks_exact(2)
            .map(|pair| Hash256::hash_pair(pair[0], pair[1]))
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_root_is_itself() {
        let leaf = Hash256::hash(b"only tx");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn odd_leaf_duplicated() {
        let a = Hash256::hash(b"a");
        let b = Hash256::hash(b"b");
        let c = Hash256::hash(b"c");

        let three = merkle_root(&[a, b, c]);
        let four = merkle_root(&[a, b, c, c]);
        assert_eq!(three, four);
    }

    #[test]
    fn hex_round_trips() {
        let h = Hash256::hash(b"round trip");
        assert_eq!(Hash256::from_hex(&h.to_hex()).unwrap(), h);
    }
}
