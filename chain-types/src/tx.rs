//! Transaction data model (C2/C3).

use crate::{
    codec::{decode_bytes, decode_vec, encode_bytes, encode_vec, CodecError, Decode, Encode},
    destination::Destination,
    hash::Hash256,
};

/// One spent output reference: `(prev_hash, prev_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TxIn {
    /// The id of the transaction holding the output being spent.
    pub prev_hash: Hash256,
    /// The output index within that transaction, 0 (`send_to`) or 1
    /// (change).
    pub prev_index: u8,
}

impl Encode for TxIn {
    fn encode(&self, out: &mut Vec<u8>) {
        self.prev_hash.encode(out);
        self.prev_index.encode(out);
    }
}

impl Decode for TxIn {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            prev_hash: Hash256::decode(buf)?,
            prev_index: u8::decode(buf)?,
        })
    }
}

/// `type:u16` discriminant on [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u16)]
pub enum TxType {
    /// An ordinary value transfer, spending `inputs`, paying `fee`.
    Token = 0,
    /// Enrolls or renews a delegate certificate.
    Cert = 1,
    /// The genesis block's sole transaction.
    Genesis = 2,
    /// A delegate-mint block's mint transaction.
    Stake = 3,
    /// A proof-of-work block's mint transaction.
    Work = 4,
}

impl TxType {
    const fn from_u16(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Self::Token),
            1 => Some(Self::Cert),
            2 => Some(Self::Genesis),
            3 => Some(Self::Stake),
            4 => Some(Self::Work),
            _ => None,
        }
    }

    /// Mint types (`Genesis`, `Stake`, `Work`) carry no `inputs` and no
    /// `sig`; their legitimacy comes from their position as a block's
    /// mint transaction, not from a spend authorization.
    #[must_use]
    pub const fn is_mint(self) -> bool {
        matches!(self, Self::Genesis | Self::Stake | Self::Work)
    }
}

/// A transaction, per the data model's
/// `version, type, timestamp, lock_until, inputs, send_to, amount, fee,
/// data, sig` field set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub tx_type: TxType,
    pub timestamp: u32,
    pub lock_until: u32,
    pub inputs: Vec<TxIn>,
    pub send_to: Destination,
    pub amount: i64,
    pub fee: i64,
    pub data: Vec<u8>,
    pub sig: Vec<u8>,
}

impl Transaction {
    /// Which output (`send_to` or change) `lock_until`'s high bit
    /// selects as locked: `false` selects `send_to` (index 0), `true`
    /// selects change (index 1).
    #[must_use]
    pub const fn locks_change_output(&self) -> bool {
        self.lock_until & 0x8000_0000 != 0
    }

    /// The canonical encoding, minus `sig`: this is the signature
    /// message and the preimage of `txid` before the timestamp splice.
    #[must_use]
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.version.encode(&mut out);
        (self.tx_type as u16).encode(&mut out);
        self.timestamp.encode(&mut out);
        self.lock_until.encode(&mut out);
        encode_vec(&self.inputs, &mut out);
        self.send_to.encode(&mut out);
        self.amount.encode(&mut out);
        self.fee.encode(&mut out);
        encode_bytes(&self.data, &mut out);
        out
    }

    /// `txid = H(canonical_tx)` with the upper 32 bits of the digest
    /// replaced by `timestamp`, so txid sorts by time prefix and two
    /// otherwise-identical transactions submitted at different times
    /// never collide.
    #[must_use]
    pub fn txid(&self) -> Hash256 {
        let mut hash = Hash256::hash(&self.signing_bytes());
        hash.0[..4].copy_from_slice(&self.timestamp.to_be_bytes());
        hash
    }
}

impl Encode for Transaction {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.signing_bytes());
        encode_bytes(&self.sig, out);
    }
}

impl Decode for Transaction {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let version = u16::decode(buf)?;
        let tag = u16::decode(buf)?;
        let tx_type = TxType::from_u16(tag).ok_or(CodecError::InvalidTag(tag))?;
        let timestamp = u32::decode(buf)?;
        let lock_until = u32::decode(buf)?;
        let inputs: Vec<TxIn> = decode_vec(buf)?;
        let send_to = Destination::decode(buf)?;
        let amount = i64::decode(buf)?;
        let fee = i64::decode(buf)?;
        let data = decode_bytes(buf)?;
        let sig = decode_bytes(buf)?;
        Ok(Self {
            version,
            tx_type,
            timestamp,
            lock_until,
            inputs,
            send_to,
            amount,
            fee,
            data,
            sig,
        })
    }
}

/// An output as held in the UTXO set: `(dest, amount, tx_time, lock_until)`.
/// The outpoint half of the pair, `(txid, index)`, is the UTXO table's key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxOut {
    pub dest: Destination,
    pub amount: i64,
    pub tx_time: u32,
    pub lock_until: u32,
}

impl Encode for TxOut {
    fn encode(&self, out: &mut Vec<u8>) {
        self.dest.encode(out);
        self.amount.encode(out);
        self.tx_time.encode(out);
        self.lock_until.encode(out);
    }
}

impl Decode for TxOut {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            dest: Destination::decode(buf)?,
            amount: i64::decode(buf)?,
            tx_time: u32::decode(buf)?,
            lock_until: u32::decode(buf)?,
        })
    }
}

/// `(txid, index)`, index is 0 (`send_to`) or 1 (change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u8,
}

impl Encode for OutPoint {
    fn encode(&self, out: &mut Vec<u8>) {
        self.txid.encode(out);
        self.index.encode(out);
    }
}

impl Decode for OutPoint {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            txid: Hash256::decode(buf)?,
            index: u8::decode(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            tx_type: TxType::Token,
            timestamp: 1_700_000_000,
            lock_until: 0,
            inputs: vec![TxIn { prev_hash: Hash256::hash(b"prev"), prev_index: 0 }],
            send_to: Destination::PubKey(Hash256::hash(b"payee")),
            amount: 1_000,
            fee: 10,
            data: vec![],
            sig: vec![1, 2, 3],
        }
    }

    #[test]
    fn codec_round_trip() {
        let tx = sample_tx();
        let bytes = tx.to_bytes();
        assert_eq!(Transaction::decode_exact(&bytes).unwrap(), tx);
    }

    #[test]
    fn txid_embeds_timestamp() {
        let tx = sample_tx();
        assert_eq!(&tx.txid().0[..4], &tx.timestamp.to_be_bytes());
    }

    #[test]
    fn txid_differs_with_timestamp() {
        let mut a = sample_tx();
        let mut b = sample_tx();
        b.timestamp += 1;
        assert_ne!(a.txid(), b.txid());
        a.sig.clear();
    }

    #[test]
    fn sig_does_not_affect_txid() {
        let mut a = sample_tx();
        let mut b = sample_tx();
        b.sig = vec![9, 9, 9, 9];
        assert_eq!(a.txid(), b.txid());
    }

    #[test]
    fn mint_types_carry_no_inputs_or_sig() {
        assert!(TxType::Genesis.is_mint());
        assert!(TxType::Stake.is_mint());
        assert!(TxType::Work.is_mint());
        assert!(!TxType::Token.is_mint());
        assert!(!TxType::Cert.is_mint());
    }

    #[test]
    fn lock_until_high_bit_selects_change() {
        let mut tx = sample_tx();
        assert!(!tx.locks_change_output());
        tx.lock_until = 0x8000_0000;
        assert!(tx.locks_change_output());
    }
}
