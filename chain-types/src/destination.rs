//! Destination & template model (C2).

use serde::{Deserialize, Serialize};

use crate::{
    codec::{CodecError, Decode, Encode},
    hash::Hash256,
    sig,
};

/// Outcome of [`Destination::verify_tx_signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigVerifyResult {
    /// The signature fully authorizes the spend.
    OkComplete,
    /// The signature is one of several required (a multisig/weighted
    /// threshold not yet met by this signature alone).
    OkPartial,
    /// The signature does not authorize the spend.
    Fail,
}

/// `Null | PubKey(hash256) | Template(template_id)`. Canonical on-wire form
/// is a 33-byte `prefix‖hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// No destination; only legal on a vacant block's mint/sig fields.
    Null,
    /// A plain Ed25519 public key.
    PubKey(Hash256),
    /// A template instance, identified by `(kind_tag, hash of params)`.
    Template(TemplateId),
}

impl Destination {
    /// `dest.verify_tx_signature(sig_msg, tx_anchor, send_to, sig, fork_height)`.
    ///
    /// For [`Destination::PubKey`] this defers to [`sig::verify`]. For
    /// [`Destination::Template`] the caller must already have parsed the
    /// matching [`TemplateKind`] out of the signature's template-data
    /// prefix and pass it in; this function only asserts the parsed
    /// instance's id matches `self` before dispatching to the kind's own
    /// verifier.
    #[must_use]
    pub fn verify_tx_signature(
        &self,
        sig_msg: &[u8],
        template: Option<&TemplateKind>,
        sig_bytes: &[u8],
        fork_height: u32,
    ) -> SigVerifyResult {
        match (self, template) {
            (Self::PubKey(pubkey), None) => {
                if sig::verify(*pubkey, sig_msg, sig_bytes) {
                    SigVerifyResult::OkComplete
                } else {
                    SigVerifyResult::Fail
                }
            }
            (Self::Template(id), Some(template)) => {
                if template.template_id() != *id {
                    return SigVerifyResult::Fail;
                }
                template.verify_tx_signature(sig_msg, sig_bytes, fork_height)
            }
            _ => SigVerifyResult::Fail,
        }
    }
}

impl Encode for Destination {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Null => out.push(0),
            Self::PubKey(hash) => {
                out.push(1);
                hash.encode(out);
            }
            Self::Template(id) => {
                out.push(2);
                id.encode(out);
            }
        }
    }
}

impl Decode for Destination {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let tag = u8::decode(buf)?;
        match tag {
            0 => Ok(Self::Null),
            1 => Ok(Self::PubKey(Hash256::decode(buf)?)),
            2 => Ok(Self::Template(TemplateId::decode(buf)?)),
            other => Err(CodecError::InvalidTag(u16::from(other))),
        }
    }
}

/// `(u16 type, hash256 of template params)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId {
    /// The [`TemplateKindTag`] discriminant.
    pub kind: u16,
    /// Hash of the template's canonically encoded parameters.
    pub params_hash: Hash256,
}

impl Encode for TemplateId {
    fn encode(&self, out: &mut Vec<u8>) {
        self.kind.encode(out);
        self.params_hash.encode(out);
    }
}

impl Decode for TemplateId {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            kind: u16::decode(buf)?,
            params_hash: Hash256::decode(buf)?,
        })
    }
}

/// Discriminants for [`TemplateKind`], in on-wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TemplateKindTag {
    /// `weighted-multisig`.
    WeightedMultisig = 0,
    /// `multisig`.
    Multisig = 1,
    /// `fork-redemption`, a locked-coin kind.
    ForkRedemption = 2,
    /// `proof-of-work-mint`, a block-signing kind.
    ProofOfWorkMint = 3,
    /// `delegate-mint`, a block-signing kind and the delegate destination.
    DelegateMint = 4,
    /// `exchange`.
    Exchange = 5,
    /// `vote`, wraps an underlying delegate.
    Vote = 6,
    /// `payment`, height-gated signer set.
    Payment = 7,
    /// `dex-order`.
    DexOrder = 8,
    /// `dex-match`, destIn-recorded.
    DexMatch = 9,
}

/// A signer entry in [`TemplateKind::WeightedMultisig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedSigner {
    /// This signer's weight toward the threshold.
    pub weight: u8,
    /// This signer's Ed25519 public key.
    pub pubkey: Hash256,
}

/// A parameterized script object. Each kind carries typed parameters flat
/// in the variant body (no nested vtable hierarchy, per the spec's design
/// note against a deep template class hierarchy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    /// `{ threshold, signers: [(weight, pubkey)] }`.
    WeightedMultisig { threshold: u8, signers: Vec<WeightedSigner> },
    /// `{ threshold, pubkeys }`.
    Multisig { threshold: u8, pubkeys: Vec<Hash256> },
    /// `{ owner, redeem_height }`, locked-coin kind.
    ForkRedemption { owner: Hash256, redeem_height: u32 },
    /// `{ miner_pubkey }`, mint/block-signing kind.
    ProofOfWorkMint { miner_pubkey: Hash256 },
    /// `{ delegate_pubkey }`, mint/block-signing kind and C9's delegate
    /// destination.
    DelegateMint { delegate_pubkey: Hash256 },
    /// `{ offer: (asset, amount), ask: (asset, amount), owner }`.
    Exchange {
        offer_asset: u16,
        offer_amount: i64,
        ask_asset: u16,
        ask_amount: i64,
        owner: Hash256,
    },
    /// `{ delegate }`, wraps an underlying delegate destination; not
    /// itself a delegate.
    Vote { delegate: Hash256 },
    /// `{ payer, payee, exec_height, end_height, amount, pledge }`.
    Payment {
        payer: Hash256,
        payee: Hash256,
        exec_height: u32,
        end_height: u32,
        amount: i64,
        pledge: i64,
    },
    /// `{ owner, asset, amount, price }`.
    DexOrder {
        owner: Hash256,
        asset: u16,
        amount: i64,
        price: i64,
    },
    /// `{ order_a, order_b }`, destIn-recorded.
    DexMatch { order_a: Hash256, order_b: Hash256 },
}

impl TemplateKind {
    /// This kind's on-wire discriminant.
    #[must_use]
    pub const fn tag(&self) -> TemplateKindTag {
        match self {
            Self::WeightedMultisig { .. } => TemplateKindTag::WeightedMultisig,
            Self::Multisig { .. } => TemplateKindTag::Multisig,
            Self::ForkRedemption { .. } => TemplateKindTag::ForkRedemption,
            Self::ProofOfWorkMint { .. } => TemplateKindTag::ProofOfWorkMint,
            Self::DelegateMint { .. } => TemplateKindTag::DelegateMint,
            Self::Exchange { .. } => TemplateKindTag::Exchange,
            Self::Vote { .. } => TemplateKindTag::Vote,
            Self::Payment { .. } => TemplateKindTag::Payment,
            Self::DexOrder { .. } => TemplateKindTag::DexOrder,
            Self::DexMatch { .. } => TemplateKindTag::DexMatch,
        }
    }

    /// Whether this kind may appear as the `send_to` of a spending input
    /// (as opposed to only ever being a spend target).
    #[must_use]
    pub const fn is_spendable(&self) -> bool {
        !matches!(self, Self::ProofOfWorkMint { .. } | Self::DelegateMint { .. })
    }

    /// Whether the actual spender destination for this kind is recorded
    /// inside the signature blob rather than being the outer destination
    /// (a policy-wrapper kind).
    #[must_use]
    pub const fn is_dest_in_recorded(&self) -> bool {
        matches!(self, Self::Vote { .. } | Self::DexMatch { .. })
    }

    /// Derives this instance's `template_id` by hashing its canonical
    /// parameter encoding.
    #[must_use]
    pub fn template_id(&self) -> TemplateId {
        TemplateId {
            kind: self.tag() as u16,
            params_hash: Hash256::hash(&self.to_bytes()),
        }
    }

    /// Returns the delegate destination this kind routes votes to, if
    /// any: itself for [`Self::DelegateMint`], the wrapped delegate for
    /// [`Self::Vote`], `None` otherwise.
    #[must_use]
    pub fn as_delegate(&self) -> Option<Hash256> {
        match self {
            Self::DelegateMint { delegate_pubkey } => Some(*delegate_pubkey),
            Self::Vote { delegate } => Some(*delegate),
            _ => None,
        }
    }

    /// `locked_coin_floor(height)`: the spendable balance floor at
    /// `height`, for locked-coin kinds. `None` for kinds with no floor.
    #[must_use]
    pub fn locked_coin_floor(&self, height: u64) -> Option<i64> {
        match self {
            Self::ForkRedemption { .. } => {
                let cycles = height / chain_constants::delegate::MORTGAGE_DECAY_CYCLE;
                #[allow(clippy::cast_precision_loss)]
                let base = chain_constants::delegate::MIN_MORTGAGE as f64;
                let floor =
                    base * chain_constants::delegate::MORTGAGE_DECAY_RATIO.powi(i32::try_from(cycles).unwrap_or(i32::MAX));
                #[allow(clippy::cast_possible_truncation)]
                Some(floor as i64)
            }
            _ => None,
        }
    }

    /// Verifies a signature against this template instance.
    ///
    /// Dispatches on kind:
    /// - multisig kinds recover the signer subset via [`sig::multi_verify`]
    ///   and compare the recovered count against `threshold`;
    /// - mint kinds verify a single Ed25519 signature from the held key;
    /// - [`Self::Payment`] additionally rejects if `fork_height` disagrees
    ///   with any height encoded in `sig_msg`'s first four bytes (the
    ///   connecting block's height is authoritative, per spec's
    ///   height-authority decision);
    /// - policy-wrapper kinds ([`Self::Vote`], [`Self::DexMatch`]) defer
    ///   to the recorded inner destination and always report complete
    ///   here, since the inner destination's own check happens at the
    ///   call site that parsed it out.
    #[must_use]
    pub fn verify_tx_signature(
        &self,
        sig_msg: &[u8],
        sig_bytes: &[u8],
        fork_height: u32,
    ) -> SigVerifyResult {
        match self {
            Self::WeightedMultisig { threshold, signers } => {
                let pubkeys: Vec<Hash256> = signers.iter().map(|s| s.pubkey).collect();
                let recovered = sig::multi_verify(&pubkeys, sig_msg, &[sig_bytes.to_vec()]);
                let weight: u32 = signers
                    .iter()
                    .filter(|s| recovered.contains(&s.pubkey))
                    .map(|s| u32::from(s.weight))
                    .sum();
                if weight >= u32::from(*threshold) {
                    SigVerifyResult::OkComplete
                } else if weight > 0 {
                    SigVerifyResult::OkPartial
                } else {
                    SigVerifyResult::Fail
                }
            }
            Self::Multisig { threshold, pubkeys } => {
                let recovered = sig::multi_verify(pubkeys, sig_msg, &[sig_bytes.to_vec()]);
                #[allow(clippy::cast_possible_truncation)]
                if recovered.len() as u8 >= *threshold {
                    SigVerifyResult::OkComplete
                } else if recovered.is_empty() {
                    SigVerifyResult::Fail
                } else {
                    SigVerifyResult::OkPartial
                }
            }
            Self::ForkRedemption { owner, .. } | Self::Exchange { owner, .. } | Self::DexOrder { owner, .. } => {
                bool_result(sig::verify(*owner, sig_msg, sig_bytes))
            }
            Self::ProofOfWorkMint { miner_pubkey } => bool_result(sig::verify(*miner_pubkey, sig_msg, sig_bytes)),
            Self::DelegateMint { delegate_pubkey } => bool_result(sig::verify(*delegate_pubkey, sig_msg, sig_bytes)),
            Self::Payment { payer, exec_height, end_height, .. } => {
                if sig_msg.len() < 4 {
                    return SigVerifyResult::Fail;
                }
                let embedded_height = u32::from_le_bytes(sig_msg[..4].try_into().expect("checked length above"));
                if embedded_height != fork_height || fork_height < *exec_height || fork_height > *end_height {
                    return SigVerifyResult::Fail;
                }
                bool_result(sig::verify(*payer, sig_msg, sig_bytes))
            }
            Self::Vote { .. } | Self::DexMatch { .. } => SigVerifyResult::OkComplete,
        }
    }
}

fn bool_result(ok: bool) -> SigVerifyResult {
    if ok {
        SigVerifyResult::OkComplete
    } else {
        SigVerifyResult::Fail
    }
}

impl Encode for WeightedSigner {
    fn encode(&self, out: &mut Vec<u8>) {
        self.weight.encode(out);
        self.pubkey.encode(out);
    }
}

impl Decode for WeightedSigner {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Self {
            weight: u8::decode(buf)?,
            pubkey: Hash256::decode(buf)?,
        })
    }
}

impl Encode for TemplateKind {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.tag() as u16).encode(out);
        match self {
            Self::WeightedMultisig { threshold, signers } => {
                threshold.encode(out);
                crate::codec::encode_vec(signers, out);
            }
            Self::Multisig { threshold, pubkeys } => {
                threshold.encode(out);
                crate::codec::encode_vec(pubkeys, out);
            }
            Self::ForkRedemption { owner, redeem_height } => {
                owner.encode(out);
                redeem_height.encode(out);
            }
            Self::ProofOfWorkMint { miner_pubkey } => miner_pubkey.encode(out),
            Self::DelegateMint { delegate_pubkey } => delegate_pubkey.encode(out),
            Self::Exchange { offer_asset, offer_amount, ask_asset, ask_amount, owner } => {
                offer_asset.encode(out);
                offer_amount.encode(out);
                ask_asset.encode(out);
                ask_amount.encode(out);
                owner.encode(out);
            }
            Self::Vote { delegate } => delegate.encode(out),
            Self::Payment { payer, payee, exec_height, end_height, amount, pledge } => {
                payer.encode(out);
                payee.encode(out);
                exec_height.encode(out);
                end_height.encode(out);
                amount.encode(out);
                pledge.encode(out);
            }
            Self::DexOrder { owner, asset, amount, price } => {
                owner.encode(out);
                asset.encode(out);
                amount.encode(out);
                price.encode(out);
            }
            Self::DexMatch { order_a, order_b } => {
                order_a.encode(out);
                order_b.encode(out);
            }
        }
    }
}

impl Decode for TemplateKind {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let tag = u16::decode(buf)?;
        Ok(match tag {
            0 => Self::WeightedMultisig {
                threshold: u8::decode(buf)?,
                signers: crate::codec::decode_vec(buf)?,
            },
            1 => Self::Multisig {
                threshold: u8::decode(buf)?,
                pubkeys: crate::codec::decode_vec(buf)?,
            },
            2 => Self::ForkRedemption {
                owner: Hash256::decode(buf)?,
                redeem_height: u32::decode(buf)?,
            },
            3 => Self::ProofOfWorkMint { miner_pubkey: Hash256::decode(buf)? },
            4 => Self::DelegateMint { delegate_pubkey: Hash256::decode(buf)? },
            5 => Self::Exchange {
                offer_asset: u16::decode(buf)?,
                offer_amount: i64::decode(buf)?,
                ask_asset: u16::decode(buf)?,
                ask_amount: i64::decode(buf)?,
                owner: Hash256::decode(buf)?,
            },
            6 => Self::Vote { delegate: Hash256::decode(buf)? },
            7 => Self::Payment {
                payer: Hash256::decode(buf)?,
                payee: Hash256::decode(buf)?,
                exec_height: u32::decode(buf)?,
                end_height: u32::decode(buf)?,
                amount: i64::decode(buf)?,
                pledge: i64::decode(buf)?,
            },
            8 => Self::DexOrder {
                owner: Hash256::decode(buf)?,
                asset: u16::decode(buf)?,
                amount: i64::decode(buf)?,
                price: i64::decode(buf)?,
            },
            9 => Self::DexMatch {
                order_a: Hash256::decode(buf)?,
                order_b: Hash256::decode(buf)?,
            },
            other => return Err(CodecError::InvalidTag(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_id_stable_for_same_params() {
        let a = TemplateKind::Vote { delegate: Hash256::hash(b"delegate") };
        let b = TemplateKind::Vote { delegate: Hash256::hash(b"delegate") };
        assert_eq!(a.template_id(), b.template_id());
    }

    #[test]
    fn template_id_differs_across_kinds() {
        let vote = TemplateKind::Vote { delegate: Hash256::ZERO };
        let mint = TemplateKind::DelegateMint { delegate_pubkey: Hash256::ZERO };
        assert_ne!(vote.template_id(), mint.template_id());
    }

    #[test]
    fn vote_routes_to_wrapped_delegate() {
        let delegate = Hash256::hash(b"delegate");
        let vote = TemplateKind::Vote { delegate };
        assert_eq!(vote.as_delegate(), Some(delegate));
        assert!(vote.is_dest_in_recorded());
    }

    #[test]
    fn mint_kinds_are_not_spendable() {
        assert!(!TemplateKind::ProofOfWorkMint { miner_pubkey: Hash256::ZERO }.is_spendable());
        assert!(!TemplateKind::DelegateMint { delegate_pubkey: Hash256::ZERO }.is_spendable());
        assert!(TemplateKind::Vote { delegate: Hash256::ZERO }.is_spendable());
    }

    #[test]
    fn destination_codec_round_trip() {
        let dest = Destination::PubKey(Hash256::hash(b"pubkey"));
        let bytes = dest.to_bytes();
        assert_eq!(Destination::decode_exact(&bytes).unwrap(), dest);
    }
}
