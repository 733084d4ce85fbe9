//! Data model, canonical codec and signature primitives for the
//! chain-state core: [`hash::Hash256`], [`destination::Destination`] and
//! [`destination::TemplateKind`], [`tx::Transaction`], [`block::Block`]
//! and the in-memory index types, and the [`codec::Encode`]/
//! [`codec::Decode`] framing every one of them implements.

pub mod block;
pub mod codec;
pub mod destination;
pub mod hash;
pub mod sig;
pub mod tx;

pub use block::{Block, BlockIndex, BlockType, EnrollRecord, Fork, ForkProfile, HeightEntry, MintType, ProofAlgo};
pub use codec::{CodecError, Decode, Encode};
pub use destination::{Destination, SigVerifyResult, TemplateId, TemplateKind, TemplateKindTag, WeightedSigner};
pub use hash::{merkle_root, Hash256};
pub use sig::{multi_sign, multi_verify, verify, PrivateKey};
pub use tx::{OutPoint, Transaction, TxIn, TxOut, TxType};
