//! Per-concern validation error enums (C11).

use chain_types::Hash256;

/// Context-free transaction check failures (spec §4.11, first paragraph).
///
/// "Type in known set" isn't its own variant here: [`chain_types::TxType`]
/// is a closed enum the codec already refuses to decode outside its known
/// tags, so by the time a [`chain_types::Transaction`] reaches this crate
/// the check has already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("amount or fee outside the legal money range")]
    MoneyRangeViolation,
    #[error("mint transaction carries inputs, or non-mint transaction carries none")]
    InputsMintMismatch,
    #[error("transaction spends the same outpoint twice")]
    DuplicateInput,
    #[error("input lookup index {0} is neither 0 nor 1")]
    BadLookupIndex(u8),
    #[error("mint transaction carries a signature, or non-mint transaction carries none")]
    SigMintMismatch,
    #[error("send_to is Null")]
    NullDestination,
    #[error("serialized transaction size {size} exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },
    #[error("TOKEN transaction fee {0} is below the minimum")]
    FeeTooLow(i64),
    #[error("non-TOKEN transaction carries a nonzero fee")]
    NonzeroMintFee,
    #[error("data frame header is malformed")]
    BadDataFrame,
}

/// Context-free block check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("block type {0:?} is not legal for version 1")]
    IllegalType(chain_types::BlockType),
    #[error("block timestamp {timestamp} is more than {max_drift}s ahead of now ({now})")]
    TimestampTooFarAhead { timestamp: u32, now: u32, max_drift: u32 },
    #[error("mint transaction failed its own context-free check: {0}")]
    InvalidMintTx(TxError),
    #[error("tx merkle root does not match the recomputed root")]
    MerkleMismatch,
    #[error("block contains a duplicate transaction id")]
    DuplicateTxid,
    #[error("embedded transaction {index} failed its context-free check: {source}")]
    InvalidTx { index: usize, source: TxError },
    #[error("block signature does not verify against the mint destination")]
    BadBlockSignature,
}

/// Context-dependent proof-of-work check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PowError {
    #[error("proof_bytes length {0} is below the minimum of 46")]
    ProofTooShort(usize),
    #[error("proof_bytes could not be parsed")]
    UnparseableProof,
    #[error("block timestamp {timestamp} is not monotonic with prev ({prev_timestamp})")]
    NonMonotonicTimestamp { timestamp: u32, prev_timestamp: u32 },
    #[error("proof bits {proof_bits} do not match the retarget bits {expected_bits}")]
    BitsMismatch { proof_bits: u32, expected_bits: u32 },
    #[error("proof's mint destination does not match the mint transaction's send_to")]
    MintDestMismatch,
    #[error("PoWHash exceeds the retarget target")]
    TargetNotMet,
}

/// Subsidiary/Extended DPoS slot check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DposError {
    #[error("block does not fall on an extended-block spacing boundary from its reference block")]
    BadSlotSpacing,
    #[error("mint destination does not match the expected ballot entry for this slot")]
    NotTheExpectedDelegate(Hash256),
}

/// Origin (fork-creation) block check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OriginError {
    #[error("origin block's proof_bytes does not decode to a fork profile")]
    UnparseableProfile,
    #[error("parent fork is private; child fork must also be private with the same owner")]
    PrivateInheritanceViolation,
}

/// Vacant-block emptiness check failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VacantError {
    #[error("vacant block's tx merkle root is not the empty root")]
    NonEmptyMerkle,
    #[error("vacant block's mint transaction is not empty")]
    NonEmptyMintTx,
    #[error("vacant block carries embedded transactions")]
    NonEmptyVtx,
    #[error("vacant block's proof_bytes is not empty")]
    NonEmptyProof,
    #[error("vacant block's signature is not empty")]
    NonEmptySig,
}

/// Block-tx-in-context check failures (spec §4.11, "Block-tx verification
/// in context").
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextualTxError {
    #[error("input outpoint was already spent or is still locked at this height")]
    InputUnspendable,
    #[error("sum of inputs does not cover amount + fee (+ locked-coin floor, if applicable)")]
    InsufficientInputs,
    #[error("TOKEN transaction carries non-empty data")]
    NonEmptyTokenData,
    #[error("destIn's signature does not verify as complete")]
    IncompleteSignature,
}
