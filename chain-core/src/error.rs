//! Composition-root error type and the stable error-code mapping §6
//! exposes to external collaborators.

use chain_context::ContextError;
use chain_kv::KvError;
use chain_rules::{BlockError, ContextualTxError, DposError, OriginError, PowError, TxError, VacantError};
use chain_types::{CodecError, Hash256};

/// Stable, externally-visible rejection code (§6's error-code space).
/// Unlike [`ChainError`], this carries no payload: P2P/wallet
/// collaborators match on the code, not on the internal cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok,
    ErrTxInvalid,
    ErrTxInputInvalid,
    ErrTxOutputInvalid,
    ErrTxOversize,
    ErrTxSigInvalid,
    ErrBlockTypeInvalid,
    ErrBlockTimestampOutOfRange,
    ErrBlockProofOfWorkInvalid,
    ErrBlockProofOfStakeInvalid,
    ErrBlockTxInvalid,
    ErrBlockOversize,
    ErrBlockTxhashMismatch,
    ErrBlockDuplicatedTx,
    ErrBlockSignatureInvalid,
    ErrBlockInvalidFork,
    ErrAlreadyHave,
    ErrMissingPrev,
    ErrFatal,
}

/// Every failure mode the composition root can report, layered over the
/// per-crate errors each lower component already defines.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("context-free transaction check failed: {0}")]
    Tx(#[from] TxError),
    #[error("context-free block check failed: {0}")]
    Block(#[from] BlockError),
    #[error("proof-of-work check failed: {0}")]
    Pow(#[from] PowError),
    #[error("DPoS slot check failed: {0}")]
    Dpos(#[from] DposError),
    #[error("origin block check failed: {0}")]
    Origin(#[from] OriginError),
    #[error("vacant block check failed: {0}")]
    Vacant(#[from] VacantError),
    #[error("block-tx-in-context check failed: {0}")]
    ContextualTx(#[from] ContextualTxError),
    #[error("in-memory index error: {0}")]
    Context(#[from] ContextError),
    #[error("key-value store error: {0}")]
    Kv(#[from] KvError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("block {0:?} is already indexed")]
    AlreadyHave(Hash256),
    #[error("block's prev {0:?} is not indexed (orphan)")]
    MissingPrev(Hash256),
    #[error("referenced fork {0:?} is not registered")]
    UnknownFork(Hash256),
    #[error("genesis block in proof_bytes failed to parse as a fork profile")]
    BadGenesis,
    #[error("delegate vote transition rejected the block")]
    DelegateTransitionRejected,
    #[error("template kind is not a block-signing mint template")]
    NotAMintTemplate,
}

impl ChainError {
    /// Maps this error onto §6's externally-visible code space. Every
    /// variant that carries no further caller-actionable structure
    /// collapses into one of these buckets; transient storage failures
    /// ([`ChainError::Kv`], [`ChainError::Context`]) are always fatal —
    /// per §7, the core assumes KV/file-store consistency at steady
    /// state, so a failure there is a bug or a disk/corruption event,
    /// never a validation outcome.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Tx(TxError::TooLarge { .. }) => ErrorCode::ErrTxOversize,
            Self::Tx(_) => ErrorCode::ErrTxInvalid,
            Self::ContextualTx(ContextualTxError::IncompleteSignature) => ErrorCode::ErrTxSigInvalid,
            Self::ContextualTx(ContextualTxError::InputUnspendable | ContextualTxError::InsufficientInputs) => {
                ErrorCode::ErrTxInputInvalid
            }
            Self::ContextualTx(ContextualTxError::NonEmptyTokenData) => ErrorCode::ErrTxOutputInvalid,
            Self::Block(BlockError::IllegalType(_)) => ErrorCode::ErrBlockTypeInvalid,
            Self::Block(BlockError::TimestampTooFarAhead { .. }) => ErrorCode::ErrBlockTimestampOutOfRange,
            Self::Block(BlockError::MerkleMismatch) => ErrorCode::ErrBlockTxhashMismatch,
            Self::Block(BlockError::DuplicateTxid) => ErrorCode::ErrBlockDuplicatedTx,
            Self::Block(BlockError::BadBlockSignature) => ErrorCode::ErrBlockSignatureInvalid,
            Self::Block(BlockError::InvalidMintTx(_) | BlockError::InvalidTx { .. }) => ErrorCode::ErrBlockTxInvalid,
            Self::Pow(_) => ErrorCode::ErrBlockProofOfWorkInvalid,
            Self::Dpos(_) => ErrorCode::ErrBlockProofOfStakeInvalid,
            Self::Vacant(_) => ErrorCode::ErrBlockTxInvalid,
            Self::Origin(_) | Self::UnknownFork(_) | Self::BadGenesis => ErrorCode::ErrBlockInvalidFork,
            Self::DelegateTransitionRejected => ErrorCode::ErrBlockTxInvalid,
            Self::NotAMintTemplate => ErrorCode::ErrBlockTypeInvalid,
            Self::AlreadyHave(_) => ErrorCode::ErrAlreadyHave,
            Self::MissingPrev(_) => ErrorCode::ErrMissingPrev,
            Self::Codec(_) | Self::Kv(_) | Self::Context(_) => ErrorCode::ErrFatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_tx_maps_to_its_own_code() {
        let err = ChainError::Tx(TxError::TooLarge { size: 1, max: 1 });
        assert_eq!(err.code(), ErrorCode::ErrTxOversize);
    }

    #[test]
    fn storage_errors_are_always_fatal() {
        assert_eq!(ChainError::from(ContextError::UnknownBlock(Hash256::ZERO)).code(), ErrorCode::ErrFatal);
    }

    #[test]
    fn already_have_round_trips() {
        let err = ChainError::AlreadyHave(Hash256::ZERO);
        assert_eq!(err.code(), ErrorCode::ErrAlreadyHave);
    }
}
