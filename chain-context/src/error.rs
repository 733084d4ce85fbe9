//! Errors shared across the index, difficulty and delegate modules.

use chain_types::Hash256;

/// Failure modes of [`crate::index::ChainIndex`] and
/// [`crate::delegate`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A lookup referenced a block hash the index has never seen.
    #[error("unknown block {0:?}")]
    UnknownBlock(Hash256),
    /// A lookup referenced a fork origin the index has never seen.
    #[error("unknown fork {0:?}")]
    UnknownFork(Hash256),
    /// [`crate::index::branch_walk`] ran off the start of a chain before
    /// the two sides met; the index is missing an ancestor.
    #[error("branch walk from {tip:?}/{candidate:?} ran past a chain's genesis without meeting")]
    NoForkPoint { tip: Hash256, candidate: Hash256 },
    /// A `CERT` transaction's effect carried no resolved `destIn`
    /// delegate.
    #[error("enrollment certificate has no destIn delegate")]
    CertMissingDelegate,
    /// A `CERT` transaction's `data` did not carry a 4-byte anchor
    /// height prefix.
    #[error("enrollment certificate has no anchor height")]
    CertMissingAnchor,
    /// A `CERT` transaction's destIn delegate balance, after this
    /// block's vote deltas, falls below the enrollment minimum.
    #[error("delegate {0:?} balance below minimum enroll amount")]
    InsufficientEnrollBalance(Hash256),
    /// A block's delegate vote transition produced a negative balance
    /// for some delegate — the block must be rejected (§4.9 invariant).
    #[error("delegate {0:?} balance went negative")]
    NegativeDelegateBalance(Hash256),
}
