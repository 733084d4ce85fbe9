//! In-memory block index, fork set, PoW retarget and delegate vote
//! tally (C6/C8/C9).
//!
//! This crate holds the chain's in-memory, rebuildable state: the block
//! DAG and fork tips ([`index::ChainIndex`]), the PoW retarget window
//! and block-trust rule ([`difficulty`]), the mint reward schedule
//! ([`reward`]), and the delegate vote/enrollment transition
//! ([`delegate`]). None of it touches [`chain_kv`] directly — the
//! composition root (chain-core) rebuilds it from the KV store at
//! startup and feeds it block-by-block as the chain advances.

pub mod delegate;
pub mod difficulty;
pub mod error;
pub mod index;
pub mod reward;

pub use delegate::{apply_block as apply_delegate_block, build_ballot, TransitionResult, TxVoteEffect};
pub use difficulty::{block_trust, dpos_trust_bits, DifficultyCache};
pub use error::ContextError;
pub use index::ChainIndex;
pub use reward::mint_reward;
