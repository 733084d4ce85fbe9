//! Transaction and block validator (C11).
//!
//! Every check here is a free function over already-decoded types; none
//! of them touch the KV store, the UTXO set or the block index directly.
//! Context-free checks ([`tx`], [`block`]) take only the object being
//! checked. Context-dependent checks ([`pow`], [`dpos`],
//! [`contextual_tx`]) take pre-resolved ancestor/UTXO data the caller
//! (chain-core) looked up — the same "push resolution upstream" split
//! [`chain_context::delegate`] uses for the vote tally.

pub mod block;
pub mod contextual_tx;
pub mod dpos;
pub mod error;
pub mod pow;
pub mod tx;

pub use block::check_block_context_free;
pub use contextual_tx::check_tx_in_context;
pub use dpos::{check_dpos_slot, check_origin, check_vacant};
pub use error::{BlockError, ContextualTxError, DposError, OriginError, PowError, TxError, VacantError};
pub use pow::check_pow;
pub use tx::check_tx_context_free;
