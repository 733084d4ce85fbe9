//! Composition root: UTXO/tx-index core (C7), the `BlockView`/commit
//! engine (C10), and the synchronous `Chain` façade (§4.12) that wires
//! them with the block file store (C4), the KV store (C5) and the
//! in-memory index (C6/C8/C9) into one entry point.
//!
//! [`chain`] is the façade itself; [`params`] holds the presets it's
//! built from; [`template`] resolves `Destination::Template` instances
//! against the `Template` KV table; [`utxo`] applies a transaction's
//! input/output deltas; [`view`] replays a branch switch's blocks into
//! a pending overlay and commits it atomically; [`error`] is the
//! failure type threading through all of them.

pub mod chain;
pub mod error;
pub mod params;
pub mod template;
pub mod utxo;
pub mod view;

pub use chain::{Chain, WorkTemplate};
pub use error::{ChainError, ErrorCode};
pub use params::ChainParams;
pub use template::TemplateRegistry;
pub use view::BlockView;
