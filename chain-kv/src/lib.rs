//! Chain KV store (C5) and append-only block file store (C4).
//!
//! [`env::ChainKv`] owns the `heed`/LMDB environment and a typed
//! [`database::Database`] handle per [`tables`] table; [`filestore::FileStore`]
//! owns the numbered append-only block files those tables point into.
//! Every row is framed through [`chain_types`]'s canonical codec via the
//! [`storable::Storable`] blanket impl, so there is exactly one
//! serialization format shared between the wire and the disk.

pub mod config;
pub mod database;
pub mod env;
pub mod error;
pub mod filestore;
pub mod storable;
pub mod table;
pub mod tables;

pub use config::Config;
pub use database::Database;
pub use env::ChainKv;
pub use error::KvError;
pub use filestore::{FilePos, FileStore};
pub use storable::Storable;
pub use table::Table;
