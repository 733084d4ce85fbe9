//! Backend-agnostic database errors.

/// A key-value store failure.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The requested key does not exist in the table.
    #[error("key not found")]
    KeyNotFound,

    /// The backend (`heed`/LMDB) raised an error.
    #[error("heed backend error: {0}")]
    Backend(#[from] heed::Error),

    /// A row's bytes failed to decode into its `Table::Key`/`Table::Value`.
    #[error("row codec error: {0}")]
    Codec(#[from] chain_types::CodecError),

    /// The block/chain-kv data directory could not be created or opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
