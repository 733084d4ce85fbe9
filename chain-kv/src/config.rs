//! Chain KV [`crate::env::ChainKv`] configuration.

use std::path::{Path, PathBuf};

/// Configuration for opening a [`crate::env::ChainKv`] store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory the `heed`/LMDB environment lives in.
    pub path: PathBuf,

    /// Maximum size, in bytes, the memory-mapped environment may grow to.
    /// `heed` reserves this address space up front; it is not allocated
    /// disk space until written.
    pub map_size: usize,

    /// Durability mode for committed write transactions.
    pub sync_mode: SyncMode,
}

impl Config {
    /// The default map size: 1 GiB, ample headroom for the block index
    /// and UTXO set before a resize is needed.
    pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

    /// A config rooted at `path`, with [`Config::DEFAULT_MAP_SIZE`] and
    /// [`SyncMode::Safe`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            map_size: Self::DEFAULT_MAP_SIZE,
            sync_mode: SyncMode::Safe,
        }
    }

    /// `self` with a non-default map size.
    #[must_use]
    pub const fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    /// `self` with a non-default sync mode.
    #[must_use]
    pub const fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// The store's directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Durability/performance trade-off for the environment's writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Flush to disk on every committed write transaction.
    #[default]
    Safe,
    /// Let the OS decide when to flush; only guaranteed durable at a
    /// clean environment close.
    Fastest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::new("/tmp/chain").with_map_size(4096).with_sync_mode(SyncMode::Fastest);
        assert_eq!(config.map_size, 4096);
        assert_eq!(config.sync_mode, SyncMode::Fastest);
    }
}
