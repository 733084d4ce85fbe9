//! Opens the chain KV environment and creates all tables (C5).

use heed::EnvOpenOptions;

use crate::config::Config;
use crate::database::Database;
use crate::error::KvError;
use crate::tables::{AddressInvite, BlockOutline, Delegate, Enroll, ForkContext, ForkTable, Template, TxIndex, Unspent};

/// The chain's open KV store: one `heed` environment and a handle onto
/// each of its tables.
///
/// `ChainKv` is the only piece of this crate that touches `heed`
/// directly to open an environment; [`Database`] handles everything
/// after that through a single generic path.
pub struct ChainKv {
    env: heed::Env,
    pub block_outline: Database<BlockOutline>,
    pub tx_index: Database<TxIndex>,
    pub unspent: Database<Unspent>,
    pub fork: Database<ForkTable>,
    pub fork_context: Database<ForkContext>,
    pub delegate: Database<Delegate>,
    pub enroll: Database<Enroll>,
    pub address_invite: Database<AddressInvite>,
    pub template: Database<Template>,
}

const TABLE_COUNT: u32 = 9;

impl ChainKv {
    /// Opens (creating if needed) the chain KV store described by
    /// `config`.
    ///
    /// # Errors
    /// Propagates I/O errors creating `config.path`, or any `heed` error
    /// opening the environment or creating its tables.
    pub fn open(config: &Config) -> Result<Self, KvError> {
        std::fs::create_dir_all(&config.path)?;

        // SAFETY: the caller guarantees `config.path` is not concurrently
        // opened by another environment handle within this process; LMDB
        // itself arbitrates across processes via its own file locks.
        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(TABLE_COUNT)
                .map_size(config.map_size)
                .open(&config.path)?
        };

        tracing::info!(path = %config.path.display(), map_size = config.map_size, "opening chain KV environment");

        let mut wtxn = env.write_txn()?;
        let block_outline = Database::open_or_create(&env, &mut wtxn)?;
        let tx_index = Database::open_or_create(&env, &mut wtxn)?;
        let unspent = Database::open_or_create(&env, &mut wtxn)?;
        let fork = Database::open_or_create(&env, &mut wtxn)?;
        let fork_context = Database::open_or_create(&env, &mut wtxn)?;
        let delegate = Database::open_or_create(&env, &mut wtxn)?;
        let enroll = Database::open_or_create(&env, &mut wtxn)?;
        let address_invite = Database::open_or_create(&env, &mut wtxn)?;
        let template = Database::open_or_create(&env, &mut wtxn)?;
        wtxn.commit()?;

        Ok(Self {
            env,
            block_outline,
            tx_index,
            unspent,
            fork,
            fork_context,
            delegate,
            enroll,
            address_invite,
            template,
        })
    }

    /// Opens a read-only transaction over the store.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn read_txn(&self) -> Result<heed::RoTxn<'_>, KvError> {
        Ok(self.env.read_txn()?)
    }

    /// Opens a read-write transaction over the store.
    ///
    /// Callers implementing `UpdateFork` (§4.5) commit every table write
    /// for one fork update through a single transaction from this call,
    /// so the store never observes a partial mix of pre/post state.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn write_txn(&self) -> Result<heed::RwTxn<'_>, KvError> {
        Ok(self.env.write_txn()?)
    }

    /// Forces a synchronous flush of the environment to disk.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn sync(&self) -> Result<(), KvError> {
        self.env.force_sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_and_reopens_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        let kv = ChainKv::open(&config).unwrap();
        drop(kv);
        ChainKv::open(&config).unwrap();
    }

    #[test]
    fn tables_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let kv = ChainKv::open(&Config::new(dir.path())).unwrap();
        let rtxn = kv.read_txn().unwrap();
        assert!(kv.block_outline.is_empty(&rtxn).unwrap());
        assert!(kv.unspent.is_empty(&rtxn).unwrap());
    }
}
