//! A single open [`Table`], backed directly by `heed`.

use std::marker::PhantomData;

use heed::types::Bytes;
use heed::{RoTxn, RwTxn};

use crate::error::KvError;
use crate::storable::Storable;
use crate::table::Table;

/// An open handle onto one table. Cheap to clone: it wraps `heed`'s own
/// `Copy` database handle.
#[derive(Debug)]
pub struct Database<T: Table> {
    db: heed::Database<Bytes, Bytes>,
    _table: PhantomData<fn() -> T>,
}

impl<T: Table> Clone for Database<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Table> Copy for Database<T> {}

impl<T: Table> Database<T> {
    /// Opens `T`, creating it if it doesn't yet exist.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn open_or_create(env: &heed::Env, tx: &mut RwTxn<'_>) -> Result<Self, KvError> {
        let db = env.create_database(tx, Some(T::NAME))?;
        Ok(Self { db, _table: PhantomData })
    }

    /// Reads the value stored at `key`, if present.
    ///
    /// # Errors
    /// Propagates `heed` errors or a row codec failure.
    pub fn get(&self, tx: &RoTxn<'_>, key: &T::Key) -> Result<Option<T::Value>, KvError> {
        self.db
            .get(tx, &key.to_bytes())?
            .map(T::Value::from_bytes)
            .transpose()
            .map_err(KvError::from)
    }

    /// Reads the value stored at `key`.
    ///
    /// # Errors
    /// As [`Database::get`], plus [`KvError::KeyNotFound`] if absent.
    pub fn get_required(&self, tx: &RoTxn<'_>, key: &T::Key) -> Result<T::Value, KvError> {
        self.get(tx, key)?.ok_or(KvError::KeyNotFound)
    }

    /// Returns whether `key` has a row in this table.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn contains(&self, tx: &RoTxn<'_>, key: &T::Key) -> Result<bool, KvError> {
        Ok(self.db.get(tx, &key.to_bytes())?.is_some())
    }

    /// Inserts or overwrites the row at `key`.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn put(&self, tx: &mut RwTxn<'_>, key: &T::Key, value: &T::Value) -> Result<(), KvError> {
        self.db.put(tx, &key.to_bytes(), &value.to_bytes())?;
        Ok(())
    }

    /// Removes the row at `key`, reporting whether it existed.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn delete(&self, tx: &mut RwTxn<'_>, key: &T::Key) -> Result<bool, KvError> {
        Ok(self.db.delete(tx, &key.to_bytes())?)
    }

    /// Removes every row from the table.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn clear(&self, tx: &mut RwTxn<'_>) -> Result<(), KvError> {
        self.db.clear(tx)?;
        Ok(())
    }

    /// The number of rows currently stored.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn len(&self, tx: &RoTxn<'_>) -> Result<u64, KvError> {
        Ok(self.db.len(tx)?)
    }

    /// Whether the table currently holds no rows.
    ///
    /// # Errors
    /// Propagates any `heed` error.
    pub fn is_empty(&self, tx: &RoTxn<'_>) -> Result<bool, KvError> {
        Ok(self.len(tx)? == 0)
    }

    /// Iterates every row in the table in key order.
    ///
    /// Each item has the potential to error: a row whose bytes don't
    /// decode into `T::Key`/`T::Value` surfaces as [`KvError::Codec`]
    /// rather than panicking.
    ///
    /// # Errors
    /// Propagates a `heed` error opening the cursor.
    pub fn iter<'tx>(
        &self,
        tx: &'tx RoTxn<'_>,
    ) -> Result<impl Iterator<Item = Result<(T::Key, T::Value), KvError>> + 'tx, KvError> {
        Ok(self.db.iter(tx)?.map(|entry| {
            let (k, v) = entry?;
            Ok((T::Key::from_bytes(k)?, T::Value::from_bytes(v)?))
        }))
    }
}
