//! The `Table` trait: each chain KV table is a zero-sized type naming its
//! on-disk name, key type and value type.

use crate::storable::Storable;

/// A single table in the chain KV store.
pub trait Table: Send + Sync + 'static {
    /// The table's name, used as the `heed` database name.
    const NAME: &'static str;

    /// The table's key type.
    type Key: Storable + Ord;

    /// The table's value type.
    type Value: Storable;
}

/// Declares a zero-sized [`Table`] type.
///
/// Mirrors the `table!` generator the chain's KV tables are modeled on:
/// one empty struct per table, distinguished only by its `Key`/`Value`
/// associated types.
macro_rules! table {
    (
        $(#[$attr:meta])*
        $table:ident,
        $key:ty,
        $value:ty
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $table;

        impl Table for $table {
            const NAME: &'static str = stringify!($table);
            type Key = $key;
            type Value = $value;
        }
    };
}

pub(crate) use table;
