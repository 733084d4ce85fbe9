//! Transaction related limits.

/// Maximum serialized size of a single transaction.
pub const MAX_TX_SIZE: usize = 200_000;

/// Minimum fee a `TOKEN` transaction must carry.
pub const MIN_TX_FEE: i64 = 10_000;

/// Number of blocks a mint output (`sendTo`/`change`, selected by the
/// `lock_until` high bit) stays unspendable for.
pub const MINT_OUTPUT_UNLOCK_WINDOW: u64 = 60;

/// Layout of the optional `data` frame attached to pubkey/simple-template
/// sends: `[16B uuid, 4B timestamp, 1B desc_len, desc_len base64 bytes]`.
pub mod data_frame {
    /// Byte offset and length of the embedded UUID.
    pub const UUID_LEN: usize = 16;
    /// Byte length of the embedded timestamp.
    pub const TIMESTAMP_LEN: usize = 4;
    /// Byte length of the description-length prefix.
    pub const DESC_LEN_PREFIX: usize = 1;
    /// Smallest legal frame: uuid + timestamp + an empty description.
    pub const MIN_FRAME_LEN: usize = UUID_LEN + TIMESTAMP_LEN + DESC_LEN_PREFIX;
}
