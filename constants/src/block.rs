//! Block related limits.

use core::time::Duration;

/// The maximum block height possible. A block hash packs its height into the
/// upper 32 bits (see [`crate::pow`]), which bounds how far any fork can extend.
pub const MAX_BLOCK_HEIGHT: u64 = u32::MAX as u64;

/// Target spacing between two primary-chain blocks.
pub const BLOCK_TARGET_SPACING: Duration = Duration::from_secs(45);

/// Slot spacing used to number extended (subsidiary-window) blocks against
/// the primary block they reference.
pub const EXTENDED_BLOCK_SPACING: Duration = Duration::from_secs(3);

/// How far into the future a block's timestamp may sit relative to the local
/// (or network-adjusted) clock before it is rejected.
pub const MAX_CLOCK_DRIFT: Duration = Duration::from_secs(600);

/// Maximum serialized size of a block, mint transaction and `vtx` included.
pub const MAX_BLOCK_SIZE: usize = 4_000_000;
