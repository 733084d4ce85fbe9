//! Proof-of-work retarget parameters.

/// Number of prior same-algorithm blocks the retarget average is taken over.
pub const POW_ADJUST_COUNT: usize = 8;

/// Allowed slack, in seconds, either side of the target spacing before the
/// retarget algorithm nudges `bits`.
pub const POW_ADJUST_DEBOUNCE: u64 = 15;

/// Lowest legal value of `bits` (easiest target).
pub const POW_BITS_LOWER: u32 = 8;

/// Highest legal value of `bits` (hardest target).
pub const POW_BITS_UPPER: u32 = 200;

/// Initial `bits` used by the mainnet genesis block.
pub const MAINNET_INITIAL_BITS: u32 = 32;

/// Initial `bits` used by the testnet genesis block.
pub const TESTNET_INITIAL_BITS: u32 = 10;

/// Weight applied to the most recent of the [`POW_ADJUST_COUNT`] spacings
/// when computing the weighted average, halving for each block further back.
pub const fn retarget_weight(blocks_ago: usize) -> u64 {
    1 << (POW_ADJUST_COUNT - 1 - blocks_ago)
}
