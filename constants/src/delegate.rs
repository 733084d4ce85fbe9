//! Delegate vote / enrollment constants.

/// Size of the active ballot: the number of top-voted, enrolled delegates
/// eligible to mint at a given height window.
pub const MAX_DELEGATE_THRESH: usize = 23;

/// Minimum balance, in the smallest unit, a delegate template destination
/// must hold to submit an enrollment certificate.
pub const MIN_MORTGAGE: i64 = 100_000 * crate::money::COIN;

/// Height span over which a locked-coin template's spendable floor halves.
pub const MORTGAGE_DECAY_CYCLE: u64 = 525_600;

/// Per-cycle decay ratio applied to a locked-coin template's floor.
pub const MORTGAGE_DECAY_RATIO: f64 = 0.5;
