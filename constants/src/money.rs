//! Money range and reward-schedule shared constants.

/// A single `(end_height, reward)` bracket of the piecewise mint reward
/// schedule; `end_height` is exclusive, the last bracket's reward becomes the
/// base for the constant yearly increment described in [`YEARLY_REWARD_STEP`].
pub struct RewardBracket {
    /// Height at which the next bracket takes over.
    pub end_height: u64,
    /// Per-block mint reward, in the smallest unit, within this bracket.
    pub reward: i64,
}

/// The smallest representable unit amounts are denominated in.
pub const COIN: i64 = 1_000_000;

/// Inclusive bounds any `amount`/`fee` field on a transaction must fall in.
pub const MONEY_RANGE: core::ops::RangeInclusive<i64> = 0..=i64::MAX;

/// Per-block mint reward schedule for the primary chain. After
/// [`BLOCKS_PER_YEAR`] blocks past the last bracket's `end_height`, the reward
/// increases by [`YEARLY_REWARD_STEP`].
pub const REWARD_SCHEDULE: &[RewardBracket] = &[
    RewardBracket { end_height: 262_800, reward: 384 * COIN },
    RewardBracket { end_height: 525_600, reward: 256 * COIN },
    RewardBracket { end_height: 1_051_200, reward: 128 * COIN },
    RewardBracket { end_height: 2_102_400, reward: 64 * COIN },
];

/// Approximate number of blocks minted per year at [`crate::block::BLOCK_TARGET_SPACING`].
pub const BLOCKS_PER_YEAR: u64 = 365 * 24 * 3600 / 45;

/// Constant reward increment applied once per [`BLOCKS_PER_YEAR`] after the
/// schedule's last bracket.
pub const YEARLY_REWARD_STEP: i64 = 4 * COIN;

/// Minimum balance a delegate must hold before it may submit an enrollment
/// certificate or appear in the active ballot.
pub const MIN_ENROLL_AMOUNT: i64 = 100_000 * COIN;

/// Minimum first-incoming amount an address must receive before it's
/// recorded in the address-invite graph (`address_invite`).
pub const INVITE_MIN_AMOUNT: i64 = 10_000;
