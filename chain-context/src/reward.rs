//! Per-block mint reward schedule (C8).

use chain_constants::money::{BLOCKS_PER_YEAR, REWARD_SCHEDULE, YEARLY_REWARD_STEP};

/// The primary chain's per-block mint reward at `height`.
///
/// Looks up the first schedule bracket whose `end_height` is still
/// ahead of `height`. Past the schedule's last bracket, the reward
/// keeps its final bracket value plus one [`YEARLY_REWARD_STEP`] per
/// [`BLOCKS_PER_YEAR`] blocks elapsed since that bracket ended.
#[must_use]
pub fn mint_reward(height: u64) -> i64 {
    for bracket in REWARD_SCHEDULE {
        if height < bracket.end_height {
            return bracket.reward;
        }
    }

    let Some(last) = REWARD_SCHEDULE.last() else {
        return 0;
    };
    let years_past = (height - last.end_height) / BLOCKS_PER_YEAR;
    last.reward.saturating_add(YEARLY_REWARD_STEP.saturating_mul(i64::try_from(years_past).unwrap_or(i64::MAX)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_bracket_applies_from_genesis() {
        assert_eq!(mint_reward(0), REWARD_SCHEDULE[0].reward);
        assert_eq!(mint_reward(REWARD_SCHEDULE[0].end_height - 1), REWARD_SCHEDULE[0].reward);
    }

    #[test]
    fn reward_steps_down_across_brackets() {
        assert_eq!(mint_reward(REWARD_SCHEDULE[0].end_height), REWARD_SCHEDULE[1].reward);
    }

    #[test]
    fn reward_increments_yearly_past_the_schedule() {
        let last = REWARD_SCHEDULE.last().unwrap();
        assert_eq!(mint_reward(last.end_height), last.reward);
        assert_eq!(mint_reward(last.end_height + BLOCKS_PER_YEAR), last.reward + YEARLY_REWARD_STEP);
        assert_eq!(mint_reward(last.end_height + 2 * BLOCKS_PER_YEAR), last.reward + 2 * YEARLY_REWARD_STEP);
    }
}
