//! Wall-clock helpers.
//!
//! Requires `std`.

//---------------------------------------------------------------------------------------------------- Use
use std::time::{SystemTime, UNIX_EPOCH};

//---------------------------------------------------------------------------------------------------- Public API
#[inline]
/// Returns the current system time as a UNIX timestamp.
///
/// This is the `Clock` source used for a block's received-time bound
/// and for `MAX_CLOCK_DRIFT` checks.
///
/// # Panics
/// Panics if the system clock reports a time before the UNIX epoch.
pub fn wall_now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn now_is_sane() {
        // Past 2023-01-01 and before some sanity ceiling far in the future.
        assert!(wall_now_seconds() > 1_672_531_200);
        assert!(wall_now_seconds() < 4_102_444_800);
    }
}
