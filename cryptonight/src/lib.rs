//! CryptoNight, the chain's proof-of-work hash.
//!
//! [`pow_hash`] is the only algorithm the chain's `algo=CRYPTONIGHT` tag
//! resolves to; the variant selection inherited from Monero's history of
//! CryptoNight revisions is kept internal. The hash itself is delegated to
//! `cuprate_cryptonight`, which carries the reference implementation of all
//! four Monero-era variants.

/// Hashes `bytes` with the chain's proof-of-work algorithm (CryptoNight
/// variant 2).
///
/// This is `PoWHash` from the difficulty-target check: a block's header
/// bytes (sans signature) are fed through this function and the result
/// compared against the retarget `target`.
pub fn pow_hash(bytes: &[u8]) -> [u8; 32] {
    cuprate_cryptonight::cryptonight_hash_v2(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = pow_hash(b"determinism check");
        let b = pow_hash(b"determinism check");
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_inputs() {
        assert_ne!(pow_hash(b"left"), pow_hash(b"right"));
    }
}
