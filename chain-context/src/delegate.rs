//! Delegate vote tally and enrollment transition (C9).
//!
//! The destination-resolution work — parsing `(destIn, sendTo)` out of a
//! spent output and a transaction's own `send_to`, and recognizing which
//! of the two (if either) names a delegate template — happens upstream,
//! where the UTXO set and template codec already live (chain-core).
//! This module only carries the pure per-block balance transition and
//! ballot construction the resolved effects feed into.

use std::collections::{HashMap, HashSet};

use chain_constants::delegate::MAX_DELEGATE_THRESH;
use chain_types::Hash256;

use crate::error::ContextError;

/// One ordinary transaction's resolved effect on the delegate vote
/// tally, per §4.9 step 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxVoteEffect {
    /// The delegate `sendTo` routes votes to, if any.
    pub dest_out_delegate: Option<Hash256>,
    /// The delegate `destIn` is spending from, if any.
    pub dest_in_delegate: Option<Hash256>,
    pub amount: i64,
    pub fee: i64,
    /// Whether this tx is an enrollment certificate (`TxType::Cert`).
    pub is_cert: bool,
    /// The anchor height parsed from the cert's `data` prefix, if this
    /// is a cert tx.
    pub anchor_height: Option<u32>,
    /// `(file, offset)` of this tx's start within its block's file
    /// record, recorded into `enroll[anchor_height]` for cert txs.
    pub location: (u32, u64),
}

/// The result of applying one block's vote/enrollment transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionResult {
    /// `delegate[B]`, ready to persist.
    pub balances: HashMap<Hash256, i64>,
    /// `(anchor_height, delegate, file, offset)` records to persist into
    /// `enroll[anchor_height]`.
    pub enrollments: Vec<(u32, Hash256, u32, u64)>,
}

/// Applies §4.9's transition rule for a block `B` connecting to `P`,
/// given `P`'s tally and `B`'s resolved mint/tx effects.
///
/// `mint_effect` is `Some((delegate, amount))` when the mint tx's
/// `send_to` is a delegate template; `None` for PoW or vacant blocks.
///
/// # Errors
/// [`ContextError::CertMissingDelegate`]/[`ContextError::CertMissingAnchor`]
/// if a cert effect is missing the fields its variant requires;
/// [`ContextError::InsufficientEnrollBalance`] if a cert's destIn
/// balance, after this block's deltas, sits below `min_enroll_amount`;
/// [`ContextError::NegativeDelegateBalance`] if any delegate's resulting
/// balance goes negative (the block must be rejected, per the §4.9
/// invariant).
pub fn apply_block(
    prev_balances: &HashMap<Hash256, i64>,
    mint_effect: Option<(Hash256, i64)>,
    tx_effects: &[TxVoteEffect],
    min_enroll_amount: i64,
) -> Result<TransitionResult, ContextError> {
    let mut balances = prev_balances.clone();

    if let Some((delegate, amount)) = mint_effect {
        *balances.entry(delegate).or_insert(0) += amount;
    }

    let mut enrollments = Vec::new();
    for effect in tx_effects {
        if let Some(delegate) = effect.dest_out_delegate {
            *balances.entry(delegate).or_insert(0) += effect.amount;
        }
        if let Some(delegate) = effect.dest_in_delegate {
            *balances.entry(delegate).or_insert(0) -= effect.amount + effect.fee;
        }

        if effect.is_cert {
            let delegate = effect.dest_in_delegate.ok_or(ContextError::CertMissingDelegate)?;
            let anchor_height = effect.anchor_height.ok_or(ContextError::CertMissingAnchor)?;
            let balance = *balances.get(&delegate).unwrap_or(&0);
            if balance < min_enroll_amount {
                return Err(ContextError::InsufficientEnrollBalance(delegate));
            }
            enrollments.push((anchor_height, delegate, effect.location.0, effect.location.1));
        }
    }

    if let Some((&delegate, _)) = balances.iter().find(|(_, &votes)| votes < 0) {
        return Err(ContextError::NegativeDelegateBalance(delegate));
    }

    balances.retain(|_, &mut votes| votes != 0);
    Ok(TransitionResult { balances, enrollments })
}

/// Builds the active ballot for height `h + 1` (§4.9): every candidate
/// with `votes >= min_enroll_amount` and a reachable `enroll[h]` record,
/// sorted by `(votes desc, enroll_position desc)`, truncated to
/// [`MAX_DELEGATE_THRESH`].
#[must_use]
pub fn build_ballot(
    candidates: &HashMap<Hash256, i64>,
    enrolled: &HashSet<Hash256>,
    enroll_position: &HashMap<Hash256, u32>,
    min_enroll_amount: i64,
) -> Vec<Hash256> {
    let mut eligible: Vec<(Hash256, i64, u32)> = candidates
        .iter()
        .filter(|(delegate, &votes)| votes >= min_enroll_amount && enrolled.contains(*delegate))
        .map(|(delegate, &votes)| (*delegate, votes, enroll_position.get(delegate).copied().unwrap_or(0)))
        .collect();

    eligible.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
    eligible.truncate(MAX_DELEGATE_THRESH);
    eligible.into_iter().map(|(delegate, _, _)| delegate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_effect_credits_the_delegate() {
        let prev = HashMap::new();
        let delegate = Hash256::hash(b"delegate");
        let result = apply_block(&prev, Some((delegate, 1000)), &[], 500).unwrap();
        assert_eq!(result.balances.get(&delegate), Some(&1000));
    }

    #[test]
    fn vote_debits_dest_in_and_credits_dest_out() {
        let voter = Hash256::hash(b"voter");
        let receiver = Hash256::hash(b"receiver");
        let mut prev = HashMap::new();
        prev.insert(voter, 1000);

        let effect = TxVoteEffect {
            dest_out_delegate: Some(receiver),
            dest_in_delegate: Some(voter),
            amount: 100,
            fee: 1,
            ..Default::default()
        };
        let result = apply_block(&prev, None, &[effect], 500).unwrap();
        assert_eq!(result.balances.get(&voter), Some(&899));
        assert_eq!(result.balances.get(&receiver), Some(&100));
    }

    #[test]
    fn negative_balance_is_rejected() {
        let voter = Hash256::hash(b"voter");
        let prev = HashMap::new();
        let effect = TxVoteEffect { dest_in_delegate: Some(voter), amount: 100, fee: 0, ..Default::default() };
        assert!(matches!(apply_block(&prev, None, &[effect], 500), Err(ContextError::NegativeDelegateBalance(_))));
    }

    #[test]
    fn cert_below_minimum_is_rejected() {
        let delegate = Hash256::hash(b"delegate");
        let mut prev = HashMap::new();
        prev.insert(delegate, 10);
        let effect = TxVoteEffect {
            dest_in_delegate: Some(delegate),
            amount: 0,
            fee: 0,
            is_cert: true,
            anchor_height: Some(1),
            ..Default::default()
        };
        assert!(matches!(apply_block(&prev, None, &[effect], 500), Err(ContextError::InsufficientEnrollBalance(_))));
    }

    #[test]
    fn cert_above_minimum_records_enrollment() {
        let delegate = Hash256::hash(b"delegate");
        let mut prev = HashMap::new();
        prev.insert(delegate, 1000);
        let effect = TxVoteEffect {
            dest_in_delegate: Some(delegate),
            amount: 0,
            fee: 0,
            is_cert: true,
            anchor_height: Some(7),
            location: (3, 128),
            ..Default::default()
        };
        let result = apply_block(&prev, None, &[effect], 500).unwrap();
        assert_eq!(result.enrollments, vec![(7, delegate, 3, 128)]);
    }

    #[test]
    fn zero_balances_are_dropped() {
        let delegate = Hash256::hash(b"delegate");
        let mut prev = HashMap::new();
        prev.insert(delegate, 100);
        let effect = TxVoteEffect { dest_in_delegate: Some(delegate), amount: 100, fee: 0, ..Default::default() };
        let result = apply_block(&prev, None, &[effect], 500).unwrap();
        assert!(!result.balances.contains_key(&delegate));
    }

    #[test]
    fn ballot_sorts_by_votes_then_enroll_position() {
        let a = Hash256::hash(b"a");
        let b = Hash256::hash(b"b");
        let c = Hash256::hash(b"c");

        let mut candidates = HashMap::new();
        candidates.insert(a, 1000);
        candidates.insert(b, 1000);
        candidates.insert(c, 500);

        let enrolled: HashSet<Hash256> = [a, b, c].into_iter().collect();
        let mut positions = HashMap::new();
        positions.insert(a, 1);
        positions.insert(b, 5);
        positions.insert(c, 9);

        let ballot = build_ballot(&candidates, &enrolled, &positions, 500);
        assert_eq!(ballot, vec![b, a, c]);
    }

    #[test]
    fn ballot_excludes_unenrolled_and_under_minimum() {
        let a = Hash256::hash(b"a");
        let b = Hash256::hash(b"b");
        let mut candidates = HashMap::new();
        candidates.insert(a, 1000);
        candidates.insert(b, 100);
        let enrolled: HashSet<Hash256> = [a].into_iter().collect();
        let ballot = build_ballot(&candidates, &enrolled, &HashMap::new(), 500);
        assert_eq!(ballot, vec![a]);
    }
}
