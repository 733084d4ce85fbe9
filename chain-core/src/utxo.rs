//! UTXO + tx-index core (C7): turns an already-validated transaction
//! into the `(outpoint, utxo)` rows it produces and the `outpoint`s it
//! consumes. Pure data transforms — no KV access, no locking; the
//! caller ([`crate::view::BlockView`]) is the one with overlay/KV
//! access, mirroring the "push resolution upstream" split chain-rules
//! and chain-context already use.

use chain_constants::tx::MINT_OUTPUT_UNLOCK_WINDOW;
use chain_types::{Destination, OutPoint, Transaction, TxOut};

/// The high bit of `lock_until` selects which of a tx's two outputs the
/// numeric lock height applies to; the other output is unlocked
/// immediately. This is [`Transaction::locks_change_output`]'s flag,
/// resolved here into the two outputs' own (unflagged) `lock_until`
/// fields.
fn resolve_output_locks(tx: &Transaction) -> (u32, u32) {
    let masked = tx.lock_until & 0x7FFF_FFFF;
    if tx.locks_change_output() {
        (0, masked)
    } else {
        (masked, 0)
    }
}

/// The outpoints an ordinary (non-mint) transaction consumes, in input
/// order — the lookup keys the caller resolves against the unspent set
/// before calling [`apply_tx`].
#[must_use]
pub fn spent_outpoints(tx: &Transaction) -> Vec<OutPoint> {
    tx.inputs.iter().map(|input| OutPoint { txid: input.prev_hash, index: input.prev_index }).collect()
}

/// Produces the single output a mint transaction (`Genesis`/`Stake`/
/// `Work`) creates at index 0, locked until `connecting_height +
/// MINT_OUTPUT_UNLOCK_WINDOW` (spec §4.7's mint-output rule, read
/// alongside the maturity window [`MINT_OUTPUT_UNLOCK_WINDOW`] already
/// carried in `chain-constants`).
#[must_use]
pub fn apply_mint_tx(tx: &Transaction, connecting_height: u32) -> (OutPoint, TxOut) {
    let outpoint = OutPoint { txid: tx.txid(), index: 0 };
    #[allow(clippy::cast_possible_truncation)]
    let window = MINT_OUTPUT_UNLOCK_WINDOW as u32;
    let lock_until = connecting_height.saturating_add(window);
    let utxo = TxOut { dest: tx.send_to, amount: tx.amount, tx_time: tx.timestamp, lock_until };
    (outpoint, utxo)
}

/// Produces the outputs an ordinary transaction creates, given the
/// resolved `TxOut`s its inputs spend (in `tx.inputs` order; already
/// validated unspent/unlocked/sufficient by [`chain_rules::check_tx_in_context`]).
///
/// Always yields index 0 (`send_to`); yields index 1 (change back to
/// `destIn`, the spent outputs' common owner) only when
/// `sum_in - amount - fee > 0`.
#[must_use]
pub fn apply_tx(tx: &Transaction, spent_outputs: &[TxOut]) -> Vec<(OutPoint, TxOut)> {
    let txid = tx.txid();
    let (send_lock, change_lock) = resolve_output_locks(tx);

    let mut outputs = vec![(
        OutPoint { txid, index: 0 },
        TxOut { dest: tx.send_to, amount: tx.amount, tx_time: tx.timestamp, lock_until: send_lock },
    )];

    let sum_in: i64 = spent_outputs.iter().map(|out| out.amount).sum();
    let change = sum_in - tx.amount - tx.fee;
    if change > 0 {
        let dest_in = spent_outputs.first().map_or(Destination::Null, |out| out.dest);
        outputs.push((
            OutPoint { txid, index: 1 },
            TxOut { dest: dest_in, amount: change, tx_time: tx.timestamp, lock_until: change_lock },
        ));
    }
    outputs
}

#[cfg(test)]
mod tests {
    use chain_types::{Hash256, TxIn, TxType};

    use super::*;

    fn spent_output(dest: Destination, amount: i64) -> TxOut {
        TxOut { dest, amount, tx_time: 0, lock_until: 0 }
    }

    fn token_tx(amount: i64, fee: i64, lock_until: u32) -> Transaction {
        Transaction {
            version: 1,
            tx_type: TxType::Token,
            timestamp: 1_700_000_000,
            lock_until,
            inputs: vec![TxIn { prev_hash: Hash256::hash(b"prev"), prev_index: 0 }],
            send_to: Destination::PubKey(Hash256::hash(b"payee")),
            amount,
            fee,
            data: vec![],
            sig: vec![1],
        }
    }

    #[test]
    fn no_change_output_when_exact() {
        let tx = token_tx(990, 10, 0);
        let spent = [spent_output(Destination::PubKey(Hash256::hash(b"payer")), 1_000)];
        let outputs = apply_tx(&tx, &spent);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].0.index, 0);
    }

    #[test]
    fn change_output_returns_to_payer() {
        let payer = Destination::PubKey(Hash256::hash(b"payer"));
        let tx = token_tx(500, 10, 0);
        let spent = [spent_output(payer, 1_000)];
        let outputs = apply_tx(&tx, &spent);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].0.index, 1);
        assert_eq!(outputs[1].1.amount, 490);
        assert_eq!(outputs[1].1.dest, payer);
    }

    #[test]
    fn lock_flag_selects_change_output() {
        let payer = Destination::PubKey(Hash256::hash(b"payer"));
        let tx = token_tx(500, 10, 0x8000_0064); // high bit set, masked = 100
        let spent = [spent_output(payer, 1_000)];
        let outputs = apply_tx(&tx, &spent);
        assert_eq!(outputs[0].1.lock_until, 0);
        assert_eq!(outputs[1].1.lock_until, 100);
    }

    #[test]
    fn lock_flag_unset_locks_send_to_output() {
        let payer = Destination::PubKey(Hash256::hash(b"payer"));
        let tx = token_tx(500, 10, 100);
        let spent = [spent_output(payer, 1_000)];
        let outputs = apply_tx(&tx, &spent);
        assert_eq!(outputs[0].1.lock_until, 100);
        assert_eq!(outputs[1].1.lock_until, 0);
    }

    #[test]
    fn mint_output_locks_until_maturity_window() {
        let tx = Transaction {
            version: 1,
            tx_type: TxType::Work,
            timestamp: 1_700_000_000,
            lock_until: 0,
            inputs: vec![],
            send_to: Destination::PubKey(Hash256::hash(b"miner")),
            amount: 5_000,
            fee: 0,
            data: vec![],
            sig: vec![],
        };
        let (outpoint, utxo) = apply_mint_tx(&tx, 1_000);
        assert_eq!(outpoint.index, 0);
        assert_eq!(utxo.lock_until, 1_000 + u32::try_from(MINT_OUTPUT_UNLOCK_WINDOW).unwrap());
    }

    #[test]
    fn spent_outpoints_match_input_order() {
        let tx = token_tx(100, 10, 0);
        let outpoints = spent_outpoints(&tx);
        assert_eq!(outpoints, vec![OutPoint { txid: Hash256::hash(b"prev"), index: 0 }]);
    }
}
