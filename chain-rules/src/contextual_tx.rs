//! Block-tx-in-context verification (spec §4.11, "Block-tx verification
//! in context" / §4.7).
//!
//! These checks need the UTXO set, which lives above this crate in
//! chain-core; the caller resolves each input's spent output and current
//! height first and passes the resolved data in, keeping this crate free
//! of any KV dependency.

use chain_types::{Destination, SigVerifyResult, TemplateKind, Transaction, TxOut, TxType};

use crate::error::ContextualTxError;

/// Verifies `tx` against its already-resolved spent outputs.
///
/// `spent_outputs[i]` is the output `tx.inputs[i]` names; the caller has
/// already confirmed each is present in the UTXO set (an input naming a
/// missing outpoint never reaches this check).
///
/// `dest_in_template` is the parsed template behind `spent_outputs[0]`'s
/// destination, when that destination is a template (needed both for
/// the locked-coin floor and for signature verification).
///
/// `height` is the height of the block connecting `tx`.
///
/// # Errors
/// The first check that fails, per [`ContextualTxError`].
pub fn check_tx_in_context(
    tx: &Transaction,
    spent_outputs: &[TxOut],
    dest_in_template: Option<&TemplateKind>,
    height: u64,
) -> Result<(), ContextualTxError> {
    check_inputs_spendable(tx, spent_outputs, height)?;
    check_sum_in_covers_spend(tx, spent_outputs, dest_in_template, height)?;
    check_token_data_empty(tx)?;
    check_signature_complete(tx, spent_outputs, dest_in_template, height)?;
    Ok(())
}

fn check_inputs_spendable(_tx: &Transaction, spent_outputs: &[TxOut], height: u64) -> Result<(), ContextualTxError> {
    for output in spent_outputs {
        if height < u64::from(output.lock_until) {
            return Err(ContextualTxError::InputUnspendable);
        }
    }
    Ok(())
}

fn sum_in(spent_outputs: &[TxOut]) -> i64 {
    spent_outputs.iter().map(|out| out.amount).fold(0_i64, i64::saturating_add)
}

fn check_sum_in_covers_spend(
    tx: &Transaction,
    spent_outputs: &[TxOut],
    dest_in_template: Option<&TemplateKind>,
    height: u64,
) -> Result<(), ContextualTxError> {
    let floor = dest_in_template.and_then(|template| template.locked_coin_floor(height)).unwrap_or(0);
    let required = tx.amount.saturating_add(tx.fee).saturating_add(floor);
    if sum_in(spent_outputs) >= required {
        Ok(())
    } else {
        Err(ContextualTxError::InsufficientInputs)
    }
}

fn check_token_data_empty(tx: &Transaction) -> Result<(), ContextualTxError> {
    if tx.tx_type == TxType::Token && !tx.data.is_empty() {
        Err(ContextualTxError::NonEmptyTokenData)
    } else {
        Ok(())
    }
}

fn check_signature_complete(
    tx: &Transaction,
    spent_outputs: &[TxOut],
    dest_in_template: Option<&TemplateKind>,
    height: u64,
) -> Result<(), ContextualTxError> {
    let Some(dest_in) = spent_outputs.first().map(|out| &out.dest) else {
        return Err(ContextualTxError::IncompleteSignature);
    };
    #[allow(clippy::cast_possible_truncation)]
    let fork_height = height as u32;
    let result = match dest_in {
        Destination::Null => SigVerifyResult::Fail,
        _ => dest_in.verify_tx_signature(&tx.signing_bytes(), dest_in_template, &tx.sig, fork_height),
    };
    if matches!(result, SigVerifyResult::OkComplete) {
        Ok(())
    } else {
        Err(ContextualTxError::IncompleteSignature)
    }
}
