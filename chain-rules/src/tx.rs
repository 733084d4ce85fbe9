//! Context-free transaction checks (spec §4.11).

use chain_constants::{
    money::MONEY_RANGE,
    tx::{data_frame, MAX_TX_SIZE, MIN_TX_FEE},
};
use chain_types::{codec::Encode, Destination, TemplateKindTag, Transaction, TxType};

use crate::error::TxError;

/// Runs every context-free check on `tx`, in the order spec'd: type,
/// money range, inputs-empty-iff-mint, no duplicate inputs, lookup-index
/// range, sig-empty-iff-mint, `send_to != Null`, size, fee rule, and (for
/// a plain-key or multisig recipient) the data-frame header.
///
/// # Errors
/// The first check that fails, per [`TxError`].
pub fn check_tx_context_free(tx: &Transaction) -> Result<(), TxError> {
    check_money_range(tx)?;
    check_inputs_mint_consistency(tx)?;
    check_no_duplicate_inputs(tx)?;
    check_lookup_indices(tx)?;
    check_sig_mint_consistency(tx)?;
    check_destination_not_null(tx)?;
    check_size(tx)?;
    check_fee(tx)?;
    check_data_frame(tx)?;
    Ok(())
}

fn check_money_range(tx: &Transaction) -> Result<(), TxError> {
    if MONEY_RANGE.contains(&tx.amount) && MONEY_RANGE.contains(&tx.fee) {
        Ok(())
    } else {
        Err(TxError::MoneyRangeViolation)
    }
}

fn check_inputs_mint_consistency(tx: &Transaction) -> Result<(), TxError> {
    if tx.tx_type.is_mint() == tx.inputs.is_empty() {
        Ok(())
    } else {
        Err(TxError::InputsMintMismatch)
    }
}

fn check_no_duplicate_inputs(tx: &Transaction) -> Result<(), TxError> {
    let mut seen = std::collections::HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert((input.prev_hash, input.prev_index)) {
            return Err(TxError::DuplicateInput);
        }
    }
    Ok(())
}

fn check_lookup_indices(tx: &Transaction) -> Result<(), TxError> {
    for input in &tx.inputs {
        if input.prev_index > 1 {
            return Err(TxError::BadLookupIndex(input.prev_index));
        }
    }
    Ok(())
}

fn check_sig_mint_consistency(tx: &Transaction) -> Result<(), TxError> {
    if tx.tx_type.is_mint() == tx.sig.is_empty() {
        Ok(())
    } else {
        Err(TxError::SigMintMismatch)
    }
}

fn check_destination_not_null(tx: &Transaction) -> Result<(), TxError> {
    if matches!(tx.send_to, Destination::Null) {
        Err(TxError::NullDestination)
    } else {
        Ok(())
    }
}

fn check_size(tx: &Transaction) -> Result<(), TxError> {
    let size = tx.to_bytes().len();
    if size > MAX_TX_SIZE {
        Err(TxError::TooLarge { size, max: MAX_TX_SIZE })
    } else {
        Ok(())
    }
}

fn check_fee(tx: &Transaction) -> Result<(), TxError> {
    match tx.tx_type {
        TxType::Token if tx.fee < MIN_TX_FEE => Err(TxError::FeeTooLow(tx.fee)),
        TxType::Token => Ok(()),
        _ if tx.fee != 0 => Err(TxError::NonzeroMintFee),
        _ => Ok(()),
    }
}

/// Whether `dest` is one of the kinds the data-frame header applies to:
/// a plain key, or a multisig/weighted-multisig template.
fn takes_data_frame(dest: &Destination) -> bool {
    match dest {
        Destination::PubKey(_) => true,
        Destination::Template(id) => {
            id.kind == TemplateKindTag::Multisig as u16 || id.kind == TemplateKindTag::WeightedMultisig as u16
        }
        Destination::Null => false,
    }
}

fn check_data_frame(tx: &Transaction) -> Result<(), TxError> {
    if tx.data.is_empty() || !takes_data_frame(&tx.send_to) {
        return Ok(());
    }

    if tx.data.len() < data_frame::MIN_FRAME_LEN {
        return Err(TxError::BadDataFrame);
    }
    let desc_len = tx.data[data_frame::UUID_LEN + data_frame::TIMESTAMP_LEN] as usize;
    let expected_len = data_frame::MIN_FRAME_LEN + desc_len;
    if tx.data.len() != expected_len {
        return Err(TxError::BadDataFrame);
    }
    let desc = &tx.data[data_frame::MIN_FRAME_LEN..];
    if base64_decodable(desc) {
        Ok(())
    } else {
        Err(TxError::BadDataFrame)
    }
}

/// Whether `bytes`, interpreted as ASCII, is a legal (possibly padded)
/// base64 alphabet string. We never need the decoded description itself,
/// only that the frame's author encoded one.
fn base64_decodable(bytes: &[u8]) -> bool {
    let is_b64_char = |b: u8| b.is_ascii_alphanumeric() || b == b'+' || b == b'/';
    let trimmed = {
        let mut end = bytes.len();
        while end > 0 && bytes[end - 1] == b'=' {
            end -= 1;
        }
        &bytes[..end]
    };
    !trimmed.is_empty() && trimmed.iter().copied().all(is_b64_char) || bytes.is_empty()
}
