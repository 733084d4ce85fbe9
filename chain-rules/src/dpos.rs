//! DPoS slot, fork-origin and vacant-block checks (spec §4.9/§4.11).

use chain_constants::block::EXTENDED_BLOCK_SPACING;
use chain_types::{codec::Decode, Block, ForkProfile, Hash256};

use crate::error::{DposError, OriginError, VacantError};

/// Checks a Subsidiary/Extended block's slot: its timestamp must fall on
/// an [`EXTENDED_BLOCK_SPACING`] boundary measured from the primary block
/// it references, and its mint destination must be the delegate the
/// active ballot assigned to that slot.
///
/// `reference_timestamp` is the referenced primary block's timestamp;
/// `slot_delegate` is the ballot entry chain-core already resolved for
/// this slot.
///
/// # Errors
/// [`DposError::BadSlotSpacing`] if the timestamp doesn't land on a
/// spacing boundary; [`DposError::NotTheExpectedDelegate`] if the mint
/// destination's delegate doesn't match `slot_delegate`.
pub fn check_dpos_slot(
    block: &Block,
    reference_timestamp: u32,
    slot_delegate: Hash256,
    mint_delegate: Option<Hash256>,
) -> Result<(), DposError> {
    let spacing = u32::try_from(EXTENDED_BLOCK_SPACING.as_secs()).unwrap_or(1);
    if block.timestamp < reference_timestamp || (block.timestamp - reference_timestamp) % spacing != 0 {
        return Err(DposError::BadSlotSpacing);
    }
    match mint_delegate {
        Some(delegate) if delegate == slot_delegate => Ok(()),
        _ => Err(DposError::NotTheExpectedDelegate(slot_delegate)),
    }
}

/// Checks an Origin (fork-creation) block: its `proof_bytes` must decode
/// to a [`ForkProfile`], and if `parent` is private, the new profile must
/// also be private with the same owner.
///
/// # Errors
/// [`OriginError::UnparseableProfile`] if `proof_bytes` doesn't decode;
/// [`OriginError::PrivateInheritanceViolation`] if the private-inheritance
/// rule is broken.
pub fn check_origin(block: &Block, parent: Option<&ForkProfile>) -> Result<ForkProfile, OriginError> {
    let profile = ForkProfile::decode_exact(&block.proof_bytes).map_err(|_| OriginError::UnparseableProfile)?;

    if let Some(parent) = parent {
        if parent.private && !(profile.private && profile.owner == parent.owner) {
            return Err(OriginError::PrivateInheritanceViolation);
        }
    }
    Ok(profile)
}

/// Checks a Vacant block: every payload field must be empty.
///
/// # Errors
/// The first non-empty field found, per [`VacantError`].
pub fn check_vacant(block: &Block) -> Result<(), VacantError> {
    if block.tx_merkle_root != Hash256::ZERO {
        return Err(VacantError::NonEmptyMerkle);
    }
    if !block.mint_tx.inputs.is_empty() || block.mint_tx.amount != 0 || !matches!(block.mint_tx.send_to, chain_types::Destination::Null) {
        return Err(VacantError::NonEmptyMintTx);
    }
    if !block.vtx.is_empty() {
        return Err(VacantError::NonEmptyVtx);
    }
    if !block.proof_bytes.is_empty() {
        return Err(VacantError::NonEmptyProof);
    }
    if !block.sig.is_empty() {
        return Err(VacantError::NonEmptySig);
    }
    Ok(())
}
