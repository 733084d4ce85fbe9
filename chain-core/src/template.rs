//! Resolves the [`TemplateKind`] instances a [`Destination::Template`]
//! stands for.
//!
//! A `TemplateId` only commits to its params (`kind` tag plus
//! `hash(params)`) — it cannot be inverted back into the params
//! themselves. Those live in the `Template` KV table (C5), keyed by id,
//! and are populated exactly once: on the first transaction that ever
//! *pays to* a not-yet-seen id, by reading them off the front of that
//! transaction's `data` field (the one place a template-establishing
//! transaction is guaranteed to leave free — see
//! [`takes_data_frame`](chain_rules) for the two template kinds,
//! `Multisig` and `WeightedMultisig`, that claim `data` for their own
//! description frame instead and so cannot self-establish this way).
//!
//! Deliberately absent from this module: any attempt to carry template
//! params in `tx.sig`. [`chain_types::sig::verify`] requires its `sig`
//! argument be exactly one raw signature — there is no room in it for
//! anything else, which is why `destIn`'s template is always resolved
//! by registry lookup, never by parsing the spending transaction's own
//! signature bytes.

use chain_types::{Decode, Destination, Encode, TemplateId, TemplateKind, Transaction, TxType};

use crate::error::ChainError;

/// Parses a length-prefixed `TemplateKind` from the front of `bytes`.
///
/// `None` if `bytes` is too short to carry a length prefix, the
/// declared length overruns the buffer, or the declared region doesn't
/// decode as a `TemplateKind`.
#[must_use]
pub fn parse_leading_template(bytes: &[u8]) -> Option<TemplateKind> {
    if bytes.len() < 4 {
        return None;
    }
    let len = u32::from_le_bytes(bytes[..4].try_into().expect("checked length above")) as usize;
    let encoded = bytes.get(4..)?.get(..len)?;
    TemplateKind::decode_exact(encoded).ok()
}

/// Encodes `kind` with the length prefix [`parse_leading_template`]
/// expects, for callers constructing an establishing transaction's
/// `data` field.
#[must_use]
pub fn encode_leading_template(kind: &TemplateKind) -> Vec<u8> {
    let encoded = kind.to_bytes();
    let mut out = Vec::with_capacity(4 + encoded.len());
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    out.extend_from_slice(&encoded);
    out
}

/// Whether `dest` is one of the two kinds that claim `tx.data` for
/// their own description frame, and so can never self-establish
/// through it.
fn claims_data_frame(dest: Destination) -> bool {
    matches!(
        dest,
        Destination::Template(TemplateId { kind, .. })
            if kind == chain_types::TemplateKindTag::Multisig as u16
                || kind == chain_types::TemplateKindTag::WeightedMultisig as u16
    )
}

/// A read-through cache over the `Template` registry: consults an
/// in-progress [`crate::view::BlockView`]'s own pending registrations
/// (not yet committed to the KV store) before falling back to what's
/// already on disk, and buffers any newly-discovered registration for
/// the view to persist on commit.
pub trait TemplateRegistry {
    /// Looks up `id`, checking pending registrations first.
    fn lookup(&self, id: TemplateId) -> Result<Option<TemplateKind>, ChainError>;

    /// Records a newly-discovered registration, to be persisted
    /// alongside the rest of the view's overlay on commit.
    fn register(&mut self, id: TemplateId, kind: TemplateKind);
}

/// Resolves the template a spent output's `destIn` routes to.
///
/// `destIn`'s producing output was necessarily created by an earlier
/// transaction that already established the template (a template
/// address can't be funded before it's registered), so this is always
/// a pure registry lookup.
///
/// # Errors
/// [`ChainError::ContextualTx`]'s [`chain_rules::ContextualTxError::IncompleteSignature`]
/// if `dest_in` is a template with no matching registry entry.
pub fn resolve_dest_in_template(
    registry: &impl TemplateRegistry,
    dest_in: Destination,
) -> Result<Option<TemplateKind>, ChainError> {
    match dest_in {
        Destination::Template(id) => registry
            .lookup(id)?
            .map(Some)
            .ok_or_else(|| chain_rules::ContextualTxError::IncompleteSignature.into()),
        _ => Ok(None),
    }
}

/// Resolves the template a transaction's `sendTo` routes to, registering
/// it from `tx.data`'s leading prefix if this is the first transaction
/// ever to pay to that id.
///
/// # Errors
/// [`ChainError::ContextualTx`]'s [`chain_rules::ContextualTxError::IncompleteSignature`]
/// if `send_to` is an unregistered template and either claims `data`
/// for its own description frame (so can never self-establish) or
/// carries no parseable instance at its front.
pub fn resolve_send_to_template(
    registry: &mut impl TemplateRegistry,
    send_to: Destination,
    data: &[u8],
) -> Result<Option<TemplateKind>, ChainError> {
    let Destination::Template(id) = send_to else {
        return Ok(None);
    };

    if let Some(kind) = registry.lookup(id)? {
        return Ok(Some(kind));
    }

    if claims_data_frame(send_to) {
        return Err(chain_rules::ContextualTxError::IncompleteSignature.into());
    }

    let kind = parse_leading_template(data).ok_or(chain_rules::ContextualTxError::IncompleteSignature)?;
    registry.register(id, kind.clone());
    Ok(Some(kind))
}

/// Resolves both sides of a transaction's destinations against
/// `registry`, registering `sendTo`'s template on first sight.
///
/// A `CERT`'s first four `data` bytes are always the enrollment's
/// anchor height (spec's §4.9 step 3 rule), never a template prefix —
/// so a cert's `send_to`, like `Multisig`/`WeightedMultisig`, can never
/// self-establish and must already be registered.
///
/// # Errors
/// See [`resolve_dest_in_template`] and [`resolve_send_to_template`].
pub fn resolve_tx_templates(
    registry: &mut impl TemplateRegistry,
    tx: &Transaction,
    dest_in: Destination,
) -> Result<(Option<TemplateKind>, Option<TemplateKind>), ChainError> {
    let dest_in_template = resolve_dest_in_template(registry, dest_in)?;
    let send_to_data: &[u8] = if tx.tx_type == TxType::Cert { &[] } else { &tx.data };
    let send_to_template = resolve_send_to_template(registry, tx.send_to, send_to_data)?;
    Ok((dest_in_template, send_to_template))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chain_types::Hash256;

    use super::*;

    #[derive(Default)]
    struct FakeRegistry(HashMap<TemplateId, TemplateKind>);

    impl TemplateRegistry for FakeRegistry {
        fn lookup(&self, id: TemplateId) -> Result<Option<TemplateKind>, ChainError> {
            Ok(self.0.get(&id).cloned())
        }

        fn register(&mut self, id: TemplateId, kind: TemplateKind) {
            self.0.insert(id, kind);
        }
    }

    #[test]
    fn round_trips_an_encoded_template() {
        let kind = TemplateKind::Vote { delegate: Hash256::hash(b"delegate") };
        let blob = encode_leading_template(&kind);
        assert_eq!(parse_leading_template(&blob), Some(kind));
    }

    #[test]
    fn rejects_a_truncated_length_prefix() {
        assert!(parse_leading_template(&[1, 2]).is_none());
    }

    #[test]
    fn rejects_an_overrunning_length() {
        let mut blob = 100_u32.to_le_bytes().to_vec();
        blob.extend_from_slice(b"short");
        assert!(parse_leading_template(&blob).is_none());
    }

    #[test]
    fn send_to_registers_on_first_sight_then_reads_through() {
        let mut registry = FakeRegistry::default();
        let kind = TemplateKind::Vote { delegate: Hash256::hash(b"delegate") };
        let send_to = Destination::Template(kind.template_id());
        let data = encode_leading_template(&kind);

        let first = resolve_send_to_template(&mut registry, send_to, &data).unwrap();
        assert_eq!(first, Some(kind.clone()));

        let second = resolve_send_to_template(&mut registry, send_to, &[]).unwrap();
        assert_eq!(second, Some(kind));
    }

    #[test]
    fn send_to_multisig_can_never_self_establish() {
        let mut registry = FakeRegistry::default();
        let kind = TemplateKind::Multisig { threshold: 2, pubkeys: vec![Hash256::hash(b"a"), Hash256::hash(b"b")] };
        let send_to = Destination::Template(kind.template_id());
        let data = encode_leading_template(&kind);

        assert!(resolve_send_to_template(&mut registry, send_to, &data).is_err());
    }

    #[test]
    fn dest_in_is_pure_lookup_never_registers() {
        let registry = FakeRegistry::default();
        let kind = TemplateKind::Vote { delegate: Hash256::hash(b"delegate") };
        let dest_in = Destination::Template(kind.template_id());
        assert!(resolve_dest_in_template(&registry, dest_in).is_err());
    }
}
