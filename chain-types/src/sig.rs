//! Sign/verify/multi-sign primitives (C1). Verify never raises: malformed
//! input simply fails to verify.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::hash::Hash256;

/// A signing key, wrapping an Ed25519 keypair.
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generates a fresh private key.
    #[must_use]
    pub fn generate<R: rand_core::CryptoRngCore>(rng: &mut R) -> Self {
        Self(SigningKey::generate(rng))
    }

    /// The corresponding public key.
    #[must_use]
    pub fn public_key(&self) -> Hash256 {
        Hash256(self.0.verifying_key().to_bytes())
    }

    /// `Sign(priv, msg) -> sig`.
    #[must_use]
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.0.sign(msg).to_bytes().to_vec()
    }
}

/// `Verify(pub, msg, sig) -> bool`. Returns `false` on any malformed input
/// rather than raising.
#[must_use]
pub fn verify(pubkey: Hash256, msg: &[u8], sig: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pubkey.0) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(sig) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);
    verifying_key.verify(msg, &signature).is_ok()
}

/// `MultiSign(pubkey_set, msg) -> partial_sig`: one signer's contribution
/// to a threshold/multisig destination. The partial signature is just that
/// signer's own Ed25519 signature; aggregation is "recover which of the
/// declared pubkeys produced a valid signature", not curve-level
/// aggregation — matching the weighted-multisig/multisig template kinds'
/// "threshold of independent signatures" semantics.
#[must_use]
pub fn multi_sign(priv_key: &PrivateKey, msg: &[u8]) -> Vec<u8> {
    priv_key.sign(msg)
}

/// `MultiVerify(pubkey_set, msg, sig) -> recovered_pubkey_set`: for each
/// candidate signature in `sigs`, returns the subset of `pubkey_set` whose
/// key verifies at least one of the supplied signatures against `msg`.
#[must_use]
pub fn multi_verify(pubkey_set: &[Hash256], msg: &[u8], sigs: &[Vec<u8>]) -> Vec<Hash256> {
    pubkey_set
        .iter()
        .copied()
        .filter(|pubkey| sigs.iter().any(|sig| verify(*pubkey, msg, sig)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let mut rng = rand_core::OsRng;
        let key = PrivateKey::generate(&mut rng);
        let sig = key.sign(b"message");
        assert!(verify(key.public_key(), b"message", &sig));
        assert!(!verify(key.public_key(), b"tampered", &sig));
    }

    #[test]
    fn verify_rejects_malformed_input() {
        assert!(!verify(Hash256::ZERO, b"msg", &[]));
        assert!(!verify(Hash256::ZERO, b"msg", &[0; 64]));
    }

    #[test]
    fn multi_verify_recovers_signers() {
        let mut rng = rand_core::OsRng;
        let a = PrivateKey::generate(&mut rng);
        let b = PrivateKey::generate(&mut rng);
        let c = PrivateKey::generate(&mut rng);

        let sig_a = multi_sign(&a, b"threshold msg");
        let sig_b = multi_sign(&b, b"threshold msg");

        let recovered = multi_verify(
            &[a.public_key(), b.public_key(), c.public_key()],
            b"threshold msg",
            &[sig_a, sig_b],
        );

        assert_eq!(recovered.len(), 2);
        assert!(recovered.contains(&a.public_key()));
        assert!(recovered.contains(&b.public_key()));
        assert!(!recovered.contains(&c.public_key()));
    }
}
