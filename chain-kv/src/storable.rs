//! (De)serialization for table keys & values.
//!
//! Every row type in [`crate::tables`] is canonically little-endian
//! encoded via [`chain_types::Encode`]/[`chain_types::Decode`] rather
//! than cast zero-copy from bytes, since the chain's row shapes (tx
//! vectors, variable-length destinations, template params) are not
//! fixed-width.

use chain_types::{CodecError, Decode, Encode};

/// A type storable as a table key or value.
pub trait Storable: Sized {
    /// Encodes `self` into a freshly allocated buffer.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes a full row's bytes back into `Self`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `bytes` is truncated, carries an
    /// unrecognized tag, or has trailing bytes left over.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl<T: Encode + Decode> Storable for T {
    fn to_bytes(&self) -> Vec<u8> {
        Encode::to_bytes(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode_exact(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_storable() {
        let hash = chain_types::Hash256::hash(b"row");
        let bytes = Storable::to_bytes(&hash);
        assert_eq!(<chain_types::Hash256 as Storable>::from_bytes(&bytes).unwrap(), hash);
    }
}
