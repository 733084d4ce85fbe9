//! Canonical little-endian codec used for all on-wire/on-disk framing.
//!
//! Every entry point returns a [`Result`]; nothing here panics on
//! adversarial input.

/// A codec failure. Never raised for well-formed data produced by
/// [`Encode::encode`].
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes remained than the field being decoded requires.
    #[error("truncated input")]
    Truncated,
    /// A tagged union's discriminant didn't match any known variant.
    #[error("invalid tag: {0}")]
    InvalidTag(u16),
    /// Bytes remained after decoding a value that should have consumed all
    /// of them.
    #[error("trailing bytes")]
    TrailingBytes,
}

/// Appends `self`'s canonical little-endian encoding to `out`.
pub trait Encode {
    /// Appends the encoding of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Encodes into a freshly allocated buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Decodes `Self` from the front of `buf`, advancing `buf` past the bytes
/// consumed.
pub trait Decode: Sized {
    /// Decodes one value, consuming its bytes from the front of `buf`.
    ///
    /// # Errors
    /// Returns [`CodecError`] on truncated input or an invalid tag.
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError>;

    /// Decodes a value that should consume every byte of `bytes`.
    ///
    /// # Errors
    /// Returns [`CodecError::TrailingBytes`] if bytes remain afterward, or
    /// any error `decode` itself returns.
    fn decode_exact(mut bytes: &[u8]) -> Result<Self, CodecError> {
        let value = Self::decode(&mut bytes)?;
        if bytes.is_empty() {
            Ok(value)
        } else {
            Err(CodecError::TrailingBytes)
        }
    }
}

macro_rules! impl_int_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Encode for $ty {
            fn encode(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }

        impl Decode for $ty {
            fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
                const N: usize = core::mem::size_of::<$ty>();
                if buf.len() < N {
                    return Err(CodecError::Truncated);
                }
                let (head, tail) = buf.split_at(N);
                *buf = tail;
                Ok(<$ty>::from_le_bytes(head.try_into().expect("checked length above")))
            }
        }
    )*};
}

impl_int_codec!(u8, u16, u32, u64, i64, i128, u128);

impl Encode for primitive_types::U256 {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut bytes = [0_u8; 32];
        self.to_little_endian(&mut bytes);
        out.extend_from_slice(&bytes);
    }
}

impl Decode for primitive_types::U256 {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        if buf.len() < 32 {
            return Err(CodecError::Truncated);
        }
        let (head, tail) = buf.split_at(32);
        *buf = tail;
        Ok(Self::from_little_endian(head))
    }
}

impl Encode for () {
    fn encode(&self, _out: &mut Vec<u8>) {}
}

impl Decode for () {
    fn decode(_buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(())
    }
}

impl Encode for bool {
    fn encode(&self, out: &mut Vec<u8>) {
        u8::from(*self).encode(out);
    }
}

impl Decode for bool {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(u8::decode(buf)? != 0)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            None => out.push(0),
            Some(value) => {
                out.push(1);
                value.encode(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
        match u8::decode(buf)? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(buf)?)),
            other => Err(CodecError::InvalidTag(u16::from(other))),
        }
    }
}

/// Length-prefixed (`u32` LE count) UTF-8 string.
pub fn encode_string(s: &str, out: &mut Vec<u8>) {
    encode_bytes(s.as_bytes(), out);
}

/// Decodes a length-prefixed UTF-8 string written by [`encode_string`].
///
/// # Errors
/// Returns [`CodecError::InvalidTag`] if the bytes aren't valid UTF-8, or
/// propagates [`CodecError::Truncated`] from the underlying byte read.
pub fn decode_string(buf: &mut &[u8]) -> Result<String, CodecError> {
    let bytes = decode_bytes(buf)?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidTag(0))
}

/// Length-prefixed (`u32` LE count) byte blob, used for `data`/`sig`/
/// `proof_bytes` fields.
pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    #[allow(clippy::cast_possible_truncation)]
    let len = bytes.len() as u32;
    len.encode(out);
    out.extend_from_slice(bytes);
}

/// Decodes a length-prefixed byte blob written by [`encode_bytes`].
///
/// # Errors
/// Returns [`CodecError::Truncated`] if fewer bytes remain than the
/// decoded length prefix claims.
pub fn decode_bytes(buf: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = u32::decode(buf)? as usize;
    if buf.len() < len {
        return Err(CodecError::Truncated);
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head.to_vec())
}

/// Length-prefixed (`u32` LE count) vector of [`Encode`]/[`Decode`] items.
pub fn encode_vec<T: Encode>(items: &[T], out: &mut Vec<u8>) {
    #[allow(clippy::cast_possible_truncation)]
    let len = items.len() as u32;
    len.encode(out);
    for item in items {
        item.encode(out);
    }
}

/// Decodes a length-prefixed vector written by [`encode_vec`].
///
/// # Errors
/// Propagates any error from decoding an element, or [`CodecError::Truncated`]
/// if the input ends before `len` elements are read.
pub fn decode_vec<T: Decode>(buf: &mut &[u8]) -> Result<Vec<T>, CodecError> {
    let len = u32::decode(buf)? as usize;
    let mut out = Vec::with_capacity(len.min(1 << 16));
    for _ in 0..len {
        out.push(T::decode(buf)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn bytes_round_trip_arbitrary(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let mut out = Vec::new();
            encode_bytes(&data, &mut out);
            let mut slice = out.as_slice();
            prop_assert_eq!(decode_bytes(&mut slice).unwrap(), data);
            prop_assert!(slice.is_empty());
        }

        #[test]
        fn u64_round_trip_arbitrary(n in any::<u64>()) {
            let mut out = Vec::new();
            n.encode(&mut out);
            let mut slice = out.as_slice();
            prop_assert_eq!(u64::decode(&mut slice).unwrap(), n);
        }
    }

    #[test]
    fn int_round_trip() {
        let mut out = Vec::new();
        42_u32.encode(&mut out);
        let mut slice = out.as_slice();
        assert_eq!(u32::decode(&mut slice).unwrap(), 42);
        assert!(slice.is_empty());
    }

    #[test]
    fn truncated_int_errors() {
        let mut slice: &[u8] = &[1, 2];
        assert_eq!(u32::decode(&mut slice), Err(CodecError::Truncated));
    }

    #[test]
    fn bytes_round_trip() {
        let mut out = Vec::new();
        encode_bytes(b"hello", &mut out);
        let mut slice = out.as_slice();
        assert_eq!(decode_bytes(&mut slice).unwrap(), b"hello");
    }

    #[test]
    fn vec_round_trip() {
        let mut out = Vec::new();
        encode_vec(&[1_u32, 2, 3], &mut out);
        let mut slice = out.as_slice();
        let decoded: Vec<u32> = decode_vec(&mut slice).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }
}
