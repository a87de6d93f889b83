//! Encoding of values stored in remote blocks.
//!
//! Scalars use fixed-width little-endian layouts. Composite values implement
//! [`RemoteValue`] with [`ElementType::Opaque`] and choose their own layout;
//! the server only sees bytes of the declared width.

use crate::error::{ClientError, Result};
use rheap_core::ElementType;

/// A value that can live in a remote block.
pub trait RemoteValue: Sized + Send + Sync + 'static {
    /// Element type the block is created with.
    fn element_type() -> ElementType;

    /// Encode into exactly [`width`](Self::width) bytes.
    fn encode(&self) -> Vec<u8>;

    /// Decode from the block's bytes.
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Encoded width in bytes.
    fn width() -> usize {
        Self::element_type().size()
    }
}

/// Copy `bytes` into an array of exactly `N` bytes.
pub fn fixed<const N: usize>(type_name: &str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        ClientError::Codec(format!(
            "{type_name} needs {N} bytes, got {}",
            bytes.len()
        ))
    })
}

macro_rules! impl_le_scalar {
    ($($ty:ty => $element:expr),* $(,)?) => {
        $(
            impl RemoteValue for $ty {
                fn element_type() -> ElementType {
                    $element
                }

                fn encode(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }

                fn decode(bytes: &[u8]) -> Result<Self> {
                    Ok(<$ty>::from_le_bytes(fixed(stringify!($ty), bytes)?))
                }
            }
        )*
    };
}

impl_le_scalar!(
    i32 => ElementType::Int32,
    f32 => ElementType::Float32,
    f64 => ElementType::Float64,
    u8 => ElementType::Byte,
);

impl RemoteValue for bool {
    fn element_type() -> ElementType {
        ElementType::Bool
    }

    fn encode(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        match fixed::<1>("bool", bytes)? {
            [0] => Ok(false),
            [1] => Ok(true),
            [other] => Err(ClientError::Codec(format!("invalid bool byte {other:#04x}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_element_types() {
        assert_eq!(i32::width(), 4);
        assert_eq!(f32::width(), 4);
        assert_eq!(f64::width(), 8);
        assert_eq!(u8::width(), 1);
        assert_eq!(bool::width(), 1);
    }

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(42i32.encode(), vec![42, 0, 0, 0]);
        assert_eq!((-1i32).encode(), vec![0xff; 4]);
        assert_eq!(f64::decode(&1.5f64.to_le_bytes()).unwrap(), 1.5);
    }

    #[test]
    fn short_input_is_rejected() {
        let err = i32::decode(&[1, 2]).unwrap_err();
        assert!(matches!(err, ClientError::Codec(ref m) if m.contains("i32 needs 4 bytes")));
    }

    #[test]
    fn bool_rejects_other_bytes() {
        assert!(bool::decode(&[1]).unwrap());
        assert!(!bool::decode(&[0]).unwrap());
        assert!(bool::decode(&[2]).is_err());
    }
}
