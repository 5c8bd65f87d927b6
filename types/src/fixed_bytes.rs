//! Fixed-width byte wrappers for BLS key material. The actual pairing-based cryptography
//! lives behind the `bls_domain` crate's `BLSBackend` trait; these types only carry bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! fixed_bytes_type {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(#[serde(with = "serde_bytes_array")] pub [u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;

            pub const fn zero() -> Self {
                Self([0u8; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = ();

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                if value.len() != $len {
                    return Err(());
                }
                let mut out = [0u8; $len];
                out.copy_from_slice(value);
                Ok(Self(out))
            }
        }
    };
}

fixed_bytes_type!(PublicKeyBytes, 48);
fixed_bytes_type!(SignatureBytes, 96);

/// Serde helper for fixed-size byte arrays (const generics aren't directly supported by serde).
mod serde_bytes_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec: Vec<u8> = Deserialize::deserialize(deserializer)?;
        vec.try_into()
            .map_err(|_| serde::de::Error::custom("unexpected byte length"))
    }
}
