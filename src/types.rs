//! Primitive identities and amounts shared by every layer.

use core::{fmt, str::FromStr};

use rand::{distributions::Standard, prelude::Distribution};
use serde::{de, Deserialize, Deserializer, Serialize};
use uint::construct_uint;

/// Error returned when parsing a hex string into one of the fixed-size types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseHexError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s)?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseHexError::WrongLength { expected: N, got })
}

macro_rules! impl_hex_fmt {
    ($T:ident) => {
        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("0x")?;
                for b in self.0 {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

macro_rules! bytes_n {
    ( $(#[$meta:meta])* $T:ident, $N:literal ) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
        pub struct $T(pub [u8; $N]);

        impl $T {
            pub const LEN: usize = $N;

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self([0; $N])
            }
        }

        impl Distribution<$T> for Standard {
            fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> $T {
                $T(rng.gen())
            }
        }

        impl FromStr for $T {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$N>(s).map($T)
            }
        }

        impl TryFrom<&[u8]> for $T {
            type Error = ParseHexError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                let got = value.len();
                <[u8; $N]>::try_from(value)
                    .map($T)
                    .map_err(|_| ParseHexError::WrongLength { expected: $N, got })
            }
        }

        impl<'de> Deserialize<'de> for $T {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }

        impl_hex_fmt!($T);
    };
}

bytes_n!(
    /// Keccak-256 digest. Also used as channel identifier.
    Hash,
    32
);

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

bytes_n!(
    /// 65 byte recoverable ECDSA signature (`r || s || v`).
    Signature,
    65
);

impl Signature {
    pub fn new(rs: &[u8; 64], v: u8) -> Self {
        let mut sig = Signature([0; 65]);
        sig.0[..64].copy_from_slice(rs);
        sig.0[64] = v;
        sig
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

bytes_n!(
    /// Identity of a participant, a token or an external contract.
    ///
    /// The zero address denotes the native asset when used as a token.
    Address,
    20
);

impl Address {
    pub const ZERO: Address = Address([0; 20]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Addresses are right aligned in their slot, like integers.
        let mut bytes = [0u8; 32];
        bytes[32 - 20..].copy_from_slice(self.0.as_slice());
        serializer.serialize_bytes(&bytes)
    }
}

bytes_n!(
    /// Identifier of a price feed: category byte followed by the ASCII feed
    /// name, zero padded.
    FeedId,
    21
);

construct_uint! {
    /// Token amount in the smallest unit of the token.
    pub struct U256(4);
}

impl U256 {
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes
    }

    /// Accepts up to 32 big-endian bytes, as produced by [U256::to_be_bytes].
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 32 {
            return None;
        }
        Some(U256::from_big_endian(bytes))
    }
}

impl Serialize for U256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.to_be_bytes())
    }
}

impl Distribution<U256> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> U256 {
        let buf: [u8; 32] = rng.gen();
        U256::from_big_endian(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parses_with_and_without_prefix() {
        let a: Address = "0xC2BA5c5E2c4848F64187Aa1F3f32a331b0C031b9".parse().unwrap();
        let b: Address = "c2ba5c5e2c4848f64187aa1f3f32a331b0c031b9".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0xc2ba5c5e2c4848f64187aa1f3f32a331b0c031b9");
    }

    #[test]
    fn address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err, ParseHexError::WrongLength { expected: 20, got: 2 });
    }

    #[test]
    fn u256_bytes_round_trip() {
        let v = U256::exp10(60) + U256::from(7u64);
        assert_eq!(U256::from_be_slice(&v.to_be_bytes()), Some(v));
        assert_eq!(U256::from_be_slice(&[0u8; 33]), None);
    }
}
