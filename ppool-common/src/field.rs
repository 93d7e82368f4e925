//! BN256 scalar wrapper with a fixed-width, big-endian hex wire form.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use halo2curves_axiom::{
    bn256::Fr,
    ff::{Field, PrimeField},
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of hex characters in a serialized field element or proof word.
const HEX_WIDTH: usize = 64;

/// Errors produced while decoding a field element or proof word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} hex chars, got {got}")]
    WrongWidth { expected: usize, got: usize },

    #[error("value exceeds 32 bytes ({0} bytes)")]
    TooLong(usize),

    #[error("value is not a canonical field element")]
    NonCanonical,
}

/// A canonical element of the BN256 scalar field.
///
/// Ordering and hashing follow the big-endian byte form so the type can key
/// ordered maps and sets deterministically.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FieldElement(pub Fr);

impl FieldElement {
    pub const ZERO: FieldElement = FieldElement(<Fr as Field>::ZERO);

    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn from_fr(fr: Fr) -> Self {
        Self(fr)
    }

    pub fn as_fr(&self) -> &Fr {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Fr::zero()
    }

    /// Big-endian 32-byte encoding (the `bytes32` form used on chain).
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let repr = self.0.to_repr();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(repr.as_ref());
        bytes.reverse();
        bytes
    }

    /// Decode a big-endian encoding, rejecting values at or above the modulus.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Result<Self, FieldParseError> {
        let mut le = *bytes;
        le.reverse();
        Fr::from_repr(le)
            .into_option()
            .map(Self)
            .ok_or(FieldParseError::NonCanonical)
    }

    /// Interpret `bytes` as a big-endian integer and reduce it into the field.
    pub fn reduce_be_bytes(bytes: &[u8; 32]) -> Self {
        let mut acc = Fr::zero();
        let base = Fr::from(256);
        for byte in bytes.iter() {
            acc = acc * base + Fr::from(*byte as u64);
        }
        Self(acc)
    }

    /// Left-pad a short big-endian byte string (an address, say) to 32 bytes.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, FieldParseError> {
        if bytes.len() > 32 {
            return Err(FieldParseError::TooLong(bytes.len()));
        }
        let mut padded = [0u8; 32];
        padded[32 - bytes.len()..].copy_from_slice(bytes);
        Self::from_be_bytes(&padded)
    }

    /// `0x`-prefixed, 64 lowercase hex chars.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// Strict fixed-width decode, as used on the wire.
    pub fn from_hex(s: &str) -> Result<Self, FieldParseError> {
        Self::from_be_bytes(&decode_word(s)?)
    }

    /// Lenient decode that left-pads shorter hex strings (`0x123` is accepted).
    pub fn parse_padded(s: &str) -> Result<Self, FieldParseError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() > HEX_WIDTH {
            return Err(FieldParseError::WrongWidth {
                expected: HEX_WIDTH,
                got: digits.len(),
            });
        }
        let padded = format!("{:0>width$}", digits, width = HEX_WIDTH);
        Self::from_hex(&padded)
    }
}

fn decode_word(s: &str) -> Result<[u8; 32], FieldParseError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != HEX_WIDTH {
        return Err(FieldParseError::WrongWidth {
            expected: HEX_WIDTH,
            got: digits.len(),
        });
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(digits, &mut bytes)
        .map_err(|e| FieldParseError::InvalidHex(e.to_string()))?;
    Ok(bytes)
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(Fr::from(value))
    }
}

impl From<Fr> for FieldElement {
    fn from(fr: Fr) -> Self {
        Self(fr)
    }
}

impl Ord for FieldElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_be_bytes().cmp(&other.to_be_bytes())
    }
}

impl PartialOrd for FieldElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for FieldElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_be_bytes().hash(state);
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for FieldElement {
    type Err = FieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_padded(s)
    }
}

impl Serialize for FieldElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldVisitor;

        impl de::Visitor<'_> for FieldVisitor {
            type Value = FieldElement;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 32-byte big-endian hex string (with or without 0x prefix)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                FieldElement::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FieldVisitor)
    }
}

/// A raw 256-bit big-endian word, e.g. a curve coordinate in a proof.
///
/// Proof points live in the base field, which is wider than the scalar field,
/// so they are carried as words rather than [`FieldElement`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProofWord(pub [u8; 32]);

impl ProofWord {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, FieldParseError> {
        decode_word(s).map(Self)
    }
}

impl From<[u8; 32]> for ProofWord {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ProofWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofWord({})", self.to_hex())
    }
}

impl Serialize for ProofWord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProofWord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ProofWord::from_hex(&s).map_err(de::Error::custom)
    }
}
