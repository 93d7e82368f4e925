use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FieldElement;

/// Identifier of one shielded pool instance (one asset on one chain).
///
/// Accounts, commitments and nullifiers are never compared across scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(pub FieldElement);

impl Scope {
    pub fn new(id: FieldElement) -> Self {
        Self(id)
    }

    /// Derive a scope from a human-readable pool name such as
    /// `0XBOW_ETH_ETHEREUM_POOL`: BLAKE3 of the label, reduced into the field.
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        Self(FieldElement::reduce_be_bytes(digest.as_bytes()))
    }

    pub fn as_field(&self) -> FieldElement {
        self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A published note commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub FieldElement);

impl Commitment {
    /// Parent value hashed into deposit commitments, which have no parent.
    pub const NONE: Commitment = Commitment(FieldElement::ZERO);

    pub fn as_field(&self) -> FieldElement {
        self.0
    }

    /// Hash-boundary form of an optional parent.
    pub fn or_none(parent: Option<Commitment>) -> FieldElement {
        parent.unwrap_or(Self::NONE).0
    }
}

impl From<FieldElement> for Commitment {
    fn from(fe: FieldElement) -> Self {
        Self(fe)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_stable_distinct_scopes() {
        let eth = Scope::from_label("0XBOW_ETH_ETHEREUM_POOL");
        assert_eq!(eth, Scope::from_label("0XBOW_ETH_ETHEREUM_POOL"));
        assert_ne!(eth, Scope::from_label("0XBOW_USDC_ETHEREUM_POOL"));
    }

    #[test]
    fn none_sentinel_is_zero() {
        assert!(Commitment::NONE.as_field().is_zero());
        assert_eq!(Commitment::or_none(None), FieldElement::zero());
        let c = Commitment(FieldElement::from(9u64));
        assert_eq!(Commitment::or_none(Some(c)), FieldElement::from(9u64));
    }

    #[test]
    fn commitment_serializes_as_bare_hex() {
        let c = Commitment(FieldElement::from(1u64));
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, format!("\"{}\"", FieldElement::from(1u64).to_hex()));
    }
}
