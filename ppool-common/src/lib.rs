//! Shared primitives for the privacy-pool client.
//!
//! Everything that crosses the cryptographic boundary is a [`FieldElement`]
//! (a BN256 scalar). Amounts and addresses stay as application integers until
//! they are hashed. Hashing is a capability injected through [`HashOracle`] so
//! that ledger logic never depends on a concrete primitive.

mod field;
mod hash;
mod scope;

pub use field::{FieldElement, FieldParseError, ProofWord};
pub use hash::{HashError, HashOracle, PoseidonOracle, MAX_POSEIDON_ARITY};
pub use scope::{Commitment, Scope};

/// Application-level amount (smallest unit of the pooled asset).
pub type Amount = u64;
