//! Note commitment and nullifier-hash derivation.
//!
//! ```text
//! inner      = H(nullifier, secret)
//! commitment = H(scope, depositor, amount, parent | 0, inner)
//! nf_hash    = H(nullifier)
//! ```
//!
//! `inner` binds the spending secret independently of amount and parent, so a
//! prover can show knowledge of it without revealing either half.

use std::fmt;

use ppool_common::{Amount, Commitment, FieldElement, HashOracle, Scope};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Spending material of one note. Generated by the caller, never here.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSecrets {
    pub nullifier: FieldElement,
    pub secret: FieldElement,
}

impl NoteSecrets {
    pub fn new(nullifier: FieldElement, secret: FieldElement) -> Self {
        Self { nullifier, secret }
    }
}

impl fmt::Debug for NoteSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoteSecrets { .. }")
    }
}

#[derive(Clone, Debug)]
pub struct CommitmentScheme<H> {
    oracle: H,
}

impl<H: HashOracle> CommitmentScheme<H> {
    pub fn new(oracle: H) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &H {
        &self.oracle
    }

    /// `H(nullifier, secret)`
    pub fn precommitment(&self, nullifier: FieldElement, secret: FieldElement) -> Result<FieldElement> {
        Ok(self.oracle.hash(&[nullifier, secret])?)
    }

    pub fn commit(
        &self,
        scope: Scope,
        depositor: FieldElement,
        amount: Amount,
        parent: Option<Commitment>,
        nullifier: FieldElement,
        secret: FieldElement,
    ) -> Result<Commitment> {
        let inner = self.precommitment(nullifier, secret)?;
        let commitment = self.oracle.hash(&[
            scope.as_field(),
            depositor,
            FieldElement::from(amount),
            Commitment::or_none(parent),
            inner,
        ])?;
        Ok(Commitment(commitment))
    }

    /// Public hash revealed when a note is spent.
    pub fn nullifier_hash(&self, nullifier: FieldElement) -> Result<FieldElement> {
        Ok(self.oracle.hash(&[nullifier])?)
    }
}
