//! Proving backend seam and the on-chain withdrawal proof encoding.

use anyhow::Result;
use async_trait::async_trait;
use ppool_common::{FieldElement, ProofWord};
use serde::{Deserialize, Serialize};

use crate::inputs::{WithdrawalPrivateInputs, WithdrawalPublicInputs};

/// Number of 32-byte words in [`WithdrawalProof::to_bytes`].
pub const PROOF_WORDS: usize = 10;

/// Groth16 proof points as returned by the prover, coordinates unswapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub pi_a: [ProofWord; 2],
    pub pi_b: [[ProofWord; 2]; 2],
    pub pi_c: [ProofWord; 2],
}

/// External prover. Failures are surfaced to the caller unchanged.
#[async_trait]
pub trait ProvingBackend: Send + Sync {
    async fn prove(
        &self,
        public: &WithdrawalPublicInputs,
        private: &WithdrawalPrivateInputs,
    ) -> Result<ProofArtifact>;
}

/// `(pA, pB, pC, root, nullifierHash)` in the layout the pool verifier
/// contract takes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalProof {
    pub p_a: [ProofWord; 2],
    /// Already swapped: `[[b01, b00], [b11, b10]]`.
    pub p_b: [[ProofWord; 2]; 2],
    pub p_c: [ProofWord; 2],
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
}

impl WithdrawalProof {
    /// The pairing precompile expects each G2 coordinate as (imaginary, real),
    /// the reverse of the prover's order.
    pub fn from_artifact(
        artifact: &ProofArtifact,
        root: FieldElement,
        nullifier_hash: FieldElement,
    ) -> Self {
        let [[b00, b01], [b10, b11]] = artifact.pi_b;
        Self {
            p_a: artifact.pi_a,
            p_b: [[b01, b00], [b11, b10]],
            p_c: artifact.pi_c,
            root,
            nullifier_hash,
        }
    }

    pub fn words(&self) -> [[u8; 32]; PROOF_WORDS] {
        let [a0, a1] = self.p_a;
        let [[b00, b01], [b10, b11]] = self.p_b;
        let [c0, c1] = self.p_c;
        [
            a0.0,
            a1.0,
            b00.0,
            b01.0,
            b10.0,
            b11.0,
            c0.0,
            c1.0,
            self.root.to_be_bytes(),
            self.nullifier_hash.to_be_bytes(),
        ]
    }

    /// Fixed-width ABI encoding: ten big-endian 32-byte words.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words().concat()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}
