// ppool/ppool-witness/src/lib.rs

//! Withdrawal witness pipeline.
//!
//! Turns a ledger [`Account`](ppool_ledger::Account) and a
//! [`WithdrawalRequest`] into the circuit inputs for a withdrawal proof, asks
//! an external [`ProvingBackend`] for the proof, and encodes the result for the
//! on-chain verifier. Merkle paths come from a [`MerkleProofSource`];
//! [`LocalMerkleTree`] computes them in memory.

pub mod builder;
pub mod inputs;
pub mod merkle;
pub mod proof;

pub use builder::WitnessBuilder;
pub use inputs::{
    WithdrawalPrivateInputs, WithdrawalPublicInputs, WithdrawalRequest, WithdrawalWitness,
};
pub use merkle::{LocalMerkleTree, MerkleProof, MerkleProofSource, DEFAULT_TREE_DEPTH};
pub use proof::{ProofArtifact, ProvingBackend, WithdrawalProof, PROOF_WORDS};
