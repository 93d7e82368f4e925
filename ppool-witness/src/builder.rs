//! Withdrawal witness assembly.
//!
//! The builder only reads the account it is given. Both external calls
//! (Merkle source and prover) happen before any ledger mutation the caller
//! may perform afterwards, so a slow or failed call leaves the ledger as is.

use ppool_common::{FieldElement, HashOracle, Scope};
use ppool_ledger::{Account, CommitmentScheme, Error, ExternalService, Result};
use tracing::{debug, info, warn};

use crate::inputs::{
    WithdrawalPrivateInputs, WithdrawalPublicInputs, WithdrawalRequest, WithdrawalWitness,
};
use crate::merkle::{MerkleProofSource, DEFAULT_TREE_DEPTH};
use crate::proof::{ProvingBackend, WithdrawalProof};

pub struct WitnessBuilder<H, M, P> {
    scheme: CommitmentScheme<H>,
    merkle: M,
    prover: P,
    tree_depth: usize,
}

impl<H, M, P> WitnessBuilder<H, M, P>
where
    H: HashOracle + Send + Sync,
    M: MerkleProofSource,
{
    pub fn new(oracle: H, merkle: M, prover: P) -> Self {
        Self {
            scheme: CommitmentScheme::new(oracle),
            merkle,
            prover,
            tree_depth: DEFAULT_TREE_DEPTH,
        }
    }

    /// Expected length of Merkle paths returned by the source.
    pub fn with_tree_depth(mut self, depth: usize) -> Self {
        self.tree_depth = depth;
        self
    }

    pub fn scheme(&self) -> &CommitmentScheme<H> {
        &self.scheme
    }

    /// Assemble the public and private inputs for spending the account's
    /// current note. `leaves` is every commitment in the scope's public tree.
    pub async fn build(
        &self,
        scope: Scope,
        account: &Account,
        request: &WithdrawalRequest,
        leaves: &[FieldElement],
    ) -> Result<WithdrawalWitness> {
        let note = account.current_note().ok_or(Error::AccountClosed {
            initial_commitment: account.initial_commitment,
            status: account.status(),
        })?;
        let debit = request.total_debit()?;
        let remaining = note
            .amount
            .checked_sub(debit)
            .ok_or(Error::InsufficientBalance {
                requested: debit,
                available: note.amount,
            })?;

        let nullifier_hash = self.scheme.nullifier_hash(note.secrets.nullifier)?;

        debug!(%scope, leaf = %note.commitment, leaves = leaves.len(), "requesting merkle proof");
        let path = self
            .merkle
            .proof(leaves, note.commitment.as_field())
            .await
            .map_err(|e| {
                warn!(%scope, error = %e, "merkle proof source failed");
                Error::external(ExternalService::MerkleProof, format!("{:#}", e))
            })?;
        if !path.is_well_formed() || path.depth() != self.tree_depth {
            return Err(Error::external(
                ExternalService::MerkleProof,
                format!(
                    "expected a path of depth {}, got {} elements and {} indices",
                    self.tree_depth,
                    path.path_elements.len(),
                    path.path_indices.len()
                ),
            ));
        }

        let new_commitment = self.scheme.commit(
            scope,
            account.deposit_address,
            remaining,
            Some(note.commitment),
            request.new_nullifier,
            request.new_secret,
        )?;

        info!(
            %scope,
            account = %account.initial_commitment,
            amount = request.amount,
            remaining,
            %new_commitment,
            "withdrawal witness built"
        );

        Ok(WithdrawalWitness {
            public: WithdrawalPublicInputs {
                root: path.root,
                nullifier_hash,
                recipient: request.recipient,
                relayer: request.relayer,
                fee: request.fee,
                refund: request.refund,
                amount_to_withdraw: request.amount,
                new_commitment,
            },
            private: WithdrawalPrivateInputs {
                committed_amount: note.amount,
                deposit_address: account.deposit_address,
                nullifier: note.secrets.nullifier,
                secret: note.secrets.secret,
                new_nullifier: request.new_nullifier,
                new_secret: request.new_secret,
                path_elements: path.path_elements,
                path_indices: path.path_indices,
            },
        })
    }
}

impl<H, M, P> WitnessBuilder<H, M, P>
where
    H: HashOracle + Send + Sync,
    M: MerkleProofSource,
    P: ProvingBackend,
{
    /// Hand the witness to the proving backend. No retries.
    pub async fn prove(&self, witness: &WithdrawalWitness) -> Result<WithdrawalProof> {
        let artifact = self
            .prover
            .prove(&witness.public, &witness.private)
            .await
            .map_err(|e| {
                warn!(error = %e, "proving backend failed");
                Error::external(ExternalService::Prover, format!("{:#}", e))
            })?;
        Ok(WithdrawalProof::from_artifact(
            &artifact,
            witness.public.root,
            witness.public.nullifier_hash,
        ))
    }

    pub async fn build_and_prove(
        &self,
        scope: Scope,
        account: &Account,
        request: &WithdrawalRequest,
        leaves: &[FieldElement],
    ) -> Result<(WithdrawalWitness, WithdrawalProof)> {
        let witness = self.build(scope, account, request, leaves).await?;
        let proof = self.prove(&witness).await?;
        Ok((witness, proof))
    }
}
