//! Withdrawal request and circuit input types.
//!
//! The JSON form of [`WithdrawalWitness`] is the flat input object the
//! withdrawal circuit expects:
//!
//! ```text
//! public:  root, nullifierHash, recipient, relayer, fee, refund,
//!          amountToWithdraw, newCommitment
//! private: committedAmount, depositAddress, nullifier, secret,
//!          newNullifier, newSecret, pathElements, pathIndices
//! ```

use std::fmt;

use ppool_common::{Amount, Commitment, FieldElement};
use ppool_ledger::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters of one withdrawal, supplied by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub amount: Amount,
    pub recipient: FieldElement,
    pub relayer: FieldElement,
    pub fee: Amount,
    pub refund: Amount,
    /// Spending material of the change note.
    pub new_nullifier: FieldElement,
    pub new_secret: FieldElement,
}

impl WithdrawalRequest {
    /// `amount + fee + refund`, the value leaving the note.
    pub fn total_debit(&self) -> Result<Amount> {
        self.amount
            .checked_add(self.fee)
            .and_then(|sum| sum.checked_add(self.refund))
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "amount {} + fee {} + refund {} overflows",
                    self.amount, self.fee, self.refund
                ))
            })
    }
}

impl fmt::Debug for WithdrawalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithdrawalRequest")
            .field("amount", &self.amount)
            .field("recipient", &self.recipient)
            .field("relayer", &self.relayer)
            .field("fee", &self.fee)
            .field("refund", &self.refund)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalPublicInputs {
    pub root: FieldElement,
    pub nullifier_hash: FieldElement,
    pub recipient: FieldElement,
    pub relayer: FieldElement,
    pub fee: Amount,
    pub refund: Amount,
    pub amount_to_withdraw: Amount,
    pub new_commitment: Commitment,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalPrivateInputs {
    pub committed_amount: Amount,
    pub deposit_address: FieldElement,
    pub nullifier: FieldElement,
    pub secret: FieldElement,
    pub new_nullifier: FieldElement,
    pub new_secret: FieldElement,
    pub path_elements: Vec<FieldElement>,
    pub path_indices: Vec<u8>,
}

impl fmt::Debug for WithdrawalPrivateInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithdrawalPrivateInputs")
            .field("committed_amount", &self.committed_amount)
            .field("deposit_address", &self.deposit_address)
            .field("depth", &self.path_elements.len())
            .finish_non_exhaustive()
    }
}

/// Complete input set for one withdrawal proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalWitness {
    #[serde(flatten)]
    pub public: WithdrawalPublicInputs,
    #[serde(flatten)]
    pub private: WithdrawalPrivateInputs,
}

impl WithdrawalWitness {
    /// Remaining value of the change note.
    pub fn change_amount(&self) -> Amount {
        self.private.committed_amount
            - self.public.amount_to_withdraw
            - self.public.fee
            - self.public.refund
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
