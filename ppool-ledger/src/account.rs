//! Account records: one deposit lineage inside one scope.

use std::fmt;

use ppool_common::{Amount, Commitment, FieldElement};
use serde::{Deserialize, Serialize};

use crate::commitment::NoteSecrets;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub amount: Amount,
    pub secret: FieldElement,
    pub nullifier: FieldElement,
    pub commitment: Commitment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub amount: Amount,
    pub secret: FieldElement,
    pub nullifier: FieldElement,
    pub commitment: Commitment,
    pub parent: Commitment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagequitRecord {
    pub amount: Amount,
    pub parent: Commitment,
}

/// Lifecycle position of an account. Derived from the record, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Funded,
    PartiallyWithdrawn,
    Exhausted,
    RagequitClosed,
}

impl AccountStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccountStatus::Exhausted | AccountStatus::RagequitClosed)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccountStatus::Funded => "funded",
            AccountStatus::PartiallyWithdrawn => "partially withdrawn",
            AccountStatus::Exhausted => "exhausted",
            AccountStatus::RagequitClosed => "ragequit",
        })
    }
}

/// The unspent note currently backing an open account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentNote {
    pub commitment: Commitment,
    pub amount: Amount,
    pub secrets: NoteSecrets,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub deposit_address: FieldElement,
    pub initial_commitment: Commitment,
    /// `None` once exhausted or ragequit.
    pub latest_commitment: Option<Commitment>,
    pub balance: Amount,
    pub deposit: DepositRecord,
    pub withdrawals: Vec<WithdrawalRecord>,
    pub ragequit: Option<RagequitRecord>,
}

impl Account {
    pub(crate) fn open(deposit_address: FieldElement, deposit: DepositRecord) -> Self {
        Self {
            deposit_address,
            initial_commitment: deposit.commitment,
            latest_commitment: Some(deposit.commitment),
            balance: deposit.amount,
            deposit,
            withdrawals: Vec::new(),
            ragequit: None,
        }
    }

    pub fn status(&self) -> AccountStatus {
        if self.ragequit.is_some() {
            AccountStatus::RagequitClosed
        } else if self.latest_commitment.is_none() {
            AccountStatus::Exhausted
        } else if self.withdrawals.is_empty() {
            AccountStatus::Funded
        } else {
            AccountStatus::PartiallyWithdrawn
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status().is_terminal()
    }

    /// Secrets of the note that `latest_commitment` names.
    fn latest_secrets(&self) -> NoteSecrets {
        match self.withdrawals.last() {
            Some(w) => NoteSecrets::new(w.nullifier, w.secret),
            None => NoteSecrets::new(self.deposit.nullifier, self.deposit.secret),
        }
    }

    pub fn current_note(&self) -> Option<CurrentNote> {
        let commitment = self.latest_commitment?;
        Some(CurrentNote {
            commitment,
            amount: self.balance,
            secrets: self.latest_secrets(),
        })
    }

    pub fn withdrawn_total(&self) -> Amount {
        self.withdrawals.iter().map(|w| w.amount).sum()
    }

    /// `balance == deposit - Σ withdrawals - ragequit`, with no underflow.
    pub fn balance_is_consistent(&self) -> bool {
        let ragequit = self.ragequit.as_ref().map_or(0, |r| r.amount);
        self.deposit
            .amount
            .checked_sub(self.withdrawn_total())
            .and_then(|rest| rest.checked_sub(ragequit))
            == Some(self.balance)
    }

    /// Every commitment this lineage has produced, oldest first.
    pub fn commitments(&self) -> impl Iterator<Item = Commitment> + '_ {
        std::iter::once(self.deposit.commitment).chain(self.withdrawals.iter().map(|w| w.commitment))
    }
}
