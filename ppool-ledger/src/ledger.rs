//! Per-scope account books and the multi-scope note ledger.
//!
//! Every mutation validates fully before touching state: a failed call leaves
//! the book exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use ppool_common::{Amount, Commitment, FieldElement, HashOracle, Scope};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::account::{Account, DepositRecord, RagequitRecord, WithdrawalRecord};
use crate::commitment::CommitmentScheme;
use crate::error::{Error, Result};
use crate::event::Event;

/// Accounts of one scope plus the scope-wide uniqueness indexes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBook {
    scope: Scope,
    accounts: BTreeMap<Commitment, Account>,
    /// Every commitment ever produced in this scope.
    commitments: BTreeSet<Commitment>,
    /// The same commitments in insertion order (public tree leaf order).
    leaves: Vec<Commitment>,
    /// Nullifiers bound to a note (deposit or change note).
    note_nullifiers: BTreeSet<FieldElement>,
    /// Nullifiers whose note has been consumed.
    spent_nullifiers: BTreeSet<FieldElement>,
}

impl ScopeBook {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            accounts: BTreeMap::new(),
            commitments: BTreeSet::new(),
            leaves: Vec::new(),
            note_nullifiers: BTreeSet::new(),
            spent_nullifiers: BTreeSet::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn account(&self, initial_commitment: &Commitment) -> Option<&Account> {
        self.accounts.get(initial_commitment)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn contains_commitment(&self, commitment: &Commitment) -> bool {
        self.commitments.contains(commitment)
    }

    /// All commitments in the scope, in key order.
    pub fn commitments(&self) -> impl Iterator<Item = &Commitment> {
        self.commitments.iter()
    }

    /// Commitments in the order they were produced.
    pub fn leaves(&self) -> &[Commitment] {
        &self.leaves
    }

    pub fn is_spent(&self, nullifier: &FieldElement) -> bool {
        self.spent_nullifiers.contains(nullifier)
    }

    fn open_account(&self, initial_commitment: Commitment) -> Result<&Account> {
        let account = self
            .accounts
            .get(&initial_commitment)
            .ok_or(Error::UnknownAccount {
                scope: self.scope,
                initial_commitment,
            })?;
        if account.is_closed() {
            return Err(Error::AccountClosed {
                initial_commitment,
                status: account.status(),
            });
        }
        Ok(account)
    }

    fn check_parent(account: &Account, parent: Option<Commitment>) -> Result<()> {
        match parent {
            Some(got) if Some(got) != account.latest_commitment => Err(Error::StaleParent {
                expected: account.latest_commitment,
                got,
            }),
            _ => Ok(()),
        }
    }

    /// Nullifier of the note an open account would consume next.
    fn spendable_nullifier(&self, account: &Account) -> Result<FieldElement> {
        let nullifier = account
            .current_note()
            .map(|note| note.secrets.nullifier)
            .unwrap_or(account.deposit.nullifier);
        if self.spent_nullifiers.contains(&nullifier) {
            return Err(Error::NullifierReused { scope: self.scope });
        }
        Ok(nullifier)
    }

    pub fn apply_deposit<H: HashOracle>(
        &mut self,
        scheme: &CommitmentScheme<H>,
        depositor: FieldElement,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
    ) -> Result<Commitment> {
        let commitment = scheme.commit(self.scope, depositor, amount, None, nullifier, secret)?;
        if self.commitments.contains(&commitment) {
            return Err(Error::DuplicateCommitment {
                scope: self.scope,
                commitment,
            });
        }
        if self.note_nullifiers.contains(&nullifier) {
            return Err(Error::NullifierReused { scope: self.scope });
        }

        let record = DepositRecord {
            amount,
            secret,
            nullifier,
            commitment,
        };
        self.accounts.insert(commitment, Account::open(depositor, record));
        self.commitments.insert(commitment);
        self.leaves.push(commitment);
        self.note_nullifiers.insert(nullifier);

        info!(scope = %self.scope, %commitment, amount, "deposit applied");
        Ok(commitment)
    }

    pub fn apply_withdrawal<H: HashOracle>(
        &mut self,
        scheme: &CommitmentScheme<H>,
        initial_commitment: Commitment,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
        parent: Option<Commitment>,
    ) -> Result<Commitment> {
        let account = self.open_account(initial_commitment)?;
        Self::check_parent(account, parent)?;
        if amount > account.balance {
            return Err(Error::InsufficientBalance {
                requested: amount,
                available: account.balance,
            });
        }
        let latest = account.latest_commitment;
        let new_commitment = scheme.commit(
            self.scope,
            account.deposit_address,
            amount,
            latest,
            nullifier,
            secret,
        )?;
        if self.commitments.contains(&new_commitment) {
            return Err(Error::DuplicateCommitment {
                scope: self.scope,
                commitment: new_commitment,
            });
        }
        if self.note_nullifiers.contains(&nullifier) {
            return Err(Error::NullifierReused { scope: self.scope });
        }
        let spent = self.spendable_nullifier(account)?;

        let scope = self.scope;
        let account = self
            .accounts
            .get_mut(&initial_commitment)
            .ok_or(Error::UnknownAccount {
                scope,
                initial_commitment,
            })?;
        account.withdrawals.push(WithdrawalRecord {
            amount,
            secret,
            nullifier,
            commitment: new_commitment,
            parent: latest.unwrap_or(Commitment::NONE),
        });
        account.balance -= amount;
        account.latest_commitment = (account.balance > 0).then_some(new_commitment);
        let balance = account.balance;

        self.commitments.insert(new_commitment);
        self.leaves.push(new_commitment);
        self.note_nullifiers.insert(nullifier);
        self.spent_nullifiers.insert(spent);

        info!(%scope, %initial_commitment, %new_commitment, amount, balance, "withdrawal applied");
        if balance == 0 {
            debug!(%scope, %initial_commitment, "account exhausted");
        }
        Ok(new_commitment)
    }

    pub fn apply_ragequit(
        &mut self,
        initial_commitment: Commitment,
        amount: Amount,
        parent: Option<Commitment>,
    ) -> Result<()> {
        let account = self.open_account(initial_commitment)?;
        Self::check_parent(account, parent)?;
        if amount != account.balance {
            return Err(Error::InvalidAmount(format!(
                "ragequit must exit the full balance {}, got {}",
                account.balance, amount
            )));
        }
        let latest = account.latest_commitment.unwrap_or(Commitment::NONE);
        let spent = self.spendable_nullifier(account)?;

        let scope = self.scope;
        let account = self
            .accounts
            .get_mut(&initial_commitment)
            .ok_or(Error::UnknownAccount {
                scope,
                initial_commitment,
            })?;
        account.ragequit = Some(RagequitRecord {
            amount,
            parent: latest,
        });
        account.balance = 0;
        account.latest_commitment = None;
        self.spent_nullifiers.insert(spent);

        info!(%scope, %initial_commitment, amount, "ragequit applied");
        Ok(())
    }

    /// Dispatch an event to the matching mutation. The event must belong to
    /// this book's scope.
    pub fn apply_event<H: HashOracle>(
        &mut self,
        scheme: &CommitmentScheme<H>,
        event: &Event,
    ) -> Result<()> {
        if event.scope() != self.scope {
            return Err(Error::ScopeMismatch {
                expected: self.scope,
                got: event.scope(),
            });
        }
        match event {
            Event::Deposit(e) => self
                .apply_deposit(scheme, e.depositor_address, e.amount, e.secret, e.nullifier)
                .map(|_| ()),
            Event::Withdrawal(e) => self
                .apply_withdrawal(
                    scheme,
                    e.initial_commitment,
                    e.amount,
                    e.secret,
                    e.nullifier,
                    e.parent,
                )
                .map(|_| ()),
            Event::Ragequit(e) => self.apply_ragequit(e.initial_commitment, e.amount, e.parent),
        }
    }
}

/// All scope books, keyed by scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerState {
    books: BTreeMap<Scope, ScopeBook>,
}

impl LedgerState {
    pub fn book(&self, scope: &Scope) -> Option<&ScopeBook> {
        self.books.get(scope)
    }

    pub fn books(&self) -> impl Iterator<Item = &ScopeBook> {
        self.books.values()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.books.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn into_books(self) -> impl Iterator<Item = ScopeBook> {
        self.books.into_values()
    }
}

impl FromIterator<ScopeBook> for LedgerState {
    fn from_iter<I: IntoIterator<Item = ScopeBook>>(iter: I) -> Self {
        Self {
            books: iter.into_iter().map(|b| (b.scope(), b)).collect(),
        }
    }
}

/// Ledger over every tracked scope. Scope is always an explicit argument.
#[derive(Clone, Debug)]
pub struct NoteLedger<H> {
    scheme: CommitmentScheme<H>,
    state: LedgerState,
}

impl<H: HashOracle> NoteLedger<H> {
    pub fn new(oracle: H) -> Self {
        Self {
            scheme: CommitmentScheme::new(oracle),
            state: LedgerState::default(),
        }
    }

    pub fn from_parts(scheme: CommitmentScheme<H>, state: LedgerState) -> Self {
        Self { scheme, state }
    }

    pub fn scheme(&self) -> &CommitmentScheme<H> {
        &self.scheme
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_parts(self) -> (CommitmentScheme<H>, LedgerState) {
        (self.scheme, self.state)
    }

    pub fn register_scope(&mut self, scope: Scope) -> &ScopeBook {
        self.state.books.entry(scope).or_insert_with(|| {
            debug!(%scope, "scope registered");
            ScopeBook::new(scope)
        })
    }

    pub fn book(&self, scope: &Scope) -> Option<&ScopeBook> {
        self.state.books.get(scope)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.state.scopes()
    }

    pub fn account(&self, scope: &Scope, initial_commitment: &Commitment) -> Option<&Account> {
        self.book(scope)?.account(initial_commitment)
    }

    fn book_mut(&mut self, scope: Scope, initial_commitment: Commitment) -> Result<&mut ScopeBook> {
        self.state
            .books
            .get_mut(&scope)
            .ok_or(Error::UnknownAccount {
                scope,
                initial_commitment,
            })
    }

    /// Registers `scope` if needed. A failed deposit into a new scope leaves
    /// it unregistered.
    pub fn apply_deposit(
        &mut self,
        scope: Scope,
        depositor: FieldElement,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
    ) -> Result<Commitment> {
        match self.state.books.get_mut(&scope) {
            Some(book) => book.apply_deposit(&self.scheme, depositor, amount, secret, nullifier),
            None => {
                let mut book = ScopeBook::new(scope);
                let commitment =
                    book.apply_deposit(&self.scheme, depositor, amount, secret, nullifier)?;
                debug!(%scope, "scope registered");
                self.state.books.insert(scope, book);
                Ok(commitment)
            }
        }
    }

    pub fn apply_withdrawal(
        &mut self,
        scope: Scope,
        initial_commitment: Commitment,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
        parent: Option<Commitment>,
    ) -> Result<Commitment> {
        let scheme = &self.scheme;
        let book = self
            .state
            .books
            .get_mut(&scope)
            .ok_or(Error::UnknownAccount {
                scope,
                initial_commitment,
            })?;
        book.apply_withdrawal(scheme, initial_commitment, amount, secret, nullifier, parent)
    }

    pub fn apply_ragequit(
        &mut self,
        scope: Scope,
        initial_commitment: Commitment,
        amount: Amount,
        parent: Option<Commitment>,
    ) -> Result<()> {
        self.book_mut(scope, initial_commitment)?
            .apply_ragequit(initial_commitment, amount, parent)
    }

    pub fn apply_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Deposit(e) => self
                .apply_deposit(e.scope, e.depositor_address, e.amount, e.secret, e.nullifier)
                .map(|_| ()),
            Event::Withdrawal(e) => self
                .apply_withdrawal(
                    e.scope,
                    e.initial_commitment,
                    e.amount,
                    e.secret,
                    e.nullifier,
                    e.parent,
                )
                .map(|_| ()),
            Event::Ragequit(e) => {
                self.apply_ragequit(e.scope, e.initial_commitment, e.amount, e.parent)
            }
        }
    }
}
