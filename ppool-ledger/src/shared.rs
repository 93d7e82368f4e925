//! Wallet shared across async tasks, serialized per scope.
//!
//! Each scope book sits behind its own mutex, so operations on different
//! scopes run in parallel while operations on one scope are strictly ordered.
//! Lock order is always `books` → scope book → `log`.

use std::collections::BTreeMap;
use std::sync::Arc;

use ppool_common::{Amount, Commitment, FieldElement, HashOracle, Scope};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::account::Account;
use crate::commitment::CommitmentScheme;
use crate::error::{Error, Result};
use crate::event::{DepositEvent, Event, RagequitEvent, WithdrawalEvent};
use crate::ledger::{LedgerState, NoteLedger, ScopeBook};
use crate::log::EventLog;
use crate::wallet::Wallet;

/// What to do when the target scope is not registered yet.
enum OnMissing {
    Register,
    Reject(Commitment),
}

pub struct SharedWallet<H> {
    scheme: CommitmentScheme<H>,
    books: RwLock<BTreeMap<Scope, Arc<Mutex<ScopeBook>>>>,
    log: Mutex<EventLog>,
}

impl<H: HashOracle + Clone + Send + Sync> SharedWallet<H> {
    pub fn new(oracle: H) -> Self {
        Self {
            scheme: CommitmentScheme::new(oracle),
            books: RwLock::new(BTreeMap::new()),
            log: Mutex::new(EventLog::new()),
        }
    }

    pub fn from_wallet(wallet: Wallet<H>) -> Self {
        let (ledger, log) = wallet.into_parts();
        let (scheme, state) = ledger.into_parts();
        let books = state
            .into_books()
            .map(|book| (book.scope(), Arc::new(Mutex::new(book))))
            .collect();
        Self {
            scheme,
            books: RwLock::new(books),
            log: Mutex::new(log),
        }
    }

    async fn book(&self, scope: &Scope) -> Option<Arc<Mutex<ScopeBook>>> {
        self.books.read().await.get(scope).cloned()
    }

    /// Run `op` against the scope's book while holding its lock, then log the
    /// event it produced.
    async fn mutate<T, F>(&self, scope: Scope, on_missing: OnMissing, op: F) -> Result<T>
    where
        F: FnOnce(&mut ScopeBook, &CommitmentScheme<H>) -> Result<(T, Event)>,
    {
        if let Some(book) = self.book(&scope).await {
            let mut guard = book.lock().await;
            let (out, event) = op(&mut *guard, &self.scheme)?;
            self.log.lock().await.append(event);
            return Ok(out);
        }
        if let OnMissing::Reject(initial_commitment) = on_missing {
            return Err(Error::UnknownAccount {
                scope,
                initial_commitment,
            });
        }

        let mut books = self.books.write().await;
        // registered by another task while we waited for the write lock
        if let Some(book) = books.get(&scope).cloned() {
            let mut guard = book.lock().await;
            let (out, event) = op(&mut *guard, &self.scheme)?;
            self.log.lock().await.append(event);
            return Ok(out);
        }
        let mut book = ScopeBook::new(scope);
        let (out, event) = op(&mut book, &self.scheme)?;
        books.insert(scope, Arc::new(Mutex::new(book)));
        debug!(%scope, "scope registered");
        self.log.lock().await.append(event);
        Ok(out)
    }

    pub async fn apply(&self, event: Event) -> Result<()> {
        let on_missing = match &event {
            Event::Deposit(_) => OnMissing::Register,
            Event::Withdrawal(e) => OnMissing::Reject(e.initial_commitment),
            Event::Ragequit(e) => OnMissing::Reject(e.initial_commitment),
        };
        self.mutate(event.scope(), on_missing, move |book, scheme| {
            book.apply_event(scheme, &event)?;
            Ok(((), event))
        })
        .await
    }

    pub async fn deposit(
        &self,
        scope: Scope,
        depositor: FieldElement,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
    ) -> Result<Commitment> {
        self.mutate(scope, OnMissing::Register, move |book, scheme| {
            let commitment = book.apply_deposit(scheme, depositor, amount, secret, nullifier)?;
            let event = Event::Deposit(DepositEvent {
                scope,
                depositor_address: depositor,
                amount,
                secret,
                nullifier,
            });
            Ok((commitment, event))
        })
        .await
    }

    pub async fn withdraw(
        &self,
        scope: Scope,
        initial_commitment: Commitment,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
    ) -> Result<Commitment> {
        let on_missing = OnMissing::Reject(initial_commitment);
        self.mutate(scope, on_missing, move |book, scheme| {
            // read and advance the chain under the same lock
            let parent = book
                .account(&initial_commitment)
                .and_then(|a| a.latest_commitment);
            let commitment = book.apply_withdrawal(
                scheme,
                initial_commitment,
                amount,
                secret,
                nullifier,
                parent,
            )?;
            let event = Event::Withdrawal(WithdrawalEvent {
                scope,
                initial_commitment,
                amount,
                secret,
                nullifier,
                parent,
            });
            Ok((commitment, event))
        })
        .await
    }

    pub async fn ragequit(
        &self,
        scope: Scope,
        initial_commitment: Commitment,
        amount: Amount,
    ) -> Result<()> {
        let on_missing = OnMissing::Reject(initial_commitment);
        self.mutate(scope, on_missing, move |book, _| {
            let parent = book
                .account(&initial_commitment)
                .and_then(|a| a.latest_commitment);
            book.apply_ragequit(initial_commitment, amount, parent)?;
            let event = Event::Ragequit(RagequitEvent {
                scope,
                initial_commitment,
                amount,
                parent,
            });
            Ok(((), event))
        })
        .await
    }

    /// Owned copy of one account; no lock is held once this returns.
    pub async fn account(&self, scope: &Scope, initial_commitment: &Commitment) -> Option<Account> {
        let book = self.book(scope).await?;
        let guard = book.lock().await;
        guard.account(initial_commitment).cloned()
    }

    /// Copy of every scope book, each taken under its own lock.
    pub async fn snapshot(&self) -> NoteLedger<H> {
        let books = self.books.read().await;
        let mut copies = Vec::with_capacity(books.len());
        for book in books.values() {
            copies.push(book.lock().await.clone());
        }
        let state: LedgerState = copies.into_iter().collect();
        NoteLedger::from_parts(self.scheme.clone(), state)
    }

    pub async fn export_history(&self) -> Vec<Event> {
        self.log.lock().await.export_history()
    }
}
