//! Single-owner wallet: a note ledger plus the log of events applied to it.

use ppool_common::{Amount, Commitment, FieldElement, HashOracle, Scope};
use tracing::info;

use crate::account::Account;
use crate::error::Result;
use crate::event::{DepositEvent, Event, RagequitEvent, WithdrawalEvent};
use crate::ledger::{LedgerState, NoteLedger};
use crate::log::{self, EventLog};

/// Invariant: replaying `log` onto an empty ledger reproduces `ledger`.
#[derive(Clone, Debug)]
pub struct Wallet<H> {
    ledger: NoteLedger<H>,
    log: EventLog,
}

impl<H: HashOracle + Clone> Wallet<H> {
    pub fn new(oracle: H) -> Self {
        Self {
            ledger: NoteLedger::new(oracle),
            log: EventLog::new(),
        }
    }

    /// A wallet with `scope` registered up front.
    pub fn with_scope(oracle: H, scope: Scope) -> Self {
        let mut wallet = Self::new(oracle);
        wallet.ledger.register_scope(scope);
        wallet
    }

    /// Build a wallet from scratch by replaying `events`.
    pub fn replay(oracle: H, events: &[Event]) -> Result<Self> {
        let mut wallet = Self::new(oracle);
        wallet.import_history(events)?;
        Ok(wallet)
    }

    pub fn from_json(oracle: H, json: &str) -> Result<Self> {
        let log = EventLog::from_json(json)?;
        Self::replay(oracle, log.events())
    }

    pub fn ledger(&self) -> &NoteLedger<H> {
        &self.ledger
    }

    pub fn state(&self) -> &LedgerState {
        self.ledger.state()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn into_parts(self) -> (NoteLedger<H>, EventLog) {
        (self.ledger, self.log)
    }

    pub fn account(&self, scope: &Scope, initial_commitment: &Commitment) -> Option<&Account> {
        self.ledger.account(scope, initial_commitment)
    }

    /// Apply `event` and record it. Nothing is logged when application fails.
    pub fn apply(&mut self, event: Event) -> Result<()> {
        self.ledger.apply_event(&event)?;
        self.log.append(event);
        Ok(())
    }

    pub fn deposit(
        &mut self,
        scope: Scope,
        depositor: FieldElement,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
    ) -> Result<Commitment> {
        let commitment = self
            .ledger
            .apply_deposit(scope, depositor, amount, secret, nullifier)?;
        self.log.append(Event::Deposit(DepositEvent {
            scope,
            depositor_address: depositor,
            amount,
            secret,
            nullifier,
        }));
        Ok(commitment)
    }

    /// Spend `amount` from the account's current note into a change note
    /// bound to `secret`/`nullifier`. The recorded event pins the parent.
    pub fn withdraw(
        &mut self,
        scope: Scope,
        initial_commitment: Commitment,
        amount: Amount,
        secret: FieldElement,
        nullifier: FieldElement,
    ) -> Result<Commitment> {
        let parent = self.current_parent(scope, initial_commitment);
        let commitment = self.ledger.apply_withdrawal(
            scope,
            initial_commitment,
            amount,
            secret,
            nullifier,
            parent,
        )?;
        self.log.append(Event::Withdrawal(WithdrawalEvent {
            scope,
            initial_commitment,
            amount,
            secret,
            nullifier,
            parent,
        }));
        Ok(commitment)
    }

    pub fn ragequit(
        &mut self,
        scope: Scope,
        initial_commitment: Commitment,
        amount: Amount,
    ) -> Result<()> {
        let parent = self.current_parent(scope, initial_commitment);
        self.ledger
            .apply_ragequit(scope, initial_commitment, amount, parent)?;
        self.log.append(Event::Ragequit(RagequitEvent {
            scope,
            initial_commitment,
            amount,
            parent,
        }));
        Ok(())
    }

    fn current_parent(&self, scope: Scope, initial_commitment: Commitment) -> Option<Commitment> {
        self.ledger
            .account(&scope, &initial_commitment)
            .and_then(|a| a.latest_commitment)
    }

    /// Replay `events` on top of the current state.
    ///
    /// All-or-nothing: the events are applied to a copy, which replaces this
    /// wallet only if every event succeeds.
    pub fn import_history(&mut self, events: &[Event]) -> Result<()> {
        let mut working = self.ledger.clone();
        log::replay(&mut working, events)?;
        self.ledger = working;
        for event in events {
            self.log.append(event.clone());
        }
        info!(imported = events.len(), total = self.log.len(), "history imported");
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let log = EventLog::from_json(json)?;
        self.import_history(log.events())
    }

    pub fn export_history(&self) -> Vec<Event> {
        self.log.export_history()
    }

    pub fn export_json(&self) -> Result<String> {
        self.log.to_json()
    }
}
