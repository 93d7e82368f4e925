//! Privacy-pool note ledger
//!
//! Tracks deposit lineages ("accounts") per pool scope and records every
//! mutation as a replayable event:
//!
//! ```text
//! deposit     c0 = H(scope, depositor, amount, 0,  H(n0, s0))      Funded
//! withdrawal  c1 = H(scope, depositor, amount, c0, H(n1, s1))      PartiallyWithdrawn
//! ...         balance == 0                                          Exhausted
//! ragequit    full remaining balance, no new note                   RagequitClosed
//! ```
//!
//! # Layers
//!
//! - [`CommitmentScheme`]: commitment and nullifier-hash derivation over an
//!   injected [`HashOracle`](ppool_common::HashOracle).
//! - [`NoteLedger`]: per-scope [`ScopeBook`]s enforcing balance, parent-chain
//!   and anti-double-spend invariants. Scope is always an explicit argument.
//! - [`EventLog`] and [`replay`]: ordered history with JSON export.
//! - [`Wallet`]: ledger + log for a single owner; [`SharedWallet`]: the same
//!   behind per-scope async locks.

pub mod account;
pub mod commitment;
pub mod error;
pub mod event;
pub mod ledger;
pub mod log;
pub mod shared;
pub mod wallet;

pub use account::{
    Account, AccountStatus, CurrentNote, DepositRecord, RagequitRecord, WithdrawalRecord,
};
pub use commitment::{CommitmentScheme, NoteSecrets};
pub use error::{Error, ExternalService, Result};
pub use event::{DepositEvent, Event, EventKind, RagequitEvent, WithdrawalEvent};
pub use ledger::{LedgerState, NoteLedger, ScopeBook};
pub use log::{replay, EventLog};
pub use shared::SharedWallet;
pub use wallet::Wallet;
