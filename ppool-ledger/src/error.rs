//! Error types for ledger, replay and witness operations.

use std::fmt;

use ppool_common::{Amount, Commitment, HashError, Scope};
use thiserror::Error;

use crate::account::AccountStatus;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// External collaborator whose failure is being surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalService {
    Hash,
    MerkleProof,
    Prover,
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExternalService::Hash => "hash oracle",
            ExternalService::MerkleProof => "merkle proof source",
            ExternalService::Prover => "proving backend",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Commitment collision: broken randomness or identical inputs replayed.
    #[error("commitment {commitment} already exists in scope {scope}")]
    DuplicateCommitment { scope: Scope, commitment: Commitment },

    #[error("no account with initial commitment {initial_commitment} in scope {scope}")]
    UnknownAccount {
        scope: Scope,
        initial_commitment: Commitment,
    },

    #[error("account {initial_commitment} is closed ({status})")]
    AccountClosed {
        initial_commitment: Commitment,
        status: AccountStatus,
    },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("operation for scope {got} dispatched to scope {expected}")]
    ScopeMismatch { expected: Scope, got: Scope },

    #[error("malformed event at position {position}: {reason}")]
    MalformedEvent { position: usize, reason: String },

    /// The value itself is never printed; nullifiers are spending secrets.
    #[error("nullifier already used in scope {scope}")]
    NullifierReused { scope: Scope },

    #[error("parent {got} does not match the account's latest commitment {expected:?}")]
    StaleParent {
        expected: Option<Commitment>,
        got: Commitment,
    },

    #[error("{service} failed: {message}")]
    ExternalFailure {
        service: ExternalService,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("replay aborted at event {position}: {source}")]
    Replay {
        position: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn external(service: ExternalService, message: impl fmt::Display) -> Self {
        Error::ExternalFailure {
            service,
            message: message.to_string(),
        }
    }

    /// Get a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::DuplicateCommitment { .. } => "DUPLICATE_COMMITMENT",
            Error::UnknownAccount { .. } => "UNKNOWN_ACCOUNT",
            Error::AccountClosed { .. } => "ACCOUNT_CLOSED",
            Error::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Error::InvalidAmount(_) => "INVALID_AMOUNT",
            Error::ScopeMismatch { .. } => "SCOPE_MISMATCH",
            Error::MalformedEvent { .. } => "MALFORMED_EVENT",
            Error::NullifierReused { .. } => "NULLIFIER_REUSED",
            Error::StaleParent { .. } => "STALE_PARENT",
            Error::ExternalFailure { .. } => "EXTERNAL_FAILURE",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Replay { .. } => "REPLAY_FAILED",
        }
    }

    /// The underlying error, looking through replay wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Replay { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<HashError> for Error {
    fn from(err: HashError) -> Self {
        Error::external(ExternalService::Hash, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
