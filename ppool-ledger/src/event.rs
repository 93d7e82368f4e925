//! Replayable ledger events.
//!
//! Each event carries every input needed to reproduce its mutation, including
//! the secrets and nullifiers, so replay never re-randomizes anything.
//!
//! Wire form (one element of the exported history array):
//! ```json
//! { "type": "deposit", "scope": "0x..", "depositorAddress": "0x..",
//!   "amount": 100, "secret": "0x..", "nullifier": "0x.." }
//! ```

use std::fmt;

use ppool_common::{Amount, Commitment, FieldElement, Scope};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositEvent {
    pub scope: Scope,
    pub depositor_address: FieldElement,
    pub amount: Amount,
    pub secret: FieldElement,
    pub nullifier: FieldElement,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    pub scope: Scope,
    pub initial_commitment: Commitment,
    pub amount: Amount,
    /// Secret of the change note.
    pub secret: FieldElement,
    /// Nullifier of the change note.
    pub nullifier: FieldElement,
    /// Expected `latestCommitment` at application time. Checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Commitment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagequitEvent {
    pub scope: Scope,
    pub initial_commitment: Commitment,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Commitment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    Ragequit(RagequitEvent),
}

/// Discriminator of an [`Event`], for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Deposit,
    Withdrawal,
    Ragequit,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Deposit => "deposit",
            EventKind::Withdrawal => "withdrawal",
            EventKind::Ragequit => "ragequit",
        })
    }
}

impl Event {
    pub fn scope(&self) -> Scope {
        match self {
            Event::Deposit(e) => e.scope,
            Event::Withdrawal(e) => e.scope,
            Event::Ragequit(e) => e.scope,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Deposit(_) => EventKind::Deposit,
            Event::Withdrawal(_) => EventKind::Withdrawal,
            Event::Ragequit(_) => EventKind::Ragequit,
        }
    }
}

impl From<DepositEvent> for Event {
    fn from(e: DepositEvent) -> Self {
        Event::Deposit(e)
    }
}

impl From<WithdrawalEvent> for Event {
    fn from(e: WithdrawalEvent) -> Self {
        Event::Withdrawal(e)
    }
}

impl From<RagequitEvent> for Event {
    fn from(e: RagequitEvent) -> Self {
        Event::Ragequit(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    #[test]
    fn deposit_wire_shape() {
        let event = Event::Deposit(DepositEvent {
            scope: Scope::new(fe(7)),
            depositor_address: fe(0xa),
            amount: 100,
            secret: fe(1),
            nullifier: fe(2),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "deposit");
        assert_eq!(value["amount"], 100);
        assert_eq!(value["depositorAddress"], json!(fe(0xa).to_hex()));
        assert_eq!(value["scope"], json!(fe(7).to_hex()));

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn parent_is_optional_on_the_wire() {
        let value = json!({
            "type": "ragequit",
            "scope": fe(7).to_hex(),
            "initialCommitment": fe(9).to_hex(),
            "amount": 60
        });
        let event: Event = serde_json::from_value(value).unwrap();
        match event {
            Event::Ragequit(r) => assert_eq!(r.parent, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let value = json!({ "type": "mint", "scope": fe(7).to_hex() });
        assert!(serde_json::from_value::<Event>(value).is_err());
    }

    #[test]
    fn short_hex_is_rejected() {
        let value = json!({
            "type": "ragequit",
            "scope": "0x07",
            "initialCommitment": fe(9).to_hex(),
            "amount": 60
        });
        assert!(serde_json::from_value::<Event>(value).is_err());
    }

    #[test]
    fn kind_and_scope() {
        let event = Event::from(RagequitEvent {
            scope: Scope::new(fe(3)),
            initial_commitment: Commitment(fe(4)),
            amount: 1,
            parent: None,
        });
        assert_eq!(event.kind(), EventKind::Ragequit);
        assert_eq!(event.kind().to_string(), "ragequit");
        assert_eq!(event.scope(), Scope::new(fe(3)));
    }
}
