//! Append-only event log with JSON export and position-aware replay.

use ppool_common::HashOracle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::ledger::NoteLedger;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: Event) {
        debug!(position = self.events.len(), kind = %event.kind(), scope = %event.scope(), "event appended");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The full ordered history.
    pub fn export_history(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }

    /// Parse an exported history. Each element is decoded on its own so the
    /// failing position can be reported.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<Value> = serde_json::from_str(json).map_err(|e| Error::MalformedEvent {
            position: 0,
            reason: format!("history is not a JSON array of events: {}", e),
        })?;
        let events = raw
            .into_iter()
            .enumerate()
            .map(|(position, value)| {
                serde_json::from_value(value).map_err(|e| Error::MalformedEvent {
                    position,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<Event>>>()?;
        Ok(Self { events })
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

/// Apply `events` in order, stopping at the first failure.
///
/// The ledger is left with every event before the failing one applied; callers
/// that need all-or-nothing semantics replay onto a copy.
pub fn replay<H: HashOracle>(ledger: &mut NoteLedger<H>, events: &[Event]) -> Result<()> {
    for (position, event) in events.iter().enumerate() {
        ledger.apply_event(event).map_err(|source| {
            warn!(position, kind = %event.kind(), error = %source, "replay aborted");
            Error::Replay {
                position,
                source: Box::new(source),
            }
        })?;
    }
    debug!(events = events.len(), "replay complete");
    Ok(())
}
