// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Change-set notifications broadcast to observers.

use tokio::sync::broadcast;

use crate::operation::OpResult;
use crate::record::RecordSummary;

/// Default broadcast capacity. Slow receivers observe `Lagged` rather than
/// blocking the engine.
pub const EVENT_CAPACITY: usize = 256;

/// Something observable happened to the change set.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSetEvent {
    /// A record was added, removed or completed.
    ChangeSetModified,
    /// A record was dispatched to the backend.
    Commit {
        /// The dispatched record.
        record: RecordSummary,
    },
    /// The backend answered for a record. Sent before the user callback runs.
    TaskComplete {
        /// The completed record.
        record: RecordSummary,
        /// The backend result.
        result: OpResult,
    },
    /// Every level of a commit index completed.
    CurrentCommitFinished {
        /// The index that finished.
        index: u64,
    },
}

/// Fan-out sender; emitting with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeSetEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Bus holding up to `capacity` undelivered events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// New receiver observing every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSetEvent> {
        self.tx.subscribe()
    }

    /// Emit `event` to all current receivers.
    pub fn emit(&self, event: ChangeSetEvent) {
        // No receivers is the common case in headless use.
        let _ = self.tx.send(event);
    }
}
