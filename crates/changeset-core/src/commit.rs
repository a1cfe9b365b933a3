// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Commit executor: replays the current index level by level.

use changeset_model::{CommitStatus, ModelDb};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::change_set::{mark_commit_status, ChangeSet};
use crate::error::ChangeSetError;
use crate::event::ChangeSetEvent;
use crate::hierarchy::HierarchyMode;
use crate::transport::Transport;

/// What a commit did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Index that was committed.
    pub index: u64,
    /// Number of levels executed.
    pub levels: usize,
    /// Records dispatched to the backend.
    pub dispatched: usize,
    /// Records whose backend result carried an error.
    pub failed: usize,
    /// Unplaced unit records held back for the next index.
    pub deferred: usize,
}

impl ChangeSet {
    /// Send every record of the current index to `transport`.
    ///
    /// Levels run strictly in order. Within a level each record's `prepare`
    /// hook runs, the call is dispatched, and all calls of the level are then
    /// awaited together; results are delivered through
    /// [`ChangeSet::complete`] as they arrive, so later levels see rewritten
    /// arguments. Backend errors are counted and propagated, never fatal.
    ///
    /// Emits [`ChangeSetEvent::CurrentCommitFinished`] and advances the index
    /// once the last level finished. An empty index still advances.
    #[instrument(skip_all, fields(index = self.current_index()))]
    pub async fn commit<T: Transport>(
        &mut self,
        transport: &T,
        db: &mut ModelDb,
    ) -> Result<CommitSummary, ChangeSetError> {
        let index = self.current_index();
        let mode = if self.config.defer_unplaced_units {
            HierarchyMode::PlacedOnly
        } else {
            HierarchyMode::All
        };
        let levels = self.build_hierarchy(mode, db)?;
        let deferred = self.records().filter(|r| r.index > index).count();
        info!(levels = levels.len(), deferred, "committing change set");

        let mut summary = CommitSummary {
            index,
            levels: levels.len(),
            deferred,
            ..CommitSummary::default()
        };

        for (depth, level) in levels.iter().enumerate() {
            let mut in_flight = FuturesUnordered::new();
            for key in level {
                let Some(record) = self.record_mut(key) else {
                    continue;
                };
                if let Some(prepare) = record.command.prepare.as_mut() {
                    prepare(&mut record.command.call, &*db);
                }
                mark_commit_status(&record.command.call, CommitStatus::InProgress, db);
                let operation = record.command.call.operation.clone();
                let snapshot = record.summary();
                self.emit(ChangeSetEvent::Commit { record: snapshot });

                let key = key.clone();
                in_flight.push(async move {
                    let result = operation.dispatch(transport).await;
                    (key, result)
                });
                summary.dispatched += 1;
            }

            while let Some((key, result)) = in_flight.next().await {
                if let Some(err) = &result.err {
                    warn!(record = %key, level = depth, error = %err, "backend call failed");
                    summary.failed += 1;
                }
                self.complete(&key, result, db);
            }
        }

        self.emit(ChangeSetEvent::CurrentCommitFinished { index });
        self.advance_index();
        info!(
            dispatched = summary.dispatched,
            failed = summary.failed,
            "change set committed"
        );
        Ok(summary)
    }
}
