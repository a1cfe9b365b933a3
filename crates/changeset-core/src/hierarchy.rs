// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Dependency levels for the current commit index.

use changeset_model::ModelDb;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::change_set::ChangeSet;
use crate::error::ChangeSetError;
use crate::key::RecordKey;
use crate::operation::Operation;

/// Which records of the current index take part in a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyMode {
    /// Every record (used by clear).
    All,
    /// Skip `addUnits` records whose unit has no machine yet. Skipped records
    /// move to the next index.
    PlacedOnly,
}

impl ChangeSet {
    /// Group the current index's records into levels.
    ///
    /// Level 0 holds records without parents in the selection; level N holds
    /// records whose selected parents all sit in levels below N. Parents that
    /// are not selected (already executed, removed, or in another index) count
    /// as satisfied. Records inside a level keep insertion order.
    ///
    /// In [`HierarchyMode::PlacedOnly`] unplaced units are left out and their
    /// records are bumped to the next index, but only once the levels were
    /// built successfully.
    pub fn build_hierarchy(
        &mut self,
        mode: HierarchyMode,
        db: &ModelDb,
    ) -> Result<Vec<Vec<RecordKey>>, ChangeSetError> {
        let index = self.current_index();
        let mut selected = Vec::new();
        let mut deferred = Vec::new();
        for record in self.records().filter(|r| r.index == index) {
            let skip = mode == HierarchyMode::PlacedOnly
                && is_unplaced_unit(record.operation(), record.call().model_id(), db);
            if skip {
                deferred.push(record.id.clone());
            } else {
                selected.push(record.id.clone());
            }
        }

        let levels = self.peel(&selected)?;
        for key in &deferred {
            if let Some(record) = self.record_mut(key) {
                record.index += 1;
            }
        }
        if !deferred.is_empty() {
            debug!(count = deferred.len(), "deferred unplaced units to next index");
        }
        Ok(levels)
    }

    fn peel(&self, selected: &[RecordKey]) -> Result<Vec<Vec<RecordKey>>, ChangeSetError> {
        let in_selection: FxHashSet<&RecordKey> = selected.iter().collect();
        let mut level_of: FxHashMap<&RecordKey, usize> = FxHashMap::default();
        let mut levels: Vec<Vec<RecordKey>> = Vec::new();
        let mut remaining: Vec<&RecordKey> = selected.iter().collect();

        while !remaining.is_empty() {
            let current = levels.len();
            let mut level = Vec::new();
            remaining.retain(|key| {
                let ready = self.record(key).is_none_or(|r| {
                    r.parents.iter().all(|p| {
                        !in_selection.contains(p) || level_of.get(p).is_some_and(|&l| l < current)
                    })
                });
                if ready {
                    level.push(*key);
                }
                !ready
            });
            if level.is_empty() {
                return Err(ChangeSetError::DependencyCycle(
                    remaining.into_iter().cloned().collect(),
                ));
            }
            for key in &level {
                level_of.insert(*key, current);
            }
            levels.push(level.into_iter().cloned().collect());
        }
        Ok(levels)
    }
}

fn is_unplaced_unit(operation: &Operation, model_id: Option<&str>, db: &ModelDb) -> bool {
    if !matches!(operation, Operation::AddUnits(_)) {
        return false;
    }
    model_id
        .and_then(|id| db.unit(id))
        .is_some_and(|unit| unit.machine.is_none())
}
