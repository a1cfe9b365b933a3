// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! The record store and the result propagator.

use std::time::SystemTime;

use changeset_model::{CommitStatus, ModelDb};
use rustc_hash::FxHashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::ChangeSetConfig;
use crate::event::{ChangeSetEvent, EventBus};
use crate::key::{KeyGenerator, RecordKey};
use crate::operation::{OpResult, Operation};
use crate::record::{Call, Callback, Command, Record};

/// Client-side queue of deferred backend calls.
///
/// Records are keyed by [`RecordKey`] and remembered in insertion order.
/// Every record belongs to a commit index; [`ChangeSet::commit`] only
/// considers records of the current index and advances it when done.
#[derive(Debug)]
pub struct ChangeSet {
    records: FxHashMap<RecordKey, Record>,
    order: Vec<RecordKey>,
    keys: KeyGenerator,
    current_index: u64,
    pub(crate) config: ChangeSetConfig,
    events: EventBus,
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self::new(ChangeSetConfig::default())
    }
}

impl ChangeSet {
    /// Empty change set at index 0.
    pub fn new(config: ChangeSetConfig) -> Self {
        Self {
            records: FxHashMap::default(),
            order: Vec::new(),
            keys: KeyGenerator::new(),
            current_index: 0,
            config,
            events: EventBus::default(),
        }
    }

    /// Active settings.
    pub fn config(&self) -> &ChangeSetConfig {
        &self.config
    }

    /// Subscribe to change-set events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSetEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ChangeSetEvent) {
        self.events.emit(event);
    }

    /// Index the next commit will process.
    pub fn current_index(&self) -> u64 {
        self.current_index
    }

    pub(crate) fn advance_index(&mut self) {
        self.current_index += 1;
    }

    /// Queue `command` with the given parents.
    ///
    /// The key family comes from the command's operation. Empty and duplicate
    /// parent keys are dropped. Emits [`ChangeSetEvent::ChangeSetModified`].
    pub fn create_record(
        &mut self,
        command: Command,
        parents: impl IntoIterator<Item = RecordKey>,
        callback: Option<Callback>,
    ) -> RecordKey {
        let id = self.keys.next_key(command.call.operation.family());
        let mut record = Record {
            id: id.clone(),
            index: self.current_index,
            parents: Vec::new(),
            executed: false,
            command,
            callback,
            timestamp: SystemTime::now(),
        };
        for parent in parents {
            if !parent.as_str().is_empty() {
                record.add_parent(parent);
            }
        }
        debug!(record = %id, index = record.index, parents = ?record.parents, "queued record");
        self.records.insert(id.clone(), record);
        self.order.push(id.clone());
        self.emit(ChangeSetEvent::ChangeSetModified);
        id
    }

    /// Remove a record without touching the model. Missing keys are ignored.
    pub fn remove_record(&mut self, key: &RecordKey) -> Option<Record> {
        let removed = self.take_record(key)?;
        debug!(record = %key, "removed record");
        self.emit(ChangeSetEvent::ChangeSetModified);
        Some(removed)
    }

    fn take_record(&mut self, key: &RecordKey) -> Option<Record> {
        let removed = self.records.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Record by key.
    pub fn record(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// Mutable record by key.
    pub fn record_mut(&mut self, key: &RecordKey) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    /// Every live record, in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|k| self.records.get(k))
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of the current index, in insertion order.
    pub fn current_change_set(&self) -> Vec<&Record> {
        self.records()
            .filter(|r| r.index == self.current_index)
            .collect()
    }

    /// First record (insertion order) matching `pred`.
    pub fn find_record(&self, mut pred: impl FnMut(&Record) -> bool) -> Option<RecordKey> {
        self.records().find(|r| pred(r)).map(|r| r.id.clone())
    }

    /// Keys of every record matching `pred`, in insertion order.
    pub fn find_records(&self, mut pred: impl FnMut(&Record) -> bool) -> Vec<RecordKey> {
        self.records()
            .filter(|r| pred(r))
            .map(|r| r.id.clone())
            .collect()
    }

    /// Queued deploy whose ghost application is `application`.
    pub fn queued_deploy(&self, application: &str) -> Option<RecordKey> {
        self.find_record(|r| {
            matches!(r.operation(), Operation::Deploy(_))
                && r.call().model_id() == Some(application)
        })
    }

    /// Queued `addMachines` whose ghost machine is `machine`.
    pub fn queued_machine(&self, machine: &str) -> Option<RecordKey> {
        self.find_record(|r| {
            matches!(r.operation(), Operation::AddMachines { .. })
                && r.call().model_id() == Some(machine)
        })
    }

    /// Queued `addUnits` whose ghost unit is `unit`.
    pub fn queued_unit(&self, unit: &str) -> Option<RecordKey> {
        self.find_record(|r| {
            matches!(r.operation(), Operation::AddUnits(_)) && r.call().model_id() == Some(unit)
        })
    }

    /// Drop every record of the current index; returns how many were dropped.
    pub(crate) fn drop_current_index(&mut self) -> usize {
        let index = self.current_index;
        let doomed: Vec<RecordKey> = self.find_records(|r| r.index == index);
        for key in &doomed {
            self.take_record(key);
        }
        doomed.len()
    }

    /// Deliver the backend result for `key`.
    ///
    /// Marks the record executed, emits [`ChangeSetEvent::TaskComplete`], runs
    /// the user callback, removes the record and then lets every child that
    /// lists it as a parent rewrite its call from the result. Failed results
    /// are propagated the same way.
    ///
    /// Returns `false` (and does nothing) for unknown or already executed
    /// keys, so each record completes at most once.
    pub fn complete(&mut self, key: &RecordKey, result: OpResult, db: &mut ModelDb) -> bool {
        let Some(record) = self.records.get_mut(key) else {
            return false;
        };
        if record.executed {
            return false;
        }
        record.executed = true;
        mark_commit_status(&record.command.call, CommitStatus::Committed, db);
        self.events.emit(ChangeSetEvent::TaskComplete {
            record: record.summary(),
            result: result.clone(),
        });
        if let Some(callback) = record.callback.take() {
            callback(&result);
        }

        let Some(done) = self.take_record(key) else {
            return false;
        };
        for child_key in &self.order {
            let Some(child) = self.records.get_mut(child_key) else {
                continue;
            };
            if !child.has_parent(&done.id) {
                continue;
            }
            if let Some(hook) = child.command.on_parent_results.as_mut() {
                hook(&mut child.command.call, &done, &result, &mut *db);
            }
        }
        debug!(record = %key, ok = result.is_ok(), "record completed");
        self.emit(ChangeSetEvent::ChangeSetModified);
        true
    }
}

/// Track commit progress on the ghost machine an `addMachines` call creates.
pub(crate) fn mark_commit_status(call: &Call, status: CommitStatus, db: &mut ModelDb) {
    if !matches!(call.operation, Operation::AddMachines { .. }) {
        return;
    }
    if let Some(machine) = call.model_id().and_then(|id| db.machine_mut(id)) {
        machine.commit_status = status;
    }
}
