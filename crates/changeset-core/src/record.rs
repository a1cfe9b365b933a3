// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Change-set records: a deferred backend call plus its hooks.

use std::time::SystemTime;

use changeset_model::ModelDb;
use serde::Serialize;

use crate::key::RecordKey;
use crate::operation::{OpResult, Operation};

/// Correlation metadata carried alongside a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOptions {
    /// Id of the model entity (often a ghost) this call creates or targets.
    pub model_id: Option<String>,
    /// Bypass the queue and send the call straight to the backend.
    pub immediate: bool,
}

impl CommandOptions {
    /// Options correlated with `model_id`.
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: Some(model_id.into()),
            immediate: false,
        }
    }

    /// Options requesting immediate execution.
    pub fn immediate() -> Self {
        Self {
            model_id: None,
            immediate: true,
        }
    }
}

/// A symbolic backend call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    /// Verb and arguments.
    pub operation: Operation,
    /// Correlation metadata.
    pub options: CommandOptions,
}

impl Call {
    /// Call without correlation metadata.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            options: CommandOptions::default(),
        }
    }

    /// Call correlated with a model entity.
    pub fn with_model(operation: Operation, model_id: impl Into<String>) -> Self {
        Self {
            operation,
            options: CommandOptions::for_model(model_id),
        }
    }

    /// The correlated model id, if any.
    pub fn model_id(&self) -> Option<&str> {
        self.options.model_id.as_deref()
    }
}

/// Hook run right before a call is dispatched; may rewrite the call from the
/// current state of the model.
pub type PrepareHook = Box<dyn FnMut(&mut Call, &ModelDb) + Send>;

/// Hook run on a child record whenever one of its parents completes. Receives
/// the completed parent and its result.
pub type ParentResultsHook = Box<dyn FnMut(&mut Call, &Record, &OpResult, &mut ModelDb) + Send>;

/// User completion callback.
pub type Callback = Box<dyn FnOnce(&OpResult) + Send>;

/// A call plus the hooks that keep it in sync with the model.
pub struct Command {
    /// The deferred call.
    pub call: Call,
    /// Optional pre-dispatch hook.
    pub prepare: Option<PrepareHook>,
    /// Optional parent-result hook.
    pub on_parent_results: Option<ParentResultsHook>,
}

impl Command {
    /// Command without hooks.
    pub fn new(call: Call) -> Self {
        Self {
            call,
            prepare: None,
            on_parent_results: None,
        }
    }

    /// Attach a prepare hook.
    #[must_use]
    pub fn with_prepare(
        mut self,
        hook: impl FnMut(&mut Call, &ModelDb) + Send + 'static,
    ) -> Self {
        self.prepare = Some(Box::new(hook));
        self
    }

    /// Attach a parent-results hook.
    #[must_use]
    pub fn with_parent_results(
        mut self,
        hook: impl FnMut(&mut Call, &Record, &OpResult, &mut ModelDb) + Send + 'static,
    ) -> Self {
        self.on_parent_results = Some(Box::new(hook));
        self
    }
}

impl core::fmt::Debug for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Command")
            .field("call", &self.call)
            .field("prepare", &self.prepare.is_some())
            .field("on_parent_results", &self.on_parent_results.is_some())
            .finish()
    }
}

/// One entry of the change set.
pub struct Record {
    /// Unique key, e.g. `addUnits-3`.
    pub id: RecordKey,
    /// Commit generation the record belongs to.
    pub index: u64,
    /// Keys of records that must complete first. No duplicates.
    pub parents: Vec<RecordKey>,
    /// True once the backend answered.
    pub executed: bool,
    /// The deferred call and its hooks.
    pub command: Command,
    /// Completion callback supplied by the caller.
    pub callback: Option<Callback>,
    /// Creation time; informational.
    pub timestamp: SystemTime,
}

impl Record {
    /// The deferred call.
    pub fn call(&self) -> &Call {
        &self.command.call
    }

    /// The deferred operation.
    pub fn operation(&self) -> &Operation {
        &self.command.call.operation
    }

    /// True when `key` is one of this record's parents.
    pub fn has_parent(&self, key: &RecordKey) -> bool {
        self.parents.contains(key)
    }

    /// Add `key` as a parent unless already present.
    pub fn add_parent(&mut self, key: RecordKey) {
        if !self.parents.contains(&key) {
            self.parents.push(key);
        }
    }

    /// Cloneable view of the record, without hooks or callback.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id.clone(),
            index: self.index,
            parents: self.parents.clone(),
            executed: self.executed,
            call: self.command.call.clone(),
        }
    }
}

impl core::fmt::Debug for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("parents", &self.parents)
            .field("executed", &self.executed)
            .field("command", &self.command)
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

/// Plain-data snapshot of a [`Record`], used in events and listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    /// Record key.
    pub id: RecordKey,
    /// Commit generation.
    pub index: u64,
    /// Parent keys.
    pub parents: Vec<RecordKey>,
    /// Whether the backend answered.
    pub executed: bool,
    /// The call as it stood when the snapshot was taken.
    pub call: Call,
}
