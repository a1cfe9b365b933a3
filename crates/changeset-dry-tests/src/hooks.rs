// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Callbacks and hooks that count and capture their invocations.

use std::sync::{Arc, Mutex, MutexGuard};

use changeset_core::{Call, Callback, OpResult, Record, RecordKey};
use changeset_model::ModelDb;

#[derive(Debug, Default)]
struct Seen {
    results: Vec<OpResult>,
    prepares: usize,
    parent_results: Vec<(RecordKey, OpResult)>,
}

/// Shared counter handed out as callbacks and hooks.
///
/// Clones observe the same counts.
#[derive(Debug, Clone, Default)]
pub struct HookCounter {
    seen: Arc<Mutex<Seen>>,
}

impl HookCounter {
    /// Fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    fn seen(&self) -> MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Completion callback recording each delivered result.
    pub fn callback(&self) -> Option<Callback> {
        let seen = Arc::clone(&self.seen);
        Some(Box::new(move |result: &OpResult| {
            seen.lock()
                .unwrap_or_else(|e| e.into_inner())
                .results
                .push(result.clone());
        }))
    }

    /// Prepare hook counting invocations.
    pub fn prepare(&self) -> impl FnMut(&mut Call, &ModelDb) + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |_call: &mut Call, _db: &ModelDb| {
            seen.lock().unwrap_or_else(|e| e.into_inner()).prepares += 1;
        }
    }

    /// Parent-results hook recording each completed parent and its result.
    pub fn parent_results(
        &self,
    ) -> impl FnMut(&mut Call, &Record, &OpResult, &mut ModelDb) + Send + 'static {
        let seen = Arc::clone(&self.seen);
        move |_call: &mut Call, parent: &Record, result: &OpResult, _db: &mut ModelDb| {
            seen.lock()
                .unwrap_or_else(|e| e.into_inner())
                .parent_results
                .push((parent.id.clone(), result.clone()));
        }
    }

    /// Number of callback invocations.
    pub fn callbacks(&self) -> usize {
        self.seen().results.len()
    }

    /// Results delivered to callbacks, in delivery order.
    pub fn results(&self) -> Vec<OpResult> {
        self.seen().results.clone()
    }

    /// Number of prepare invocations.
    pub fn prepares(&self) -> usize {
        self.seen().prepares
    }

    /// Parents whose completion reached the parent-results hook.
    pub fn parents_seen(&self) -> Vec<RecordKey> {
        self.seen()
            .parent_results
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Parent keys and results, as delivered to the parent-results hook.
    pub fn parent_outcomes(&self) -> Vec<(RecordKey, OpResult)> {
        self.seen().parent_results.clone()
    }
}
