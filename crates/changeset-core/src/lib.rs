// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! changeset-core: an optimistic, dependency-ordered queue of backend calls.
//!
//! Callers act on a model that may not exist on the backend yet. Each action
//! is recorded as a deferred call linked to the calls it depends on, its
//! effect is applied to the ghost model immediately, and [`ChangeSet::commit`]
//! later replays the calls level by level, rewriting placeholder ids with the
//! real ones produced by earlier levels.
//!
//! The main pieces:
//! - [`ChangeSet`]: record store, key generator and result propagation.
//! - [`HierarchyMode`] / [`ChangeSet::build_hierarchy`]: dependency levels.
//! - [`ChangeSet::commit`]: level-by-level executor over a [`Transport`].
//! - [`validate_unit_placement`] / [`ChangeSet::place_unit`]: placement rules.
//! - [`ChangeSet::clear`]: drop the current index and revert the model.
//! - [`Environment`]: per-verb facade choosing between queueing and
//!   immediate dispatch.
#![forbid(unsafe_code)]

mod change_set;
mod commit;
mod config;
mod env;
mod error;
mod event;
mod hierarchy;
mod key;
mod lazy;
mod operation;
mod placement;
mod record;
mod sandbox;
mod transport;
mod undo;

pub use change_set::ChangeSet;
pub use commit::CommitSummary;
pub use config::{ChangeSetConfig, CONFIG_KEY};
pub use env::{Environment, Submission};
pub use error::{ChangeSetError, PlacementError};
pub use event::{ChangeSetEvent, EventBus, EVENT_CAPACITY};
pub use hierarchy::HierarchyMode;
pub use key::{KeyGenerator, RecordFamily, RecordKey};
pub use operation::{
    AddCharm, AddUnits, CharmConfig, Deploy, DestroyMachines, MachineOutcome, MachineParams,
    OpResult, Operation, ResultDetail,
};
pub use placement::validate_unit_placement;
pub use record::{
    Call, Callback, Command, CommandOptions, ParentResultsHook, PrepareHook, Record, RecordSummary,
};
pub use sandbox::SandboxTransport;
pub use transport::Transport;
