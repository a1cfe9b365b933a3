// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Error types for the change-set engine.

use thiserror::Error;

use crate::key::RecordKey;

/// Errors raised by change-set operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeSetError {
    /// The parent links of the current index form a cycle; no level could be
    /// built for the listed records.
    #[error("dependency cycle among records: {}", join_keys(.0))]
    DependencyCycle(Vec<RecordKey>),
    /// A record key does not exist in the store.
    #[error("unknown change-set record: {0}")]
    UnknownRecord(RecordKey),
    /// An immediate call targeted an application that only exists as a
    /// queued deploy.
    #[error("application {0} is queued for deployment; its changes must be queued too")]
    QueuedApplication(String),
    /// A lazy entry point referenced a model entity missing from the store.
    #[error("{kind} {id} does not exist in the model")]
    MissingModel {
        /// Entity kind (`application`, `machine`, ...).
        kind: &'static str,
        /// Requested id.
        id: String,
    },
}

impl ChangeSetError {
    pub(crate) fn missing(kind: &'static str, id: impl Into<String>) -> Self {
        Self::MissingModel {
            kind,
            id: id.into(),
        }
    }
}

fn join_keys(keys: &[RecordKey]) -> String {
    keys.iter()
        .map(RecordKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reasons a unit cannot be placed on a machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// No queued `addUnits` record exists for the unit.
    #[error("attempted to place a unit which has not been added: {0}")]
    NotQueued(String),
    /// The machine's explicit series differs from the unit's.
    #[error("unable to place a {unit_series} unit on the {machine_series} machine {machine}")]
    SeriesMismatch {
        /// Series the unit runs.
        unit_series: String,
        /// Series of the target machine.
        machine_series: String,
        /// Target machine id.
        machine: String,
    },
    /// A ghost machine already hosts units of another series.
    #[error("machine {machine} already includes units with a different series: {series}")]
    MixedSeries {
        /// Target machine id.
        machine: String,
        /// Series of the unit already hosted.
        series: String,
    },
    /// The target machine is not in the model.
    #[error("machine {0} does not exist")]
    UnknownMachine(String),
    /// The unit is not in the model.
    #[error("unit {0} does not exist")]
    UnknownUnit(String),
}
