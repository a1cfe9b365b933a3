// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Model entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Character that marks a placeholder (ghost) identifier, e.g. `$applicationId3`.
pub const GHOST_MARKER: char = '$';

/// Charm configuration values keyed by option name. `Null` means "unset".
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// An application (service), real or ghost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    /// Stable identifier. Ghosts use a `$`-prefixed placeholder.
    pub id: String,
    /// User-visible name; may change until the deploy is committed.
    pub name: String,
    /// Charm URL the application runs.
    pub charm_url: String,
    /// Explicit series, when known.
    pub series: Option<String>,
    /// Local configuration, including uncommitted edits.
    pub config: ConfigMap,
    /// Configuration as last reported by the environment.
    pub environment_config: ConfigMap,
    /// Option names edited locally since the last commit.
    pub dirty_fields: Vec<String>,
    /// Whether the application is exposed.
    pub exposed: bool,
    /// Whether a destroy is pending.
    pub deleted: bool,
    /// Whether the charm is a subordinate.
    pub subordinate: bool,
}

impl Application {
    /// Construct a ghost application whose id is a placeholder.
    pub fn ghost(
        id: impl Into<String>,
        name: impl Into<String>,
        charm_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            charm_url: charm_url.into(),
            ..Self::default()
        }
    }

    /// True when the id is still a placeholder.
    pub fn is_ghost(&self) -> bool {
        self.id.contains(GHOST_MARKER)
    }
}

/// A unit of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier (`app/N`).
    pub id: String,
    /// Owning application id.
    pub application: String,
    /// Machine or container hosting the unit; `None` while unplaced.
    pub machine: Option<String>,
    /// Agent state reported by the backend; `None` for uncommitted units.
    pub agent_state: Option<String>,
    /// Whether a removal is pending.
    pub deleted: bool,
}

impl Unit {
    /// Construct an unplaced, uncommitted unit.
    pub fn new(id: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            application: application.into(),
            ..Self::default()
        }
    }

    /// Place the unit on `machine`.
    #[must_use]
    pub fn on(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }
}

/// Commit progress of a ghost machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitStatus {
    /// Queued, not yet dispatched.
    #[default]
    Uncommitted,
    /// Dispatched to the backend, awaiting a response.
    InProgress,
    /// Backend responded.
    Committed,
}

/// A machine or container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Stable identifier (`0`, `0/lxc/1`, or a ghost placeholder).
    pub id: String,
    /// Hosting machine for containers.
    pub parent_id: Option<String>,
    /// Explicit series; ghost machines may not have one yet.
    pub series: Option<String>,
    /// Whether a destroy is pending.
    pub deleted: bool,
    /// Commit progress for ghosts.
    pub commit_status: CommitStatus,
}

impl Machine {
    /// Construct a top-level machine.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the series.
    #[must_use]
    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    /// Make this a container hosted on `parent`.
    #[must_use]
    pub fn inside(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }
}

/// One side of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Application id or name.
    pub application: String,
    /// Relation (interface endpoint) name.
    pub name: String,
}

impl Endpoint {
    /// Construct an endpoint.
    pub fn new(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            name: name.into(),
        }
    }
}

/// A relation between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Stable identifier.
    pub id: String,
    /// The two endpoints, in creation order.
    pub endpoints: [Endpoint; 2],
    /// Whether a removal is pending.
    pub deleted: bool,
}

impl Relation {
    /// Construct a relation.
    pub fn new(id: impl Into<String>, endpoints: [Endpoint; 2]) -> Self {
        Self {
            id: id.into(),
            endpoints,
            deleted: false,
        }
    }

    /// True when `other` names the same two endpoints, in either order.
    pub fn joins(&self, other: &[Endpoint; 2]) -> bool {
        let [a, b] = &self.endpoints;
        (a == &other[0] && b == &other[1]) || (a == &other[1] && b == &other[0])
    }

    /// True when either endpoint belongs to `application`.
    pub fn involves(&self, application: &str) -> bool {
        self.endpoints.iter().any(|e| e.application == application)
    }
}
