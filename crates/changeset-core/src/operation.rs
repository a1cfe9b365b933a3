// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Backend operations and their results.
//!
//! [`Operation`] is a closed enum with one variant per backend verb. Each
//! variant carries a typed argument list; [`Operation::dispatch`] routes it to
//! the matching [`Transport`] method.

use std::collections::BTreeMap;

use changeset_model::{ConfigMap, Endpoint};
use serde::{Deserialize, Serialize};

use crate::key::RecordFamily;
use crate::transport::Transport;

/// Charm configuration supplied with a deploy: either a value map or a raw
/// YAML document, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CharmConfig {
    /// Option values keyed by name. `Null` values mean "unset".
    Values(ConfigMap),
    /// Raw YAML configuration.
    Yaml(String),
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self::Values(ConfigMap::new())
    }
}

/// Arguments of `addCharm`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddCharm {
    /// Charm URL.
    pub url: String,
    /// Authorization macaroon for private charms.
    pub macaroon: Option<String>,
}

/// Arguments of `deploy`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Deploy {
    /// Charm URL to deploy.
    pub charm_url: String,
    /// Series to deploy on.
    pub series: Option<String>,
    /// Application name.
    pub application_name: String,
    /// Initial configuration.
    pub config: CharmConfig,
    /// Units to create alongside the application.
    pub num_units: u32,
    /// Placement constraints.
    pub constraints: BTreeMap<String, String>,
    /// Machine to place the initial units on.
    pub to_machine: Option<String>,
}

/// Arguments of `destroyMachines`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DestroyMachines {
    /// Machine ids to destroy.
    pub machines: Vec<String>,
    /// Destroy even if units are still hosted.
    pub force: bool,
}

/// Parameters for one machine of an `addMachines` call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachineParams {
    /// Series; filled from hosted units when absent.
    pub series: Option<String>,
    /// Hardware constraints.
    pub constraints: BTreeMap<String, String>,
    /// Machine jobs.
    pub jobs: Vec<String>,
    /// Hosting machine for containers. May be a ghost id until the parent
    /// machine commits.
    pub parent_id: Option<String>,
    /// Container type (`lxc`, `kvm`) for containers.
    pub container_type: Option<String>,
}

/// Arguments of `addUnits`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddUnits {
    /// Application name.
    pub application: String,
    /// Number of units to add.
    pub num_units: u32,
    /// Target machine, when placed.
    pub to_machine: Option<String>,
}

/// A backend verb with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Make a charm available to the model.
    AddCharm(AddCharm),
    /// Deploy an application.
    Deploy(Deploy),
    /// Destroy an application.
    DestroyApplication {
        /// Application id.
        application: String,
    },
    /// Destroy machines.
    DestroyMachines(DestroyMachines),
    /// Set application configuration.
    SetConfig {
        /// Application id or name.
        application: String,
        /// Changed option values.
        config: ConfigMap,
    },
    /// Relate two endpoints.
    AddRelation {
        /// The two endpoints.
        endpoints: [Endpoint; 2],
    },
    /// Remove a relation.
    RemoveRelation {
        /// The two endpoints.
        endpoints: [Endpoint; 2],
    },
    /// Remove units.
    RemoveUnits {
        /// Unit ids.
        units: Vec<String>,
    },
    /// Expose an application.
    Expose {
        /// Application id or name.
        application: String,
    },
    /// Unexpose an application.
    Unexpose {
        /// Application id or name.
        application: String,
    },
    /// Add machines or containers.
    AddMachines {
        /// One entry per machine.
        params: Vec<MachineParams>,
    },
    /// Add units to an application.
    AddUnits(AddUnits),
}

impl Operation {
    /// Key family for records carrying this operation.
    pub const fn family(&self) -> RecordFamily {
        match self {
            Self::AddCharm(_) => RecordFamily::AddCharm,
            Self::Deploy(_) => RecordFamily::Service,
            Self::DestroyApplication { .. } => RecordFamily::DestroyApplication,
            Self::DestroyMachines(_) => RecordFamily::DestroyMachines,
            Self::SetConfig { .. } => RecordFamily::SetConfig,
            Self::AddRelation { .. } => RecordFamily::AddRelation,
            Self::RemoveRelation { .. } => RecordFamily::RemoveRelation,
            Self::RemoveUnits { .. } => RecordFamily::RemoveUnit,
            Self::Expose { .. } => RecordFamily::Expose,
            Self::Unexpose { .. } => RecordFamily::Unexpose,
            Self::AddMachines { .. } => RecordFamily::AddMachines,
            Self::AddUnits(_) => RecordFamily::AddUnits,
        }
    }

    /// Backend verb name, as logged.
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::AddCharm(_) => "add_charm",
            Self::Deploy(_) => "deploy",
            Self::DestroyApplication { .. } => "destroy_application",
            Self::DestroyMachines(_) => "destroy_machines",
            Self::SetConfig { .. } => "set_config",
            Self::AddRelation { .. } => "add_relation",
            Self::RemoveRelation { .. } => "remove_relation",
            Self::RemoveUnits { .. } => "remove_units",
            Self::Expose { .. } => "expose",
            Self::Unexpose { .. } => "unexpose",
            Self::AddMachines { .. } => "add_machines",
            Self::AddUnits(_) => "add_units",
        }
    }

    /// Send this operation to `transport` and wait for its result.
    pub async fn dispatch<T: Transport>(&self, transport: &T) -> OpResult {
        match self {
            Self::AddCharm(args) => transport.add_charm(args).await,
            Self::Deploy(args) => transport.deploy(args).await,
            Self::DestroyApplication { application } => {
                transport.destroy_application(application).await
            }
            Self::DestroyMachines(args) => transport.destroy_machines(args).await,
            Self::SetConfig {
                application,
                config,
            } => transport.set_config(application, config).await,
            Self::AddRelation { endpoints } => transport.add_relation(endpoints).await,
            Self::RemoveRelation { endpoints } => transport.remove_relation(endpoints).await,
            Self::RemoveUnits { units } => transport.remove_units(units).await,
            Self::Expose { application } => transport.expose(application).await,
            Self::Unexpose { application } => transport.unexpose(application).await,
            Self::AddMachines { params } => transport.add_machines(params).await,
            Self::AddUnits(args) => transport.add_units(args).await,
        }
    }
}

/// Outcome for one machine of an `addMachines` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineOutcome {
    /// Real machine name assigned by the backend.
    pub name: String,
    /// Per-machine error.
    pub err: Option<String>,
}

/// Verb-specific payload of an [`OpResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultDetail {
    /// No payload.
    #[default]
    None,
    /// `addCharm` result.
    Charm {
        /// Charm URL as stored by the backend.
        url: String,
    },
    /// `deploy` result.
    Deployed {
        /// Final application name.
        application_name: String,
        /// Charm URL deployed.
        charm_url: String,
    },
    /// `addMachines` result, one entry per requested machine.
    Machines(Vec<MachineOutcome>),
    /// `addUnits` result: the new unit names.
    Units(Vec<String>),
    /// Application-scoped verbs (`expose`, `setConfig`, ...).
    Application {
        /// Application name.
        application_name: String,
    },
}

/// Result of a backend call. Backend errors travel in `err` and never abort
/// a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResult {
    /// Backend error message, if the call failed.
    pub err: Option<String>,
    /// Verb-specific payload.
    pub detail: ResultDetail,
}

impl OpResult {
    /// Successful result with a payload.
    pub fn ok(detail: ResultDetail) -> Self {
        Self { err: None, detail }
    }

    /// Failed result.
    pub fn failed(err: impl Into<String>) -> Self {
        Self {
            err: Some(err.into()),
            detail: ResultDetail::None,
        }
    }

    /// True when the backend reported no error.
    pub const fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Application name reported by a deploy.
    pub fn deployed_name(&self) -> Option<&str> {
        match &self.detail {
            ResultDetail::Deployed {
                application_name, ..
            } => Some(application_name),
            _ => None,
        }
    }

    /// Name of the first machine reported by an `addMachines` call.
    pub fn first_machine(&self) -> Option<&str> {
        match &self.detail {
            ResultDetail::Machines(machines) => machines.first().map(|m| m.name.as_str()),
            _ => None,
        }
    }
}
