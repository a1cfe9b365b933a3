// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Backend port: one async method per verb.

use changeset_model::{ConfigMap, Endpoint};

use crate::operation::{AddCharm, AddUnits, Deploy, DestroyMachines, MachineParams, OpResult};

/// The RPC layer the commit executor drives.
///
/// Implementations report failures through [`OpResult::err`]; a transport
/// never fails the commit itself. Calls issued for records of the same level
/// are polled concurrently on one task, so implementations must not assume
/// calls complete in issue order.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Make a charm available to the model.
    async fn add_charm(&self, args: &AddCharm) -> OpResult;
    /// Deploy an application.
    async fn deploy(&self, args: &Deploy) -> OpResult;
    /// Destroy an application.
    async fn destroy_application(&self, application: &str) -> OpResult;
    /// Destroy machines.
    async fn destroy_machines(&self, args: &DestroyMachines) -> OpResult;
    /// Set application configuration.
    async fn set_config(&self, application: &str, config: &ConfigMap) -> OpResult;
    /// Relate two endpoints.
    async fn add_relation(&self, endpoints: &[Endpoint; 2]) -> OpResult;
    /// Remove a relation.
    async fn remove_relation(&self, endpoints: &[Endpoint; 2]) -> OpResult;
    /// Remove units.
    async fn remove_units(&self, units: &[String]) -> OpResult;
    /// Expose an application.
    async fn expose(&self, application: &str) -> OpResult;
    /// Unexpose an application.
    async fn unexpose(&self, application: &str) -> OpResult;
    /// Add machines or containers.
    async fn add_machines(&self, params: &[MachineParams]) -> OpResult;
    /// Add units to an application.
    async fn add_units(&self, args: &AddUnits) -> OpResult;
}
