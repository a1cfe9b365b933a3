// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording transport: logs every operation and how many were in flight.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use changeset_core::{
    AddCharm, AddUnits, Deploy, DestroyMachines, MachineParams, OpResult, Operation,
    SandboxTransport, Transport,
};
use changeset_model::{ConfigMap, Endpoint};

#[derive(Debug, Default)]
struct Log {
    operations: Vec<Operation>,
    in_flight: usize,
    max_in_flight: usize,
    scripted: BTreeMap<&'static str, OpResult>,
}

/// Transport that answers like [`SandboxTransport`] while recording each
/// operation it receives.
///
/// Every call yields to the runtime once before answering, so calls issued
/// together are observably in flight at the same time
/// ([`RecordingTransport::max_in_flight`]).
#[derive(Debug, Default)]
pub struct RecordingTransport {
    backend: SandboxTransport,
    log: Mutex<Log>,
}

impl RecordingTransport {
    /// Fresh transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer every later call of `verb` (as in [`Operation::verb`]) with
    /// `result` instead of the sandbox's answer.
    pub fn respond(&self, verb: &'static str, result: OpResult) {
        self.log().scripted.insert(verb, result);
    }

    /// Operations received, in dispatch order.
    pub fn operations(&self) -> Vec<Operation> {
        self.log().operations.clone()
    }

    /// Verbs received, in dispatch order.
    pub fn verbs(&self) -> Vec<&'static str> {
        self.log().operations.iter().map(Operation::verb).collect()
    }

    /// Largest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.log().max_in_flight
    }

    async fn record(&self, operation: Operation) -> OpResult {
        let scripted = {
            let mut log = self.log();
            log.in_flight += 1;
            log.max_in_flight = log.max_in_flight.max(log.in_flight);
            let scripted = log.scripted.get(operation.verb()).cloned();
            log.operations.push(operation.clone());
            scripted
        };
        tokio::task::yield_now().await;
        let result = match scripted {
            Some(result) => result,
            None => operation.dispatch(&self.backend).await,
        };
        self.log().in_flight -= 1;
        result
    }
}

impl Transport for RecordingTransport {
    async fn add_charm(&self, args: &AddCharm) -> OpResult {
        self.record(Operation::AddCharm(args.clone())).await
    }

    async fn deploy(&self, args: &Deploy) -> OpResult {
        self.record(Operation::Deploy(args.clone())).await
    }

    async fn destroy_application(&self, application: &str) -> OpResult {
        self.record(Operation::DestroyApplication {
            application: application.to_owned(),
        })
        .await
    }

    async fn destroy_machines(&self, args: &DestroyMachines) -> OpResult {
        self.record(Operation::DestroyMachines(args.clone())).await
    }

    async fn set_config(&self, application: &str, config: &ConfigMap) -> OpResult {
        self.record(Operation::SetConfig {
            application: application.to_owned(),
            config: config.clone(),
        })
        .await
    }

    async fn add_relation(&self, endpoints: &[Endpoint; 2]) -> OpResult {
        self.record(Operation::AddRelation {
            endpoints: endpoints.clone(),
        })
        .await
    }

    async fn remove_relation(&self, endpoints: &[Endpoint; 2]) -> OpResult {
        self.record(Operation::RemoveRelation {
            endpoints: endpoints.clone(),
        })
        .await
    }

    async fn remove_units(&self, units: &[String]) -> OpResult {
        self.record(Operation::RemoveUnits {
            units: units.to_vec(),
        })
        .await
    }

    async fn expose(&self, application: &str) -> OpResult {
        self.record(Operation::Expose {
            application: application.to_owned(),
        })
        .await
    }

    async fn unexpose(&self, application: &str) -> OpResult {
        self.record(Operation::Unexpose {
            application: application.to_owned(),
        })
        .await
    }

    async fn add_machines(&self, params: &[MachineParams]) -> OpResult {
        self.record(Operation::AddMachines {
            params: params.to_vec(),
        })
        .await
    }

    async fn add_units(&self, args: &AddUnits) -> OpResult {
        self.record(Operation::AddUnits(args.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_results_override_the_sandbox() {
        let transport = RecordingTransport::new();
        transport.respond("expose", OpResult::failed("nope"));
        let result = transport.expose("wordpress").await;
        assert_eq!(result.err.as_deref(), Some("nope"));
        assert_eq!(transport.verbs(), vec!["expose"]);
        assert_eq!(transport.max_in_flight(), 1);
    }
}
