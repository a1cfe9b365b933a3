// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! In-process backend that answers every verb the way a fresh model would.
//!
//! Machines get sequential names (`0`, `1`, `0/lxc/2`), deploys echo the
//! requested name and unit names count up per application. Individual verbs
//! can be made to fail to exercise error propagation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use changeset_model::{ConfigMap, Endpoint};
use tracing::trace;

use crate::operation::{
    AddCharm, AddUnits, Deploy, DestroyMachines, MachineOutcome, MachineParams, OpResult,
    ResultDetail,
};
use crate::transport::Transport;

#[derive(Debug, Default)]
struct SandboxState {
    calls: Vec<String>,
    failing: BTreeSet<String>,
    next_machine: u64,
    next_unit: BTreeMap<String, u32>,
}

/// Sandbox backend.
#[derive(Debug, Default)]
pub struct SandboxTransport {
    state: Mutex<SandboxState>,
}

impl SandboxTransport {
    /// Sandbox where every verb succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later call of `verb` (e.g. `"deploy"`) fail.
    pub fn fail_verb(&self, verb: &str) {
        self.state().failing.insert(verb.to_owned());
    }

    /// Verbs received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Log the call; `Some` carries the injected failure.
    fn enter(&self, verb: &str) -> Option<OpResult> {
        let mut state = self.state();
        state.calls.push(verb.to_owned());
        trace!(verb, "sandbox call");
        state
            .failing
            .contains(verb)
            .then(|| OpResult::failed(format!("sandbox rejected {verb}")))
    }

    fn application_ok(&self, verb: &str, application: &str) -> OpResult {
        self.enter(verb).unwrap_or_else(|| {
            OpResult::ok(ResultDetail::Application {
                application_name: application.to_owned(),
            })
        })
    }

    fn plain_ok(&self, verb: &str) -> OpResult {
        self.enter(verb).unwrap_or_default()
    }
}

impl Transport for SandboxTransport {
    async fn add_charm(&self, args: &AddCharm) -> OpResult {
        self.enter("add_charm").unwrap_or_else(|| {
            OpResult::ok(ResultDetail::Charm {
                url: args.url.clone(),
            })
        })
    }

    async fn deploy(&self, args: &Deploy) -> OpResult {
        if let Some(failed) = self.enter("deploy") {
            return failed;
        }
        self.state()
            .next_unit
            .entry(args.application_name.clone())
            .or_insert(args.num_units);
        OpResult::ok(ResultDetail::Deployed {
            application_name: args.application_name.clone(),
            charm_url: args.charm_url.clone(),
        })
    }

    async fn destroy_application(&self, application: &str) -> OpResult {
        self.application_ok("destroy_application", application)
    }

    async fn destroy_machines(&self, _args: &DestroyMachines) -> OpResult {
        self.plain_ok("destroy_machines")
    }

    async fn set_config(&self, application: &str, _config: &ConfigMap) -> OpResult {
        self.application_ok("set_config", application)
    }

    async fn add_relation(&self, _endpoints: &[Endpoint; 2]) -> OpResult {
        self.plain_ok("add_relation")
    }

    async fn remove_relation(&self, _endpoints: &[Endpoint; 2]) -> OpResult {
        self.plain_ok("remove_relation")
    }

    async fn remove_units(&self, _units: &[String]) -> OpResult {
        self.plain_ok("remove_units")
    }

    async fn expose(&self, application: &str) -> OpResult {
        self.application_ok("expose", application)
    }

    async fn unexpose(&self, application: &str) -> OpResult {
        self.application_ok("unexpose", application)
    }

    async fn add_machines(&self, params: &[MachineParams]) -> OpResult {
        if let Some(failed) = self.enter("add_machines") {
            return failed;
        }
        let mut state = self.state();
        let machines = params
            .iter()
            .map(|p| {
                let n = state.next_machine;
                state.next_machine += 1;
                let name = match &p.parent_id {
                    Some(host) => {
                        let kind = p.container_type.as_deref().unwrap_or("lxc");
                        format!("{host}/{kind}/{n}")
                    }
                    None => n.to_string(),
                };
                MachineOutcome { name, err: None }
            })
            .collect();
        OpResult::ok(ResultDetail::Machines(machines))
    }

    async fn add_units(&self, args: &AddUnits) -> OpResult {
        if let Some(failed) = self.enter("add_units") {
            return failed;
        }
        let mut state = self.state();
        let next = state.next_unit.entry(args.application.clone()).or_insert(0);
        let units = (0..args.num_units)
            .map(|_| {
                let name = format!("{}/{}", args.application, *next);
                *next += 1;
                name
            })
            .collect();
        OpResult::ok(ResultDetail::Units(units))
    }
}
