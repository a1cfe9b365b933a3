// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Environment facade: routes each verb to the change set or, when asked,
//! straight to the backend.

use changeset_model::{ConfigMap, Endpoint, ModelDb};
use tracing::debug;

use crate::change_set::ChangeSet;
use crate::commit::CommitSummary;
use crate::config::ChangeSetConfig;
use crate::error::{ChangeSetError, PlacementError};
use crate::key::RecordKey;
use crate::operation::{
    AddCharm, AddUnits, Deploy, DestroyMachines, MachineParams, OpResult, Operation,
};
use crate::record::{Callback, CommandOptions};
use crate::transport::Transport;

/// How a verb was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Recorded in the change set. `None` when the request cancelled a
    /// queued record (or was already queued) instead of adding one.
    Queued(Option<RecordKey>),
    /// Sent immediately; the backend's answer.
    Immediate(OpResult),
}

impl Submission {
    /// Key of the queued record, if one was created.
    pub fn key(&self) -> Option<&RecordKey> {
        match self {
            Self::Queued(key) => key.as_ref(),
            Self::Immediate(_) => None,
        }
    }
}

/// A backend, the change set in front of it and the model both act on.
#[derive(Debug)]
pub struct Environment<T> {
    transport: T,
    change_set: ChangeSet,
    db: ModelDb,
}

impl<T: Transport> Environment<T> {
    /// Environment with an empty change set and model configured by `config`.
    pub fn new(transport: T, config: ChangeSetConfig) -> Self {
        let db = ModelDb::with_notifications(config.notification_service());
        Self {
            transport,
            change_set: ChangeSet::new(config),
            db,
        }
    }

    /// Environment over an existing model.
    pub fn with_model(transport: T, config: ChangeSetConfig, db: ModelDb) -> Self {
        Self {
            transport,
            change_set: ChangeSet::new(config),
            db,
        }
    }

    /// The backend.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The change set.
    pub fn change_set(&self) -> &ChangeSet {
        &self.change_set
    }

    /// The change set, mutably.
    pub fn change_set_mut(&mut self) -> &mut ChangeSet {
        &mut self.change_set
    }

    /// The model.
    pub fn db(&self) -> &ModelDb {
        &self.db
    }

    /// The model, mutably.
    pub fn db_mut(&mut self) -> &mut ModelDb {
        &mut self.db
    }

    /// Split borrow of the change set and the model.
    pub fn parts_mut(&mut self) -> (&mut ChangeSet, &mut ModelDb) {
        (&mut self.change_set, &mut self.db)
    }

    async fn send(&self, operation: Operation, callback: Option<Callback>) -> Submission {
        debug!(verb = operation.verb(), "sending immediately");
        let result = operation.dispatch(&self.transport).await;
        if let Some(callback) = callback {
            callback(&result);
        }
        Submission::Immediate(result)
    }

    /// `addCharm`.
    pub async fn add_charm(
        &mut self,
        args: AddCharm,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self.send(Operation::AddCharm(args), callback).await;
        }
        Submission::Queued(self.change_set.lazy_add_charm(args, options, callback))
    }

    /// `deploy`.
    pub async fn deploy(
        &mut self,
        args: Deploy,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self.send(Operation::Deploy(args), callback).await;
        }
        Submission::Queued(Some(self.change_set.lazy_deploy(args, options, callback)))
    }

    /// `destroyApplication`.
    pub async fn destroy_application(
        &mut self,
        application: &str,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Result<Submission, ChangeSetError> {
        if options.immediate {
            let operation = Operation::DestroyApplication {
                application: application.to_owned(),
            };
            return Ok(self.send(operation, callback).await);
        }
        let key = self.change_set.lazy_destroy_application(
            application,
            options,
            callback,
            &mut self.db,
        )?;
        Ok(Submission::Queued(key))
    }

    /// `destroyMachines`.
    pub async fn destroy_machines(
        &mut self,
        args: DestroyMachines,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Result<Submission, ChangeSetError> {
        if options.immediate {
            return Ok(self.send(Operation::DestroyMachines(args), callback).await);
        }
        let key = self
            .change_set
            .lazy_destroy_machines(args, options, callback, &mut self.db)?;
        Ok(Submission::Queued(key))
    }

    /// `setConfig`. An immediate call on an application that is only a
    /// queued deploy is refused.
    pub async fn set_config(
        &mut self,
        application: &str,
        config: ConfigMap,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Result<Submission, ChangeSetError> {
        if options.immediate {
            if self.change_set.queued_deploy(application).is_some() {
                return Err(ChangeSetError::QueuedApplication(application.to_owned()));
            }
            let operation = Operation::SetConfig {
                application: application.to_owned(),
                config,
            };
            return Ok(self.send(operation, callback).await);
        }
        let key =
            self.change_set
                .lazy_set_config(application, config, options, callback, &mut self.db)?;
        Ok(Submission::Queued(Some(key)))
    }

    /// `addRelation`.
    pub async fn add_relation(
        &mut self,
        endpoints: [Endpoint; 2],
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self.send(Operation::AddRelation { endpoints }, callback).await;
        }
        Submission::Queued(Some(
            self.change_set.lazy_add_relation(endpoints, options, callback),
        ))
    }

    /// `removeRelation`.
    pub async fn remove_relation(
        &mut self,
        endpoints: [Endpoint; 2],
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self
                .send(Operation::RemoveRelation { endpoints }, callback)
                .await;
        }
        Submission::Queued(self.change_set.lazy_remove_relation(
            endpoints,
            options,
            callback,
            &mut self.db,
        ))
    }

    /// `removeUnits`.
    pub async fn remove_units(
        &mut self,
        units: Vec<String>,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self.send(Operation::RemoveUnits { units }, callback).await;
        }
        Submission::Queued(
            self.change_set
                .lazy_remove_units(units, options, callback, &mut self.db),
        )
    }

    /// `expose`.
    pub async fn expose(
        &mut self,
        application: &str,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Result<Submission, ChangeSetError> {
        if options.immediate {
            let operation = Operation::Expose {
                application: application.to_owned(),
            };
            return Ok(self.send(operation, callback).await);
        }
        let key = self
            .change_set
            .lazy_expose(application, options, callback, &mut self.db)?;
        Ok(Submission::Queued(Some(key)))
    }

    /// `unexpose`.
    pub async fn unexpose(
        &mut self,
        application: &str,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Result<Submission, ChangeSetError> {
        if options.immediate {
            let operation = Operation::Unexpose {
                application: application.to_owned(),
            };
            return Ok(self.send(operation, callback).await);
        }
        let key = self
            .change_set
            .lazy_unexpose(application, options, callback, &mut self.db)?;
        Ok(Submission::Queued(key))
    }

    /// `addMachines`.
    pub async fn add_machines(
        &mut self,
        params: Vec<MachineParams>,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self.send(Operation::AddMachines { params }, callback).await;
        }
        Submission::Queued(Some(
            self.change_set.lazy_add_machines(params, options, callback),
        ))
    }

    /// `addUnits`.
    pub async fn add_units(
        &mut self,
        args: AddUnits,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Submission {
        if options.immediate {
            return self.send(Operation::AddUnits(args), callback).await;
        }
        Submission::Queued(Some(self.change_set.lazy_add_units(args, options, callback)))
    }

    /// Place a queued unit.
    pub fn place_unit(&mut self, unit: &str, machine: &str) -> Result<(), PlacementError> {
        self.change_set.place_unit(unit, machine, &mut self.db)
    }

    /// Commit the current index against the backend.
    pub async fn commit(&mut self) -> Result<CommitSummary, ChangeSetError> {
        self.change_set.commit(&self.transport, &mut self.db).await
    }

    /// Clear the current index.
    pub fn clear(&mut self) -> usize {
        self.change_set.clear(&mut self.db)
    }
}
