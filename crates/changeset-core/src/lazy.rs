// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Lazy entry points: record a backend call instead of sending it, and
//! apply its effect to the ghost model straight away.
//!
//! Each entry point wires the parents and hooks its verb needs so the call
//! can be replayed later with real identifiers in place of placeholders.

use changeset_model::{ConfigMap, Endpoint, ModelDb, GHOST_MARKER};
use tracing::debug;

use crate::change_set::ChangeSet;
use crate::error::ChangeSetError;
use crate::key::{RecordFamily, RecordKey};
use crate::operation::{
    AddCharm, AddUnits, CharmConfig, Deploy, DestroyMachines, MachineParams, OpResult, Operation,
};
use crate::record::{Call, Callback, Command, CommandOptions, Record};

/// True when `a` and `b` name the same two endpoints, in either order.
fn same_endpoints(a: &[Endpoint; 2], b: &[Endpoint; 2]) -> bool {
    (a[0] == b[0] && a[1] == b[1]) || (a[0] == b[1] && a[1] == b[0])
}

/// Real application name for a completed deploy parent: the name the backend
/// reported, else the name the deploy was sent with.
fn deployed_name(parent: &Record, result: &OpResult) -> Option<String> {
    if let Some(name) = result.deployed_name() {
        return Some(name.to_owned());
    }
    match parent.operation() {
        Operation::Deploy(args) => Some(args.application_name.clone()),
        _ => None,
    }
}

/// Replace `application` with the deployed name when it is the placeholder
/// of the completed deploy `parent`.
fn rename_from_deploy(application: &mut String, parent: &Record, result: &OpResult) {
    if !matches!(parent.operation(), Operation::Deploy(_)) {
        return;
    }
    if !application.contains(GHOST_MARKER)
        || parent.call().model_id() != Some(application.as_str())
    {
        return;
    }
    if let Some(name) = deployed_name(parent, result) {
        *application = name;
    }
}

impl ChangeSet {
    /// Queue `addCharm`. A second request for the same URL is ignored and
    /// returns `None`.
    pub fn lazy_add_charm(
        &mut self,
        args: AddCharm,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> Option<RecordKey> {
        let existing = self.find_record(|r| {
            matches!(r.operation(), Operation::AddCharm(c) if c.url == args.url)
        });
        if existing.is_some() {
            debug!(url = %args.url, "charm already queued");
            return None;
        }
        let call = Call {
            operation: Operation::AddCharm(args),
            options,
        };
        Some(self.create_record(Command::new(call), [], callback))
    }

    /// Queue `deploy`, after the matching `addCharm` and the queued target
    /// machine, if any.
    ///
    /// Right before dispatch the application name and series are refreshed
    /// from the ghost application (users may rename it until commit) and
    /// unset config values are stripped. A queued target machine is swapped
    /// for its real name once it commits.
    pub fn lazy_deploy(
        &mut self,
        args: Deploy,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> RecordKey {
        let mut parents = self.find_records(|r| {
            matches!(r.operation(), Operation::AddCharm(c) if c.url == args.charm_url)
        });
        if let Some(machine) = args.to_machine.as_deref().and_then(|m| self.queued_machine(m)) {
            parents.push(machine);
        }
        let command = Command::new(Call {
            operation: Operation::Deploy(args),
            options,
        })
        .with_parent_results(|call, parent, result, _db| {
            if !matches!(parent.operation(), Operation::AddMachines { .. }) {
                return;
            }
            if let (Operation::Deploy(args), Some(real)) =
                (&mut call.operation, result.first_machine())
            {
                args.to_machine = Some(real.to_owned());
            }
        })
        .with_prepare(|call, db| {
            let Some(ghost) = call.model_id().and_then(|id| db.application(id)).cloned() else {
                return;
            };
            if let Operation::Deploy(args) = &mut call.operation {
                args.application_name = ghost.name;
                if ghost.series.is_some() {
                    args.series = ghost.series;
                }
                if let CharmConfig::Values(values) = &mut args.config {
                    values.retain(|_, v| !v.is_null());
                }
            }
        });
        self.create_record(command, parents, callback)
    }

    /// Destroy an application.
    ///
    /// If the application is still a queued deploy, the deploy, everything
    /// depending on it and its ghost entities are dropped instead and `None`
    /// is returned. Otherwise its units are removed, it is marked deleted and
    /// a `destroyApplication` record is queued.
    pub fn lazy_destroy_application(
        &mut self,
        application: &str,
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Result<Option<RecordKey>, ChangeSetError> {
        if let Some(deploy) = self.queued_deploy(application) {
            self.destroy_queued_application(&deploy, db);
            return Ok(None);
        }
        if db.application(application).is_none() {
            return Err(ChangeSetError::missing("application", application));
        }
        let units: Vec<String> = db
            .units_of_application(application)
            .map(|u| u.id.clone())
            .collect();
        if !units.is_empty() {
            self.lazy_remove_units(units, CommandOptions::default(), None, db);
        }
        if let Some(app) = db.application_mut(application) {
            app.deleted = true;
        }
        let call = Call {
            operation: Operation::DestroyApplication {
                application: application.to_owned(),
            },
            options,
        };
        Ok(Some(self.create_record(Command::new(call), [], callback)))
    }

    /// Drop a queued deploy together with every record parented on it, its
    /// ghost units, relations and application, and its `addCharm` record when
    /// no other deploy still needs it.
    pub fn destroy_queued_application(&mut self, deploy: &RecordKey, db: &mut ModelDb) {
        for child in self.find_records(|r| r.has_parent(deploy)) {
            self.remove_record(&child);
        }
        let Some(record) = self.remove_record(deploy) else {
            return;
        };
        if let Some(app) = record.call().model_id() {
            let units: Vec<String> = db.units_of_application(app).map(|u| u.id.clone()).collect();
            for unit in &units {
                db.remove_unit(unit);
            }
            for relation in db.relations_of_application(app) {
                db.remove_relation(&relation);
            }
            db.remove_application(app);
        }
        for charm in record
            .parents
            .iter()
            .filter(|p| p.family_prefix() == RecordFamily::AddCharm.as_str())
        {
            let still_used = self
                .find_record(|r| {
                    matches!(r.operation(), Operation::Deploy(_)) && r.has_parent(charm)
                })
                .is_some();
            if !still_used {
                self.remove_record(charm);
            }
        }
        debug!(record = %deploy, "dropped queued deploy");
    }

    /// Destroy machines.
    ///
    /// Uncommitted units on the machines (and their containers) are unplaced
    /// first. Machines that are still queued are dropped with
    /// [`ChangeSet::destroy_queued_machine`]; the rest are marked deleted,
    /// with their containers, and queued in one `destroyMachines` record,
    /// whose key is returned.
    pub fn lazy_destroy_machines(
        &mut self,
        args: DestroyMachines,
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Result<Option<RecordKey>, ChangeSetError> {
        if let Some(missing) = args.machines.iter().find(|m| db.machine(m).is_none()) {
            return Err(ChangeSetError::missing("machine", missing.clone()));
        }
        let mut real = Vec::new();
        for machine in &args.machines {
            let hosted: Vec<String> = db
                .units_on_machine(machine, true)
                .iter()
                .map(|u| u.id.clone())
                .collect();
            for unit in &hosted {
                self.unplace_unit(unit, db);
            }
            if let Some(queued) = self.queued_machine(machine) {
                self.destroy_queued_machine(&queued, db);
                continue;
            }
            let mut affected = db.descendants(machine);
            affected.push(machine.clone());
            for id in &affected {
                if let Some(m) = db.machine_mut(id) {
                    m.deleted = true;
                }
            }
            real.push(machine.clone());
        }
        if real.is_empty() {
            return Ok(None);
        }
        let call = Call {
            operation: Operation::DestroyMachines(DestroyMachines {
                machines: real,
                force: args.force,
            }),
            options,
        };
        Ok(Some(self.create_record(Command::new(call), [], callback)))
    }

    /// Drop a queued `addMachines` record and its ghost machine.
    ///
    /// `addUnits` children only lose the machine as parent and target.
    /// Queued containers on the machine are dropped the same way.
    pub fn destroy_queued_machine(&mut self, machine: &RecordKey, db: &mut ModelDb) {
        for child in self.find_records(|r| r.has_parent(machine)) {
            let is_unit = self
                .record(&child)
                .is_some_and(|r| matches!(r.operation(), Operation::AddUnits(_)));
            if is_unit {
                if let Some(record) = self.record_mut(&child) {
                    record.parents.retain(|p| p != machine);
                    if let Operation::AddUnits(args) = &mut record.command.call.operation {
                        args.to_machine = None;
                    }
                }
            } else if self
                .record(&child)
                .is_some_and(|r| matches!(r.operation(), Operation::AddMachines { .. }))
            {
                self.destroy_queued_machine(&child, db);
            } else {
                self.remove_record(&child);
            }
        }
        if let Some(record) = self.remove_record(machine) {
            if let Some(id) = record.call().model_id() {
                db.remove_machine(id);
            }
        }
        debug!(record = %machine, "dropped queued machine");
    }

    /// Queue `setConfig`, after the application's queued deploy.
    ///
    /// The values are merged into the ghost application's config at once and
    /// their names recorded as dirty fields.
    pub fn lazy_set_config(
        &mut self,
        application: &str,
        config: ConfigMap,
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Result<RecordKey, ChangeSetError> {
        let app = db
            .application_mut(application)
            .ok_or_else(|| ChangeSetError::missing("application", application))?;
        for (name, value) in &config {
            if !app.dirty_fields.contains(name) {
                app.dirty_fields.push(name.clone());
            }
            app.config.insert(name.clone(), value.clone());
        }
        let parents = self.queued_deploy(application);
        let command = Command::new(Call {
            operation: Operation::SetConfig {
                application: application.to_owned(),
                config,
            },
            options,
        })
        .with_parent_results(|call, parent, result, _db| {
            if let Operation::SetConfig { application, .. } = &mut call.operation {
                rename_from_deploy(application, parent, result);
            }
        });
        Ok(self.create_record(command, parents, callback))
    }

    /// Queue `addRelation`, after the queued deploys of either side.
    pub fn lazy_add_relation(
        &mut self,
        endpoints: [Endpoint; 2],
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> RecordKey {
        let parents: Vec<RecordKey> = endpoints
            .iter()
            .filter_map(|e| self.queued_deploy(&e.application))
            .collect();
        let command = Command::new(Call {
            operation: Operation::AddRelation { endpoints },
            options,
        })
        .with_parent_results(|call, parent, result, _db| {
            if let Operation::AddRelation { endpoints } = &mut call.operation {
                for endpoint in endpoints.iter_mut() {
                    rename_from_deploy(&mut endpoint.application, parent, result);
                }
            }
        });
        self.create_record(command, parents, callback)
    }

    /// Remove a relation. A queued `addRelation` for the same endpoints is
    /// dropped with its ghost relation instead, returning `None`.
    pub fn lazy_remove_relation(
        &mut self,
        endpoints: [Endpoint; 2],
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Option<RecordKey> {
        let queued = self.find_records(|r| {
            matches!(
                r.operation(),
                Operation::AddRelation { endpoints: e } if same_endpoints(e, &endpoints)
            )
        });
        if !queued.is_empty() {
            for key in &queued {
                self.remove_record(key);
            }
            let ghost = db.relation_from_endpoints_mut(&endpoints).map(|r| r.id.clone());
            if let Some(id) = ghost {
                db.remove_relation(&id);
            }
            return None;
        }
        if let Some(relation) = db.relation_from_endpoints_mut(&endpoints) {
            relation.deleted = true;
        }
        let call = Call {
            operation: Operation::RemoveRelation { endpoints },
            options,
        };
        Some(self.create_record(Command::new(call), [], callback))
    }

    /// Remove units. Units that are only queued lose their `addUnits` record
    /// and ghost; the rest are marked deleted and queued in one
    /// `removeUnit` record, whose key is returned.
    pub fn lazy_remove_units(
        &mut self,
        units: Vec<String>,
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Option<RecordKey> {
        let mut remaining = Vec::with_capacity(units.len());
        for unit in units {
            if let Some(key) = self.queued_unit(&unit) {
                self.remove_record(&key);
                db.remove_unit(&unit);
            } else {
                remaining.push(unit);
            }
        }
        if remaining.is_empty() {
            return None;
        }
        for unit in &remaining {
            if let Some(u) = db.unit_mut(unit) {
                u.deleted = true;
            }
        }
        let call = Call {
            operation: Operation::RemoveUnits { units: remaining },
            options,
        };
        Some(self.create_record(Command::new(call), [], callback))
    }

    /// Queue `expose`, after the application's queued deploy.
    pub fn lazy_expose(
        &mut self,
        application: &str,
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Result<RecordKey, ChangeSetError> {
        let app = db
            .application_mut(application)
            .ok_or_else(|| ChangeSetError::missing("application", application))?;
        app.exposed = true;
        let parents = self.queued_deploy(application);
        let command = Command::new(Call {
            operation: Operation::Expose {
                application: application.to_owned(),
            },
            options,
        })
        .with_parent_results(|call, parent, result, _db| {
            if let Operation::Expose { application } = &mut call.operation {
                rename_from_deploy(application, parent, result);
            }
        });
        Ok(self.create_record(command, parents, callback))
    }

    /// Unexpose an application. A queued `expose` is dropped instead,
    /// returning `None`.
    pub fn lazy_unexpose(
        &mut self,
        application: &str,
        options: CommandOptions,
        callback: Option<Callback>,
        db: &mut ModelDb,
    ) -> Result<Option<RecordKey>, ChangeSetError> {
        let app = db
            .application_mut(application)
            .ok_or_else(|| ChangeSetError::missing("application", application))?;
        app.exposed = false;
        let queued = self.find_record(|r| {
            matches!(r.operation(), Operation::Expose { application: a } if a == application)
        });
        if let Some(key) = queued {
            self.remove_record(&key);
            return Ok(None);
        }
        let call = Call {
            operation: Operation::Unexpose {
                application: application.to_owned(),
            },
            options,
        };
        Ok(Some(self.create_record(Command::new(call), [], callback)))
    }

    /// Queue `addMachines`, after the queued hosts of any containers.
    ///
    /// Before dispatch a machine without a series takes the series of the
    /// first unit placed on it. When a queued host commits, container
    /// parent ids are rewritten to its real name.
    pub fn lazy_add_machines(
        &mut self,
        params: Vec<MachineParams>,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> RecordKey {
        let parents: Vec<RecordKey> = params
            .iter()
            .filter_map(|p| p.parent_id.as_deref())
            .filter_map(|host| self.queued_machine(host))
            .collect();
        let command = Command::new(Call {
            operation: Operation::AddMachines { params },
            options,
        })
        .with_prepare(|call, db| {
            let Some(machine) = call.model_id() else {
                return;
            };
            let series = db
                .units_on_machine(machine, false)
                .first()
                .and_then(|unit| db.unit_series(unit));
            if let Operation::AddMachines { params } = &mut call.operation {
                if let Some(first) = params.first_mut() {
                    if first.series.is_none() {
                        first.series = series;
                    }
                }
            }
        })
        .with_parent_results(|call, parent, result, _db| {
            if !matches!(parent.operation(), Operation::AddMachines { .. }) {
                return;
            }
            let (Some(ghost), Some(real)) = (parent.call().model_id(), result.first_machine())
            else {
                return;
            };
            if let Operation::AddMachines { params } = &mut call.operation {
                for param in params.iter_mut() {
                    if let Some(host) = param.parent_id.as_mut() {
                        *host = host.replace(ghost, real);
                    }
                }
            }
        });
        self.create_record(command, parents, callback)
    }

    /// Queue `addUnits`, after the application's queued deploy and the
    /// queued target machine.
    ///
    /// When the deploy commits the call adopts the deployed name and the
    /// ghost unit is re-keyed to match; when the machine commits its real id
    /// becomes the target.
    pub fn lazy_add_units(
        &mut self,
        mut args: AddUnits,
        options: CommandOptions,
        callback: Option<Callback>,
    ) -> RecordKey {
        let mut parents = Vec::new();
        if let Some(deploy) = self.queued_deploy(&args.application) {
            if let Some(Operation::Deploy(d)) = self.record(&deploy).map(Record::operation) {
                args.application.clone_from(&d.application_name);
            }
            parents.push(deploy);
        }
        if let Some(machine) = args.to_machine.as_deref().and_then(|m| self.queued_machine(m)) {
            parents.push(machine);
        }
        let command = Command::new(Call {
            operation: Operation::AddUnits(args),
            options,
        })
        .with_parent_results(|call, parent, result, db| match parent.operation() {
            Operation::AddMachines { .. } => {
                if let (Operation::AddUnits(args), Some(real)) =
                    (&mut call.operation, result.first_machine())
                {
                    args.to_machine = Some(real.to_owned());
                }
            }
            Operation::Deploy(_) => {
                let Some(name) = deployed_name(parent, result) else {
                    return;
                };
                if let Operation::AddUnits(args) = &mut call.operation {
                    args.application.clone_from(&name);
                }
                let rekeyed = call
                    .options
                    .model_id
                    .as_deref()
                    .and_then(|unit| db.update_unit_id(&name, unit));
                if let Some(unit) = rekeyed {
                    call.options.model_id = Some(unit);
                }
            }
            _ => {}
        });
        self.create_record(command, parents, callback)
    }
}
